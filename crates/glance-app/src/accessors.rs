//! Memoized read accessors, one per expensive backend operation.
//!
//! Each accessor takes the connector handed back by resolution, requires the
//! matching capability and keys its cache by connector identity plus call
//! arguments. Ad-hoc SQL from the query box is intentionally not cached.

use crate::context::AppContext;
use glance_query::{
    BucketInfo, CacheKey, CatalogInfo, ColumnDef, Connector, DataError, FieldType, ObjectInfo,
    ObjectStore, Result, SourceId, Spreadsheet, SqlWarehouse, TablePreview,
};
use std::sync::Arc;
use tracing::debug;

fn warehouse_view(connector: &dyn Connector) -> Result<&dyn SqlWarehouse> {
    connector.as_warehouse().ok_or_else(|| {
        DataError::operation_not_supported(format!(
            "{} does not support SQL queries",
            connector.source_id()
        ))
    })
}

fn spreadsheet_view(connector: &dyn Connector) -> Result<&dyn Spreadsheet> {
    connector.as_spreadsheet().ok_or_else(|| {
        DataError::operation_not_supported(format!(
            "{} is not a spreadsheet source",
            connector.source_id()
        ))
    })
}

fn object_store_view(connector: &dyn Connector) -> Result<&dyn ObjectStore> {
    connector.as_object_store().ok_or_else(|| {
        DataError::operation_not_supported(format!(
            "{} is not an object store",
            connector.source_id()
        ))
    })
}

impl AppContext {
    /// Top-level catalogs of a warehouse (BigQuery projects, Snowflake
    /// databases), memoized per connector.
    pub async fn warehouse_catalogs(
        &self,
        connector: &Arc<dyn Connector>,
    ) -> Result<Vec<CatalogInfo>> {
        warehouse_view(connector.as_ref())?;

        let key = CacheKey::new(connector, "list_catalogs", vec![]);
        let conn = connector.clone();
        self.caches
            .catalogs
            .get_or_compute(key, || async move {
                warehouse_view(conn.as_ref())?.list_catalogs().await
            })
            .await
    }

    /// Per-table size breakdown for a BigQuery project: every schema's
    /// `__TABLES__` aggregated into one preview with columns
    /// `project, schema, table, size_in_gb`.
    pub async fn bigquery_table_sizes(
        &self,
        connector: &Arc<dyn Connector>,
        project: &str,
    ) -> Result<TablePreview> {
        if connector.source_id() != SourceId::BigQuery {
            return Err(DataError::operation_not_supported(format!(
                "table size breakdown is only available for BigQuery, not {}",
                connector.source_id()
            )));
        }

        let key = CacheKey::new(connector, "bigquery_table_sizes", vec![project.to_string()]);
        let conn = connector.clone();
        let project = project.to_string();
        self.caches
            .bigquery_table_sizes
            .get_or_compute(key, || async move {
                collect_table_sizes(warehouse_view(conn.as_ref())?, &project).await
            })
            .await
    }

    /// Tables available in a Snowflake database
    /// (`INFORMATION_SCHEMA.TABLES`), memoized per connector and database.
    pub async fn snowflake_database_tables(
        &self,
        connector: &Arc<dyn Connector>,
        database: &str,
    ) -> Result<TablePreview> {
        if connector.source_id() != SourceId::Snowflake {
            return Err(DataError::operation_not_supported(format!(
                "database table listing is only available for Snowflake, not {}",
                connector.source_id()
            )));
        }

        let key = CacheKey::new(
            connector,
            "snowflake_database_tables",
            vec![database.to_string()],
        );
        let conn = connector.clone();
        let database = database.to_string();
        self.caches
            .snowflake_tables
            .get_or_compute(key, || async move {
                warehouse_view(conn.as_ref())?
                    .execute_sql(&format!(
                        "SELECT * FROM {}.INFORMATION_SCHEMA.TABLES;",
                        database
                    ))
                    .await
            })
            .await
    }

    /// Full contents of the configured public sheet, memoized per connector
    pub async fn sheet_preview(&self, connector: &Arc<dyn Connector>) -> Result<TablePreview> {
        spreadsheet_view(connector.as_ref())?;

        let key = CacheKey::new(connector, "read_all", vec![]);
        let conn = connector.clone();
        self.caches
            .sheet
            .get_or_compute(key, || async move {
                spreadsheet_view(conn.as_ref())?.read_all().await
            })
            .await
    }

    /// Buckets visible to the object store credentials, memoized per connector
    pub async fn object_store_buckets(
        &self,
        connector: &Arc<dyn Connector>,
    ) -> Result<Vec<BucketInfo>> {
        object_store_view(connector.as_ref())?;

        let key = CacheKey::new(connector, "list_buckets", vec![]);
        let conn = connector.clone();
        self.caches
            .buckets
            .get_or_compute(key, || async move {
                object_store_view(conn.as_ref())?.list_buckets().await
            })
            .await
    }

    /// Objects in a bucket, optionally under a key prefix, memoized per
    /// connector, bucket and prefix.
    pub async fn object_store_objects(
        &self,
        connector: &Arc<dyn Connector>,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectInfo>> {
        object_store_view(connector.as_ref())?;

        let key = CacheKey::new(
            connector,
            "list_objects",
            vec![
                bucket.to_string(),
                prefix.unwrap_or_default().to_string(),
            ],
        );
        let conn = connector.clone();
        let bucket = bucket.to_string();
        let prefix = prefix.map(str::to_string);
        self.caches
            .objects
            .get_or_compute(key, || async move {
                object_store_view(conn.as_ref())?
                    .list_objects(&bucket, prefix.as_deref())
                    .await
            })
            .await
    }

    /// Run an ad-hoc SQL statement from the query box.
    ///
    /// Never cached: the operator expects each submit to hit the backend, and
    /// a failed statement must not poison any memoized state.
    pub async fn run_sql(&self, connector: &Arc<dyn Connector>, sql: &str) -> Result<TablePreview> {
        debug!(source = %connector.source_id(), "Running ad-hoc SQL");
        warehouse_view(connector.as_ref())?.execute_sql(sql).await
    }
}

/// Walk every schema of a project and aggregate `__TABLES__` sizes
async fn collect_table_sizes(warehouse: &dyn SqlWarehouse, project: &str) -> Result<TablePreview> {
    let schemata = warehouse
        .execute_sql(&format!(
            "SELECT schema_name FROM `{}`.INFORMATION_SCHEMA.SCHEMATA;",
            project
        ))
        .await?;
    let name_index = schemata
        .column_index("schema_name")
        .ok_or_else(|| DataError::query_failed("SCHEMATA result lacks a schema_name column"))?;

    let columns = vec![
        ColumnDef::new("project", FieldType::String),
        ColumnDef::new("schema", FieldType::String),
        ColumnDef::new("table", FieldType::String),
        ColumnDef::new("size_in_gb", FieldType::Float64),
    ];
    let mut rows = Vec::new();

    for schema_row in &schemata.rows {
        let Some(schema) = schema_row.get(name_index).and_then(|v| v.as_str()) else {
            continue;
        };

        let sizes = warehouse
            .execute_sql(&format!(
                "SELECT table_id AS table, sum(size_bytes)/pow(10,9) AS size_in_gb \
                 FROM `{}`.{}.__TABLES__ GROUP BY table_id",
                project, schema
            ))
            .await?;
        let table_index = sizes
            .column_index("table")
            .ok_or_else(|| DataError::query_failed("__TABLES__ result lacks a table column"))?;
        let size_index = sizes
            .column_index("size_in_gb")
            .ok_or_else(|| DataError::query_failed("__TABLES__ result lacks a size_in_gb column"))?;

        for row in &sizes.rows {
            rows.push(vec![
                serde_json::Value::String(project.to_string()),
                serde_json::Value::String(schema.to_string()),
                row.get(table_index).cloned().unwrap_or(serde_json::Value::Null),
                row.get(size_index).cloned().unwrap_or(serde_json::Value::Null),
            ]);
        }
    }

    Ok(TablePreview::new(columns, rows))
}
