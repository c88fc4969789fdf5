//! End-to-end flows through the composition root with stubbed backends:
//! resolve, onboarding fallback, memoization and secrets edits.

use async_trait::async_trait;
use glance_app::AppContext;
use glance_onboarding::{credential_template, tutorial, ChecklistState};
use glance_query::{
    Capability, CatalogInfo, ColumnDef, ConnectionOutcome, Connector, ConnectorFactory, DataError,
    FieldType, ObjectInfo, ObjectStore, Result, SecretSection, SecretStore, SourceDescriptor,
    SourceId, SourceRegistry, SqlWarehouse, TablePreview,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct StubWarehouse {
    id: SourceId,
    catalog_calls: AtomicUsize,
    sql_calls: AtomicUsize,
}

impl StubWarehouse {
    fn new(id: SourceId) -> Arc<Self> {
        Arc::new(Self {
            id,
            catalog_calls: AtomicUsize::new(0),
            sql_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Connector for StubWarehouse {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Warehouse]
    }

    fn as_warehouse(&self) -> Option<&dyn SqlWarehouse> {
        Some(self)
    }
}

#[async_trait]
impl SqlWarehouse for StubWarehouse {
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![CatalogInfo {
            name: "proj-a".to_string(),
            description: None,
        }])
    }

    async fn execute_sql(&self, sql: &str) -> Result<TablePreview> {
        self.sql_calls.fetch_add(1, Ordering::SeqCst);

        if sql.contains("boom") {
            return Err(DataError::QueryFailed("syntax error near boom".into()));
        }
        if sql.contains("INFORMATION_SCHEMA.SCHEMATA") {
            return Ok(TablePreview::new(
                vec![ColumnDef::new("schema_name", FieldType::String)],
                vec![vec![json!("analytics")], vec![json!("sales")]],
            ));
        }
        if sql.contains("__TABLES__") {
            return Ok(TablePreview::new(
                vec![
                    ColumnDef::new("table", FieldType::String),
                    ColumnDef::new("size_in_gb", FieldType::Float64),
                ],
                vec![vec![json!("events"), json!(1.5)]],
            ));
        }
        Ok(TablePreview::new(
            vec![ColumnDef::new("value", FieldType::Int64)],
            vec![vec![json!(1)]],
        ))
    }
}

struct StubObjects {
    list_calls: AtomicUsize,
}

#[async_trait]
impl Connector for StubObjects {
    fn source_id(&self) -> SourceId {
        SourceId::AwsS3
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::ObjectStore]
    }

    fn as_object_store(&self) -> Option<&dyn ObjectStore> {
        Some(self)
    }
}

#[async_trait]
impl ObjectStore for StubObjects {
    async fn list_buckets(&self) -> Result<Vec<glance_query::BucketInfo>> {
        Ok(vec![])
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ObjectInfo {
            bucket: bucket.to_string(),
            key: format!("{}data.csv", prefix.unwrap_or_default()),
            size_bytes: Some(42),
            last_modified: None,
        }])
    }
}

/// Factory handing out one pre-built connector, counting invocations
struct FixedFactory {
    id: SourceId,
    connector: Arc<dyn Connector>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ConnectorFactory for FixedFactory {
    fn source_id(&self) -> SourceId {
        self.id
    }

    async fn connect(&self, _secrets: &SecretSection) -> Result<Arc<dyn Connector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.connector.clone())
    }
}

fn registry_with(
    id: SourceId,
    connector: Arc<dyn Connector>,
    calls: Arc<AtomicUsize>,
) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(SourceDescriptor::new(
        id,
        "https://docs.example.com",
        credential_template(id),
        tutorial(id),
        Arc::new(FixedFactory {
            id,
            connector,
            calls,
        }),
    ));
    registry
}

fn bigquery_secrets() -> SecretStore {
    SecretStore::from_toml_str("[bigquery]\nproject_id = \"p\"\n").unwrap()
}

async fn connected(ctx: &AppContext, name: &str) -> Arc<dyn Connector> {
    match ctx.resolve(name).await.unwrap() {
        ConnectionOutcome::Connected(c) => c,
        other => panic!("expected Connected, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_credentials_falls_back_to_onboarding() {
    let stub = StubWarehouse::new(SourceId::BigQuery);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::BigQuery, stub, calls.clone()),
        SecretStore::empty(),
    );

    let outcome = ctx.resolve("BigQuery").await.unwrap();
    assert!(matches!(
        outcome,
        ConnectionOutcome::MissingCredentials { secret_key: "bigquery" }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The UI renders the walkthrough with a fresh, all-unchecked checklist.
    let descriptor = ctx.registry().lookup("BigQuery").unwrap();
    assert!(!descriptor.tutorial.steps.is_empty());
    let checklist = ChecklistState::new();
    assert_eq!(checklist.completed_count(), 0);
}

#[tokio::test]
async fn connected_catalogs_hit_backend_once() {
    let stub = StubWarehouse::new(SourceId::BigQuery);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::BigQuery, stub.clone(), calls.clone()),
        bigquery_secrets(),
    );

    let connector = connected(&ctx, "BigQuery").await;

    let first = ctx.warehouse_catalogs(&connector).await.unwrap();
    let second = ctx.warehouse_catalogs(&connector).await.unwrap();
    assert_eq!(first[0].name, "proj-a");
    assert_eq!(second.len(), 1);
    assert_eq!(stub.catalog_calls.load(Ordering::SeqCst), 1);

    // The connector itself is a shared singleton.
    let again = connected(&ctx, "BigQuery").await;
    assert!(Arc::ptr_eq(&connector, &again));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn secrets_edit_is_picked_up_without_restart() {
    let stub = StubWarehouse::new(SourceId::BigQuery);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::BigQuery, stub, calls.clone()),
        bigquery_secrets(),
    );

    connected(&ctx, "BigQuery").await;

    // Operator wipes the section: next interaction shows onboarding again.
    ctx.update_secrets(SecretStore::empty()).await;
    let outcome = ctx.resolve("BigQuery").await.unwrap();
    assert!(matches!(
        outcome,
        ConnectionOutcome::MissingCredentials { .. }
    ));
    assert!(ctx.connected_sources().await.is_empty());

    // Re-adding credentials reconnects from scratch.
    ctx.update_secrets(bigquery_secrets()).await;
    connected(&ctx, "BigQuery").await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ad_hoc_sql_is_never_cached_and_failures_are_contained() {
    let stub = StubWarehouse::new(SourceId::BigQuery);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::BigQuery, stub.clone(), calls),
        bigquery_secrets(),
    );

    let connector = connected(&ctx, "BigQuery").await;

    let err = ctx.run_sql(&connector, "SELECT boom").await.unwrap_err();
    assert!(matches!(err, DataError::QueryFailed(_)));

    // The failure neither drops the connector nor poisons any cache.
    let again = connected(&ctx, "BigQuery").await;
    assert!(Arc::ptr_eq(&connector, &again));

    ctx.run_sql(&connector, "SELECT 1").await.unwrap();
    ctx.run_sql(&connector, "SELECT 1").await.unwrap();
    assert_eq!(stub.sql_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn table_sizes_aggregate_all_schemas_and_memoize() {
    let stub = StubWarehouse::new(SourceId::BigQuery);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::BigQuery, stub.clone(), calls),
        bigquery_secrets(),
    );

    let connector = connected(&ctx, "BigQuery").await;

    let preview = ctx
        .bigquery_table_sizes(&connector, "my-project")
        .await
        .unwrap();
    let names: Vec<&str> = preview.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["project", "schema", "table", "size_in_gb"]);
    // Two schemas, one table each.
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.rows[0][1], json!("analytics"));
    assert_eq!(preview.rows[1][1], json!("sales"));
    assert_eq!(preview.rows[0][3], json!(1.5));

    // One SCHEMATA query plus one per schema, then served from cache.
    assert_eq!(stub.sql_calls.load(Ordering::SeqCst), 3);
    ctx.bigquery_table_sizes(&connector, "my-project")
        .await
        .unwrap();
    assert_eq!(stub.sql_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn capability_mismatch_is_rejected() {
    let stub = StubWarehouse::new(SourceId::BigQuery);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::BigQuery, stub, calls),
        bigquery_secrets(),
    );

    let connector = connected(&ctx, "BigQuery").await;

    let err = ctx.sheet_preview(&connector).await.unwrap_err();
    assert!(matches!(err, DataError::OperationNotSupported(_)));
    let err = ctx.object_store_buckets(&connector).await.unwrap_err();
    assert!(matches!(err, DataError::OperationNotSupported(_)));
}

#[tokio::test]
async fn object_listings_are_memoized_per_prefix() {
    let stub = Arc::new(StubObjects {
        list_calls: AtomicUsize::new(0),
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = AppContext::with_registry(
        registry_with(SourceId::AwsS3, stub.clone(), calls),
        SecretStore::from_toml_str("[aws_s3]\nAWS_ACCESS_KEY_ID = \"k\"\n").unwrap(),
    );

    let connector = connected(&ctx, "AWS S3").await;

    ctx.object_store_objects(&connector, "demo", None)
        .await
        .unwrap();
    ctx.object_store_objects(&connector, "demo", None)
        .await
        .unwrap();
    assert_eq!(stub.list_calls.load(Ordering::SeqCst), 1);

    // A different prefix is a different cache entry.
    let objects = ctx
        .object_store_objects(&connector, "demo", Some("raw/"))
        .await
        .unwrap();
    assert_eq!(objects[0].key, "raw/data.csv");
    assert_eq!(stub.list_calls.load(Ordering::SeqCst), 2);
}
