//! Composition root: wires registry, resolver, secrets and caches together.
//!
//! One [`AppContext`] exists per process. Every UI interaction goes through
//! [`AppContext::resolve`], which re-runs the secrets presence check so
//! credential edits take effect without a restart.

use glance_onboarding::{credential_template, tutorial};
use glance_query::{
    BucketInfo, CatalogInfo, ConnectionOutcome, ConnectorResolver, ObjectInfo, QueryCache, Result,
    SecretStore, SourceDescriptor, SourceId, SourceRegistry, TablePreview,
};
use glance_query_bigquery::BigQueryFactory;
use glance_query_gsheets::GoogleSheetFactory;
use glance_query_s3::S3Factory;
use glance_query_snowflake::SnowflakeFactory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

const BIGQUERY_DOCS_URL: &str =
    "https://cloud.google.com/bigquery/docs/quickstarts/quickstart-web-ui";
const SNOWFLAKE_DOCS_URL: &str = "https://docs.snowflake.com/en/developer-guide/sql-api/index";
const GSHEETS_DOCS_URL: &str = "https://support.google.com/docs/answer/183965";
const AWS_S3_DOCS_URL: &str =
    "https://docs.aws.amazon.com/AmazonS3/latest/userguide/Welcome.html";

/// Catalog listings change rarely
const CATALOGS_TTL: Duration = Duration::from_secs(216_000);
/// BigQuery table size aggregation is expensive but should stay fresh-ish
const BIGQUERY_TABLE_SIZES_TTL: Duration = Duration::from_secs(2_000);
const SNOWFLAKE_TABLES_TTL: Duration = Duration::from_secs(216_000);
/// Sheets are edited by humans while they watch the preview
const SHEET_TTL: Duration = Duration::from_secs(600);
const OBJECTS_TTL: Duration = Duration::from_secs(3_600);

/// One cache instance per memoized operation family
pub struct Caches {
    pub catalogs: QueryCache<Vec<CatalogInfo>>,
    pub bigquery_table_sizes: QueryCache<TablePreview>,
    pub snowflake_tables: QueryCache<TablePreview>,
    pub sheet: QueryCache<TablePreview>,
    pub buckets: QueryCache<Vec<BucketInfo>>,
    pub objects: QueryCache<Vec<ObjectInfo>>,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            catalogs: QueryCache::new(CATALOGS_TTL),
            bigquery_table_sizes: QueryCache::new(BIGQUERY_TABLE_SIZES_TTL),
            snowflake_tables: QueryCache::new(SNOWFLAKE_TABLES_TTL),
            sheet: QueryCache::new(SHEET_TTL),
            buckets: QueryCache::new(OBJECTS_TTL),
            objects: QueryCache::new(OBJECTS_TTL),
        }
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide application state: registry, resolver, secrets and caches
pub struct AppContext {
    registry: SourceRegistry,
    resolver: ConnectorResolver,
    secrets: RwLock<SecretStore>,
    pub(crate) caches: Caches,
}

impl AppContext {
    /// Build the production context with all four backends registered
    pub fn new(secrets: SecretStore) -> Self {
        Self::with_registry(default_registry(), secrets)
    }

    /// Build a context around a caller-supplied registry.
    /// Used by tests to substitute stub factories.
    pub fn with_registry(registry: SourceRegistry, secrets: SecretStore) -> Self {
        info!(sources = registry.len(), "Initializing application context");
        Self {
            registry,
            resolver: ConnectorResolver::new(),
            secrets: RwLock::new(secrets),
            caches: Caches::new(),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Labels of all registered sources, in registration order
    pub fn source_labels(&self) -> Vec<&'static str> {
        self.registry.list_ids()
    }

    /// Resolve a data source by its human-facing label.
    ///
    /// Runs once per UI interaction: the presence check against the current
    /// secrets always happens, so editing or removing a secret section takes
    /// effect on the very next interaction.
    pub async fn resolve(&self, name: &str) -> Result<ConnectionOutcome> {
        let descriptor = self.registry.lookup(name)?;
        let secrets = self.secrets.read().await;
        Ok(self.resolver.resolve(descriptor, &secrets).await)
    }

    /// Replace the secrets store (e.g. after the operator edits the file)
    pub async fn update_secrets(&self, secrets: SecretStore) {
        info!("Replacing secrets store");
        *self.secrets.write().await = secrets;
    }

    /// Drop the held connector for a source, closing it best-effort
    pub async fn evict(&self, id: SourceId) {
        self.resolver.evict(id).await;
    }

    /// Sources that currently hold a live connector
    pub async fn connected_sources(&self) -> Vec<SourceId> {
        self.resolver.connected_sources().await
    }
}

/// The four production descriptors, in the order the UI lists them
fn default_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();

    registry.register(SourceDescriptor::new(
        SourceId::BigQuery,
        BIGQUERY_DOCS_URL,
        credential_template(SourceId::BigQuery),
        tutorial(SourceId::BigQuery),
        Arc::new(BigQueryFactory),
    ));
    registry.register(SourceDescriptor::new(
        SourceId::Snowflake,
        SNOWFLAKE_DOCS_URL,
        credential_template(SourceId::Snowflake),
        tutorial(SourceId::Snowflake),
        Arc::new(SnowflakeFactory),
    ));
    registry.register(SourceDescriptor::new(
        SourceId::GoogleSheet,
        GSHEETS_DOCS_URL,
        credential_template(SourceId::GoogleSheet),
        tutorial(SourceId::GoogleSheet),
        Arc::new(GoogleSheetFactory),
    ));
    registry.register(SourceDescriptor::new(
        SourceId::AwsS3,
        AWS_S3_DOCS_URL,
        credential_template(SourceId::AwsS3),
        tutorial(SourceId::AwsS3),
        Arc::new(S3Factory),
    ));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_all_backends_in_order() {
        let registry = default_registry();
        assert_eq!(
            registry.list_ids(),
            vec!["BigQuery", "Snowflake", "Public Google Sheet", "AWS S3"]
        );
    }

    #[test]
    fn test_every_descriptor_carries_tutorial_and_template() {
        let registry = default_registry();
        for id in SourceId::ALL {
            let descriptor = registry.get(id).unwrap();
            assert!(!descriptor.secret_key.is_empty());
            assert!(!descriptor.docs_url.is_empty());
            assert!(!descriptor.tutorial.steps.is_empty());
            assert!(descriptor
                .credential_template
                .contains(descriptor.secret_key));
        }
    }

    #[tokio::test]
    async fn test_unknown_source_lookup_fails() {
        let ctx = AppContext::new(SecretStore::empty());
        let err = ctx.resolve("nonexistent").await.unwrap_err();
        assert!(matches!(
            err,
            glance_query::DataError::UnknownSource(name) if name == "nonexistent"
        ));
    }
}
