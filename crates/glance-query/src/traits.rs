use crate::error::Result;
use crate::secrets::SecretSection;
use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;

/// A live session handle to a backend data source.
///
/// Connectors are created by a [`ConnectorFactory`] and owned by the
/// process-wide resolver slot; callers only ever see `Arc<dyn Connector>`.
/// The capability views give access to the backend-specific read surface
/// without string-keyed dynamic dispatch.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Which source this connector serves
    fn source_id(&self) -> SourceId;

    /// Capabilities supported by this connector
    fn capabilities(&self) -> Vec<Capability>;

    /// Check if a specific capability is supported
    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// View this connector as a SQL warehouse, if it is one
    fn as_warehouse(&self) -> Option<&dyn SqlWarehouse> {
        None
    }

    /// View this connector as a spreadsheet source, if it is one
    fn as_spreadsheet(&self) -> Option<&dyn Spreadsheet> {
        None
    }

    /// View this connector as an object store, if it is one
    fn as_object_store(&self) -> Option<&dyn ObjectStore> {
        None
    }

    /// Close the session gracefully
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds a live connector from a secret section.
///
/// The section is handed over verbatim; the factory deserializes whatever
/// fields its backend needs and fails with a classified [`crate::DataError`]
/// on malformed fields, auth errors or unreachable backends. Factories must be
/// side-effect-free on the backend so redundant construction under races is
/// harmless.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    /// Which source this factory builds connectors for
    fn source_id(&self) -> SourceId;

    /// Attempt to construct a live connector
    async fn connect(&self, secrets: &SecretSection) -> Result<Arc<dyn Connector>>;
}

/// Read surface of SQL warehouses (BigQuery, Snowflake)
#[async_trait]
pub trait SqlWarehouse: Send + Sync {
    /// List top-level catalogs (BigQuery projects, Snowflake databases)
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>>;

    /// Execute a read-only SQL statement and return a bounded preview
    async fn execute_sql(&self, sql: &str) -> Result<TablePreview>;
}

/// Read surface of spreadsheet sources
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Fetch the whole sheet as a table
    async fn read_all(&self) -> Result<TablePreview>;
}

/// Read surface of object stores (S3, MinIO)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List buckets visible to the credentials
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// List objects in a bucket, optionally under a key prefix
    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>>;
}
