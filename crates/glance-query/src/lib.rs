//! # glance-query
//!
//! Core abstractions for Glance, a demo that previews data from external
//! backends (warehouses, spreadsheets, object stores) using credentials from
//! a secrets store.
//!
//! The crate carries the pieces every backend shares:
//!
//! - **SourceRegistry**: static mapping from a data source name to its
//!   metadata (secret key, credential template, tutorial, factory)
//! - **ConnectorResolver**: classifies each resolution attempt into exactly
//!   one [`ConnectionOutcome`] and owns the process-wide connector slots
//! - **QueryCache**: TTL memoization for expensive read calls
//! - **SecretStore**: the nested key-value credentials configuration
//! - **Connector / ConnectorFactory** traits plus capability surfaces
//!   ([`SqlWarehouse`], [`Spreadsheet`], [`ObjectStore`])
//!
//! Backend crates (`glance-query-bigquery`, `glance-query-snowflake`,
//! `glance-query-gsheets`, `glance-query-s3`) implement the traits; the
//! composition root in `glance-app` wires descriptors and caches together.

pub mod cache;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod secrets;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use cache::{CacheKey, QueryCache};
pub use error::{DataError, Result};
pub use registry::{SourceDescriptor, SourceRegistry};
pub use resolver::{ConnectionOutcome, ConnectorResolver};
pub use secrets::{parse_section, SecretSection, SecretStore};
pub use traits::{Connector, ConnectorFactory, ObjectStore, Spreadsheet, SqlWarehouse};
pub use types::{
    BucketInfo, Capability, CatalogInfo, ColumnDef, FieldType, ObjectInfo, QueryStats, SourceId,
    TablePreview, TutorialFlow, TutorialStep,
};
