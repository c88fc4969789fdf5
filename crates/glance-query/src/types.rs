use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a supported backend integration.
///
/// This is a closed set: adding a backend means adding a variant here and a
/// descriptor in the composition root, so an unregistered-but-matched source
/// cannot exist.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    BigQuery,
    Snowflake,
    GoogleSheet,
    AwsS3,
}

impl SourceId {
    /// All supported sources, in presentation order
    pub const ALL: [SourceId; 4] = [
        SourceId::BigQuery,
        SourceId::Snowflake,
        SourceId::GoogleSheet,
        SourceId::AwsS3,
    ];

    /// Top-level section name expected in the secrets store
    pub fn secret_key(self) -> &'static str {
        match self {
            SourceId::BigQuery => "bigquery",
            SourceId::Snowflake => "snowflake",
            SourceId::GoogleSheet => "gsheets",
            SourceId::AwsS3 => "aws_s3",
        }
    }

    /// Human-facing name used by selection controls
    pub fn label(self) -> &'static str {
        match self {
            SourceId::BigQuery => "BigQuery",
            SourceId::Snowflake => "Snowflake",
            SourceId::GoogleSheet => "Public Google Sheet",
            SourceId::AwsS3 => "AWS S3",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Capabilities supported by a data source
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Capability {
    /// SQL warehouse (BigQuery, Snowflake)
    Warehouse,
    /// Tabular spreadsheet access
    Spreadsheet,
    /// Object storage (S3, MinIO)
    ObjectStore,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Warehouse => write!(f, "warehouse"),
            Capability::Spreadsheet => write!(f, "spreadsheet"),
            Capability::ObjectStore => write!(f, "object-store"),
        }
    }
}

/// Field data types surfaced in table previews
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Int64,
    Float64,
    String,
    Date,
    Timestamp,
    Json,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Float64 => write!(f, "float64"),
            FieldType::String => write!(f, "string"),
            FieldType::Date => write!(f, "date"),
            FieldType::Timestamp => write!(f, "timestamp"),
            FieldType::Json => write!(f, "json"),
        }
    }
}

/// A single column in a table preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub field_type: FieldType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Statistics about a preview/query execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStats {
    /// Number of rows returned
    pub row_count: usize,
    /// Total rows available (if the backend reports it)
    pub total_rows: Option<u64>,
    /// Execution time in milliseconds
    pub execution_ms: u64,
}

/// A small tabular result rendered by the UI runtime.
///
/// Rows are positional and line up with `columns`; values are JSON so every
/// backend can map into the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePreview {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub stats: QueryStats,
}

impl TablePreview {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            stats: QueryStats {
                row_count,
                total_rows: Some(row_count as u64),
                execution_ms: 0,
            },
        }
    }

    pub fn with_stats(
        columns: Vec<ColumnDef>,
        rows: Vec<Vec<serde_json::Value>>,
        total_rows: Option<u64>,
        execution_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            stats: QueryStats {
                row_count,
                total_rows,
                execution_ms,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// A top-level catalog in a warehouse (BigQuery project, Snowflake database)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    pub description: Option<String>,
}

/// An object storage bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An object inside a bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub bucket: String,
    pub key: String,
    pub size_bytes: Option<u64>,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// One step of an onboarding checklist
#[derive(Debug, Clone, Serialize)]
pub struct TutorialStep {
    /// Stable identifier used as the checklist toggle key
    pub id: &'static str,
    /// Short bolded title
    pub title: &'static str,
    /// Markdown body
    pub body: &'static str,
    /// Optional screenshot path
    pub image: Option<&'static str>,
    /// Optional code sample with its language tag
    pub code_sample: Option<(&'static str, &'static str)>,
}

/// Ordered setup walkthrough shown when credentials are missing or rejected
#[derive(Debug, Clone, Serialize)]
pub struct TutorialFlow {
    /// Introductory markdown shown above the checklist
    pub intro: &'static str,
    pub steps: Vec<TutorialStep>,
}

impl TutorialFlow {
    pub fn step_ids(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_labels_and_keys() {
        assert_eq!(SourceId::BigQuery.label(), "BigQuery");
        assert_eq!(SourceId::BigQuery.secret_key(), "bigquery");
        assert_eq!(SourceId::GoogleSheet.secret_key(), "gsheets");
        assert_eq!(SourceId::AwsS3.secret_key(), "aws_s3");
        for id in SourceId::ALL {
            assert!(!id.secret_key().is_empty());
        }
    }

    #[test]
    fn test_table_preview_column_index() {
        let preview = TablePreview::new(
            vec![
                ColumnDef::new("name", FieldType::String),
                ColumnDef::new("size_in_gb", FieldType::Float64),
            ],
            vec![vec![serde_json::json!("events"), serde_json::json!(1.5)]],
        );
        assert_eq!(preview.column_index("size_in_gb"), Some(1));
        assert_eq!(preview.column_index("missing"), None);
        assert_eq!(preview.stats.row_count, 1);
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::Warehouse.to_string(), "warehouse");
        assert_eq!(Capability::ObjectStore.to_string(), "object-store");
    }
}
