//! Public Google Sheet implementation of the glance-query connector traits.
//!
//! Reads a link-shared sheet through the gviz endpoint
//! (`<sheet>/gviz/tq?tqx=out:json`), which needs no authentication. The
//! `[gsheets]` secret section only carries the sheet URL; "connecting" just
//! validates it, so the first network call happens on the first preview.

use async_trait::async_trait;
use glance_query::{
    parse_section, Capability, ColumnDef, Connector, ConnectorFactory, DataError, FieldType,
    Result, SecretSection, SourceId, Spreadsheet, TablePreview,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const GSHEETS_URL_PREFIX: &str = "https://docs.google.com/";

/// Credentials from the `[gsheets]` secret section
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSheetCredentials {
    /// Link-shared sheet URL, e.g. `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`
    pub public_gsheets_url: String,
}

#[derive(Debug, Deserialize)]
struct GvizResponse {
    status: String,
    #[serde(default)]
    errors: Vec<GvizError>,
    table: Option<GvizTable>,
}

#[derive(Debug, Deserialize)]
struct GvizError {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GvizTable {
    #[serde(default)]
    cols: Vec<GvizCol>,
    #[serde(default)]
    rows: Vec<GvizRow>,
}

#[derive(Debug, Deserialize)]
struct GvizCol {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(rename = "type", default)]
    col_type: String,
}

#[derive(Debug, Deserialize)]
struct GvizRow {
    #[serde(default)]
    c: Vec<Option<GvizCell>>,
}

#[derive(Debug, Deserialize)]
struct GvizCell {
    #[serde(default)]
    v: serde_json::Value,
    /// Formatted value, present for dates and formatted numbers
    #[serde(default)]
    f: Option<String>,
}

/// Public Google Sheet data source implementation
#[derive(Debug)]
pub struct GoogleSheetSource {
    http: reqwest::Client,
    query_url: String,
}

impl GoogleSheetSource {
    /// Validate the sheet URL and build a source. No network I/O happens
    /// here; a wrong-but-well-formed URL only fails on the first read.
    pub fn connect(credentials: GoogleSheetCredentials) -> Result<Arc<Self>> {
        if !credentials.public_gsheets_url.starts_with(GSHEETS_URL_PREFIX) {
            return Err(DataError::InvalidConfiguration(format!(
                "Invalid sheet URL, must start with {}",
                GSHEETS_URL_PREFIX
            )));
        }

        let query_url = sheet_url_to_query_url(&credentials.public_gsheets_url);
        Self::with_query_url(query_url)
    }

    /// Build a source straight from a gviz query URL (tests use a mock host)
    pub fn with_query_url(query_url: String) -> Result<Arc<Self>> {
        debug!("Creating Google Sheet source for {}", query_url);

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DataError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Arc::new(Self { http, query_url }))
    }

    fn convert_preview(table: GvizTable) -> TablePreview {
        let columns: Vec<ColumnDef> = table
            .cols
            .iter()
            .map(|col| {
                let name = if col.label.is_empty() {
                    col.id.clone()
                } else {
                    col.label.clone()
                };
                ColumnDef::new(name, map_col_type(&col.col_type))
            })
            .collect();

        let rows = table
            .rows
            .into_iter()
            .map(|row| {
                let mut values: Vec<serde_json::Value> =
                    row.c.into_iter().map(convert_cell).collect();
                // Ragged rows are padded so they always line up with headers.
                values.resize(columns.len(), serde_json::Value::Null);
                values
            })
            .collect();

        TablePreview::new(columns, rows)
    }
}

fn map_col_type(gviz_type: &str) -> FieldType {
    match gviz_type {
        "number" => FieldType::Float64,
        "boolean" => FieldType::Boolean,
        "date" => FieldType::Date,
        "datetime" => FieldType::Timestamp,
        _ => FieldType::String,
    }
}

/// Dates arrive as `Date(2024,0,15)` constructor strings in `v`; the
/// formatted `f` value is what a person expects to see.
fn convert_cell(cell: Option<GvizCell>) -> serde_json::Value {
    match cell {
        None => serde_json::Value::Null,
        Some(cell) => match cell.f {
            Some(formatted) if cell.v.as_str().map_or(false, |v| v.starts_with("Date(")) => {
                serde_json::Value::String(formatted)
            }
            _ => cell.v,
        },
    }
}

/// Derive the gviz query endpoint from a sheet's sharing URL
fn sheet_url_to_query_url(sheet_url: &str) -> String {
    let base = match sheet_url.find("/edit") {
        Some(idx) => &sheet_url[..idx],
        None => sheet_url.trim_end_matches('/'),
    };
    format!("{}/gviz/tq?tqx=out:json", base)
}

/// The gviz endpoint wraps its JSON in
/// `google.visualization.Query.setResponse(...)`; cut the payload out.
fn strip_gviz_wrapper(body: &str) -> Result<&str> {
    let start = body.find('{');
    let end = body.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(DataError::SerializationError(
            "Unexpected gviz response shape".to_string(),
        )),
    }
}

#[async_trait]
impl Connector for GoogleSheetSource {
    fn source_id(&self) -> SourceId {
        SourceId::GoogleSheet
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Spreadsheet]
    }

    fn as_spreadsheet(&self) -> Option<&dyn Spreadsheet> {
        Some(self)
    }
}

#[async_trait]
impl Spreadsheet for GoogleSheetSource {
    async fn read_all(&self) -> Result<TablePreview> {
        let started = std::time::Instant::now();

        let response = self
            .http
            .get(&self.query_url)
            .send()
            .await
            .map_err(|e| DataError::QueryFailed(format!("Sheet request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::QueryFailed(format!(
                "Sheet request returned status {}; is the sheet shared with 'Anyone with the link'?",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DataError::QueryFailed(format!("Failed to read sheet response: {}", e)))?;

        let payload = strip_gviz_wrapper(&body)?;
        let gviz: GvizResponse = serde_json::from_str(payload)
            .map_err(|e| DataError::SerializationError(format!("Invalid gviz payload: {}", e)))?;

        if gviz.status == "error" {
            let detail = gviz
                .errors
                .first()
                .map(|e| format!("{}: {}", e.reason, e.message))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(DataError::QueryFailed(format!(
                "Sheet query failed: {}",
                detail
            )));
        }

        let table = gviz.table.ok_or_else(|| {
            DataError::SerializationError("gviz response has no table".to_string())
        })?;

        let mut preview = Self::convert_preview(table);
        preview.stats.execution_ms = started.elapsed().as_millis() as u64;
        Ok(preview)
    }
}

/// Builds [`GoogleSheetSource`] connectors from the `[gsheets]` secret section
pub struct GoogleSheetFactory;

#[async_trait]
impl ConnectorFactory for GoogleSheetFactory {
    fn source_id(&self) -> SourceId {
        SourceId::GoogleSheet
    }

    async fn connect(&self, secrets: &SecretSection) -> Result<Arc<dyn Connector>> {
        let credentials: GoogleSheetCredentials = parse_section(secrets)?;
        let source = GoogleSheetSource::connect(credentials)?;
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_from_edit_url() {
        assert_eq!(
            sheet_url_to_query_url("https://docs.google.com/spreadsheets/d/abc123/edit#gid=0"),
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?tqx=out:json"
        );
        assert_eq!(
            sheet_url_to_query_url("https://docs.google.com/spreadsheets/d/abc123/"),
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?tqx=out:json"
        );
    }

    #[test]
    fn test_connect_rejects_foreign_urls() {
        let err = GoogleSheetSource::connect(GoogleSheetCredentials {
            public_gsheets_url: "https://example.com/spreadsheet".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_strip_gviz_wrapper() {
        let body = "/*O_o*/\ngoogle.visualization.Query.setResponse({\"status\":\"ok\"});";
        assert_eq!(strip_gviz_wrapper(body).unwrap(), "{\"status\":\"ok\"}");
        assert!(strip_gviz_wrapper("no json here").is_err());
    }

    #[test]
    fn test_convert_cell_prefers_formatted_dates() {
        let cell = GvizCell {
            v: serde_json::json!("Date(2024,0,15)"),
            f: Some("2024-01-15".to_string()),
        };
        assert_eq!(convert_cell(Some(cell)), serde_json::json!("2024-01-15"));

        let plain = GvizCell {
            v: serde_json::json!(3.5),
            f: Some("3.50".to_string()),
        };
        assert_eq!(convert_cell(Some(plain)), serde_json::json!(3.5));
        assert_eq!(convert_cell(None), serde_json::Value::Null);
    }
}
