//! Snowflake implementation of the glance-query connector traits.
//!
//! Uses the Snowflake SQL REST API (`/api/v2/statements`) with key-pair
//! authentication: the `[snowflake]` secret section carries the account,
//! user and a PKCS#8 RSA private key, and every request presents a KEYPAIR_JWT
//! whose issuer embeds the SHA-256 fingerprint of the public key.
//! Construction validates the credentials with a `SELECT 1` round trip.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use glance_query::{
    parse_section, Capability, CatalogInfo, ColumnDef, Connector, ConnectorFactory, DataError,
    FieldType, Result, SecretSection, SourceId, SqlWarehouse, TablePreview,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Statement timeout requested from the backend, in seconds
const STATEMENT_TIMEOUT_SECS: u32 = 60;

/// Credentials from the `[snowflake]` secret section.
///
/// The original password-based fields are replaced by a key pair because the
/// SQL REST API only accepts OAuth or KEYPAIR_JWT credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeCredentials {
    /// Account identifier, e.g. `xy12345` or `myorg-myaccount`
    pub account: String,
    pub user: String,
    /// PKCS#8 PEM RSA private key registered on the Snowflake user
    pub private_key: String,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(rename = "resultSetMetaData")]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultSetMetaData {
    #[serde(rename = "numRows")]
    num_rows: Option<u64>,
    #[serde(rename = "rowType", default)]
    row_type: Vec<RowType>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
    #[serde(default)]
    scale: Option<i64>,
}

/// Snowflake data source implementation
pub struct SnowflakeSource {
    http: reqwest::Client,
    base_url: String,
    credentials: SnowflakeCredentials,
    /// JWT presented on every request; minted once per connector
    jwt: String,
}

impl SnowflakeSource {
    /// Connect and validate credentials against the account's REST endpoint
    pub async fn connect(credentials: SnowflakeCredentials) -> Result<Arc<Self>> {
        let base_url = format!(
            "https://{}.snowflakecomputing.com",
            credentials.account.to_lowercase()
        );
        Self::connect_with_base_url(credentials, base_url).await
    }

    /// Connect against a custom endpoint (tests point this at a mock)
    pub async fn connect_with_base_url(
        credentials: SnowflakeCredentials,
        base_url: String,
    ) -> Result<Arc<Self>> {
        debug!(account = %credentials.account, user = %credentials.user, "Creating Snowflake source");

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| {
                DataError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        let jwt = create_keypair_jwt(&credentials)?;

        let source = Self {
            http,
            base_url,
            credentials,
            jwt,
        };

        // Round trip once so bad keys and unreachable accounts fail here.
        source.submit_statement("SELECT 1").await.map_err(|e| {
            DataError::ConnectionFailed(format!("Snowflake validation query failed: {}", e))
        })?;
        debug!("Snowflake credentials accepted");

        Ok(Arc::new(source))
    }

    async fn submit_statement(&self, sql: &str) -> Result<StatementResponse> {
        let url = format!("{}/api/v2/statements", self.base_url);

        let mut body = serde_json::json!({
            "statement": sql,
            "timeout": STATEMENT_TIMEOUT_SECS,
        });
        if let Some(warehouse) = &self.credentials.warehouse {
            body["warehouse"] = serde_json::json!(warehouse);
        }
        if let Some(database) = &self.credentials.database {
            body["database"] = serde_json::json!(database);
        }
        if let Some(schema) = &self.credentials.schema {
            body["schema"] = serde_json::json!(schema);
        }
        if let Some(role) = &self.credentials.role {
            body["role"] = serde_json::json!(role);
        }

        debug!("Snowflake statement: {}", sql);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.jwt))
            .header("X-Snowflake-Authorization-Token-Type", "KEYPAIR_JWT")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DataError::QueryFailed(format!("Statement request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::InvalidCredentials(format!(
                "Snowflake rejected the key pair: {}",
                body
            )));
        }
        if status.as_u16() == 202 {
            // async=false still returns 202 when the statement outlives the
            // request deadline; previews should never get here.
            return Err(DataError::QueryFailed(
                "Statement did not complete within the request deadline".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Snowflake API returned status {}: {}", status, body);
            return Err(DataError::QueryFailed(format!(
                "Snowflake API returned status {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DataError::SerializationError(format!("Failed to parse response: {}", e)))
    }

    fn convert_preview(response: StatementResponse) -> TablePreview {
        let meta = match response.result_set_meta_data {
            Some(meta) => meta,
            None => return TablePreview::new(vec![], vec![]),
        };

        let columns: Vec<ColumnDef> = meta
            .row_type
            .iter()
            .map(|rt| ColumnDef::new(&rt.name, map_column_type(&rt.column_type, rt.scale)))
            .collect();

        let rows = response
            .data
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(meta.row_type.iter())
                    .map(|(cell, rt)| convert_cell(cell, &rt.column_type, rt.scale))
                    .collect()
            })
            .collect();

        TablePreview::with_stats(columns, rows, meta.num_rows, 0)
    }
}

/// Map Snowflake column types onto preview field types.
/// `fixed` columns are integers unless they carry a scale.
fn map_column_type(sf_type: &str, scale: Option<i64>) -> FieldType {
    match sf_type {
        "fixed" => {
            if scale.unwrap_or(0) > 0 {
                FieldType::Float64
            } else {
                FieldType::Int64
            }
        }
        "real" => FieldType::Float64,
        "boolean" => FieldType::Boolean,
        "date" => FieldType::Date,
        "timestamp_ltz" | "timestamp_ntz" | "timestamp_tz" => FieldType::Timestamp,
        "object" | "variant" | "array" => FieldType::Json,
        _ => FieldType::String,
    }
}

/// REST API cells are strings; coerce scalars for rendering
fn convert_cell(cell: Option<String>, sf_type: &str, scale: Option<i64>) -> serde_json::Value {
    let Some(raw) = cell else {
        return serde_json::Value::Null;
    };
    match map_column_type(sf_type, scale) {
        FieldType::Int64 => raw
            .parse::<i64>()
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::String(raw)),
        FieldType::Float64 => raw
            .parse::<f64>()
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::String(raw)),
        FieldType::Boolean => match raw.as_str() {
            "true" | "TRUE" => serde_json::Value::Bool(true),
            "false" | "FALSE" => serde_json::Value::Bool(false),
            _ => serde_json::Value::String(raw),
        },
        _ => serde_json::Value::String(raw),
    }
}

/// Mint the KEYPAIR_JWT Snowflake expects: issuer is
/// `ACCOUNT.USER.SHA256:<public key fingerprint>`, subject `ACCOUNT.USER`.
fn create_keypair_jwt(credentials: &SnowflakeCredentials) -> Result<String> {
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::RsaPrivateKey;
    use sha2::{Digest, Sha256};

    let private_key = RsaPrivateKey::from_pkcs8_pem(&credentials.private_key)
        .map_err(|e| DataError::InvalidCredentials(format!("Invalid private key: {}", e)))?;

    let public_der = private_key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| DataError::InvalidCredentials(format!("Cannot encode public key: {}", e)))?;
    let fingerprint = BASE64_STANDARD.encode(Sha256::digest(public_der.as_bytes()));

    // Snowflake matches the JWT against upper-cased identifiers.
    let account = credentials.account.to_uppercase();
    let user = credentials.user.to_uppercase();
    let qualified_user = format!("{}.{}", account, user);

    let now = chrono::Utc::now().timestamp();
    let exp = now + 3540; // just under the 1 hour maximum

    let header = serde_json::json!({
        "alg": "RS256",
        "typ": "JWT"
    });
    let claims = serde_json::json!({
        "iss": format!("{}.SHA256:{}", qualified_user, fingerprint),
        "sub": qualified_user,
        "iat": now,
        "exp": exp
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string().as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    let message = format!("{}.{}", header_b64, claims_b64);

    let signing_key = SigningKey::<Sha256>::new(private_key);
    let signature = signing_key.sign(message.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(signature.to_vec());

    Ok(format!("{}.{}", message, signature_b64))
}

#[async_trait]
impl Connector for SnowflakeSource {
    fn source_id(&self) -> SourceId {
        SourceId::Snowflake
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Warehouse]
    }

    fn as_warehouse(&self) -> Option<&dyn SqlWarehouse> {
        Some(self)
    }
}

#[async_trait]
impl SqlWarehouse for SnowflakeSource {
    /// List databases visible to the role
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        let preview = self.execute_sql("SHOW DATABASES;").await?;

        let name_idx = preview
            .column_index("name")
            .ok_or_else(|| DataError::SerializationError(
                "SHOW DATABASES result has no 'name' column".to_string(),
            ))?;
        let comment_idx = preview.column_index("comment");

        Ok(preview
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.get(name_idx)?.as_str()?.to_string();
                let description = comment_idx
                    .and_then(|i| row.get(i))
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string());
                Some(CatalogInfo { name, description })
            })
            .collect())
    }

    async fn execute_sql(&self, sql: &str) -> Result<TablePreview> {
        let started = std::time::Instant::now();
        let response = self.submit_statement(sql).await?;
        if let Some(message) = &response.message {
            debug!("Snowflake response message: {}", message);
        }
        let mut preview = Self::convert_preview(response);
        preview.stats.execution_ms = started.elapsed().as_millis() as u64;
        Ok(preview)
    }
}

/// Builds [`SnowflakeSource`] connectors from the `[snowflake]` secret section
pub struct SnowflakeFactory;

#[async_trait]
impl ConnectorFactory for SnowflakeFactory {
    fn source_id(&self) -> SourceId {
        SourceId::Snowflake
    }

    async fn connect(&self, secrets: &SecretSection) -> Result<Arc<dyn Connector>> {
        let credentials: SnowflakeCredentials = parse_section(secrets)?;
        let source = SnowflakeSource::connect(credentials).await?;
        Ok(source)
    }
}
