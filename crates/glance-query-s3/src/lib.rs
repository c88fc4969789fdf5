//! S3/MinIO implementation of the glance-query connector traits.
//!
//! Credentials come from the `[aws_s3]` secret section using the same field
//! names the AWS console hands out (`AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`). A custom `endpoint_url` switches the client to
//! path-style addressing for MinIO and other S3-compatible stores.
//! Construction performs one `ListBuckets` round trip so rejected keys fail
//! at the factory instead of on the first preview.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Region, SharedCredentialsProvider};
use aws_sdk_s3::Client;
use glance_query::{
    parse_section, BucketInfo, Capability, Connector, ConnectorFactory, DataError, ObjectInfo,
    ObjectStore, Result, SecretSection, SourceId,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

const DEFAULT_REGION: &str = "us-east-1";

/// Credentials from the `[aws_s3]` secret section.
///
/// Field casing matches what operators copy out of the AWS console.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Credentials {
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: String,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    pub secret_access_key: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for MinIO/S3-compatible storage
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// S3/MinIO data source implementation
pub struct S3Source {
    client: Client,
    region: String,
}

impl S3Source {
    /// Build a client and verify the keys with a `ListBuckets` call
    pub async fn connect(credentials: S3Credentials) -> Result<Arc<Self>> {
        let source = Self::new(&credentials).await;

        source.list_buckets().await.map_err(|e| {
            DataError::ConnectionFailed(format!("S3 credential check failed: {}", e))
        })?;
        debug!("S3 credentials accepted");

        Ok(Arc::new(source))
    }

    /// Build the client without the credential round trip
    async fn new(credentials: &S3Credentials) -> Self {
        let region = credentials
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        debug!("Creating S3 source for region: {}", region);

        let creds = Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            "glance-query-s3",
        );
        let creds_provider = SharedCredentialsProvider::new(creds);

        let region_provider = RegionProviderChain::first_try(Region::new(region.clone()));

        let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region_provider)
            .credentials_provider(creds_provider);

        if let Some(endpoint) = &credentials.endpoint_url {
            config_builder = config_builder.endpoint_url(endpoint);
        }

        let config = config_builder.load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&config);

        // Force path-style addressing for MinIO compatibility
        if credentials.endpoint_url.is_some() {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self { client, region }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl Connector for S3Source {
    fn source_id(&self) -> SourceId {
        SourceId::AwsS3
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::ObjectStore]
    }

    fn as_object_store(&self) -> Option<&dyn ObjectStore> {
        Some(self)
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing S3 source");
        // The AWS SDK handles connection cleanup itself.
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Source {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        debug!("Listing S3 buckets");

        let response = self.client.list_buckets().send().await.map_err(|e| {
            error!("Failed to list S3 buckets: {}", e);
            DataError::QueryFailed(format!("Failed to list buckets: {}", e))
        })?;

        let buckets: Vec<BucketInfo> = response
            .buckets()
            .iter()
            .filter_map(|bucket| {
                Some(BucketInfo {
                    name: bucket.name()?.to_string(),
                    created_at: bucket.creation_date().and_then(to_chrono),
                })
            })
            .collect();

        debug!("Found {} buckets", buckets.len());
        Ok(buckets)
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        debug!(
            "Listing objects in bucket '{}' with prefix: {:?}",
            bucket, prefix
        );

        let mut request = self.client.list_objects_v2().bucket(bucket);
        if let Some(prefix) = prefix {
            request = request.prefix(prefix);
        }

        let response = request.send().await.map_err(|e| {
            error!("Failed to list objects in bucket '{}': {}", bucket, e);
            DataError::QueryFailed(format!("Failed to list objects: {}", e))
        })?;

        let objects: Vec<ObjectInfo> = response
            .contents()
            .iter()
            .filter_map(|obj| {
                Some(ObjectInfo {
                    bucket: bucket.to_string(),
                    key: obj.key()?.to_string(),
                    size_bytes: obj.size().map(|s| s as u64),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        debug!("Found {} objects in bucket '{}'", objects.len(), bucket);
        Ok(objects)
    }
}

/// Builds [`S3Source`] connectors from the `[aws_s3]` secret section
pub struct S3Factory;

#[async_trait]
impl ConnectorFactory for S3Factory {
    fn source_id(&self) -> SourceId {
        SourceId::AwsS3
    }

    async fn connect(&self, secrets: &SecretSection) -> Result<Arc<dyn Connector>> {
        let credentials: S3Credentials = parse_section(secrets)?;
        let source = S3Source::connect(credentials).await?;
        Ok(source)
    }
}
