//! Object-store access for the bronze/silver data lake tiers.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    /// Connection settings for `bucket` taken from the `S3_*` environment variables.
    ///
    /// Credentials fall back to the default AWS provider chain when either key is unset.
    pub fn from_env(bucket: impl Into<String>) -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|value| !value.is_empty());

        Self {
            bucket: bucket.into(),
            region: non_empty("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: non_empty("S3_ENDPOINT_URL"),
            access_key_id: non_empty("S3_ACCESS_KEY_ID"),
            secret_access_key: non_empty("S3_SECRET_ACCESS_KEY"),
            force_path_style: non_empty("S3_FORCE_PATH_STYLE")
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("object not found: {0}")]
    NotFound(String),
}

impl BucketError {
    fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError>;
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError>;
    /// Removes `key`. Deleting an absent key succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), BucketError>;
}

#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        if config.bucket.is_empty() {
            return Err(BucketError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        let client = Client::from_conf(client_config(&config).await);
        debug!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            path_style = config.force_path_style,
            "s3 client configured"
        );
        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }
}

/// SDK settings for `config`. Static keys win over the default provider chain
/// only when both halves are present.
async fn client_config(config: &S3Config) -> aws_sdk_s3::Config {
    let static_keys = config
        .access_key_id
        .as_deref()
        .zip(config.secret_access_key.as_deref())
        .map(|(id, secret)| {
            SharedCredentialsProvider::new(Credentials::new(id, secret, None, None, "salesflow-env"))
        });

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some(provider) = static_keys {
        loader = loader.credentials_provider(provider);
    }
    let shared = loader.load().await;

    let mut builder =
        aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
    if let Some(endpoint) = config.endpoint.as_deref() {
        builder = builder.endpoint_url(endpoint);
    }
    builder.build()
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        debug!(bucket = %self.bucket, key, size = bytes.len(), "uploading object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(BucketError::from_sdk)?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        debug!(bucket = %self.bucket, key, "fetching object");
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(service_err) if service_err.err().is_no_such_key() => {
                    BucketError::NotFound(key.to_string())
                }
                other => BucketError::from_sdk(other),
            })?;

        let data = output.body.collect().await.map_err(BucketError::from_sdk)?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        debug!(bucket = %self.bucket, key, "deleting object");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(BucketError::from_sdk)?;
        Ok(())
    }
}

/// Process-local store keyed by object key.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Bytes>) -> Result<(), BucketError> {
        let mut objects = self.objects.write().map_err(BucketError::from_sdk)?;
        objects.insert(key.into(), bytes.into());
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>, BucketError> {
        let objects = self.objects.read().map_err(BucketError::from_sdk)?;
        Ok(objects.keys().cloned().collect())
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<(), BucketError> {
        self.insert(key, bytes)
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let objects = self.objects.read().map_err(BucketError::from_sdk)?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        let mut objects = self.objects.write().map_err(BucketError::from_sdk)?;
        objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_overwrites_existing_keys() {
        let store = MemoryBucketStore::new();
        store
            .put_object("silver/out.csv", Bytes::from_static(b"a\n1\n"), "text/csv")
            .await
            .expect("first put");
        store
            .put_object("silver/out.csv", Bytes::from_static(b"a\n2\n"), "text/csv")
            .await
            .expect("second put");

        let bytes = store.get_object("silver/out.csv").await.expect("get");
        assert_eq!(bytes.as_ref(), b"a\n2\n");
        assert_eq!(store.keys().expect("keys"), vec!["silver/out.csv".to_string()]);
    }

    #[tokio::test]
    async fn memory_store_reports_missing_keys() {
        let store = MemoryBucketStore::new();
        let err = store.get_object("bronze/tickets.csv").await.unwrap_err();
        assert!(matches!(err, BucketError::NotFound(key) if key == "bronze/tickets.csv"));
    }

    #[tokio::test]
    async fn s3_store_rejects_empty_bucket() {
        let config = S3Config {
            bucket: String::new(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        };
        let err = S3BucketStore::new(config).await.err().expect("empty bucket must fail");
        assert!(matches!(err, BucketError::Configuration(_)));
    }

    #[tokio::test]
    async fn memory_store_delete_removes_key_and_tolerates_absent_keys() {
        let store = MemoryBucketStore::new();
        store.insert("silver/out.csv", Bytes::from_static(b"a\n1\n")).expect("insert");

        store.delete_object("silver/out.csv").await.expect("delete");
        store.delete_object("silver/out.csv").await.expect("delete absent key");

        assert!(store.keys().expect("keys").is_empty());
        let err = store.get_object("silver/out.csv").await.unwrap_err();
        assert!(matches!(err, BucketError::NotFound(_)));
    }

    #[tokio::test]
    async fn client_config_applies_endpoint_region_and_static_keys() {
        let config = S3Config {
            bucket: "datalake-utn".into(),
            region: "sa-east-1".into(),
            endpoint: Some("http://127.0.0.1:9000".into()),
            access_key_id: Some("minio".into()),
            secret_access_key: Some("minio-secret".into()),
            force_path_style: true,
        };

        let sdk = client_config(&config).await;
        assert_eq!(sdk.region().map(|region| region.as_ref()), Some("sa-east-1"));
        assert!(sdk.credentials_provider().is_some());

        let store = S3BucketStore::new(config).await.expect("client builds offline");
        assert_eq!(store.bucket, "datalake-utn");
    }
}
