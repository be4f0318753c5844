//! Object storage backend abstraction (S3/MinIO/memory).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStore, PutOptions, PutPayload,
};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Configuration for the object storage backend.
///
/// Only backends that keep user metadata next to the object are supported.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// Wrapper around different object storage backends.
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    inner: Arc<dyn ObjectStore>,
}

impl Storage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| StoreError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast on a missing bucket rather than on the first request
                let prefix = ObjectPath::from("");
                let mut stream = store.list(Some(&prefix));
                match stream.try_next().await {
                    Ok(_) => {}
                    Err(object_store::Error::NotFound { .. }) => {
                        return Err(StoreError::BucketNotFound(bucket.clone()));
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if msg.contains("NoSuchBucket")
                            || msg.contains("bucket") && msg.contains("not")
                        {
                            return Err(StoreError::BucketNotFound(bucket.clone()));
                        }
                        return Err(e.into());
                    }
                }
                drop(stream);

                store
            }
        };

        Ok(Self { inner })
    }

    /// Create an in-memory storage backend.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    fn attributes(metadata: BTreeMap<String, String>) -> Attributes {
        let mut attributes = Attributes::new();
        for (key, value) in metadata {
            attributes.insert(
                Attribute::Metadata(Cow::Owned(key)),
                AttributeValue::from(value),
            );
        }
        attributes
    }

    fn metadata(attributes: &Attributes) -> BTreeMap<String, String> {
        attributes
            .iter()
            .filter_map(|(attribute, value)| match attribute {
                Attribute::Metadata(key) => {
                    let value: &str = value.as_ref();
                    Some((key.to_string(), value.to_string()))
                }
                _ => None,
            })
            .collect()
    }

    /// Write an object together with its user metadata.
    pub async fn put(
        &self,
        key: &str,
        body: Bytes,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        let path = ObjectPath::from(key);
        let mut options = PutOptions::default();
        options.attributes = Self::attributes(metadata);
        self.inner
            .put_opts(&path, PutPayload::from(body), options)
            .await?;
        Ok(())
    }

    /// Read an object's body and user metadata.
    pub async fn get(&self, key: &str) -> Result<(Bytes, BTreeMap<String, String>)> {
        let path = ObjectPath::from(key);
        let result = self.inner.get_opts(&path, GetOptions::default()).await?;
        let metadata = Self::metadata(&result.attributes);
        let body = result.bytes().await?;
        Ok((body, metadata))
    }

    /// Read only an object's user metadata.
    pub async fn head(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let path = ObjectPath::from(key);
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self.inner.get_opts(&path, options).await?;
        Ok(Self::metadata(&result.attributes))
    }

    /// Delete one object. Deleting a missing object is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = ObjectPath::from(key);
        match self.inner.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List the keys below `prefix`, relative to it.
    ///
    /// Prefixes match whole path segments: `caretakers/abc/` lists
    /// `caretakers/abc/bob` but never `caretakers/abcd/bob`.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let path = ObjectPath::from(prefix);
        let items: Vec<_> = self.inner.list(Some(&path)).try_collect().await?;

        let keys = items
            .iter()
            .filter_map(|meta| Self::relative_key(&meta.location, &path))
            .collect();

        Ok(keys)
    }

    /// The key of `location` below `prefix`, as it was written.
    ///
    /// Paths percent-encode characters that are not safe in object keys, so
    /// each segment is decoded again before it is handed back.
    fn relative_key(location: &ObjectPath, prefix: &ObjectPath) -> Option<String> {
        let parts: Vec<String> = location
            .prefix_match(prefix)?
            .map(|part| percent_decode_str(part.as_ref()).decode_utf8_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// Delete every object below `prefix`.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let path = ObjectPath::from(prefix);
        let locations = self
            .inner
            .list(Some(&path))
            .map_ok(|meta| meta.location)
            .boxed();
        let deleted: Vec<ObjectPath> = self.inner.delete_stream(locations).try_collect().await?;
        Ok(deleted.len())
    }
}
