//! The store contract the escrow service is written against, and its
//! `object_store`-backed implementation.

use std::collections::BTreeMap;
use std::fmt::Debug;

use bytes::Bytes;
use tracing::debug;

use crate::error::Result;
use crate::storage::{ObjectStoreConfig, Storage};

/// Flat string metadata kept next to an object body.
pub type Metadata = BTreeMap<String, String>;

/// An object read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub metadata: Metadata,
}

/// Key/value storage for secrets and caretakers.
///
/// A missing key is always reported as [`StoreError::NotFound`](crate::StoreError::NotFound),
/// never folded into another error.
#[async_trait::async_trait]
pub trait SecretStore: Debug + Send + Sync {
    async fn get(&self, key: &str) -> Result<StoredObject>;

    async fn get_metadata(&self, key: &str) -> Result<Metadata>;

    /// Create or replace an object.
    async fn put(&self, key: &str, body: Bytes, metadata: Metadata) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every object below `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;

    /// Keys below `prefix`, with the prefix stripped.
    async fn list_children(&self, prefix: &str) -> Result<Vec<String>>;
}

/// [`SecretStore`] over an object storage backend (S3, MinIO or memory).
#[derive(Debug, Clone)]
pub struct ObjectStore {
    storage: Storage,
}

impl ObjectStore {
    /// Create a new ObjectStore with the given configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let storage = Storage::new(config).await?;
        Ok(Self { storage })
    }

    /// Create a fully ephemeral ObjectStore.
    pub fn in_memory() -> Self {
        Self {
            storage: Storage::memory(),
        }
    }

    /// Create a new ObjectStore with S3/MinIO storage.
    ///
    /// # Arguments
    /// * `endpoint` - S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
    /// * `access_key` - S3 access key ID
    /// * `secret_key` - S3 secret access key
    /// * `bucket` - S3 bucket name
    /// * `region` - Optional S3 region (defaults to "us-east-1")
    pub async fn new_s3(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        region: Option<&str>,
    ) -> Result<Self> {
        let config = ObjectStoreConfig::S3 {
            endpoint: endpoint.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            bucket: bucket.to_string(),
            region: region.map(|s| s.to_string()),
        };
        Self::new(config).await
    }
}

#[async_trait::async_trait]
impl SecretStore for ObjectStore {
    async fn get(&self, key: &str) -> Result<StoredObject> {
        let (body, metadata) = self.storage.get(key).await?;
        Ok(StoredObject { body, metadata })
    }

    async fn get_metadata(&self, key: &str) -> Result<Metadata> {
        self.storage.head(key).await
    }

    async fn put(&self, key: &str, body: Bytes, metadata: Metadata) -> Result<()> {
        debug!(key, size = body.len(), "storing object");
        self.storage.put(key, body, metadata).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!(key, "deleting object");
        self.storage.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let deleted = self.storage.delete_prefix(prefix).await?;
        debug!(prefix, deleted, "deleted objects by prefix");
        Ok(())
    }

    async fn list_children(&self, prefix: &str) -> Result<Vec<String>> {
        self.storage.list(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[tokio::test]
    async fn test_round_trip_through_trait_object() {
        let store: Box<dyn SecretStore> = Box::new(ObjectStore::in_memory());
        let metadata = Metadata::from([("p".to_string(), "owner".to_string())]);

        store
            .put("secrets/one", Bytes::from_static(b"cipher"), metadata.clone())
            .await
            .unwrap();

        let object = store.get("secrets/one").await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"cipher"));
        assert_eq!(object.metadata, metadata);
        assert_eq!(store.get_metadata("secrets/one").await.unwrap(), metadata);

        store.delete("secrets/one").await.unwrap();
        assert!(matches!(
            store.get("secrets/one").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_replaces_metadata() {
        let store = ObjectStore::in_memory();
        let first = Metadata::from([
            ("p".to_string(), "owner".to_string()),
            ("u".to_string(), "unlocker".to_string()),
        ]);
        let second = Metadata::from([("p".to_string(), "owner".to_string())]);

        store.put("secrets/x", Bytes::new(), first).await.unwrap();
        store
            .put("secrets/x", Bytes::new(), second.clone())
            .await
            .unwrap();
        assert_eq!(store.get_metadata("secrets/x").await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_delete_only_touches_exact_key() {
        let store = ObjectStore::in_memory();
        for key in ["caretakers/s/bob", "caretakers/s/bobby"] {
            store.put(key, Bytes::new(), Metadata::new()).await.unwrap();
        }
        store.delete("caretakers/s/bob").await.unwrap();
        assert_eq!(
            store.list_children("caretakers/s/").await.unwrap(),
            vec!["bobby"]
        );

        store.delete_prefix("caretakers/s/").await.unwrap();
        assert!(store.list_children("caretakers/s/").await.unwrap().is_empty());
    }
}
