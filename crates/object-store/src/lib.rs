//! Object storage backend for escrow records
//!
//! Secrets and caretakers are plain objects in a key/value store: a body plus a
//! small map of string metadata kept alongside it as object user metadata.
//! This crate exposes that contract as the [`SecretStore`] trait and implements
//! it over the `object_store` crate (in-memory or S3/MinIO).
//!
//! # Example
//!
//! ```rust,no_run
//! use sharedsecret_object_store::{ObjectStore, ObjectStoreConfig, SecretStore};
//!
//! # async fn example() -> Result<(), sharedsecret_object_store::StoreError> {
//! let store = ObjectStore::new(ObjectStoreConfig::Memory).await?;
//! store.put("secrets/abc", "body".into(), Default::default()).await?;
//! let object = store.get("secrets/abc").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod object_store;
mod storage;

pub use crate::object_store::{Metadata, ObjectStore, SecretStore, StoredObject};
pub use error::{Result, StoreError};
pub use storage::ObjectStoreConfig;
