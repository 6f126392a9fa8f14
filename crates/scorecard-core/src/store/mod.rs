use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod fs;
mod gcs;
mod memory;

pub use fs::FsStore;
pub use gcs::GcsStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{path}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, path: String },
    #[error("bucket reference `{0}` is malformed")]
    BadBucket(String),
    #[error("no store registered for scheme `{0}`")]
    UnknownScheme(String),
    #[error("I/O error while accessing object store")]
    Io(#[from] std::io::Error),
    #[error("object store transport error")]
    Transport(#[source] reqwest::Error),
    #[error("object store returned status {status} for `{path}`")]
    Status { status: u16, path: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Facade over a blob API. Paths are canonical, forward-slash, relative.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn scheme(&self) -> &'static str;
    async fn write(&self, bucket: &str, path: &str, data: &[u8]) -> Result<(), StoreError>;
    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Scheme-keyed registry of blob-store backends.
#[derive(Default)]
pub struct StoreRegistry {
    stores: HashMap<String, Arc<dyn BlobStore>>,
}

impl StoreRegistry {
    pub fn register(&mut self, store: impl BlobStore + 'static) {
        self.stores
            .insert(store.scheme().to_string(), Arc::new(store));
    }

    pub fn register_builtin(&mut self, timeout: Duration) -> Result<(), StoreError> {
        self.register(FsStore::new());
        self.register(GcsStore::new(timeout)?);
        self.register(MemoryStore::new());
        Ok(())
    }

    pub async fn write(
        &self,
        bucket_url: &str,
        path: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let (store, bucket) = self.resolve(bucket_url)?;
        store.write(&bucket, path, data).await
    }

    pub async fn read(&self, bucket_url: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        let (store, bucket) = self.resolve(bucket_url)?;
        store.read(&bucket, path).await
    }

    fn resolve(&self, bucket_url: &str) -> Result<(Arc<dyn BlobStore>, String), StoreError> {
        let (scheme, bucket) = bucket_url
            .split_once("://")
            .ok_or_else(|| StoreError::BadBucket(bucket_url.to_string()))?;
        if bucket.is_empty() {
            return Err(StoreError::BadBucket(bucket_url.to_string()));
        }
        let store = self
            .stores
            .get(scheme)
            .ok_or_else(|| StoreError::UnknownScheme(scheme.to_string()))?;
        let bucket = if scheme == "file" {
            // file:///var/results keeps its leading slash as part of the root.
            format!("/{}", bucket.trim_start_matches('/'))
        } else {
            bucket.to_string()
        };
        Ok((Arc::clone(store), bucket))
    }
}
