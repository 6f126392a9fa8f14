use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BlobStore, StoreError};

/// In-process store used by unit tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn scheme(&self) -> &'static str {
        "mem"
    }

    async fn write(&self, bucket: &str, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.objects
            .lock()
            .insert((bucket.to_string(), path.to_string()), data.to_vec());
        Ok(())
    }

    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
    }
}
