use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{BlobStore, StoreError};

/// Filesystem-backed store. The bucket locator is a directory root; objects
/// live at `{root}/{path}`. Used by local runs and the integration suite.
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }

    fn object_path(bucket: &str, path: &str) -> PathBuf {
        Path::new(bucket).join(path)
    }
}

impl Default for FsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for FsStore {
    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn write(&self, bucket: &str, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let dest = Self::object_path(bucket, path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&dest, data).await?;
        Ok(())
    }

    async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        match fs::read(Self::object_path(bucket, path)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
