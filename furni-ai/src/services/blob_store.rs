//! Local filesystem blob store
//!
//! Images live under `<root>/furniture-images/` and are served back by the
//! HTTP layer at `/storage/<key>`.

use std::path::{Component, Path, PathBuf};

use furni_common::{Error, Result};
use tracing::debug;

use crate::types::BlobStore;

/// Writes blobs as plain files beneath one directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    /// `public_base_url` is the URL prefix the root directory is served at
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public URL for a stored key
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Keys are relative paths without `..`
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(Error::InvalidInput(format!("invalid blob key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(
            key,
            content_type,
            bytes = bytes.len(),
            path = %path.display(),
            "Stored blob"
        );
        Ok(self.url_for(key))
    }
}
