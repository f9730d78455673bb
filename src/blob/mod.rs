//! Storage for uploaded images.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::epoch_ms;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file name is empty after sanitizing")]
    EmptyName,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return a publicly reachable URL.
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, BlobError>;
}

/// Keep letters, digits, dots, dashes and underscores.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// Writes uploads below a local directory served at `public_base_url`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let name = sanitize_file_name(file_name);
        if name.is_empty() {
            return Err(BlobError::EmptyName);
        }

        let key = format!("menu/{}_{}", epoch_ms(), name);
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(key = %key, size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}
