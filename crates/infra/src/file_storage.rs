//! File storage adapter used for product images.
//!
//! Only the narrow `upload` / `delete` interface is modeled; real backends
//! (object stores, CDNs) plug in behind [`FileStorage`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileStorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// A file stored by a backend, addressed by its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under a fresh key derived from `folder` and `filename`.
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, FileStorageError>;

    async fn delete(&self, url: &str) -> Result<(), FileStorageError>;
}

#[derive(Debug, Clone)]
struct Blob {
    content_type: String,
    bytes: Vec<u8>,
}

/// Dev/test backend keeping files in process memory under `memory://` URLs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileStorage {
    files: Arc<RwLock<HashMap<String, Blob>>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(url))
            .unwrap_or(false)
    }

    pub fn get(&self, url: &str) -> Option<(String, Vec<u8>)> {
        let files = self.files.read().ok()?;
        files
            .get(url)
            .map(|b| (b.content_type.clone(), b.bytes.clone()))
    }
}

fn sanitize(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "file".to_string() } else { cleaned }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, FileStorageError> {
        let url = format!("memory://{}/{}-{}", folder, Uuid::now_v7(), sanitize(filename));
        let size = bytes.len();

        let mut files = self
            .files
            .write()
            .map_err(|_| FileStorageError::Storage("file map lock poisoned".to_string()))?;
        files.insert(
            url.clone(),
            Blob {
                content_type: content_type.to_string(),
                bytes,
            },
        );

        Ok(StoredFile {
            url,
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), FileStorageError> {
        let mut files = self
            .files
            .write()
            .map_err(|_| FileStorageError::Storage("file map lock poisoned".to_string()))?;
        files
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| FileStorageError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_delete() {
        let storage = InMemoryFileStorage::new();
        let stored = storage
            .upload("products", "my photo.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();

        assert!(stored.url.starts_with("memory://products/"));
        assert!(stored.url.ends_with("my_photo.png"));
        assert_eq!(stored.size, 3);
        assert_eq!(storage.get(&stored.url), Some(("image/png".to_string(), vec![1, 2, 3])));

        storage.delete(&stored.url).await.unwrap();
        assert!(!storage.contains(&stored.url));
        assert!(matches!(
            storage.delete(&stored.url).await,
            Err(FileStorageError::NotFound(_))
        ));
    }
}
