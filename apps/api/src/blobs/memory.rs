use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::blobs::{public_url, BlobStore};
use crate::errors::AppError;

const MEMORY_BASE_URL: &str = "memory://blobs";

/// Process-local blob store. URLs use the `memory://` scheme.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.read().await.get(path).cloned()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Bytes, _content_type: &str) -> Result<(), AppError> {
        self.objects.write().await.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, AppError> {
        if !self.objects.read().await.contains_key(path) {
            return Err(AppError::NotFound(format!("Object '{path}' does not exist")));
        }
        public_url(MEMORY_BASE_URL, path)
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.objects.write().await.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_url() {
        let store = InMemoryBlobStore::new();
        store
            .upload("resumes/u1/resume.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        let url = store.download_url("resumes/u1/resume.pdf").await.unwrap();
        assert_eq!(url, "memory://blobs/resumes/u1/resume.pdf");
        assert_eq!(&store.get("resumes/u1/resume.pdf").await.unwrap()[..], b"%PDF");
    }

    #[tokio::test]
    async fn test_url_of_missing_object_fails() {
        let store = InMemoryBlobStore::new();
        let err = store.download_url("resumes/u1/none.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let store = InMemoryBlobStore::new();
        store
            .upload("resumes/u1/a.pdf", Bytes::from_static(b"a"), "application/pdf")
            .await
            .unwrap();
        store.delete("resumes/u1/a.pdf").await.unwrap();
        assert_eq!(store.len().await, 0);
    }
}
