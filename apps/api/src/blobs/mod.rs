//! Blob Store: résumé files under `resumes/{uid}/{filename}`.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::errors::AppError;

pub use memory::InMemoryBlobStore;
pub use s3::S3BlobStore;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;

    /// Publicly fetchable URL of a stored object.
    async fn download_url(&self, path: &str) -> Result<String, AppError>;

    async fn delete(&self, path: &str) -> Result<(), AppError>;
}

/// Storage path of a résumé. Only the final component of `filename` is kept,
/// so a client-supplied name cannot escape the user's folder.
pub fn resume_path(uid: &str, filename: &str) -> Result<String, AppError> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(AppError::Validation(format!(
            "Invalid resume file name '{filename}'"
        )));
    }
    Ok(format!("resumes/{uid}/{base}"))
}

/// Joins an object path onto a base URL, percent-encoding each segment.
pub fn public_url(base: &str, path: &str) -> Result<String, AppError> {
    let mut url = Url::parse(base)
        .map_err(|e| AppError::Storage(format!("Invalid public base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Storage(format!("Public base URL '{base}' cannot hold a path")))?
        .pop_if_empty()
        .extend(path.split('/'));
    Ok(url.to_string())
}
