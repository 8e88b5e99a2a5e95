use crate::{
    domain::FileStorage,
    errors::StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{
    primitives::ByteStream,
    Client as S3Client,
};
use std::path::PathBuf;
use tokio::fs;
use tracing;

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
    bucket_name: String,
}

impl S3FileStorage {
    pub fn new(client: S3Client, bucket_name: String) -> Self {
        Self { client, bucket_name }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject and returns an `s3://` location.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<String, StorageError> {
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, bytes = data.len(), "S3: Uploading export");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(format!("s3://{}/{}", self.bucket_name, key))
    }
}

/// Writes exports into a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: Option<String>) -> Result<String, StorageError> {
        if key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::UploadFailed(format!("invalid export name '{}'", key)));
        }
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create export directory {}", self.dir.display()))?;
        let path = self.dir.join(key);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write export {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Export written to local directory");
        Ok(path.display().to_string())
    }
}
