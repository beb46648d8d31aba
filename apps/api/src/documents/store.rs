//! Document store: where uploaded resumes live between upload and scan.
//!
//! `S3DocumentStore` talks to any S3-compatible bucket (MinIO locally,
//! Supabase storage or AWS in production).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One stored resume as shown to the recruiter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    pub name: String,
    pub storage_path: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size: i64,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resumes (PDFs) directly inside `folder`; `""` is the bucket root.
    async fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, StoreError>;

    /// Top-level folders, newest date first.
    async fn list_folders(&self) -> Result<Vec<String>, StoreError>;

    async fn fetch(&self, storage_path: &str) -> Result<Bytes, StoreError>;

    /// Stores `bytes` as `folder/filename` and returns that storage path.
    async fn store(&self, bytes: Bytes, filename: &str, folder: &str)
        -> Result<String, StoreError>;

    /// Fetches a document and writes it under `dir`, returning the local path.
    ///
    /// The local name keeps the original extension and gets a unique prefix so
    /// concurrent scans of the same object never share a file.
    async fn materialize(&self, storage_path: &str, dir: &Path) -> Result<PathBuf, StoreError> {
        let file_name = file_name_of(storage_path)?;
        let bytes = self.fetch(storage_path).await?;

        tokio::fs::create_dir_all(dir).await?;
        let local_path = dir.join(format!("{}_{}", Uuid::new_v4().simple(), file_name));
        tokio::fs::write(&local_path, &bytes).await?;

        debug!(
            storage_path,
            local_path = %local_path.display(),
            bytes = bytes.len(),
            "document materialized"
        );
        Ok(local_path)
    }
}

pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, StoreError> {
        let prefix = folder_prefix(folder);
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .delimiter("/")
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StoreError::S3(format!("list {prefix:?} failed: {e}")))?;

            for object in output.contents() {
                let Some(key) = object.key() else { continue };
                let name = key.strip_prefix(&prefix).unwrap_or(key);
                if !is_resume_file(name) {
                    continue;
                }
                entries.push(DocumentEntry {
                    name: name.to_string(),
                    storage_path: key.to_string(),
                    created_at: object
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                    size: object.size().unwrap_or(0),
                });
            }

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn list_folders(&self) -> Result<Vec<String>, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .delimiter("/")
            .send()
            .await
            .map_err(|e| StoreError::S3(format!("list folders failed: {e}")))?;

        let folders = output
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(|p| p.trim_end_matches('/').to_string())
            .collect();

        Ok(sort_folders(folders))
    }

    async fn fetch(&self, storage_path: &str) -> Result<Bytes, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StoreError::NotFound(storage_path.to_string())
                } else {
                    StoreError::S3(format!("get {storage_path} failed: {e}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::S3(format!("read {storage_path} failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn store(
        &self,
        bytes: Bytes,
        filename: &str,
        folder: &str,
    ) -> Result<String, StoreError> {
        let key = storage_path_for(folder, filename)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type_for(filename))
            .send()
            .await
            .map_err(|e| StoreError::S3(format!("upload {key} failed: {e}")))?;

        info!("Uploaded resume to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}

/// Folder and object name for an upload received at `now`.
///
/// `"Jane Doe CV.pdf"` at 2025-11-26 09:30:00.123456 becomes
/// `("2025-11-26", "20251126_093000_123456_Jane_Doe_CV.pdf")`.
pub fn upload_location(original_name: &str, now: DateTime<Utc>) -> (String, String) {
    let folder = now.format("%Y-%m-%d").to_string();
    let filename = format!(
        "{}_{}",
        now.format("%Y%m%d_%H%M%S_%6f"),
        original_name.trim().replace(' ', "_")
    );
    (folder, filename)
}

pub fn is_resume_file(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && name.to_ascii_lowercase().ends_with(".pdf")
}

fn folder_prefix(folder: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        String::new()
    } else {
        format!("{folder}/")
    }
}

fn storage_path_for(folder: &str, filename: &str) -> Result<String, StoreError> {
    if filename.is_empty() || filename.contains('/') || filename.contains("..") {
        return Err(StoreError::InvalidPath(filename.to_string()));
    }
    Ok(format!("{}{}", folder_prefix(folder), filename))
}

/// Last path segment of a storage key, rejecting traversal attempts.
fn file_name_of(storage_path: &str) -> Result<&str, StoreError> {
    let name = storage_path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(StoreError::InvalidPath(storage_path.to_string()));
    }
    Ok(name)
}

fn content_type_for(filename: &str) -> &'static str {
    if filename.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

fn sort_folders(mut folders: Vec<String>) -> Vec<String> {
    folders.retain(|f| !f.is_empty() && !f.contains('.'));
    folders.sort_unstable_by(|a, b| b.cmp(a));
    folders
}
