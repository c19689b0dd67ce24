//! Blob storage for uploaded PDFs.
//!
//! An upload is addressed by a relative object path (`uploads/<uuid>.pdf`);
//! [`ObjectStore::public_url`] turns that path into the URL the conversion
//! handler later fetches.

use crate::error::DocuScanError;
use crate::store::rest::{error_text, RestConnection};
use async_trait::async_trait;
use reqwest::Method;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), DocuScanError>;

    /// Public retrieval URL for `path`. Does not check existence.
    fn public_url(&self, path: &str) -> String;

    /// Read an object back; `None` when it does not exist.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, DocuScanError>;
}

/// Reject absolute paths and `..` so an object path can never escape the store.
pub fn validate_object_path(path: &str) -> Result<PathBuf, DocuScanError> {
    let p = Path::new(path);
    if path.is_empty()
        || p.components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(DocuScanError::Storage(format!("invalid object path '{path}'")));
    }
    Ok(p.to_path_buf())
}

// ── Local filesystem ─────────────────────────────────────────────────────

/// Objects stored as files under `root`, served by this service at
/// `<public_base_url>/objects/<path>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DocuScanError> {
        let rel = validate_object_path(path)?;
        let full = self.root.join(rel);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DocuScanError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        let len = bytes.len();
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| DocuScanError::Storage(format!("write {}: {e}", full.display())))?;
        info!("Stored {} ({} bytes, {})", path, len, content_type);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/objects/{}", self.public_base_url, path.trim_start_matches('/'))
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, DocuScanError> {
        let full = self.root.join(validate_object_path(path)?);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocuScanError::Storage(format!("read {}: {e}", full.display()))),
        }
    }
}

// ── Storage bucket over REST ─────────────────────────────────────────────

/// Objects in a hosted storage bucket (`/storage/v1/object/<bucket>/<path>`).
#[derive(Debug, Clone)]
pub struct RestObjectStore {
    conn: RestConnection,
    bucket: String,
}

impl RestObjectStore {
    pub fn new(conn: RestConnection, bucket: impl Into<String>) -> Self {
        Self {
            conn,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for RestObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DocuScanError> {
        validate_object_path(path)?;
        let response = self
            .conn
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{}", self.bucket, path),
            )
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| DocuScanError::Storage(format!("Upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DocuScanError::Storage(format!(
                "Upload failed: {}",
                error_text(response).await
            )));
        }
        debug!("Uploaded {} to bucket {}", path, self.bucket);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.conn.base_url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, DocuScanError> {
        validate_object_path(path)?;
        let response = self
            .conn
            .request(
                Method::GET,
                &format!("storage/v1/object/{}/{}", self.bucket, path),
            )
            .send()
            .await
            .map_err(|e| DocuScanError::Storage(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(DocuScanError::Storage(error_text(response).await));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DocuScanError::Storage(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }
}
