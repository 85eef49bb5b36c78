use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::content_id::ContentId;
use super::media::{FileUpload, MediaPolicy, UploadKind};
use super::traits::{ContentStore, ProgressFn};
use crate::error::{ClientError, Result};

pub const DEFAULT_PUBLIC_GATEWAY: &str = "https://ipfs.io/ipfs";
pub const DEFAULT_ALTERNATE_GATEWAY: &str = "https://nftstorage.link/ipfs";

/// How the caller wants retrieved bytes interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentHint {
    Json,
    Text,
    Binary,
}

/// Retrieved content, shaped by the caller's `ContentHint`
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievedContent {
    Json(serde_json::Value),
    Text(String),
    Binary(Vec<u8>),
}

impl RetrievedContent {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RetrievedContent::Json(v) => v.to_string().into_bytes(),
            RetrievedContent::Text(s) => s.into_bytes(),
            RetrievedContent::Binary(b) => b,
        }
    }
}

/// Validated uploads and retrievals over a `ContentStore`
pub struct StorageClient {
    store: Arc<dyn ContentStore>,
    public_gateway: String,
    alternate_gateway: String,
}

impl StorageClient {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_gateways(store, DEFAULT_PUBLIC_GATEWAY, DEFAULT_ALTERNATE_GATEWAY)
    }

    pub fn with_gateways(
        store: Arc<dyn ContentStore>,
        public_gateway: &str,
        alternate_gateway: &str,
    ) -> Self {
        Self {
            store,
            public_gateway: public_gateway.trim_end_matches('/').to_string(),
            alternate_gateway: alternate_gateway.trim_end_matches('/').to_string(),
        }
    }

    pub async fn upload_file(
        &self,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId> {
        self.store.upload(UploadKind::File, file, progress).await
    }

    /// Upload an image: `image/*` and under 10 MiB, checked before any request
    pub async fn upload_image(
        &self,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId> {
        self.upload_media(MediaPolicy::IMAGE, file, progress).await
    }

    /// Upload a video: `video/*` and under 100 MiB, checked before any request
    pub async fn upload_video(
        &self,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId> {
        self.upload_media(MediaPolicy::VIDEO, file, progress).await
    }

    async fn upload_media(
        &self,
        policy: MediaPolicy,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId> {
        policy.validate(file)?;
        self.store.upload(policy.kind, file, progress).await
    }

    pub async fn upload_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<ContentId> {
        let value = serde_json::to_value(value)?;
        self.store.upload_json(&value).await
    }

    /// Raw bytes, no interpretation
    pub async fn retrieve_file(&self, id: &ContentId) -> Result<Vec<u8>> {
        self.store.retrieve(id).await
    }

    pub async fn retrieve_content(
        &self,
        id: &ContentId,
        hint: ContentHint,
    ) -> Result<RetrievedContent> {
        let bytes = self.retrieve_file(id).await?;
        debug!(%id, len = bytes.len(), ?hint, "Retrieved content");
        match hint {
            ContentHint::Binary => Ok(RetrievedContent::Binary(bytes)),
            ContentHint::Text => String::from_utf8(bytes)
                .map(RetrievedContent::Text)
                .map_err(|e| ClientError::Decode(format!("content {id} is not UTF-8: {e}"))),
            ContentHint::Json => serde_json::from_slice(&bytes)
                .map(RetrievedContent::Json)
                .map_err(|e| ClientError::Decode(format!("content {id} is not JSON: {e}"))),
        }
    }

    /// Fetch and deserialize a JSON document, e.g. a course manifest
    pub async fn retrieve_json<T: serde::de::DeserializeOwned>(&self, id: &ContentId) -> Result<T> {
        let bytes = self.retrieve_file(id).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("content {id} is not valid JSON: {e}")))
    }

    /// Public gateway URL; empty for an empty identifier
    pub fn ipfs_url(&self, id: &str) -> String {
        gateway_link(&self.public_gateway, id)
    }

    /// Alternate gateway URL; empty for an empty identifier
    pub fn gateway_url(&self, id: &str) -> String {
        gateway_link(&self.alternate_gateway, id)
    }
}

fn gateway_link(base: &str, id: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        return String::new();
    }
    format!("{base}/{id}")
}
