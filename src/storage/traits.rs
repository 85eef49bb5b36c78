use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::Part;

use super::content_id::ContentId;
use super::media::{FileUpload, UploadKind};
use crate::error::{ClientError, Result};

/// Upload progress callback, called with the cumulative number of bytes sent
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Size of each chunk handed to the HTTP body stream
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Content-addressed store reached over HTTP.
///
/// Implementations do no validation of their own; the media rules live in
/// `StorageClient`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload a file and return its identifier
    async fn upload(
        &self,
        kind: UploadKind,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId>;

    /// Upload a JSON document and return its identifier
    async fn upload_json(&self, value: &serde_json::Value) -> Result<ContentId>;

    /// Fetch the raw bytes stored under `id`
    async fn retrieve(&self, id: &ContentId) -> Result<Vec<u8>>;
}

/// Multipart part whose body is streamed in fixed-size chunks, reporting
/// progress as each chunk is pulled by the transport.
pub(crate) fn streaming_part(file: &FileUpload, progress: Option<ProgressFn>) -> Result<Part> {
    let total = file.size();
    let chunks: Vec<Vec<u8>> = file
        .data
        .chunks(UPLOAD_CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect();

    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        if let Some(report) = &progress {
            report(sent);
        }
        Ok::<_, std::io::Error>(chunk)
    }));

    Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| {
            ClientError::Validation(format!("invalid content type '{}': {e}", file.content_type))
        })
}

/// Turn a non-success storage response into an error, keeping the server's
/// `{"error": ..}` message when there is one.
pub(crate) async fn error_from_response(
    action: &str,
    id: Option<&ContentId>,
    response: reqwest::Response,
) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("Message"))
                .and_then(|e| e.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return ClientError::NotFound(format!("content {id}"));
        }
    }
    ClientError::Transport(format!("Failed to {action} ({status}): {detail}"))
}
