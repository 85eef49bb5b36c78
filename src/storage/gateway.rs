//! REST upload server in front of IPFS
//!
//! `POST {api}/upload/{file,image,video}` (multipart, field named after the
//! kind), `POST {api}/upload/json` and `GET {api}/retrieve/{hash}`. Uploads
//! answer `{"hash": ..}`, failures `{"error": ..}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::content_id::ContentId;
use super::media::{FileUpload, UploadKind};
use super::traits::{error_from_response, streaming_part, ContentStore, ProgressFn};
use crate::error::{ClientError, Result};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    hash: String,
}

pub struct GatewayStore {
    api_base: String,
    client: Client,
}

impl GatewayStore {
    pub fn new(api_base: &str) -> Self {
        Self::with_client(api_base, Client::new())
    }

    pub fn with_client(api_base: &str, client: Client) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// `{api}/retrieve/{id}` with the identifier as one escaped path segment
    fn retrieve_url(&self, id: &ContentId) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base).map_err(|e| {
            ClientError::Configuration(format!("Invalid storage API base '{}': {e}", self.api_base))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Configuration(format!("Invalid storage API base '{}'", self.api_base))
            })?
            .pop_if_empty()
            .push("retrieve")
            .push(id.as_str());
        Ok(url)
    }

    async fn read_hash(&self, action: &str, response: reqwest::Response) -> Result<ContentId> {
        if !response.status().is_success() {
            return Err(error_from_response(action, None, response).await);
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse upload response: {e}")))?;
        ContentId::new(body.hash)
    }
}

#[async_trait]
impl ContentStore for GatewayStore {
    async fn upload(
        &self,
        kind: UploadKind,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId> {
        let url = format!("{}/upload/{}", self.api_base, kind);
        debug!(%url, file = %file.file_name, size = file.size(), "Uploading");

        let part = streaming_part(file, progress)?;
        let form = reqwest::multipart::Form::new().part(kind.as_str(), part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to upload {kind}: {e}")))?;

        let id = self.read_hash(&format!("upload {kind}"), response).await?;
        info!(kind = %kind, id = %id, size = file.size(), "Upload complete");
        Ok(id)
    }

    async fn upload_json(&self, value: &serde_json::Value) -> Result<ContentId> {
        let url = format!("{}/upload/json", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(value)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to upload JSON: {e}")))?;

        let id = self.read_hash("upload JSON", response).await?;
        info!(id = %id, "JSON upload complete");
        Ok(id)
    }

    async fn retrieve(&self, id: &ContentId) -> Result<Vec<u8>> {
        let url = self.retrieve_url(id)?;
        debug!(%url, "Retrieving");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to retrieve {id}: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from_response("retrieve file", Some(id), response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn upload_posts_multipart_field_named_after_kind() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/upload/image")
                .body_contains("name=\"image\"")
                .body_contains("filename=\"cover.png\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"hash":"QmImage"}"#);
        });

        let store = GatewayStore::new(&server.url("/api/"));
        let file = FileUpload::new("cover.png", "image/png", b"pixels".to_vec());
        let id = store.upload(UploadKind::Image, &file, None).await.unwrap();

        assert_eq!(id.as_str(), "QmImage");
        mock.assert();
    }

    #[tokio::test]
    async fn upload_reports_cumulative_progress() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/upload/file");
            then.status(200).json_body(serde_json::json!({ "hash": "QmBig" }));
        });

        let seen = Arc::new(AtomicU64::new(0));
        let calls = Arc::new(AtomicU64::new(0));
        let progress: ProgressFn = {
            let seen = seen.clone();
            let calls = calls.clone();
            Arc::new(move |bytes: u64| {
                assert!(bytes >= seen.load(Ordering::SeqCst));
                seen.store(bytes, Ordering::SeqCst);
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        let size = 150 * 1024;
        let store = GatewayStore::new(&server.url("/api"));
        let file = FileUpload::new("notes.pdf", "application/pdf", vec![7u8; size]);
        store
            .upload(UploadKind::File, &file, Some(progress))
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), size as u64);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn upload_error_carries_server_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/upload/video");
            then.status(500)
                .json_body(serde_json::json!({ "error": "pinning service unavailable" }));
        });

        let store = GatewayStore::new(&server.url("/api"));
        let file = FileUpload::new("a.mp4", "video/mp4", vec![1u8; 8]);
        let err = store.upload(UploadKind::Video, &file, None).await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("pinning service unavailable")));
    }

    #[tokio::test]
    async fn upload_json_posts_document() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/upload/json")
                .json_body(serde_json::json!({ "moduleTitles": ["Intro"] }));
            then.status(200).json_body(serde_json::json!({ "hash": "QmManifest" }));
        });

        let store = GatewayStore::new(&server.url("/api"));
        let id = store
            .upload_json(&serde_json::json!({ "moduleTitles": ["Intro"] }))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "QmManifest");
        mock.assert();
    }

    #[tokio::test]
    async fn retrieve_returns_raw_bytes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/retrieve/QmBytes");
            then.status(200).body(vec![0u8, 159, 146, 150]);
        });

        let store = GatewayStore::new(&server.url("/api"));
        let bytes = store
            .retrieve(&ContentId::new("QmBytes").unwrap())
            .await
            .unwrap();
        assert_eq!(bytes, vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn retrieve_path_escapes_the_identifier() {
        let store = GatewayStore::new("http://localhost:5000/api/");
        let url = store
            .retrieve_url(&ContentId::new("a b/c?d").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/retrieve/a%20b%2Fc%3Fd");

        let plain = store.retrieve_url(&ContentId::new("QmPlain").unwrap()).unwrap();
        assert_eq!(plain.as_str(), "http://localhost:5000/api/retrieve/QmPlain");
    }

    #[tokio::test]
    async fn retrieve_missing_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/retrieve/QmGone");
            then.status(404).json_body(serde_json::json!({ "error": "not found" }));
        });

        let store = GatewayStore::new(&server.url("/api"));
        let err = store
            .retrieve(&ContentId::new("QmGone").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }
}
