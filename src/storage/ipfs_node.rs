//! Direct IPFS node (Kubo) RPC backend

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::content_id::ContentId;
use super::media::{FileUpload, UploadKind};
use super::traits::{error_from_response, streaming_part, ContentStore, ProgressFn};
use crate::error::{ClientError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddResponse {
    hash: String,
}

/// Talks to `/api/v0/add` and `/api/v0/cat` on an IPFS node. Every upload is
/// pinned.
pub struct IpfsNodeStore {
    api_base: String,
    client: Client,
}

impl IpfsNodeStore {
    pub fn new(api_base: &str) -> Self {
        Self::with_client(api_base, Client::new())
    }

    pub fn with_client(api_base: &str, client: Client) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn add(&self, part: reqwest::multipart::Part, action: &str) -> Result<ContentId> {
        let url = format!("{}/api/v0/add?pin=true", self.api_base);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to {action}: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from_response(action, None, response).await);
        }
        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse add response: {e}")))?;
        ContentId::new(added.hash)
    }
}

#[async_trait]
impl ContentStore for IpfsNodeStore {
    async fn upload(
        &self,
        kind: UploadKind,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<ContentId> {
        debug!(node = %self.api_base, file = %file.file_name, size = file.size(), "Adding to IPFS");
        let id = self
            .add(streaming_part(file, progress)?, &format!("upload {kind}"))
            .await?;
        info!(kind = %kind, id = %id, size = file.size(), "Upload complete");
        Ok(id)
    }

    async fn upload_json(&self, value: &serde_json::Value) -> Result<ContentId> {
        let body = serde_json::to_vec(value)?;
        let part = reqwest::multipart::Part::bytes(body)
            .file_name("data.json")
            .mime_str("application/json")
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let id = self.add(part, "upload JSON").await?;
        info!(id = %id, "JSON upload complete");
        Ok(id)
    }

    async fn retrieve(&self, id: &ContentId) -> Result<Vec<u8>> {
        let url = format!("{}/api/v0/cat", self.api_base);
        let response = self
            .client
            .post(&url)
            .query(&[("arg", id.as_str())])
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to retrieve {id}: {e}")))?;

        if !response.status().is_success() {
            // Kubo reports unknown content as a 500 with a message, never a 404
            return Err(match error_from_response("retrieve file", Some(id), response).await {
                ClientError::Transport(detail) if names_missing_content(&detail) => {
                    ClientError::NotFound(format!("content {id}"))
                }
                other => other,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn names_missing_content(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    detail.contains("not found") || detail.contains("no link named")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn upload_adds_and_pins() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v0/add")
                .query_param("pin", "true")
                .body_contains("name=\"file\"");
            then.status(200)
                .json_body(serde_json::json!({ "Name": "clip.mp4", "Hash": "QmNode", "Size": "12" }));
        });

        let store = IpfsNodeStore::new(&server.base_url());
        let file = FileUpload::new("clip.mp4", "video/mp4", vec![3u8; 12]);
        let id = store.upload(UploadKind::Video, &file, None).await.unwrap();

        assert_eq!(id.as_str(), "QmNode");
        mock.assert();
    }

    #[tokio::test]
    async fn retrieve_uses_cat() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v0/cat")
                .query_param("arg", "QmCat");
            then.status(200).body("hello");
        });

        let store = IpfsNodeStore::new(&server.base_url());
        let bytes = store.retrieve(&ContentId::new("QmCat").unwrap()).await.unwrap();
        assert_eq!(bytes, b"hello");
        mock.assert();
    }

    #[tokio::test]
    async fn unknown_content_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v0/cat");
            then.status(500).json_body(serde_json::json!({
                "Message": "block was not found locally (offline): ipld: could not find QmGone",
                "Code": 0,
                "Type": "error"
            }));
        });

        let store = IpfsNodeStore::new(&server.base_url());
        let err = store
            .retrieve(&ContentId::new("QmGone").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref m) if m.contains("QmGone")));
    }

    #[tokio::test]
    async fn other_cat_failures_stay_transport_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v0/cat");
            then.status(500)
                .json_body(serde_json::json!({ "Message": "context deadline exceeded", "Code": 0 }));
        });

        let store = IpfsNodeStore::new(&server.base_url());
        let err = store
            .retrieve(&ContentId::new("QmSlow").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("deadline")));
    }

    #[tokio::test]
    async fn node_error_message_is_kept() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v0/add");
            then.status(500)
                .json_body(serde_json::json!({ "Message": "repo full", "Code": 0, "Type": "error" }));
        });

        let store = IpfsNodeStore::new(&server.base_url());
        let err = store
            .upload_json(&serde_json::json!({ "a": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("repo full")));
    }
}
