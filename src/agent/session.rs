//! Websocket session with the review agent

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::message::{extract_github_url, AgentMessage, MessageKind, Submission};
use crate::error::{ClientError, Result};
use crate::models::Assignment;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open chat channel. Frames are JSON objects with a `type` field.
pub struct AgentSession {
    url: String,
    stream: WsStream,
}

impl AgentSession {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::Agent(format!("Failed to connect to {url}: {e}")))?;
        info!(url, "Connected to review agent");
        Ok(Self {
            url: url.to_string(),
            stream,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a raw user message
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        let frame = json!({ "type": MessageKind::User.as_str(), "content": text });
        debug!(len = text.len(), "Sending user message");
        self.stream.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    /// Validate and send a submission
    pub async fn send(&mut self, submission: &Submission) -> Result<()> {
        let payload = submission.payload()?.to_string();
        self.send_text(&payload).await
    }

    /// Submit a repository for an assignment: the assignment's meta-prompt
    /// with the repository URL filled in.
    pub async fn submit_solution(&mut self, assignment: &Assignment, repo: &str) -> Result<()> {
        let url = extract_github_url(repo)
            .ok_or_else(|| ClientError::Validation("No valid GitHub repository URL found".into()))?;
        let prompt = assignment.render_prompt(url);
        info!(assignment = assignment.id, repo = url, "Submitting solution for review");
        self.send_text(&prompt).await
    }

    /// Next message from the agent, or `None` once the channel is closed.
    ///
    /// Control frames are skipped.
    pub async fn next_message(&mut self) -> Result<Option<AgentMessage>> {
        while let Some(frame) = self.stream.next().await {
            let bytes = match frame {
                Ok(Message::Text(text)) => text.into_bytes(),
                Ok(Message::Binary(data)) => data,
                Ok(Message::Close(reason)) => {
                    debug!(?reason, "Agent closed the channel");
                    return Ok(None);
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let message: AgentMessage = serde_json::from_slice(&bytes).map_err(|e| {
                ClientError::Decode(format!("unexpected agent frame: {e}"))
            })?;
            if let MessageKind::Other(kind) = &message.kind {
                debug!(kind, "Agent message of unknown type");
            }
            return Ok(Some(message));
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => {
                warn!(url = %self.url, error = %e, "Error closing agent channel");
                Err(e.into())
            }
        }
    }
}
