use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ClientError, Result};

/// Kind of a message on the review channel. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Agent,
    Response,
    Info,
    Util,
    Error,
    User,
    /// Output of code the agent executed
    CodeExe,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Agent => "agent",
            MessageKind::Response => "response",
            MessageKind::Info => "info",
            MessageKind::Util => "util",
            MessageKind::Error => "error",
            MessageKind::User => "user",
            MessageKind::CodeExe => "code_exe",
            MessageKind::Other(s) => s,
        }
    }
}

impl From<String> for MessageKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "agent" => MessageKind::Agent,
            "response" => MessageKind::Response,
            "info" => MessageKind::Info,
            "util" => MessageKind::Util,
            "error" => MessageKind::Error,
            "user" => MessageKind::User,
            "code_exe" => MessageKind::CodeExe,
            _ => MessageKind::Other(s),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message received from (or sent to) the review agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "content_as_text")]
    pub content: String,
}

impl AgentMessage {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            heading: None,
            content: content.into(),
        }
    }

    /// First GitHub URL mentioned in the content
    pub fn github_url(&self) -> Option<&str> {
        extract_github_url(&self.content)
    }
}

/// Agents sometimes send structured content; keep it as JSON text
fn content_as_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

fn github_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https://github\.com/[^\s]+").expect("static regex"))
}

/// First `https://github.com/...` URL in `text`, up to the next whitespace
pub fn extract_github_url(text: &str) -> Option<&str> {
    github_url_regex().find(text).map(|m| m.as_str())
}

/// What a learner submits for review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Text containing a GitHub repository URL
    Repository(String),
    /// Free-form solution text
    Text(String),
}

impl Submission {
    /// Text that goes on the wire.
    ///
    /// For a repository this is the extracted URL; a repository submission
    /// without one is rejected.
    pub fn payload(&self) -> Result<&str> {
        match self {
            Submission::Repository(text) => extract_github_url(text).ok_or_else(|| {
                ClientError::Validation("No valid GitHub repository URL found".into())
            }),
            Submission::Text(text) if text.trim().is_empty() => {
                Err(ClientError::Validation("Submission is empty".into()))
            }
            Submission::Text(text) => Ok(text),
        }
    }
}
