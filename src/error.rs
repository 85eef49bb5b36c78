//! Error types shared by every adapter

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// JSON-RPC error code used by geth-style nodes for `execution reverted`
pub const REVERT_ERROR_CODE: i64 = 3;

/// Errors surfaced to callers of the chain, storage and agent adapters
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad input shape, size or type. Always raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing caller/account context or unusable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The referenced entity is absent on the external system
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or HTTP failure, message kept verbatim
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// Transaction was mined but execution failed
    #[error("Transaction reverted: {tx_hash}")]
    Reverted { tx_hash: String },

    /// Response could not be decoded (ABI, JSON, UTF-8)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Receipt polling gave up
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Review agent channel failure
    #[error("Agent channel error: {0}")]
    Agent(String),
}

impl ClientError {
    /// True when the node reported an execution revert
    pub fn is_revert(&self) -> bool {
        match self {
            Self::Rpc { code, message, .. } => {
                *code == REVERT_ERROR_CODE || message.to_lowercase().contains("revert")
            }
            Self::Reverted { .. } => true,
            _ => false,
        }
    }

    /// Decoded `Error(string)` reason attached to a revert, if any
    pub fn revert_reason(&self) -> Option<String> {
        match self {
            Self::Rpc {
                data: Some(data), ..
            } => {
                let bytes = hex::decode(data.trim_start_matches("0x")).ok()?;
                crate::chain::abi::decode_revert_reason(&bytes)
            }
            _ => None,
        }
    }

    /// Turn a revert into `NotFound`, leave every other error untouched
    pub(crate) fn revert_as_not_found(self, what: impl FnOnce() -> String) -> Self {
        if self.is_revert() {
            let what = what();
            match self.revert_reason() {
                Some(reason) => Self::NotFound(format!("{what} ({reason})")),
                None => Self::NotFound(what),
            }
        } else {
            self
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Agent(err.to_string())
    }
}
