//! JSON-RPC transport to an Ethereum-compatible node

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Anything that can carry a JSON-RPC request to a node.
///
/// The contract adapters only speak through this trait, so tests can record or
/// script the calls they make.
#[async_trait]
pub trait EthTransport: Send + Sync {
    async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value>;
}

/// HTTP JSON-RPC 2.0 transport
pub struct JsonRpcTransport {
    url: String,
    client: reqwest::Client,
    request_id: AtomicU64,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default, deserialize_with = "present")]
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: Option<u64>,
}

/// `Some(Value::Null)` for `"result": null`; an absent member stays `None`
fn present<'de, D>(d: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(d).map(Some)
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl JsonRpcTransport {
    pub fn new(url: &str) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: &str, client: reqwest::Client) -> Self {
        Self {
            url: url.to_string(),
            client,
            request_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EthTransport for JsonRpcTransport {
    async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(id, method, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to send RPC request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("RPC HTTP error: {status}")));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse RPC response: {e}")))?;

        if let Some(err) = rpc_response.error {
            let data = err.data.and_then(|d| match d {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            });
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
                data,
            });
        }

        // `null` is a legitimate result (pending receipt), only a missing member is an error
        rpc_response
            .result
            .ok_or_else(|| ClientError::Decode("RPC response missing result".into()))
    }
}

/// Encode a number as a JSON-RPC hex quantity
pub fn to_quantity(v: u128) -> String {
    format!("0x{v:x}")
}

/// Parse a JSON-RPC hex quantity
pub fn parse_quantity(s: &str) -> Result<u128> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::Decode(format!("quantity '{s}' missing 0x prefix")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ClientError::Decode(format!("invalid quantity '{s}': {e}")))
}

/// Parse a JSON value expected to hold a hex quantity
pub fn quantity_from_value(value: &serde_json::Value) -> Result<u128> {
    value
        .as_str()
        .ok_or_else(|| ClientError::Decode(format!("expected hex quantity, got {value}")))
        .and_then(parse_quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn quantity_round_trip() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(255), "0xff");
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("12").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[tokio::test]
    async fn returns_result_member() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .json_body_partial(r#"{"jsonrpc":"2.0","method":"eth_gasPrice"}"#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#);
        });

        let transport = JsonRpcTransport::new(&server.url("/"));
        let result = transport.request("eth_gasPrice", json!([])).await.unwrap();
        assert_eq!(quantity_from_value(&result).unwrap(), 1_000_000_000);
        mock.assert();
    }

    #[tokio::test]
    async fn null_result_is_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#);
        });

        let transport = JsonRpcTransport::new(&server.url("/"));
        let result = transport
            .request("eth_getTransactionReceipt", json!(["0x01"]))
            .await
            .unwrap();
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn absent_result_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"jsonrpc":"2.0","id":1}"#);
        });

        let transport = JsonRpcTransport::new(&server.url("/"));
        let err = transport.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(ref m) if m.contains("missing result")));
    }

    #[tokio::test]
    async fn error_member_becomes_rpc_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted","data":"0x08c379a0"}}"#,
                );
        });

        let transport = JsonRpcTransport::new(&server.url("/"));
        let err = transport.request("eth_call", json!([])).await.unwrap_err();
        match err {
            ClientError::Rpc { code, message, data } => {
                assert_eq!(code, 3);
                assert_eq!(message, "execution reverted");
                assert_eq!(data.as_deref(), Some("0x08c379a0"));
            }
            other => panic!("expected Rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_is_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(502);
        });

        let transport = JsonRpcTransport::new(&server.url("/"));
        let err = transport.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("502")));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let transport = JsonRpcTransport::new("http://127.0.0.1:65534");
        let err = transport.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("Failed to send")));
    }
}
