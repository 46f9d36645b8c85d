//! NEAR JSON-RPC provider over HTTP.
//!
//! View calls go out as `query` requests with `request_type: call_function`
//! and `finality: optimistic`. The node answers with the raw bytes the
//! contract returned, which are decoded as JSON.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use naxios_core::RpcError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{RpcProvider, ViewRequest};

const JSON_RPC_ID: &str = "naxios";

/// HTTP JSON-RPC provider for a single NEAR endpoint.
#[derive(Clone)]
pub struct JsonRpcProvider {
    client: Client,
    endpoint: String,
}

impl JsonRpcProvider {
    /// Create a provider for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                provider: endpoint.clone(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RpcProvider for JsonRpcProvider {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query(&self, request: &ViewRequest) -> Result<Value, RpcError> {
        debug!(
            endpoint = %self.endpoint,
            contract = %request.account_id,
            method = %request.method_name,
            "Sending view call"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&build_query_body(request))
            .send()
            .await
            .map_err(|e| RpcError::Transport {
                provider: self.endpoint.clone(),
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = match status {
                StatusCode::TOO_MANY_REQUESTS => format!("Too many requests: {}", error_text),
                _ => error_text,
            };
            return Err(RpcError::Status {
                provider: self.endpoint.clone(),
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| RpcError::InvalidResponse {
            provider: self.endpoint.clone(),
            reason: format!("Failed to parse response: {}", e),
        })?;

        parse_query_response(&self.endpoint, body)
    }
}

impl std::fmt::Debug for JsonRpcProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcProvider")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<CallFunctionResult>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Option<Vec<u8>>,
    /// Older nodes report contract failures inside the result.
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorBody {
    fn describe(&self) -> String {
        let cause = self
            .cause
            .as_ref()
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str);
        let detail = match &self.data {
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        };

        match (cause, detail, &self.message, &self.name) {
            (Some(cause), Some(detail), _, _) => format!("{}: {}", cause, detail),
            (Some(cause), None, _, _) => cause.to_string(),
            (None, Some(detail), _, _) => detail,
            (None, None, Some(message), _) => message.clone(),
            (None, None, None, Some(name)) => name.clone(),
            (None, None, None, None) => "unknown RPC error".to_string(),
        }
    }
}

/// Build the JSON-RPC body for a view call.
pub fn build_query_body(request: &ViewRequest) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": JSON_RPC_ID,
        "method": "query",
        "params": {
            "request_type": "call_function",
            "finality": "optimistic",
            "account_id": request.account_id,
            "method_name": request.method_name,
            "args_base64": STANDARD.encode(request.args_bytes()),
        }
    })
}

/// Decode a JSON-RPC response body into the contract's JSON return value.
///
/// A method that returns nothing decodes to `null`.
pub fn parse_query_response(provider: &str, body: Value) -> Result<Value, RpcError> {
    let invalid = |reason: String| RpcError::InvalidResponse {
        provider: provider.to_string(),
        reason,
    };

    let envelope: RpcEnvelope =
        serde_json::from_value(body).map_err(|e| invalid(format!("Malformed envelope: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(RpcError::Query {
            provider: provider.to_string(),
            message: error.describe(),
        });
    }

    let result = envelope
        .result
        .ok_or_else(|| invalid("Response has neither result nor error".to_string()))?;

    if let Some(message) = result.error {
        return Err(RpcError::Query {
            provider: provider.to_string(),
            message,
        });
    }

    let bytes = result
        .result
        .ok_or_else(|| invalid("Missing result bytes".to_string()))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| invalid(format!("Result is not JSON: {}", e)))
}
