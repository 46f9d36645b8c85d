//! Read-side RPC provider seam.

use async_trait::async_trait;
use naxios_core::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A read-only contract method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub account_id: String,
    pub method_name: String,
    /// JSON arguments; always an object on the wire.
    pub args: Value,
}

impl ViewRequest {
    pub fn new(
        account_id: impl Into<String>,
        method_name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            method_name: method_name.into(),
            args: Value::Object(args),
        }
    }

    /// Arguments encoded the way NEAR expects them in `args_base64`.
    pub fn args_bytes(&self) -> Vec<u8> {
        self.args.to_string().into_bytes()
    }
}

/// An endpoint able to run view calls.
///
/// Implementations are interchangeable: the orchestrator tries them in order
/// and only needs the first success.
#[async_trait]
pub trait RpcProvider: Send + Sync {
    /// Endpoint URL, used in error reports and logs.
    fn endpoint(&self) -> &str;

    /// Run a view call and return the decoded JSON result.
    async fn query(&self, request: &ViewRequest) -> Result<Value, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_args_bytes_are_compact_json() {
        let mut args = Map::new();
        args.insert("keys".to_string(), json!(["alice.near/profile/**"]));
        let request = ViewRequest::new("social.near", "get", args);

        assert_eq!(
            String::from_utf8(request.args_bytes()).expect("utf-8"),
            r#"{"keys":["alice.near/profile/**"]}"#
        );
    }

    #[test]
    fn test_empty_args_encode_as_object() {
        let request = ViewRequest::new("c.near", "total", Map::new());
        assert_eq!(request.args_bytes(), b"{}".to_vec());
    }
}
