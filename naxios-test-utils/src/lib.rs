//! Naxios Test Utilities
//!
//! Shared test infrastructure for the naxios workspace:
//! - Scripted mock RPC providers that record every request
//! - A recording transaction signer
//! - Proptest generators for networks, account ids and call arguments
//! - Fixtures for fast-timing client configurations and JSON-RPC bodies

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

// Re-export core types for convenience
pub use naxios_core::{ClientConfig, Network, NaxiosError, NaxiosResult, RpcError, WalletError};
pub use naxios_rpc::{RpcProvider, TransactionRequest, TransactionSigner, ViewRequest};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MOCK PROVIDERS
// ============================================================================

/// Scripted RPC provider.
///
/// Scripted responses are consumed in order; once they run out every call
/// gets the standing response.
#[derive(Debug)]
pub struct MockRpcProvider {
    endpoint: String,
    script: Mutex<VecDeque<Result<Value, RpcError>>>,
    standing: Result<Value, RpcError>,
    delay: Duration,
    requests: Mutex<Vec<ViewRequest>>,
}

impl MockRpcProvider {
    /// A provider that always answers `value`.
    pub fn returning(endpoint: impl Into<String>, value: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            script: Mutex::new(VecDeque::new()),
            standing: Ok(value),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every call fails with a transport error carrying `message`.
    pub fn failing(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let error = RpcError::Transport {
            provider: endpoint.clone(),
            message: message.into(),
        };
        Self {
            standing: Err(error),
            ..Self::returning(endpoint, Value::Null)
        }
    }

    /// Hold each response for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a one-off response ahead of the standing one.
    pub fn push_response(&self, response: Result<Value, RpcError>) {
        lock(&self.script).push_back(response);
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<ViewRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl RpcProvider for MockRpcProvider {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query(&self, request: &ViewRequest) -> Result<Value, RpcError> {
        lock(&self.requests).push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = lock(&self.script).pop_front();
        scripted.unwrap_or_else(|| self.standing.clone())
    }
}

// ============================================================================
// MOCK SIGNER
// ============================================================================

/// Signer that records what it is asked to sign and answers with a fixed outcome.
#[derive(Debug)]
pub struct RecordingSigner {
    account_id: Option<String>,
    outcome: Value,
    requests: Mutex<Vec<TransactionRequest>>,
    batches: Mutex<Vec<(Vec<TransactionRequest>, Option<String>)>>,
}

impl RecordingSigner {
    /// A signed-in session for `account_id`.
    pub fn signed_in(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            outcome: Value::Null,
            requests: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// A session with no connected account.
    pub fn signed_out() -> Self {
        Self {
            account_id: None,
            ..Self::signed_in("")
        }
    }

    pub fn with_outcome(mut self, outcome: Value) -> Self {
        self.outcome = outcome;
        self
    }

    /// Single transactions signed so far.
    pub fn requests(&self) -> Vec<TransactionRequest> {
        lock(&self.requests).clone()
    }

    /// Batches signed so far, with their callback URLs.
    pub fn batches(&self) -> Vec<(Vec<TransactionRequest>, Option<String>)> {
        lock(&self.batches).clone()
    }
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    fn is_signed_in(&self) -> bool {
        self.account_id.is_some()
    }

    fn account_id(&self) -> Option<String> {
        self.account_id.clone()
    }

    async fn sign_and_send(&self, request: TransactionRequest) -> Result<Value, WalletError> {
        if self.account_id.is_none() {
            return Err(WalletError::NotConnected);
        }
        lock(&self.requests).push(request);
        Ok(self.outcome.clone())
    }

    async fn sign_and_send_all(
        &self,
        requests: Vec<TransactionRequest>,
        callback_url: Option<String>,
    ) -> Result<Vec<Value>, WalletError> {
        if self.account_id.is_none() {
            return Err(WalletError::NotConnected);
        }
        let outcomes = vec![self.outcome.clone(); requests.len()];
        lock(&self.batches).push((requests, callback_url));
        Ok(outcomes)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for naxios inputs.

    use super::*;
    use proptest::prelude::*;
    use serde_json::Map;

    /// Generate a network.
    pub fn arb_network() -> impl Strategy<Value = Network> {
        prop_oneof![
            Just(Network::Mainnet),
            Just(Network::Testnet),
            Just(Network::Localnet),
        ]
    }

    /// Generate a valid NEAR account id.
    pub fn arb_account_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{1,12}\\.(near|testnet)"
    }

    /// Generate a method name.
    pub fn arb_method() -> impl Strategy<Value = String> {
        "[a-z][a-z_]{0,15}"
    }

    /// Generate an argument value of the shapes contracts usually take.
    pub fn arb_arg_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            "[a-z0-9./*]{0,16}".prop_map(Value::from),
            any::<u32>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            prop::collection::vec("[a-z0-9./*]{1,8}", 0..4)
                .prop_map(|items| Value::Array(items.into_iter().map(Value::from).collect())),
        ]
    }

    /// Generate an argument object with distinct keys.
    pub fn arb_args() -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::btree_map("[a-z_]{1,10}", arb_arg_value(), 0..4)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Generate an optional cache-key tag.
    pub fn arb_tag() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z][a-z0-9-]{0,10}")
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// Client config for `contract_id` on mainnet with timings short enough for tests.
    pub fn fast_config(contract_id: &str) -> ClientConfig {
        ClientConfig::new(contract_id, Network::Mainnet)
            .with_poll_interval(Duration::from_millis(10))
            .with_fetching_timeout(Duration::from_millis(500))
            .with_request_timeout(Duration::from_secs(2))
    }

    /// A successful `call_function` JSON-RPC response returning `value`.
    pub fn view_response(value: &Value) -> Value {
        let bytes: Vec<Value> = value
            .to_string()
            .into_bytes()
            .into_iter()
            .map(Value::from)
            .collect();
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": "naxios",
            "result": {
                "result": bytes,
                "logs": [],
                "block_height": 1,
                "block_hash": "11111111111111111111111111111111"
            }
        })
    }

    /// A rate-limit style transport error from `endpoint`.
    pub fn rate_limited(endpoint: &str) -> RpcError {
        RpcError::Status {
            provider: endpoint.to_string(),
            status: 429,
            message: "Too many requests".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ViewRequest {
        ViewRequest::new("c.near", "get", serde_json::Map::new())
    }

    #[tokio::test]
    async fn test_mock_provider_script_then_standing() {
        let provider = MockRpcProvider::returning("p0", json!(1));
        provider.push_response(Ok(json!(0)));

        assert_eq!(provider.query(&request()).await, Ok(json!(0)));
        assert_eq!(provider.query(&request()).await, Ok(json!(1)));
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.requests()[0].method_name, "get");
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = MockRpcProvider::failing("p0", "down");
        assert!(matches!(
            provider.query(&request()).await,
            Err(RpcError::Transport { message, .. }) if message == "down"
        ));
    }

    #[tokio::test]
    async fn test_signed_out_signer_rejects() {
        let signer = RecordingSigner::signed_out();
        assert!(!signer.is_signed_in());
        let request = TransactionRequest {
            signer_id: "a.near".to_string(),
            receiver_id: "c.near".to_string(),
            callback_url: None,
            actions: Vec::new(),
        };
        assert_eq!(
            signer.sign_and_send(request).await,
            Err(WalletError::NotConnected)
        );
        assert!(signer.requests().is_empty());
    }

    #[test]
    fn test_fast_config_is_valid() {
        let config = fixtures::fast_config("social.near");
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }
}
