//! Change-call payloads handed to a [`TransactionSigner`](crate::TransactionSigner).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 30 Tgas, the default attached gas for change calls.
pub const THIRTY_TGAS: &str = "30000000000000";

/// No attached deposit.
pub const NO_DEPOSIT: &str = "0";

/// A single function-call action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Value,
    /// Gas in yoctoNEAR-units of gas, as decimal text.
    pub gas: String,
    /// Attached deposit in yoctoNEAR, as decimal text.
    pub deposit: String,
}

/// Everything a signer needs to sign and submit one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub signer_id: String,
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub actions: Vec<FunctionCallAction>,
}

/// A change call described by the caller, before defaults are applied.
///
/// `receiver_id` defaults to the client's contract, `gas` to [`THIRTY_TGAS`]
/// and `deposit` to [`NO_DEPOSIT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction<A = Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<A>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit: Option<String>,
}

impl<A> Transaction<A> {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            receiver_id: None,
            method: method.into(),
            args: None,
            gas: None,
            deposit: None,
        }
    }

    pub fn with_receiver(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }

    pub fn with_args(mut self, args: A) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_gas(mut self, gas: impl Into<String>) -> Self {
        self.gas = Some(gas.into());
        self
    }

    pub fn with_deposit(mut self, deposit: impl Into<String>) -> Self {
        self.deposit = Some(deposit.into());
        self
    }
}

/// Optional parts of a [`Transaction`], for [`build_transaction`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionProps<A = Value> {
    pub receiver_id: Option<String>,
    pub args: Option<A>,
    pub gas: Option<String>,
    pub deposit: Option<String>,
}

/// Assemble a [`Transaction`] for `method` from optional parts.
pub fn build_transaction<A>(method: impl Into<String>, props: TransactionProps<A>) -> Transaction<A> {
    Transaction {
        receiver_id: props.receiver_id,
        method: method.into(),
        args: props.args,
        gas: props.gas,
        deposit: props.deposit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_transaction_keeps_props() {
        let tx = build_transaction(
            "nft_mint",
            TransactionProps {
                receiver_id: Some("nft.near".to_string()),
                args: Some(json!({"token_id": "1"})),
                gas: None,
                deposit: Some("10000000000000000000000".to_string()),
            },
        );

        assert_eq!(tx.method, "nft_mint");
        assert_eq!(tx.receiver_id.as_deref(), Some("nft.near"));
        assert_eq!(tx.args, Some(json!({"token_id": "1"})));
        assert!(tx.gas.is_none());
        assert_eq!(tx.deposit.as_deref(), Some("10000000000000000000000"));
    }

    #[test]
    fn test_transaction_builders() {
        let tx: Transaction<Value> = Transaction::new("ping").with_gas(THIRTY_TGAS);
        assert_eq!(tx.gas.as_deref(), Some(THIRTY_TGAS));
        assert!(tx.args.is_none());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = TransactionRequest {
            signer_id: "alice.near".to_string(),
            receiver_id: "counter.near".to_string(),
            callback_url: None,
            actions: vec![FunctionCallAction {
                method_name: "increment".to_string(),
                args: json!({}),
                gas: THIRTY_TGAS.to_string(),
                deposit: NO_DEPOSIT.to_string(),
            }],
        };

        let value = serde_json::to_value(&request).expect("serialize should succeed");
        assert_eq!(value["signerId"], "alice.near");
        assert_eq!(value["receiverId"], "counter.near");
        assert_eq!(value["actions"][0]["methodName"], "increment");
        assert!(value.get("callbackUrl").is_none());
    }
}
