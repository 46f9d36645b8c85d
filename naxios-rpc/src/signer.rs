//! Write-side capability: whatever holds the user's keys.
//!
//! Wallet selection and key management live outside this crate. The
//! orchestrator only needs a session that can say who is signed in and
//! sign-and-send prepared transactions.

use async_trait::async_trait;
use naxios_core::WalletError;
use serde_json::Value;

use crate::transaction::TransactionRequest;

/// An active signing session.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Whether a wallet is connected and has at least one account.
    fn is_signed_in(&self) -> bool;

    /// The account transactions are signed with.
    fn account_id(&self) -> Option<String>;

    /// Sign and submit one transaction, returning the contract's decoded outcome.
    async fn sign_and_send(&self, request: TransactionRequest) -> Result<Value, WalletError>;

    /// Sign and submit several transactions in one wallet interaction.
    async fn sign_and_send_all(
        &self,
        requests: Vec<TransactionRequest>,
        callback_url: Option<String>,
    ) -> Result<Vec<Value>, WalletError>;
}
