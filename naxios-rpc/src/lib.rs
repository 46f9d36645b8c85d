//! Naxios RPC - Contract Client
//!
//! The network-facing half of naxios:
//!
//! - [`RpcProvider`] / [`JsonRpcProvider`]: view calls over NEAR JSON-RPC
//! - [`TransactionSigner`]: the injected write capability
//! - [`ContractApi`]: cached, de-duplicated reads with provider fallback,
//!   plus signer-backed change calls
//! - [`telemetry`]: tracing subscriber setup for applications

pub mod contract;
pub mod json_rpc;
pub mod provider;
pub mod signer;
pub mod telemetry;
pub mod transaction;

pub use contract::{fetching_marker, is_fetching_marker, CallOptions, ContractApi, ReadOptions};
pub use json_rpc::{build_query_body, parse_query_response, JsonRpcProvider};
pub use provider::{RpcProvider, ViewRequest};
pub use signer::TransactionSigner;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use transaction::{
    build_transaction, FunctionCallAction, Transaction, TransactionProps, TransactionRequest,
    NO_DEPOSIT, THIRTY_TGAS,
};
