//! Error types for naxios operations

use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// TTL cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Deserialization failed for key {key}: {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Cache store error: {reason}")]
    Store { reason: String },
}

/// Call queue errors.
///
/// Errors returned by a queued operation itself are never wrapped in this type;
/// they reach every merged caller unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queued call cancelled before it started (tag: {tag:?})")]
    Cancelled { tag: Option<String> },

    #[error("Queued operation panicked (tag: {tag:?})")]
    OperationPanicked { tag: Option<String> },
}

/// Polling errors raised by the polling loop itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollingError {
    #[error("Polling timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("Polling cancelled")]
    Cancelled,
}

/// Outcome of a failed poll: either the loop gave up or the probe failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError<E> {
    #[error(transparent)]
    Polling(#[from] PollingError),

    #[error("Polling probe failed: {0}")]
    Probe(E),
}

/// Errors from running an operation across an ordered list of providers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FallbackError<E> {
    #[error("Provider list is empty")]
    EmptyProviderList,

    #[error("All {attempts} providers failed, last error: {last}")]
    Exhausted { attempts: usize, last: E },
}

impl<E> FallbackError<E> {
    /// The error reported by the last provider tried, if any provider was tried.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            FallbackError::EmptyProviderList => None,
            FallbackError::Exhausted { last, .. } => Some(last),
        }
    }
}

/// RPC provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("Transport error from {provider}: {message}")]
    Transport { provider: String, message: String },

    #[error("Request to {provider} failed with status {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Query against {provider} failed: {message}")]
    Query { provider: String, message: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl RpcError {
    /// Whether this error looks like provider-side throttling.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            RpcError::Status { status: 429, .. } => true,
            other => crate::is_rate_limit_message(&other.to_string()),
        }
    }
}

/// Wallet / signing capability errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet connected")]
    NotConnected,

    #[error("Transaction rejected: {reason}")]
    Rejected { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all naxios errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NaxiosError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Polling error: {0}")]
    Polling(#[from] PollingError),

    #[error("Provider error: {0}")]
    Providers(#[from] FallbackError<RpcError>),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to decode value: {reason}")]
    Decode { reason: String },
}

impl NaxiosError {
    pub fn decode(reason: impl Display) -> Self {
        NaxiosError::Decode {
            reason: reason.to_string(),
        }
    }
}

impl<E> From<PollError<E>> for NaxiosError
where
    E: Into<NaxiosError>,
{
    fn from(e: PollError<E>) -> Self {
        match e {
            PollError::Polling(polling) => NaxiosError::Polling(polling),
            PollError::Probe(probe) => probe.into(),
        }
    }
}

/// Result type alias for naxios operations.
pub type NaxiosResult<T> = Result<T, NaxiosError>;

// =============================================================================
// TESTS
// =============================================================================
