//! Naxios Core - Shared Types
//!
//! Error taxonomy, client configuration, network selection and cache-key
//! derivation. Every other naxios crate depends on this one.

use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod key;
pub mod near;
pub mod network;

pub use config::*;
pub use error::*;
pub use key::*;
pub use near::*;
pub use network::*;

/// Wall-clock timestamp type.
pub type Timestamp = DateTime<Utc>;

/// Milliseconds since the Unix epoch, the unit cache expirations are stored in.
pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    Utc::now().timestamp_millis()
}

// ============================================================================
// FAILURE CLASSIFICATION
// ============================================================================

const RATE_LIMIT_MARKERS: &[&str] = &["too many requests", "429", "rate limit"];

/// Whether an error message reads like provider-side throttling.
///
/// Matching is case-insensitive and purely textual; it only affects how a
/// failure is reported, never whether the next provider is tried.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
