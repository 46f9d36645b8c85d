//! Cache entry envelope and expiry arithmetic.

use std::time::Duration;

use naxios_core::{now_millis, EpochMillis};
use serde::{Deserialize, Serialize};

/// A stored value with its absolute expiry.
///
/// Persisted as `{"expiresAt": <epoch-ms>, "data": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub expires_at: EpochMillis,
    pub data: T,
}

impl<T> CacheEntry<T> {
    /// Wrap `data` so that it expires `expiration` from now.
    pub fn new(data: T, expiration: Duration) -> Self {
        Self {
            expires_at: expires_at_from_now(expiration),
            data,
        }
    }

    /// An entry is valid iff `now < expires_at`.
    pub fn is_valid_at(&self, now: EpochMillis) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(now_millis())
    }
}

/// Absolute expiry for an entry written now.
pub fn expires_at_from_now(expiration: Duration) -> EpochMillis {
    let ttl_ms = i64::try_from(expiration.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl_ms)
}

/// Envelope view used when only the expiry matters (cleanup sweeps).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntryHeader {
    pub expires_at: EpochMillis,
}
