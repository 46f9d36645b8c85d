//! Small NEAR helpers: account-id validation and storage deposit estimates.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{NaxiosError, NaxiosResult};

/// Allowed characters of an account id; structural rules are checked separately.
static ACCOUNT_ID_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z\d._-]+$").expect("account id pattern is a valid regex")
});

/// NEAR charged per serialized byte when estimating storage deposits, with headroom.
pub const DEPOSIT_PER_BYTE_NEAR: f64 = 0.00003;

/// Check whether `address` is a valid named NEAR account.
///
/// The address must be 2-64 characters of `[a-z0-9._-]`, must not contain `..`,
/// must not end in `-` or `_`, and must end in `.near` or `.testnet`.
pub fn validate_near_address(address: &str) -> bool {
    let len = address.len();
    if !(2..=64).contains(&len) {
        return false;
    }

    if !ACCOUNT_ID_CHARS.is_match(address)
        || address.contains("..")
        || address.ends_with('-')
        || address.ends_with('_')
    {
        return false;
    }

    address.ends_with(".near") || address.ends_with(".testnet")
}

/// Estimate the deposit (in NEAR, as text) required to store `data` on chain.
pub fn calculate_deposit_by_data_size<T: Serialize + ?Sized>(data: &T) -> NaxiosResult<String> {
    let serialized = serde_json::to_string(data).map_err(NaxiosError::decode)?;
    Ok((serialized.len() as f64 * DEPOSIT_PER_BYTE_NEAR).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_addresses() {
        assert!(validate_near_address("alice.near"));
        assert!(validate_near_address("app.alice.near"));
        assert!(validate_near_address("bob_1.testnet"));
        assert!(validate_near_address("Alice.near"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!validate_near_address("alice"));
        assert!(!validate_near_address("alice..near"));
        assert!(!validate_near_address("alice.near-"));
        assert!(!validate_near_address("al ice.near"));
        assert!(!validate_near_address("alice.eth"));
        assert!(!validate_near_address(&format!("{}.near", "a".repeat(64))));
    }

    #[test]
    fn test_deposit_scales_with_serialized_length() {
        // {"a":1} is 7 bytes
        let deposit = calculate_deposit_by_data_size(&json!({ "a": 1 }))
            .expect("json value always serializes");
        let parsed: f64 = deposit.parse().expect("deposit is numeric text");
        assert!((parsed - 7.0 * DEPOSIT_PER_BYTE_NEAR).abs() < 1e-12);
    }
}
