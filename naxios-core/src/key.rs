//! Deterministic cache keys for contract reads.
//!
//! A key is derived from the network, contract, method name, the ordered
//! argument pairs and an optional differentiation tag:
//!
//! ```text
//! naxios::<network>:<contractId>:<method>[:<argKey>-<argValue>]*[:<tag>]
//! ```
//!
//! Argument order is the insertion order of the argument map (the workspace
//! builds `serde_json` with `preserve_order`), so `{a, b}` and `{b, a}` produce
//! different keys. The same inputs in the same order always produce the same key.

use crate::Network;
use serde_json::{Map, Value};
use std::fmt;

/// Namespace shared by every key this library writes.
pub const CACHE_NAMESPACE: &str = "naxios";

/// Namespace followed by its separator; persistent stores scope cleanup to this prefix.
pub const CACHE_KEY_PREFIX: &str = "naxios::";

/// A fully rendered cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a read of `method` on `contract_id`.
    ///
    /// Arguments render as `:<name>-<value>` in insertion order, arrays joined
    /// with `,`. The rendering is not escaped, so distinct arguments can share a
    /// key: `["a,b"]` and `["a", "b"]` collide, as do `{"a": "b-c"}` and
    /// `{"a-b": "c"}`. Use a `tag` to keep such reads apart.
    pub fn new(
        network: Network,
        contract_id: &str,
        method: &str,
        args: &Map<String, Value>,
        tag: Option<&str>,
    ) -> Self {
        let mut key = format!("{CACHE_KEY_PREFIX}{network}:{contract_id}:{method}");

        for (arg_key, arg_value) in args {
            key.push(':');
            key.push_str(arg_key);
            key.push('-');
            key.push_str(&render_arg_value(arg_value));
        }

        if let Some(tag) = tag {
            key.push(':');
            key.push_str(tag);
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `key` already lives under the library namespace.
pub fn is_namespaced(key: &str) -> bool {
    key.starts_with(CACHE_KEY_PREFIX)
}

/// Render an argument value the way it appears inside a cache key.
///
/// Strings are used verbatim and arrays join their rendered elements with `,`,
/// so `{"keys": ["alice.near/profile/**"]}` renders as `keys-alice.near/profile/**`.
/// Objects fall back to compact JSON.
pub fn render_arg_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_arg_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.to_string(),
    }
}
