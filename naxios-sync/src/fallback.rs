//! Ordered fallback across interchangeable providers.

use std::fmt::Display;
use std::future::Future;

use naxios_core::{is_rate_limit_message, FallbackError};
use tracing::{debug, info, warn};

/// Diagnostic class of a provider failure. Never changes control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Other,
}

/// Classify a failure message for reporting.
pub fn classify_failure(message: &str) -> FailureKind {
    if is_rate_limit_message(message) {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}

/// Run `operation` against each provider in order until one succeeds.
///
/// Providers are tried strictly sequentially, index 0 first, each at most once.
/// The first success is returned without touching later providers. When every
/// provider fails, the error carries the **last** provider's error.
///
/// # Errors
///
/// * [`FallbackError::EmptyProviderList`] if `providers` is empty; `operation` is not called.
/// * [`FallbackError::Exhausted`] if every provider failed.
pub async fn with_fallback<P, T, E, F, Fut>(
    providers: &[P],
    mut operation: F,
) -> Result<T, FallbackError<E>>
where
    P: Clone,
    E: Display,
    F: FnMut(P, usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if providers.is_empty() {
        return Err(FallbackError::EmptyProviderList);
    }

    let total = providers.len();
    let mut last_error = None;

    for (index, provider) in providers.iter().enumerate() {
        if index > 0 {
            info!("Attempting fallback provider {}/{}", index + 1, total);
        }

        match operation(provider.clone(), index).await {
            Ok(value) => {
                if index > 0 {
                    info!(provider_num = index + 1, "Fallback provider succeeded");
                }
                return Ok(value);
            }
            Err(e) => {
                let message = e.to_string();
                match classify_failure(&message) {
                    FailureKind::RateLimited => {
                        warn!(provider_num = index + 1, err = %message, "Provider rate limited");
                    }
                    FailureKind::Other => {
                        warn!(provider_num = index + 1, err = %message, "Provider failed");
                    }
                }
                last_error = Some(e);
            }
        }
    }

    debug!(attempts = total, "All providers failed, returning the last provider's error");
    match last_error {
        Some(last) => Err(FallbackError::Exhausted {
            attempts: total,
            last,
        }),
        None => Err(FallbackError::EmptyProviderList),
    }
}
