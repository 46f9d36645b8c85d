//! Integration tests for polling and provider fallback
//!
//! Tests verify:
//! - Polling timeout lands within one interval of the budget
//! - Fallback tries providers in order, exactly once each
//! - Exhaustion reports the last provider's error
//! - An empty provider list never invokes the operation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use naxios_core::{FallbackError, PollError, PollingError};
use naxios_sync::{poll_until, with_fallback, PollConfig};

// ============================================================================
// POLLING
// ============================================================================

#[tokio::test]
async fn test_polling_timeout_window() {
    let config = PollConfig::new()
        .with_timeout(Duration::from_millis(400))
        .with_interval(Duration::from_millis(200));

    let started = Instant::now();
    let result: Result<bool, PollError<()>> =
        poll_until(|| async { Ok(false) }, |done| *done, &config).await;
    let elapsed = started.elapsed();

    assert!(matches!(
        result,
        Err(PollError::Polling(PollingError::Timeout { .. }))
    ));
    assert!(
        elapsed >= Duration::from_millis(380),
        "timed out too early: {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_millis(700),
        "timed out too late: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_polling_picks_up_late_value() {
    let slot = Arc::new(Mutex::new(None::<u32>));
    let writer = Arc::clone(&slot);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        *writer.lock().expect("slot lock") = Some(42);
    });

    let config = PollConfig::new()
        .with_timeout(Duration::from_secs(1))
        .with_interval(Duration::from_millis(20));
    let reader = Arc::clone(&slot);
    let result: Result<Option<u32>, PollError<()>> = poll_until(
        move || {
            let value = *reader.lock().expect("slot lock");
            async move { Ok(value) }
        },
        |value| value.is_some(),
        &config,
    )
    .await;

    assert_eq!(result, Ok(Some(42)));
}

// ============================================================================
// FALLBACK
// ============================================================================

#[tokio::test]
async fn test_fallback_tries_providers_in_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);

    let result: Result<String, FallbackError<String>> =
        with_fallback(&["P0", "P1", "P2"], move |provider, index| {
            log.lock().expect("log lock").push((provider, index));
            async move {
                if provider == "P2" {
                    Ok(format!("{provider} ok"))
                } else {
                    Err(format!("{provider} down"))
                }
            }
        })
        .await;

    assert_eq!(result, Ok("P2 ok".to_string()));
    assert_eq!(
        *calls.lock().expect("log lock"),
        vec![("P0", 0), ("P1", 1), ("P2", 2)]
    );
}

#[tokio::test]
async fn test_fallback_exhaustion_reports_last_error() {
    let result: Result<u32, FallbackError<String>> =
        with_fallback(&["P0", "P1", "P2"], |provider, _| async move {
            Err(format!("{provider} down"))
        })
        .await;

    let err = result.expect_err("every provider fails");
    assert_eq!(err.last_error().map(String::as_str), Some("P2 down"));
    assert!(matches!(err, FallbackError::Exhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn test_fallback_empty_list_never_invokes_operation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let providers: Vec<&str> = Vec::new();

    let result: Result<u32, FallbackError<String>> =
        with_fallback(&providers, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(1) }
        })
        .await;

    assert_eq!(result, Err(FallbackError::EmptyProviderList));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fallback_is_sequential() {
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let (a, m) = (Arc::clone(&active), Arc::clone(&max_active));

    let _: Result<(), FallbackError<String>> = with_fallback(&[0, 1, 2], move |_, _| {
        let (a, m) = (Arc::clone(&a), Arc::clone(&m));
        async move {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            a.fetch_sub(1, Ordering::SeqCst);
            Err("busy".to_string())
        }
    })
    .await;

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}
