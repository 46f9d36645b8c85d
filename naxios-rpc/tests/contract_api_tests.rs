//! Integration tests for the contract orchestrator
//!
//! Tests verify:
//! - Cold cached reads hit a provider once, warm reads never
//! - Cache keys follow the naxios namespace format
//! - Concurrent identical reads collapse onto one provider call (marker and queue)
//! - Failed reads release the fetching marker
//! - A value that cannot be cached is still returned and releases the marker
//! - Provider fallback order and last-error reporting
//! - Change calls go through the signer, or fail without one

use std::sync::Arc;
use std::time::{Duration, Instant};

use naxios_cache::{
    CacheConfig, CacheResult, InMemoryStore, KeyValueStore, MemoryCache, StorageCache, TtlCache,
};
use naxios_core::{CacheError, FallbackError, NaxiosError, PollingError, RpcError, WalletError};
use naxios_rpc::{
    fetching_marker, CallOptions, ContractApi, ReadOptions, RpcProvider, Transaction, THIRTY_TGAS,
};
use naxios_test_utils::{fixtures, MockRpcProvider, RecordingSigner};
use serde_json::{json, Map, Value};

const PROFILE_KEY: &str = "naxios::mainnet:social.near:get:keys-wendersonpires.near/profile/**";

fn profile_args() -> Value {
    json!({"keys": ["wendersonpires.near/profile/**"]})
}

fn profile() -> Value {
    json!({"wendersonpires.near": {"profile": {"name": "Wenderson Pires"}}})
}

fn api(
    providers: Vec<Arc<dyn RpcProvider>>,
    cache: Option<Arc<MemoryCache>>,
) -> ContractApi<MemoryCache> {
    ContractApi::with_providers(fixtures::fast_config("social.near"), providers, cache)
        .expect("client should build")
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[tokio::test]
async fn test_connect_uses_configured_endpoints() {
    let config = fixtures::fast_config("social.near")
        .with_fallback_rpc_urls(["https://rpc.fallback.example", "https://rpc.mainnet.near.org"]);
    let api = ContractApi::<MemoryCache>::connect(config, Some(Arc::new(MemoryCache::default())))
        .await
        .expect("connect should succeed");

    let debug = format!("{:?}", api);
    assert!(debug.contains("https://rpc.mainnet.near.org"));
    assert!(debug.contains("https://rpc.fallback.example"));
    assert_eq!(debug.matches("rpc.mainnet.near.org").count(), 1);
    assert!(api.cache().is_some());
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let config = fixtures::fast_config("");
    let result = ContractApi::<MemoryCache>::connect(config, None).await;
    assert!(matches!(result, Err(NaxiosError::Config(_))));
}

// ============================================================================
// CACHED READS
// ============================================================================

#[tokio::test]
async fn test_cold_then_warm_cached_read() {
    let provider = Arc::new(MockRpcProvider::returning("p0", profile()));
    let cache = Arc::new(MemoryCache::default());
    let api = api(vec![provider.clone()], Some(Arc::clone(&cache)));

    let first: Value = api
        .read("get", &profile_args(), ReadOptions::cached())
        .await
        .expect("read should succeed");
    let second: Value = api
        .read("get", &profile_args(), ReadOptions::cached())
        .await
        .expect("read should succeed");

    assert_eq!(first, profile());
    assert_eq!(second, profile());
    assert_eq!(provider.call_count(), 1);

    let stored: Option<Value> = cache.get_item(PROFILE_KEY).await.expect("get should succeed");
    assert_eq!(stored, Some(profile()));
}

#[tokio::test]
async fn test_view_request_carries_contract_and_args() {
    let provider = Arc::new(MockRpcProvider::returning("p0", profile()));
    let api = api(vec![provider.clone()], None);

    let _: Value = api
        .read("get", &profile_args(), ReadOptions::new())
        .await
        .expect("read should succeed");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].account_id, "social.near");
    assert_eq!(requests[0].method_name, "get");
    assert_eq!(requests[0].args, profile_args());
}

#[tokio::test]
async fn test_uncached_reads_always_query() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!(7)));
    let cache = Arc::new(MemoryCache::default());
    let api = api(vec![provider.clone()], Some(Arc::clone(&cache)));

    for _ in 0..3 {
        let value: u64 = api
            .read("total", &(), ReadOptions::new())
            .await
            .expect("read should succeed");
        assert_eq!(value, 7);
    }
    assert_eq!(provider.call_count(), 3);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_tags_separate_cache_entries() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!("v")));
    let api = api(vec![provider.clone()], Some(Arc::new(MemoryCache::default())));

    let _: String = api
        .read("get", &(), ReadOptions::cached().with_tag("a"))
        .await
        .expect("read should succeed");
    let _: String = api
        .read("get", &(), ReadOptions::cached().with_tag("b"))
        .await
        .expect("read should succeed");
    let _: String = api
        .read("get", &(), ReadOptions::cached().with_tag("a"))
        .await
        .expect("read should succeed");

    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!(1)));
    let api = api(vec![provider.clone()], Some(Arc::new(MemoryCache::default())));
    let options = ReadOptions::cached().with_expiration(Duration::from_millis(30));

    let _: u32 = api.read("n", &(), options.clone()).await.expect("read should succeed");
    tokio::time::sleep(Duration::from_millis(60)).await;
    let _: u32 = api.read("n", &(), options).await.expect("read should succeed");

    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_decode_mismatch_is_decode_error() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!("not a number")));
    let api = api(vec![provider], None);

    let result: Result<u64, NaxiosError> = api.read("n", &(), ReadOptions::new()).await;
    assert!(matches!(result, Err(NaxiosError::Decode { .. })));
}

#[tokio::test]
async fn test_non_object_args_are_rejected() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!(1)));
    let api = api(vec![provider.clone()], None);

    let result: Result<u32, NaxiosError> = api.read("n", &["a", "b"], ReadOptions::new()).await;
    assert!(matches!(result, Err(NaxiosError::Decode { .. })));
    assert_eq!(provider.call_count(), 0);
}

// ============================================================================
// IN-FLIGHT DEDUPLICATION
// ============================================================================

#[tokio::test]
async fn test_concurrent_cached_reads_wait_on_marker() {
    let provider = Arc::new(
        MockRpcProvider::returning("p0", profile()).with_delay(Duration::from_millis(50)),
    );
    let api = api(vec![provider.clone()], Some(Arc::new(MemoryCache::default())));
    let args = profile_args();

    let (a, b) = futures::join!(
        api.read::<_, Value>("get", &args, ReadOptions::cached()),
        api.read::<_, Value>("get", &args, ReadOptions::cached()),
    );

    assert_eq!(a, Ok(profile()));
    assert_eq!(b, Ok(profile()));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_coalesced_reads_share_one_call() {
    let provider = Arc::new(
        MockRpcProvider::returning("p0", json!(42)).with_delay(Duration::from_millis(30)),
    );
    let api = api(vec![provider.clone()], None);

    let results = futures::future::join_all(
        (0..3).map(|_| api.read::<_, u32>("n", &(), ReadOptions::new().coalesced())),
    )
    .await;

    assert_eq!(results, vec![Ok(42), Ok(42), Ok(42)]);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(api.queue().pending_count(), 0);
}

#[tokio::test]
async fn test_coalesced_read_rechecks_cache_when_its_turn_comes() {
    let provider = Arc::new(
        MockRpcProvider::returning("p0", json!(1)).with_delay(Duration::from_millis(30)),
    );
    let cache = Arc::new(MemoryCache::default());
    let api = api(vec![provider.clone()], Some(Arc::clone(&cache)));
    let key = api.cache_key("n", &Map::new(), None);

    let slow = api.read::<_, Value>("slow", &(), ReadOptions::new().coalesced());
    let queued = api.read::<_, u32>("n", &(), ReadOptions::cached().coalesced());
    let fill = async {
        cache
            .set_item(key.as_str(), &json!(9), None)
            .await
            .expect("set should succeed");
    };
    let (_, queued, _) = futures::join!(slow, queued, fill);

    assert_eq!(queued, Ok(9));
    assert_eq!(provider.call_count(), 1);
    assert_eq!(provider.requests()[0].method_name, "slow");
}

#[tokio::test]
async fn test_failed_read_releases_marker() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!("ok")));
    provider.push_response(Err(RpcError::Transport {
        provider: "p0".to_string(),
        message: "connection reset".to_string(),
    }));
    let cache = Arc::new(MemoryCache::default());
    let api = api(vec![provider.clone()], Some(Arc::clone(&cache)));

    let failed: Result<String, NaxiosError> = api.read("n", &(), ReadOptions::cached()).await;
    assert!(matches!(
        failed,
        Err(NaxiosError::Providers(FallbackError::Exhausted { attempts: 1, .. }))
    ));
    let key = api.cache_key("n", &Map::new(), None);
    let slot: Option<Value> = cache.get_item(key.as_str()).await.expect("get should succeed");
    assert_eq!(slot, None);

    let retried: String = api
        .read("n", &(), ReadOptions::cached())
        .await
        .expect("retry should succeed");
    assert_eq!(retried, "ok");
}

#[tokio::test]
async fn test_waiting_reader_fetches_after_failed_read() {
    let provider = Arc::new(
        MockRpcProvider::returning("p0", json!("second")).with_delay(Duration::from_millis(30)),
    );
    provider.push_response(Err(RpcError::Transport {
        provider: "p0".to_string(),
        message: "timeout".to_string(),
    }));
    let api = api(vec![provider.clone()], Some(Arc::new(MemoryCache::default())));

    let (first, second) = futures::join!(
        api.read::<_, String>("n", &(), ReadOptions::cached()),
        api.read::<_, String>("n", &(), ReadOptions::cached()),
    );

    assert!(first.is_err());
    assert_eq!(second, Ok("second".to_string()));
    assert_eq!(provider.call_count(), 2);
}

/// Store with room for fetching markers only; any other write fails.
struct MarkerOnlyStore(InMemoryStore);

impl KeyValueStore for MarkerOnlyStore {
    fn probe(&self) -> CacheResult<()> {
        self.0.probe()
    }
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.0.get(key)
    }
    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        if value.contains("naxiosState") {
            self.0.set(key, value)
        } else {
            Err(CacheError::Store {
                reason: "disk full".to_string(),
            })
        }
    }
    fn remove(&self, key: &str) -> CacheResult<bool> {
        self.0.remove(key)
    }
    fn keys(&self) -> CacheResult<Vec<String>> {
        self.0.keys()
    }
}

#[tokio::test]
async fn test_uncacheable_value_is_returned_and_releases_marker() {
    let provider = Arc::new(
        MockRpcProvider::returning("p0", json!("fresh")).with_delay(Duration::from_millis(30)),
    );
    let cache = Arc::new(StorageCache::new(
        MarkerOnlyStore(InMemoryStore::new()),
        CacheConfig::new(),
    ));
    let api = ContractApi::with_providers(
        fixtures::fast_config("social.near"),
        vec![provider.clone()],
        Some(Arc::clone(&cache)),
    )
    .expect("client should build");

    let started = Instant::now();
    let (first, second) = futures::join!(
        api.read::<_, String>("n", &(), ReadOptions::cached()),
        api.read::<_, String>("n", &(), ReadOptions::cached()),
    );

    assert_eq!(first, Ok("fresh".to_string()));
    assert_eq!(second, Ok("fresh".to_string()));
    // The waiting reader moved on once the marker was released.
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(provider.call_count(), 2);

    let key = api.cache_key("n", &Map::new(), None);
    let slot: Option<Value> = cache.get_item(key.as_str()).await.expect("get should succeed");
    assert_eq!(slot, None);
}

#[tokio::test]
async fn test_stuck_marker_times_out() {
    let provider = Arc::new(MockRpcProvider::returning("p0", json!(1)));
    let cache = Arc::new(MemoryCache::default());
    let config = fixtures::fast_config("social.near")
        .with_fetching_timeout(Duration::from_millis(100))
        .with_poll_interval(Duration::from_millis(20));
    let api = ContractApi::with_providers(config, vec![provider.clone()], Some(Arc::clone(&cache)))
        .expect("client should build");

    let key = api.cache_key("n", &Map::new(), None);
    cache
        .set_item(key.as_str(), &fetching_marker(), Some(Duration::from_secs(60)))
        .await
        .expect("set should succeed");

    let started = Instant::now();
    let result: Result<u32, NaxiosError> = api.read("n", &(), ReadOptions::cached()).await;

    assert!(matches!(
        result,
        Err(NaxiosError::Polling(PollingError::Timeout { .. }))
    ));
    assert!(started.elapsed() >= Duration::from_millis(90));
    assert_eq!(provider.call_count(), 0);
}

// ============================================================================
// FALLBACK
// ============================================================================

#[tokio::test]
async fn test_read_falls_back_across_providers() {
    let p0 = Arc::new(MockRpcProvider::failing("p0", "connection refused"));
    let p1 = Arc::new(MockRpcProvider::returning("p1", Value::Null));
    p1.push_response(Err(fixtures::rate_limited("p1")));
    let p2 = Arc::new(MockRpcProvider::returning("p2", json!("from p2")));
    let api = api(vec![p0.clone(), p1.clone(), p2.clone()], None);

    let value: String = api
        .read("n", &(), ReadOptions::new())
        .await
        .expect("third provider should answer");

    assert_eq!(value, "from p2");
    assert_eq!(
        (p0.call_count(), p1.call_count(), p2.call_count()),
        (1, 1, 1)
    );
}

#[tokio::test]
async fn test_exhausted_providers_report_last_error() {
    let p0 = Arc::new(MockRpcProvider::failing("p0", "down"));
    let p1 = Arc::new(MockRpcProvider::failing("p1", "also down"));
    let api = api(vec![p0, p1], None);

    let result: Result<Value, NaxiosError> = api.read("n", &(), ReadOptions::new()).await;
    match result {
        Err(NaxiosError::Providers(FallbackError::Exhausted { attempts, last })) => {
            assert_eq!(attempts, 2);
            assert_eq!(
                last,
                RpcError::Transport {
                    provider: "p1".to_string(),
                    message: "also down".to_string(),
                }
            );
        }
        other => panic!("expected exhausted providers, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_provider_list() {
    let api = api(Vec::new(), None);
    let result: Result<Value, NaxiosError> = api.read("n", &(), ReadOptions::new()).await;
    assert_eq!(
        result,
        Err(NaxiosError::Providers(FallbackError::EmptyProviderList))
    );
}

// ============================================================================
// PERSISTENT CACHE
// ============================================================================

#[tokio::test]
async fn test_lmdb_cache_survives_client_restart() {
    let dir = tempfile::tempdir().expect("tempdir should be created");

    {
        let provider = Arc::new(MockRpcProvider::returning("p0", profile()));
        let cache = Arc::new(StorageCache::open(dir.path(), 10, CacheConfig::new()));
        assert!(cache.is_available());
        let api = ContractApi::with_providers(
            fixtures::fast_config("social.near"),
            vec![provider.clone()],
            Some(cache),
        )
        .expect("client should build");

        let _: Value = api
            .read("get", &profile_args(), ReadOptions::cached())
            .await
            .expect("read should succeed");
        assert_eq!(provider.call_count(), 1);
    }

    let provider = Arc::new(MockRpcProvider::failing("p0", "offline"));
    let cache = Arc::new(StorageCache::open(dir.path(), 10, CacheConfig::new()));
    let api = ContractApi::with_providers(
        fixtures::fast_config("social.near"),
        vec![provider.clone()],
        Some(cache),
    )
    .expect("client should build");

    let value: Value = api
        .read("get", &profile_args(), ReadOptions::cached())
        .await
        .expect("cached value should be served");
    assert_eq!(value, profile());
    assert_eq!(provider.call_count(), 0);
}

// ============================================================================
// CHANGE CALLS
// ============================================================================

#[tokio::test]
async fn test_call_without_signer_is_not_connected() {
    let api = api(Vec::new(), None);
    let result: Result<Value, NaxiosError> =
        api.call("set", &json!({"data": {}}), CallOptions::default()).await;
    assert_eq!(result, Err(NaxiosError::Wallet(WalletError::NotConnected)));

    let signed_out = api.with_signer(Arc::new(RecordingSigner::signed_out()));
    let result: Result<Value, NaxiosError> =
        signed_out.call("set", &json!({}), CallOptions::default()).await;
    assert_eq!(result, Err(NaxiosError::Wallet(WalletError::NotConnected)));
}

#[tokio::test]
async fn test_call_sends_function_call() {
    let signer = Arc::new(RecordingSigner::signed_in("alice.near").with_outcome(json!("done")));
    let api = api(Vec::new(), None).with_signer(signer.clone());

    let outcome: String = api
        .call(
            "set",
            &json!({"data": {"alice.near": {"profile": {"name": "Alice"}}}}),
            CallOptions::new()
                .with_deposit("1")
                .with_callback_url("https://app.example/done"),
        )
        .await
        .expect("call should succeed");
    assert_eq!(outcome, "done");

    let requests = signer.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.signer_id, "alice.near");
    assert_eq!(request.receiver_id, "social.near");
    assert_eq!(request.callback_url.as_deref(), Some("https://app.example/done"));
    assert_eq!(request.actions.len(), 1);
    assert_eq!(request.actions[0].method_name, "set");
    assert_eq!(request.actions[0].gas, THIRTY_TGAS);
    assert_eq!(request.actions[0].deposit, "1");
}

#[tokio::test]
async fn test_call_multiple_applies_defaults() {
    let signer = Arc::new(RecordingSigner::signed_in("alice.near"));
    let api = api(Vec::new(), None).with_signer(signer.clone());

    let transactions = vec![
        Transaction::new("ping"),
        Transaction::new("ft_transfer")
            .with_receiver("wrap.near")
            .with_args(json!({"receiver_id": "bob.near", "amount": "1"}))
            .with_gas("100000000000000")
            .with_deposit("1"),
    ];
    let outcomes = api
        .call_multiple(&transactions, Some("https://app.example/batch".to_string()))
        .await
        .expect("batch should succeed");
    assert_eq!(outcomes.len(), 2);

    let batches = signer.batches();
    assert_eq!(batches.len(), 1);
    let (requests, callback) = &batches[0];
    assert_eq!(callback.as_deref(), Some("https://app.example/batch"));

    assert_eq!(requests[0].receiver_id, "social.near");
    assert_eq!(requests[0].actions[0].args, json!({}));
    assert_eq!(requests[0].actions[0].gas, THIRTY_TGAS);
    assert_eq!(requests[0].actions[0].deposit, "0");

    assert_eq!(requests[1].receiver_id, "wrap.near");
    assert_eq!(requests[1].actions[0].gas, "100000000000000");
    assert_eq!(requests[1].actions[0].deposit, "1");
}
