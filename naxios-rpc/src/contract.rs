//! Contract orchestrator.
//!
//! [`ContractApi`] ties the building blocks together for one contract:
//!
//! - view calls go through the TTL cache, then through ordered provider fallback
//! - identical in-flight reads are collapsed, either by a `fetching` marker in
//!   the cache that other callers poll on, or by the tag-merging call queue
//! - change calls are handed to the injected [`TransactionSigner`]
//!
//! The marker is an ordinary cache entry, so it expires like any other value
//! and is removed as soon as the read it guards fails.

use std::sync::Arc;
use std::time::Duration;

use naxios_cache::{MemoryCache, TtlCache};
use naxios_core::{CacheError, CacheKey, ClientConfig, NaxiosError, NaxiosResult, WalletError};
use naxios_sync::{poll_until, with_fallback, CallQueue, PollConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::json_rpc::JsonRpcProvider;
use crate::provider::{RpcProvider, ViewRequest};
use crate::signer::TransactionSigner;
use crate::transaction::{FunctionCallAction, Transaction, TransactionRequest, NO_DEPOSIT, THIRTY_TGAS};

const STATE_FIELD: &str = "naxiosState";
const FETCHING_STATE: &str = "fetching";

/// The value stored under a key while its read is in flight.
pub fn fetching_marker() -> Value {
    let mut marker = Map::new();
    marker.insert(
        STATE_FIELD.to_string(),
        Value::String(FETCHING_STATE.to_string()),
    );
    Value::Object(marker)
}

/// Whether `value` is the in-flight marker rather than a real result.
pub fn is_fetching_marker(value: &Value) -> bool {
    value.as_object().is_some_and(|object| {
        object.len() == 1 && object.get(STATE_FIELD).and_then(Value::as_str) == Some(FETCHING_STATE)
    })
}

#[derive(Debug, Clone, PartialEq)]
enum CacheSlot {
    Empty,
    Fetching,
    Ready(Value),
}

async fn lookup<C: TtlCache>(cache: &C, key: &str) -> Result<CacheSlot, CacheError> {
    Ok(match cache.get_item::<Value>(key).await? {
        None => CacheSlot::Empty,
        Some(value) if is_fetching_marker(&value) => CacheSlot::Fetching,
        Some(value) => CacheSlot::Ready(value),
    })
}

fn args_to_map<A: Serialize + ?Sized>(args: &A) -> NaxiosResult<Map<String, Value>> {
    match serde_json::to_value(args).map_err(NaxiosError::decode)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(NaxiosError::decode(format!(
            "view arguments must be a JSON object, got {}",
            other
        ))),
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Per-read behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Serve from and store into the cache.
    pub use_cache: bool,
    /// Entry lifetime; falls back to the client's default expiration.
    pub expiration: Option<Duration>,
    /// Extra discriminator appended to the cache key.
    pub tag: Option<String>,
    /// Collapse identical reads through the call queue instead of marker polling.
    pub use_coalescing: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a cached read.
    pub fn cached() -> Self {
        Self {
            use_cache: true,
            ..Self::default()
        }
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn coalesced(mut self) -> Self {
        self.use_coalescing = true;
        self
    }
}

/// Per-call attachments for change calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    pub gas: String,
    pub deposit: String,
    pub callback_url: Option<String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            gas: THIRTY_TGAS.to_string(),
            deposit: NO_DEPOSIT.to_string(),
            callback_url: None,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gas(mut self, gas: impl Into<String>) -> Self {
        self.gas = gas.into();
        self
    }

    pub fn with_deposit(mut self, deposit: impl Into<String>) -> Self {
        self.deposit = deposit.into();
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }
}

// ============================================================================
// CONTRACT API
// ============================================================================

struct ContractInner<C> {
    config: ClientConfig,
    providers: Vec<Arc<dyn RpcProvider>>,
    cache: Option<Arc<C>>,
    signer: Option<Arc<dyn TransactionSigner>>,
    queue: CallQueue<Value>,
}

impl<C> Clone for ContractInner<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            providers: self.providers.clone(),
            cache: self.cache.clone(),
            signer: self.signer.clone(),
            queue: self.queue.clone(),
        }
    }
}

/// Client for one contract.
///
/// Cloning is cheap; clones share the cache, the providers and the call queue.
pub struct ContractApi<C = MemoryCache> {
    inner: Arc<ContractInner<C>>,
}

impl<C> Clone for ContractApi<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for ContractApi<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoints: Vec<&str> = self.inner.providers.iter().map(|p| p.endpoint()).collect();
        f.debug_struct("ContractApi")
            .field("contract_id", &self.inner.config.contract_id)
            .field("network", &self.inner.config.network)
            .field("providers", &endpoints)
            .field("cached", &self.inner.cache.is_some())
            .field("signer", &self.inner.signer.is_some())
            .finish()
    }
}

impl<C> ContractApi<C>
where
    C: TtlCache + 'static,
{
    /// Connect to the contract over the configured JSON-RPC endpoints.
    ///
    /// Expired entries left in `cache` by earlier sessions are swept before
    /// the client is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an HTTP client
    /// cannot be built.
    pub async fn connect(config: ClientConfig, cache: Option<Arc<C>>) -> NaxiosResult<Self> {
        config.validate()?;

        let providers = config
            .rpc_endpoints()
            .into_iter()
            .map(|endpoint| {
                JsonRpcProvider::new(endpoint, config.request_timeout)
                    .map(|provider| Arc::new(provider) as Arc<dyn RpcProvider>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let api = Self::assemble(config, providers, cache);
        api.sweep_cache().await;

        info!(
            contract = %api.inner.config.contract_id,
            network = %api.inner.config.network,
            providers = api.inner.providers.len(),
            "Contract client connected"
        );
        Ok(api)
    }

    /// Build a client over caller-supplied providers, tried in the given order.
    pub fn with_providers(
        config: ClientConfig,
        providers: Vec<Arc<dyn RpcProvider>>,
        cache: Option<Arc<C>>,
    ) -> NaxiosResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, providers, cache))
    }

    fn assemble(
        config: ClientConfig,
        providers: Vec<Arc<dyn RpcProvider>>,
        cache: Option<Arc<C>>,
    ) -> Self {
        Self {
            inner: Arc::new(ContractInner {
                config,
                providers,
                cache,
                signer: None,
                queue: CallQueue::new(),
            }),
        }
    }

    /// Attach the signing session used by change calls.
    pub fn with_signer(self, signer: Arc<dyn TransactionSigner>) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
        inner.signer = Some(signer);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> Option<&Arc<C>> {
        self.inner.cache.as_ref()
    }

    /// Queue used for coalesced reads.
    pub fn queue(&self) -> &CallQueue<Value> {
        &self.inner.queue
    }

    /// Cache key a read of `method` with `args` and `tag` is stored under.
    pub fn cache_key(&self, method: &str, args: &Map<String, Value>, tag: Option<&str>) -> CacheKey {
        CacheKey::new(
            self.inner.config.network,
            &self.inner.config.contract_id,
            method,
            args,
            tag,
        )
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Call a view method and decode its result.
    ///
    /// `args` must serialize to a JSON object (or `null` for no arguments).
    pub async fn read<A, R>(&self, method: &str, args: &A, options: ReadOptions) -> NaxiosResult<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let args = args_to_map(args)?;
        let value = self.read_value(method, args, options).await?;
        serde_json::from_value(value).map_err(NaxiosError::decode)
    }

    /// Call a view method and return its raw JSON result.
    pub async fn read_value(
        &self,
        method: &str,
        args: Map<String, Value>,
        options: ReadOptions,
    ) -> NaxiosResult<Value> {
        self.sweep_cache().await;

        let key = self.cache_key(method, &args, options.tag.as_deref());
        let request = ViewRequest::new(&self.inner.config.contract_id, method, args);
        let expiration = options
            .expiration
            .unwrap_or(self.inner.config.default_expiration);
        let cache = if options.use_cache {
            self.inner.cache.as_deref()
        } else {
            None
        };

        if let Some(cache) = cache {
            match lookup(cache, key.as_str()).await? {
                CacheSlot::Ready(value) => {
                    debug!(key = %key, "Cache hit");
                    return Ok(value);
                }
                CacheSlot::Fetching if !options.use_coalescing => {
                    if let Some(value) = self.wait_for_fetch(cache, key.as_str()).await? {
                        return Ok(value);
                    }
                    debug!(key = %key, "In-flight read vanished, fetching directly");
                }
                _ => debug!(key = %key, "Cache miss"),
            }
        }

        if options.use_coalescing {
            let api = self.clone();
            let use_cache = options.use_cache;
            let tag = key.as_str().to_string();
            let handle = self.inner.queue.enqueue(
                move || async move { api.fetch_queued(&key, &request, use_cache, expiration).await },
                Some(tag.as_str()),
            );
            return handle.await;
        }

        self.fetch_and_store(key.as_str(), &request, cache, expiration)
            .await
    }

    async fn sweep_cache(&self) {
        let Some(cache) = &self.inner.cache else {
            return;
        };
        match cache.clean_up().await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired cache entries"),
            Err(e) => warn!(err = %e, "Cache cleanup failed"),
        }
    }

    /// Poll until the in-flight read for `key` settles.
    ///
    /// `None` means the marker disappeared without a value.
    async fn wait_for_fetch(&self, cache: &C, key: &str) -> NaxiosResult<Option<Value>> {
        let config = PollConfig::new()
            .with_timeout(self.inner.config.fetching_timeout)
            .with_interval(self.inner.config.poll_interval);

        debug!(key, "Waiting on in-flight read");
        let slot = poll_until(
            || lookup(cache, key),
            |slot| !matches!(slot, CacheSlot::Fetching),
            &config,
        )
        .await?;

        Ok(match slot {
            CacheSlot::Ready(value) => Some(value),
            CacheSlot::Empty | CacheSlot::Fetching => None,
        })
    }

    async fn fetch_queued(
        &self,
        key: &CacheKey,
        request: &ViewRequest,
        use_cache: bool,
        expiration: Duration,
    ) -> NaxiosResult<Value> {
        let cache = if use_cache {
            self.inner.cache.as_deref()
        } else {
            None
        };

        if let Some(cache) = cache {
            if let CacheSlot::Ready(value) = lookup(cache, key.as_str()).await? {
                debug!(key = %key, "Cache filled while queued");
                return Ok(value);
            }
        }

        self.fetch_and_store(key.as_str(), request, cache, expiration)
            .await
    }

    async fn fetch_and_store(
        &self,
        key: &str,
        request: &ViewRequest,
        cache: Option<&C>,
        expiration: Duration,
    ) -> NaxiosResult<Value> {
        if let Some(cache) = cache {
            cache.set_item(key, &fetching_marker(), Some(expiration)).await?;
        }

        let outcome = with_fallback(&self.inner.providers, |provider, index| async move {
            debug!(
                provider_num = index + 1,
                endpoint = provider.endpoint(),
                method = %request.method_name,
                "Querying provider"
            );
            provider.query(request).await
        })
        .await;

        match outcome {
            Ok(value) => {
                if let Some(cache) = cache {
                    if let Err(e) = cache.set_item(key, &value, Some(expiration)).await {
                        warn!(key, err = %e, "Failed to cache fetched value");
                        release_marker(cache, key).await;
                    }
                }
                Ok(value)
            }
            Err(e) => {
                if let Some(cache) = cache {
                    release_marker(cache, key).await;
                }
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Change calls
    // ------------------------------------------------------------------------

    fn active_signer(&self) -> NaxiosResult<&Arc<dyn TransactionSigner>> {
        match &self.inner.signer {
            Some(signer) if signer.is_signed_in() => Ok(signer),
            _ => Err(WalletError::NotConnected.into()),
        }
    }

    /// Sign and send a change call against the contract.
    ///
    /// # Errors
    ///
    /// [`WalletError::NotConnected`] if no signed-in signer is attached.
    pub async fn call<A, R>(&self, method: &str, args: &A, options: CallOptions) -> NaxiosResult<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let signer = self.active_signer()?;
        let signer_id = signer.account_id().ok_or(WalletError::NotConnected)?;
        let args = serde_json::to_value(args).map_err(NaxiosError::decode)?;

        let request = TransactionRequest {
            signer_id,
            receiver_id: self.inner.config.contract_id.clone(),
            callback_url: options.callback_url,
            actions: vec![FunctionCallAction {
                method_name: method.to_string(),
                args,
                gas: options.gas,
                deposit: options.deposit,
            }],
        };

        info!(
            contract = %self.inner.config.contract_id,
            method,
            "Submitting change call"
        );
        let outcome = signer.sign_and_send(request).await?;
        serde_json::from_value(outcome).map_err(NaxiosError::decode)
    }

    /// Sign and send several change calls in one wallet interaction.
    ///
    /// Transactions without a receiver target this client's contract.
    pub async fn call_multiple<A>(
        &self,
        transactions: &[Transaction<A>],
        callback_url: Option<String>,
    ) -> NaxiosResult<Vec<Value>>
    where
        A: Serialize,
    {
        let signer = self.active_signer()?;
        let signer_id = signer.account_id().ok_or(WalletError::NotConnected)?;

        let requests = transactions
            .iter()
            .map(|tx| -> NaxiosResult<TransactionRequest> {
                let args = match &tx.args {
                    Some(args) => serde_json::to_value(args).map_err(NaxiosError::decode)?,
                    None => Value::Object(Map::new()),
                };
                Ok(TransactionRequest {
                    signer_id: signer_id.clone(),
                    receiver_id: tx
                        .receiver_id
                        .clone()
                        .unwrap_or_else(|| self.inner.config.contract_id.clone()),
                    callback_url: None,
                    actions: vec![FunctionCallAction {
                        method_name: tx.method.clone(),
                        args,
                        gas: tx.gas.clone().unwrap_or_else(|| THIRTY_TGAS.to_string()),
                        deposit: tx.deposit.clone().unwrap_or_else(|| NO_DEPOSIT.to_string()),
                    }],
                })
            })
            .collect::<NaxiosResult<Vec<_>>>()?;

        info!(count = requests.len(), "Submitting change calls");
        Ok(signer.sign_and_send_all(requests, callback_url).await?)
    }
}

/// Drop the marker under `key` unless a real value already replaced it.
async fn release_marker<C: TtlCache>(cache: &C, key: &str) {
    match cache.get_item::<Value>(key).await {
        Ok(Some(value)) if is_fetching_marker(&value) => {
            if let Err(e) = cache.remove_item(key).await {
                warn!(key, err = %e, "Failed to release fetching marker");
            }
        }
        Ok(_) => {}
        Err(e) => warn!(key, err = %e, "Failed to inspect fetching marker"),
    }
}
