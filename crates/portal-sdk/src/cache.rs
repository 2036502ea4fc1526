//! The resource cache coordinator.
//!
//! [`ResourceCache`] tracks `{data, loading, loaded, error}` for one
//! resource kind, optionally partitioned by an entity key, and decides
//! per `refresh` call whether to serve cached data, join the fetch that
//! is already in flight for that key, or start a new one.
//!
//! ```text
//! EMPTY  --refresh-->        LOADING
//! LOADING --refresh-->       LOADING   (joins the same fetch)
//! LOADED --refresh-->        LOADED    (no network)
//! LOADED --refresh(force)--> LOADING
//! LOADING --ok-->            LOADED    (data replaced, error cleared)
//! LOADING --err-->           ERROR     (data and loaded untouched)
//! ```
//!
//! Fetches run on their own task, so an entry settles even if every
//! caller stops waiting.  A drop guard clears `loading` if the fetch
//! panics or the task is aborted.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::SdkError;

/// Fetch function a domain facade hands to the coordinator.
pub type FetchFn<K, T> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<T, SdkError>> + Send + Sync>;

type InFlight<T> = Shared<BoxFuture<'static, Result<T, Arc<SdkError>>>>;

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// Observable state of one cached resource.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// Last fetched (or locally spliced) value.
    pub data: Option<T>,
    /// A fetch for this key is in flight.
    pub loading: bool,
    /// `data` reflects a successful fetch or an explicit `set_data`.
    pub loaded: bool,
    /// Message of the last failed attempt; cleared when a new one starts.
    pub error: Option<String>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            loaded: false,
            error: None,
        }
    }
}

/// Coarse state of an entry, for display and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CacheState {
    /// Never fetched.
    Empty,
    /// Fetch in flight.
    Loading,
    /// Last fetch succeeded.
    Loaded,
    /// Last fetch failed.
    Error,
}

impl<T> CacheEntry<T> {
    /// Coarse state.  A failed refresh over loaded data reports `Error`.
    pub fn state(&self) -> CacheState {
        if self.loading {
            CacheState::Loading
        } else if self.error.is_some() {
            CacheState::Error
        } else if self.loaded {
            CacheState::Loaded
        } else {
            CacheState::Empty
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceCache
// ---------------------------------------------------------------------------

struct Slot<T> {
    entry: CacheEntry<T>,
    /// Ticket of the fetch allowed to settle this slot, and its future.
    in_flight: Option<(u64, InFlight<T>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            entry: CacheEntry::default(),
            in_flight: None,
        }
    }
}

struct Inner<K, T> {
    name: String,
    fetch: FetchFn<K, T>,
    /// When set, refreshing while logged out resets the entry instead of
    /// fetching.
    gate: Option<CredentialStore>,
    slots: Mutex<HashMap<K, Slot<T>>>,
    next_ticket: AtomicU64,
}

/// Per-key cache over one fetch function.
///
/// Use `K = ()` for resources that are not partitioned by entity.
/// Cloning shares the same entries.
pub struct ResourceCache<K, T> {
    inner: Arc<Inner<K, T>>,
}

impl<K, T> Clone for ResourceCache<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T> ResourceCache<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Clone + Default + Send + Sync + 'static,
{
    /// Cache that always fetches, authenticated or not.
    pub fn new<F, Fut>(name: impl Into<String>, fetch: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SdkError>> + Send + 'static,
    {
        Self::build(name.into(), None, fetch)
    }

    /// Cache that only fetches while `credentials` holds an access token.
    ///
    /// Refreshing while logged out resets the entry and resolves to
    /// `T::default()` without touching the network.
    pub fn authenticated<F, Fut>(
        name: impl Into<String>,
        credentials: CredentialStore,
        fetch: F,
    ) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SdkError>> + Send + 'static,
    {
        Self::build(name.into(), Some(credentials), fetch)
    }

    fn build<F, Fut>(name: String, gate: Option<CredentialStore>, fetch: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SdkError>> + Send + 'static,
    {
        let fetch: FetchFn<K, T> = Arc::new(move |key| fetch(key).boxed());
        Self {
            inner: Arc::new(Inner {
                name,
                fetch,
                gate,
                slots: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(1),
            }),
        }
    }

    /// Name used in logs and fallback error messages.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Serve, join or fetch the value for `key`.
    ///
    /// * in flight → wait for that same fetch (no duplicate request);
    /// * loaded and not `force` → cached value, no network;
    /// * otherwise → start a fetch and wait for it.
    ///
    /// A failure is recorded in the entry's `error` **and** returned.
    pub async fn refresh(&self, key: K, force: bool) -> Result<T, SdkError> {
        let pending = {
            let mut slots = self.inner.lock();

            if !self.inner.authenticated() {
                if slots.remove(&key).is_some() {
                    debug!(cache = %self.inner.name, ?key, "logged out, entry reset");
                }
                return Ok(T::default());
            }

            let slot = slots.entry(key.clone()).or_default();
            let joined = slot.in_flight.as_ref().map(|(_, fut)| fut.clone());

            if let Some(fut) = joined {
                debug!(cache = %self.inner.name, ?key, force, "joining in-flight fetch");
                fut
            } else if slot.entry.loaded && !force {
                return Ok(slot.entry.data.clone().unwrap_or_default());
            } else {
                let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
                slot.entry.loading = true;
                slot.entry.error = None;
                let fut = self.start(key, ticket);
                slot.in_flight = Some((ticket, fut.clone()));
                fut
            }
        };

        pending.await.map_err(SdkError::Shared)
    }

    /// Current state of `key` (the default entry if never touched).
    pub fn snapshot(&self, key: &K) -> CacheEntry<T> {
        self.inner
            .lock()
            .get(key)
            .map(|slot| slot.entry.clone())
            .unwrap_or_default()
    }

    /// Splice a local change into `data` without refetching.
    ///
    /// `loading`, `loaded` and `error` are left alone.
    pub fn set_data(&self, key: &K, update: impl FnOnce(&mut Option<T>)) {
        let mut slots = self.inner.lock();
        let slot = slots.entry(key.clone()).or_default();
        update(&mut slot.entry.data);
    }

    /// Drop every entry back to the default.  Fetches still in flight
    /// finish but their results are discarded.
    pub fn reset(&self) {
        let mut slots = self.inner.lock();
        if !slots.is_empty() {
            debug!(cache = %self.inner.name, entries = slots.len(), "cache reset");
        }
        slots.clear();
    }

    fn start(&self, key: K, ticket: u64) -> InFlight<T> {
        let mut guard = SettleGuard {
            inner: Arc::clone(&self.inner),
            key,
            ticket,
            settled: false,
        };

        let task = tokio::spawn(async move {
            let fetch = Arc::clone(&guard.inner.fetch);
            let outcome = fetch(guard.key.clone()).await.map_err(Arc::new);
            guard.settle(&outcome);
            outcome
        });

        task.map(|joined| {
            joined.unwrap_or_else(|e| Err(Arc::new(SdkError::Task(e.to_string()))))
        })
        .boxed()
        .shared()
    }
}

impl<T> ResourceCache<(), T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// [`refresh`](Self::refresh) for an unkeyed resource.
    pub async fn load(&self, force: bool) -> Result<T, SdkError> {
        self.refresh((), force).await
    }

    /// [`snapshot`](Self::snapshot) for an unkeyed resource.
    pub fn entry(&self) -> CacheEntry<T> {
        self.snapshot(&())
    }

    /// [`set_data`](Self::set_data) for an unkeyed resource.
    pub fn update(&self, update: impl FnOnce(&mut Option<T>)) {
        self.set_data(&(), update)
    }
}

impl<K, T> Inner<K, T>
where
    K: Eq + Hash + Debug,
{
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authenticated(&self) -> bool {
        self.gate
            .as_ref()
            .map_or(true, CredentialStore::is_authenticated)
    }

    /// Apply a fetch outcome, if `ticket` still owns the slot.
    ///
    /// `None` means the fetch never produced an outcome.
    fn settle(&self, key: &K, ticket: u64, outcome: Option<&Result<T, Arc<SdkError>>>)
    where
        T: Clone,
    {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(key) else {
            debug!(cache = %self.name, ?key, "entry reset while fetching, result discarded");
            return;
        };
        if !matches!(&slot.in_flight, Some((owner, _)) if *owner == ticket) {
            return;
        }

        slot.in_flight = None;
        slot.entry.loading = false;
        match outcome {
            Some(Ok(data)) => {
                slot.entry.data = Some(data.clone());
                slot.entry.loaded = true;
                slot.entry.error = None;
            }
            Some(Err(e)) => {
                warn!(cache = %self.name, ?key, error = %e, "fetch failed");
                let message = e.to_string();
                slot.entry.error = Some(if message.trim().is_empty() {
                    format!("failed to load {}", self.name)
                } else {
                    message
                });
            }
            None => {
                warn!(cache = %self.name, ?key, "fetch interrupted");
                slot.entry.error = Some(format!("loading {} was interrupted", self.name));
            }
        }
    }
}

/// Settles the slot when the fetch task ends, however it ends.
struct SettleGuard<K, T>
where
    K: Eq + Hash + Debug,
    T: Clone,
{
    inner: Arc<Inner<K, T>>,
    key: K,
    ticket: u64,
    settled: bool,
}

impl<K, T> SettleGuard<K, T>
where
    K: Eq + Hash + Debug,
    T: Clone,
{
    fn settle(&mut self, outcome: &Result<T, Arc<SdkError>>) {
        self.settled = true;
        self.inner.settle(&self.key, self.ticket, Some(outcome));
    }
}

impl<K, T> Drop for SettleGuard<K, T>
where
    K: Eq + Hash + Debug,
    T: Clone,
{
    fn drop(&mut self) {
        if !self.settled {
            self.inner.settle(&self.key, self.ticket, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use portal_models::{CredentialPair, PersistMode};
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use super::*;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    /// Cache whose fetch sleeps briefly and returns `[{id: n}]` for the
    /// n-th call.
    fn counting_cache(calls: Arc<AtomicUsize>) -> ResourceCache<(), Vec<Value>> {
        ResourceCache::new("assigned", move |()| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(vec![json!({ "id": n })])
            }
        })
    }

    /// Cache whose fetch succeeds on the first call and fails afterwards.
    fn flaky_cache(calls: Arc<AtomicUsize>) -> ResourceCache<(), Vec<Value>> {
        ResourceCache::new("assigned", move |()| {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(vec![json!({ "id": 1 })])
                } else {
                    Err(SdkError::Status {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        message: "backend down".into(),
                    })
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_refresh_loads_the_entry() {
        let cache = counting_cache(counter());
        let data = cache.load(false).await.unwrap();
        assert_eq!(data, vec![json!({ "id": 1 })]);
        assert_eq!(
            cache.entry(),
            CacheEntry {
                data: Some(vec![json!({ "id": 1 })]),
                loading: false,
                loaded: true,
                error: None,
            }
        );
        assert_eq!(cache.entry().state(), CacheState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_fetch() {
        let calls = counter();
        let cache = counting_cache(calls.clone());

        let (a, b) = tokio::join!(cache.load(false), cache.load(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_entry_is_served_without_fetching() {
        let calls = counter();
        let cache = counting_cache(calls.clone());

        let first = cache.load(false).await.unwrap();
        let second = cache.load(false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_refresh_always_fetches() {
        let calls = counter();
        let cache = counting_cache(calls.clone());

        cache.load(false).await.unwrap();
        let forced = cache.load(true).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(forced, vec![json!({ "id": 2 })]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_data() {
        let cache = flaky_cache(counter());
        cache.load(false).await.unwrap();

        let err = cache.load(true).await.unwrap_err();
        assert_eq!(err.to_string(), "backend down");
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        let entry = cache.entry();
        assert!(!entry.loading);
        assert!(entry.loaded);
        assert_eq!(entry.data, Some(vec![json!({ "id": 1 })]));
        assert_eq!(entry.error.as_deref(), Some("backend down"));
        assert_eq!(entry.state(), CacheState::Error);
    }

    #[tokio::test]
    async fn first_failure_leaves_entry_unloaded() {
        let calls = counter();
        calls.store(1, Ordering::SeqCst);
        let cache = flaky_cache(calls);

        assert!(cache.load(false).await.is_err());
        let entry = cache.entry();
        assert!(!entry.loading && !entry.loaded);
        assert!(entry.data.is_none());
        assert!(entry.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn new_attempt_clears_the_previous_error() {
        let calls = counter();
        let seen = calls.clone();
        let cache: ResourceCache<(), Vec<Value>> = ResourceCache::new("assigned", move |()| {
            let seen = Arc::clone(&seen);
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(SdkError::Task("first attempt".into()));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(vec![json!({ "id": 1 })])
            }
        });
        assert!(cache.load(false).await.is_err());
        assert!(cache.entry().error.is_some());

        let retry = cache.clone();
        let pending = tokio::spawn(async move { retry.load(false).await });
        tokio::task::yield_now().await;

        let during = cache.entry();
        assert!(during.loading);
        assert!(during.error.is_none());

        pending.await.unwrap().unwrap();
        assert_eq!(cache.entry().state(), CacheState::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn panicking_fetch_clears_loading() {
        let cache: ResourceCache<(), Vec<Value>> = ResourceCache::new("boom", |()| async {
            if true {
                panic!("fetch exploded");
            }
            Ok(Vec::new())
        });

        let err = cache.load(false).await.unwrap_err();
        assert!(matches!(err.root(), SdkError::Task(_)));
        let entry = cache.entry();
        assert!(!entry.loading);
        assert!(entry.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_load_independently() {
        let calls = counter();
        let seen = calls.clone();
        let cache: ResourceCache<u32, String> = ResourceCache::new("details", move |id| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(u64::from(id) * 10)).await;
                if id == 2 {
                    return Err(SdkError::Task("no such request".into()));
                }
                Ok(format!("request {id}"))
            }
        });

        let (a, b) = tokio::join!(cache.refresh(1, false), cache.refresh(2, false));
        assert_eq!(a.unwrap(), "request 1");
        assert!(b.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(cache.snapshot(&1).loaded);
        assert!(cache.snapshot(&1).error.is_none());
        assert!(cache.snapshot(&2).error.is_some());
        assert_eq!(cache.snapshot(&3), CacheEntry::default());
    }

    #[tokio::test(start_paused = true)]
    async fn set_data_does_not_touch_loading_or_error() {
        let cache = counting_cache(counter());
        let background = cache.clone();
        let pending = tokio::spawn(async move { background.load(false).await });
        tokio::task::yield_now().await;

        cache.update(|data| *data = Some(vec![json!({ "id": "local" })]));
        let entry = cache.entry();
        assert!(entry.loading);
        assert!(entry.error.is_none());
        assert_eq!(entry.data, Some(vec![json!({ "id": "local" })]));

        pending.await.unwrap().unwrap();
        assert_eq!(cache.entry().data, Some(vec![json!({ "id": 1 })]));
    }

    #[tokio::test]
    async fn logged_out_refresh_resets_without_fetching() {
        let calls = counter();
        let seen = calls.clone();
        let store = CredentialStore::in_memory();
        let cache: ResourceCache<(), Vec<Value>> =
            ResourceCache::authenticated("assigned", store.clone(), move |()| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![json!({ "id": 1 })])
                }
            });

        assert_eq!(cache.load(true).await.unwrap(), Vec::<Value>::new());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set(&CredentialPair::new("a", None), PersistMode::Session);
        cache.load(false).await.unwrap();
        assert!(cache.entry().loaded);

        store.clear();
        assert!(cache.load(false).await.unwrap().is_empty());
        assert_eq!(cache.entry(), CacheEntry::default());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_in_flight_results() {
        let cache = counting_cache(counter());
        let background = cache.clone();
        let pending = tokio::spawn(async move { background.load(false).await });
        tokio::task::yield_now().await;

        cache.reset();
        // the joined caller still gets its value …
        assert!(pending.await.unwrap().is_ok());
        // … but the reset entry stays empty
        assert_eq!(cache.entry(), CacheEntry::default());
    }
}
