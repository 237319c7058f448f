//! Key-addressed query cache
//!
//! The cache is an explicit value owned by a client (or a test), never a
//! global. It provides:
//! - De-duplication: concurrent reads of one key share a single in-flight fetch
//! - Last-key-version-wins: every fetch and write takes the next version for
//!   its key and a result is stored only while its version is still the newest
//! - Atomic patches: each write replaces whole values under one lock, so
//!   readers see either the pre- or the post-mutation snapshot
//!
//! The lock is never held across a network await.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::domain::Enrollable;
use crate::error::{Error, Result};

use super::key::QueryKey;
use super::value::{CacheValue, Cacheable};

type SharedFetch = Shared<BoxFuture<'static, Result<CacheValue>>>;

/// Observable state of one query key
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// Never requested
    Idle,
    /// First fetch in progress, no data yet
    Loading,
    /// Last fetch failed and there is no data
    Error(Error),
    Data {
        data: T,
        /// A newer fetch is in progress
        is_fetching: bool,
        /// Data was invalidated or is older than the freshness window
        is_stale: bool,
    },
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Data { data, .. } => Some(data),
            Self::Idle | Self::Loading | Self::Error(_) => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Point-in-time view of a stored entry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub value: CacheValue,
    pub version: u64,
    pub fetched_at: DateTime<Utc>,
    pub is_stale: bool,
}

/// Which cached collections an enrollment patch touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentPatch {
    pub list_patched: bool,
    pub detail_patched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// Share an in-flight fetch for the key when there is one
    Join,
    /// Always start a new version
    Supersede,
}

struct CacheEntry {
    value: CacheValue,
    version: u64,
    fetched_at: DateTime<Utc>,
    loaded_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn new(value: CacheValue, version: u64) -> Self {
        Self {
            value,
            version,
            fetched_at: Utc::now(),
            loaded_at: Instant::now(),
            invalidated: false,
        }
    }

    fn is_stale(&self, stale_after: Duration) -> bool {
        self.invalidated || self.loaded_at.elapsed() >= stale_after
    }
}

struct InFlight {
    version: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Newest version issued per key
    versions: HashMap<QueryKey, u64>,
    in_flight: HashMap<QueryKey, InFlight>,
    errors: HashMap<QueryKey, Error>,
}

impl CacheInner {
    fn next_version(&mut self, key: &QueryKey) -> u64 {
        let version = self.versions.entry(key.clone()).or_insert(0);
        *version += 1;
        *version
    }

    fn latest_version(&self, key: &QueryKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Apply `patch` to the value under `key` as one replace
    ///
    /// Returns false when the key holds no value of type `T`. An in-flight
    /// fetch for the key is superseded either way, since it may have read
    /// pre-patch data.
    fn patch<T, F>(&mut self, key: &QueryKey, patch: F) -> bool
    where
        T: Cacheable,
        F: FnOnce(&mut T) -> bool,
    {
        if self.in_flight.contains_key(key) {
            self.next_version(key);
        }

        let Some(mut current) = self.entries.get(key).and_then(|e| T::from_value(&e.value)) else {
            return false;
        };
        if !patch(&mut current) {
            return false;
        }

        let version = self.next_version(key);
        let mut entry = CacheEntry::new(current.into_value(), version);
        if let Some(previous) = self.entries.get(key) {
            entry.fetched_at = previous.fetched_at;
            entry.loaded_at = previous.loaded_at;
            entry.invalidated = previous.invalidated;
        }
        self.entries.insert(key.clone(), entry);
        true
    }
}

/// Key-addressed store shared by every query of one client
pub struct QueryCache {
    stale_after: Duration,
    inner: Mutex<CacheInner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_after", &self.stale_after)
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl QueryCache {
    /// Create a cache whose entries turn stale after `stale_after`
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.stale_after())
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    // ========== Reads ==========

    /// Latest stored value for `key`
    pub async fn get<T: Cacheable>(&self, key: &QueryKey) -> Result<Option<T>> {
        let inner = self.inner.lock().await;
        match inner.entries.get(key) {
            None => Ok(None),
            Some(entry) => T::from_value(&entry.value)
                .map(Some)
                .ok_or_else(|| Error::CacheTypeMismatch {
                    key: key.to_string(),
                }),
        }
    }

    pub async fn snapshot(&self, key: &QueryKey) -> Option<CacheSnapshot> {
        let inner = self.inner.lock().await;
        inner.entries.get(key).map(|entry| CacheSnapshot {
            value: entry.value.clone(),
            version: entry.version,
            fetched_at: entry.fetched_at,
            is_stale: entry.is_stale(self.stale_after),
        })
    }

    pub async fn state<T: Cacheable>(&self, key: &QueryKey) -> QueryState<T> {
        let inner = self.inner.lock().await;
        let is_fetching = inner.in_flight.contains_key(key);

        if let Some(entry) = inner.entries.get(key) {
            return match T::from_value(&entry.value) {
                Some(data) => QueryState::Data {
                    data,
                    is_fetching,
                    is_stale: entry.is_stale(self.stale_after),
                },
                None => QueryState::Error(Error::CacheTypeMismatch {
                    key: key.to_string(),
                }),
            };
        }

        if is_fetching {
            QueryState::Loading
        } else if let Some(err) = inner.errors.get(key) {
            QueryState::Error(err.clone())
        } else {
            QueryState::Idle
        }
    }

    /// Newest version issued for `key` (0 if never touched)
    pub async fn version(&self, key: &QueryKey) -> u64 {
        self.inner.lock().await.latest_version(key)
    }

    pub async fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner.lock().await.in_flight.contains_key(key)
    }

    // ========== Fetches ==========

    /// Return the stored value if it is fresh, otherwise fetch it
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        {
            let inner = self.inner.lock().await;
            if let Some(entry) = inner.entries.get(&key)
                && !entry.is_stale(self.stale_after)
                && let Some(value) = T::from_value(&entry.value)
            {
                debug!(key = %key, version = entry.version, "Cache hit");
                return Ok(value);
            }
        }

        self.run(key, fetcher, FetchMode::Join).await
    }

    /// Fetch `key`, joining a fetch already in flight for it
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.run(key, fetcher, FetchMode::Join).await
    }

    /// Start a new fetch for `key`, superseding any fetch in flight
    ///
    /// The superseded fetch still resolves for its own callers but its
    /// result is never stored.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.run(key, fetcher, FetchMode::Supersede).await
    }

    async fn run<T, F, Fut>(&self, key: QueryKey, fetcher: F, mode: FetchMode) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (version, future) = {
            let mut inner = self.inner.lock().await;
            let joined = match mode {
                FetchMode::Join => inner
                    .in_flight
                    .get(&key)
                    .map(|flight| (flight.version, flight.future.clone())),
                FetchMode::Supersede => None,
            };
            match joined {
                Some((version, future)) => {
                    debug!(key = %key, version, "Joining in-flight fetch");
                    (version, future)
                }
                None => {
                    let version = inner.next_version(&key);
                    debug!(key = %key, version, "Starting fetch");
                    let future = fetcher()
                        .map(|result| result.map(Cacheable::into_value))
                        .boxed()
                        .shared();
                    inner.in_flight.insert(
                        key.clone(),
                        InFlight {
                            version,
                            future: future.clone(),
                        },
                    );
                    (version, future)
                }
            }
        };

        let result = future.await;
        self.settle(&key, version, &result).await;

        let value = result?;
        T::from_value(&value).ok_or_else(|| Error::CacheTypeMismatch {
            key: key.to_string(),
        })
    }

    /// Record a resolved fetch. Every waiter calls this; it is idempotent.
    async fn settle(&self, key: &QueryKey, version: u64, result: &Result<CacheValue>) {
        let mut inner = self.inner.lock().await;

        if inner
            .in_flight
            .get(key)
            .is_some_and(|flight| flight.version == version)
        {
            inner.in_flight.remove(key);
        }

        let latest = inner.latest_version(key);
        if version != latest {
            debug!(key = %key, version, latest, "Discarding superseded result");
            return;
        }

        match result {
            Ok(value) => {
                if inner.entries.get(key).is_some_and(|e| e.version >= version) {
                    return;
                }
                inner
                    .entries
                    .insert(key.clone(), CacheEntry::new(value.clone(), version));
                inner.errors.remove(key);
            }
            Err(err) => {
                debug!(key = %key, version, error = %err, "Fetch failed");
                inner.errors.insert(key.clone(), err.clone());
            }
        }
    }

    // ========== Writes ==========

    /// Store `value` under `key`, superseding any in-flight fetch
    pub async fn set<T: Cacheable>(&self, key: QueryKey, value: T) {
        let mut inner = self.inner.lock().await;
        let version = inner.next_version(&key);
        inner.errors.remove(&key);
        inner
            .entries
            .insert(key, CacheEntry::new(value.into_value(), version));
    }

    /// Mark the entity `id` as enrolled in both its list and its detail entry
    ///
    /// Both writes happen under one lock acquisition. A key that is not
    /// cached is left alone.
    pub async fn patch_enrollment<T>(
        &self,
        list_key: &QueryKey,
        detail_key: &QueryKey,
        id: &str,
    ) -> EnrollmentPatch
    where
        T: Enrollable + Cacheable,
        Vec<T>: Cacheable,
    {
        let mut inner = self.inner.lock().await;

        let list_patched = inner.patch::<Vec<T>, _>(list_key, |items| {
            let mut found = false;
            for item in items.iter_mut().filter(|item| item.id() == id) {
                item.mark_enrolled();
                found = true;
            }
            found
        });

        let detail_patched = inner.patch::<T, _>(detail_key, |item| {
            if item.id() != id {
                return false;
            }
            item.mark_enrolled();
            true
        });

        info!(
            id = %id,
            list = %list_key,
            detail = %detail_key,
            list_patched,
            detail_patched,
            "Applied enrollment patch"
        );

        EnrollmentPatch {
            list_patched,
            detail_patched,
        }
    }

    /// Mark `key` stale so the next `query` refetches it
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Mark every key starting with `prefix` stale; returns how many were marked
    pub async fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for (key, entry) in inner.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        count
    }
}
