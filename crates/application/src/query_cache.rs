//! Key-based query cache with staleness, coalescing and invalidation.
//!
//! Every request for a key gets a sequence number. A response is applied only
//! when it is newer than the last applied one, and a response whose request
//! started before an invalidation is applied but left stale.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use fundline_core::{AppError, AppResult};
use fundline_domain::{QueryKey, Resource};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api_client::ApiClient;

mod policy;
mod snapshot;

#[cfg(test)]
mod tests;

pub use policy::{QueryPolicy, RetryPolicy};
pub use snapshot::{QuerySnapshot, QueryStatus};

type FetchResult = AppResult<Arc<Value>>;
type PendingFetch = Shared<BoxFuture<'static, FetchResult>>;

struct InFlight {
    seq: u64,
    pending: PendingFetch,
}

struct CacheEntry {
    data: Option<Arc<Value>>,
    fetched_at: Option<Instant>,
    fetched_wall: Option<DateTime<Utc>>,
    error: Option<AppError>,
    status: QueryStatus,
    policy: QueryPolicy,
    invalidated: bool,
    invalidated_before: u64,
    applied_seq: u64,
    in_flight: Option<InFlight>,
    subscribers: usize,
    idle_since: Option<Instant>,
}

impl CacheEntry {
    fn new(policy: &QueryPolicy, now: Instant) -> Self {
        Self {
            data: None,
            fetched_at: None,
            fetched_wall: None,
            error: None,
            status: QueryStatus::Idle,
            policy: policy.clone(),
            invalidated: false,
            invalidated_before: 0,
            applied_seq: 0,
            in_flight: None,
            subscribers: 0,
            idle_since: Some(now),
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        match (self.data.as_ref(), self.fetched_at) {
            (Some(_), Some(fetched_at)) => {
                self.invalidated || now.duration_since(fetched_at) >= self.policy.stale_time
            }
            _ => true,
        }
    }

    fn touch(&mut self, policy: &QueryPolicy, now: Instant) {
        self.policy = policy.clone();
        if self.subscribers == 0 {
            self.idle_since = Some(now);
        }
    }

    fn snapshot(&self, key: &QueryKey, now: Instant) -> QuerySnapshot {
        QuerySnapshot {
            key: key.clone(),
            data: self.data.clone(),
            status: self.status,
            is_stale: self.is_stale(now),
            is_fetching: self.in_flight.is_some(),
            is_placeholder: false,
            is_previous: false,
            fetched_at: self.fetched_wall,
            error: self.error.clone(),
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    next_seq: u64,
}

struct CacheInner {
    client: ApiClient,
    state: Mutex<CacheState>,
}

/// Shared query cache. Cloning is cheap; clones share entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    /// Creates an empty cache fetching through `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                client,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    next_seq: 1,
                }),
            }),
        }
    }

    /// Returns the API client used for fetches.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Returns cached data when fresh; otherwise fetches and waits.
    ///
    /// Identical concurrent fetches share one request.
    pub async fn fetch(&self, key: &QueryKey, policy: &QueryPolicy) -> QuerySnapshot {
        let pending = {
            let now = Instant::now();
            let mut state = self.lock();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(policy, now));
            entry.touch(policy, now);

            if !entry.is_stale(now) {
                return entry.snapshot(key, now);
            }

            self.join_or_start(&mut state, key)
        };

        let _ = pending.await;
        self.current(key)
    }

    /// Fetches regardless of freshness, joining a request that started after
    /// the last invalidation.
    pub async fn refetch(&self, key: &QueryKey, policy: &QueryPolicy) -> QuerySnapshot {
        let pending = {
            let now = Instant::now();
            let mut state = self.lock();
            state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(policy, now))
                .touch(policy, now);
            self.join_or_start(&mut state, key)
        };

        let _ = pending.await;
        self.current(key)
    }

    /// Stale-while-revalidate read: cached data is returned at once and a
    /// background refetch starts when it is stale. Without data this waits
    /// like [`QueryCache::fetch`].
    pub async fn read(&self, key: &QueryKey, policy: &QueryPolicy) -> QuerySnapshot {
        {
            let now = Instant::now();
            let mut state = self.lock();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(policy, now));
            entry.touch(policy, now);

            if entry.data.is_some() {
                if entry.is_stale(now) {
                    let _ = self.join_or_start(&mut state, key);
                }
                return self.snapshot_locked(&state, key, now);
            }
        }

        self.fetch(key, policy).await
    }

    /// Reads `key` like [`QueryCache::read`]; when the fetch fails with
    /// nothing cached, returns `placeholder` flagged with `is_placeholder`.
    /// The placeholder is never cached.
    pub async fn fetch_with_fallback(
        &self,
        key: &QueryKey,
        policy: &QueryPolicy,
        placeholder: Value,
    ) -> QuerySnapshot {
        let mut snapshot = self.read(key, policy).await;
        if snapshot.data.is_none() && snapshot.status == QueryStatus::Error {
            warn!(key = %key, "serving placeholder data after failed fetch");
            snapshot.data = Some(Arc::new(placeholder));
            snapshot.is_placeholder = true;
        }
        snapshot
    }

    /// Page navigation with previous-data retention.
    ///
    /// When `key` has no data yet and `previous` does, the fetch continues in
    /// the background and the previous page is returned flagged `is_previous`.
    /// Otherwise behaves like [`QueryCache::read`].
    pub async fn fetch_paginated(
        &self,
        key: &QueryKey,
        previous: Option<&QueryKey>,
        policy: &QueryPolicy,
    ) -> QuerySnapshot {
        if policy.keep_previous_data
            && let Some(previous) = previous.filter(|previous| *previous != key)
        {
            let now = Instant::now();
            let mut state = self.lock();
            let previous_data = state
                .entries
                .get(previous)
                .and_then(|entry| entry.data.clone());
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(policy, now));
            entry.touch(policy, now);

            if entry.data.is_none()
                && let Some(previous_data) = previous_data
            {
                let _ = self.join_or_start(&mut state, key);
                let mut snapshot = self.snapshot_locked(&state, key, now);
                snapshot.data = Some(previous_data);
                snapshot.is_previous = true;
                return snapshot;
            }
        }

        self.read(key, policy).await
    }

    /// Waits for the request running for `key`, if any, and returns the
    /// snapshot it left behind.
    pub async fn settle(&self, key: &QueryKey) -> QuerySnapshot {
        let pending = {
            let state = self.lock();
            state
                .entries
                .get(key)
                .and_then(|entry| entry.in_flight.as_ref())
                .map(|in_flight| in_flight.pending.clone())
        };

        if let Some(pending) = pending {
            let _ = pending.await;
        }
        self.current(key)
    }

    /// Returns the cached snapshot without touching the network.
    #[must_use]
    pub fn peek(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let state = self.lock();
        state
            .entries
            .get(key)
            .map(|entry| entry.snapshot(key, Instant::now()))
    }

    /// Registers interest in `key`. Dropping the guard starts the gc timer.
    #[must_use]
    pub fn subscribe(&self, key: &QueryKey, policy: &QueryPolicy) -> QuerySubscription {
        let now = Instant::now();
        let mut state = self.lock();
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(policy, now));
        entry.policy = policy.clone();
        entry.subscribers += 1;
        entry.idle_since = None;

        QuerySubscription {
            cache: self.clone(),
            key: key.clone(),
            policy: policy.clone(),
        }
    }

    /// Subscribes and refetches on the policy's interval until the handle is
    /// dropped. Without an interval only the subscription is held.
    #[must_use]
    pub fn poll(&self, key: &QueryKey, policy: &QueryPolicy) -> PollHandle {
        let subscription = self.subscribe(key, policy);
        let task = policy.refetch_interval.map(|interval| {
            let cache = self.clone();
            let key = key.clone();
            let policy = policy.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    debug!(key = %key, "polling query");
                    cache.refetch(&key, &policy).await;
                }
            })
        });

        PollHandle { subscription, task }
    }

    /// Marks every entry of the given resources stale and refetches the
    /// subscribed ones. Returns the number of entries marked.
    pub fn invalidate_resources(&self, resources: &BTreeSet<Resource>) -> usize {
        if resources.is_empty() {
            return 0;
        }

        let mut state = self.lock();
        let boundary = state.next_seq;
        let mut marked = 0;
        let mut refetch = Vec::new();

        for (key, entry) in &mut state.entries {
            if resources.contains(&key.resource()) {
                entry.invalidated = true;
                entry.invalidated_before = boundary;
                marked += 1;
                if entry.subscribers > 0 {
                    refetch.push(key.clone());
                }
            }
        }

        for key in &refetch {
            let _ = self.join_or_start(&mut state, key);
        }

        debug!(
            resources = ?resources,
            marked,
            refetching = refetch.len(),
            "invalidated queries"
        );
        marked
    }

    /// Marks one entry stale, refetching it when subscribed.
    pub fn invalidate_key(&self, key: &QueryKey) -> bool {
        let mut state = self.lock();
        let boundary = state.next_seq;
        let Some(entry) = state.entries.get_mut(key) else {
            return false;
        };

        entry.invalidated = true;
        entry.invalidated_before = boundary;
        if entry.subscribers > 0 {
            let _ = self.join_or_start(&mut state, key);
        }
        true
    }

    /// Drops unsubscribed, idle entries older than their gc time. Returns the
    /// number removed.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        let before = state.entries.len();

        state.entries.retain(|_, entry| {
            let expired = entry.subscribers == 0
                && entry.in_flight.is_none()
                && entry
                    .idle_since
                    .is_some_and(|idle_since| now.duration_since(idle_since) >= entry.policy.gc_time);
            !expired
        });

        let removed = before - state.entries.len();
        if removed > 0 {
            debug!(removed, "collected idle queries");
        }
        removed
    }

    /// Runs [`QueryCache::collect_garbage`] every `period`.
    #[must_use]
    pub fn spawn_garbage_collector(&self, period: std::time::Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                cache.collect_garbage();
            }
        })
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self, key: &QueryKey) -> QuerySnapshot {
        let state = self.lock();
        self.snapshot_locked(&state, key, Instant::now())
    }

    fn snapshot_locked(&self, state: &CacheState, key: &QueryKey, now: Instant) -> QuerySnapshot {
        state.entries.get(key).map_or_else(
            || QuerySnapshot {
                key: key.clone(),
                data: None,
                status: QueryStatus::Idle,
                is_stale: true,
                is_fetching: false,
                is_placeholder: false,
                is_previous: false,
                fetched_at: None,
                error: None,
            },
            |entry| entry.snapshot(key, now),
        )
    }

    /// Joins the in-flight request for `key` unless it started before the
    /// last invalidation; otherwise starts a new one.
    fn join_or_start(&self, state: &mut CacheState, key: &QueryKey) -> PendingFetch {
        let seq = state.next_seq;
        let Some(entry) = state.entries.get_mut(key) else {
            return futures::future::ready(Err(AppError::Internal(format!(
                "query '{key}' is not cached"
            ))))
            .boxed()
            .shared();
        };

        if let Some(in_flight) = &entry.in_flight
            && in_flight.seq >= entry.invalidated_before
        {
            return in_flight.pending.clone();
        }

        let pending = self.spawn_fetch(key.clone(), seq, entry.policy.retry);
        entry.in_flight = Some(InFlight {
            seq,
            pending: pending.clone(),
        });
        if entry.data.is_none() {
            entry.status = QueryStatus::Loading;
        }
        state.next_seq += 1;
        pending
    }

    fn spawn_fetch(&self, key: QueryKey, seq: u64, retry: Option<RetryPolicy>) -> PendingFetch {
        let cache = self.clone();
        let task = tokio::spawn(async move {
            let result = cache.fetch_remote(&key, retry).await.map(Arc::new);
            cache.complete(&key, seq, &result);
            result
        });

        async move {
            task.await.unwrap_or_else(|error| {
                Err(AppError::Internal(format!("query task failed: {error}")))
            })
        }
        .boxed()
        .shared()
    }

    async fn fetch_remote(&self, key: &QueryKey, retry: Option<RetryPolicy>) -> AppResult<Value> {
        let mut remaining = retry.map_or(0, |retry| retry.attempts);
        loop {
            match self.inner.client.get_key_quietly(key).await {
                Ok(value) => return Ok(value),
                Err(error) if remaining > 0 && is_retryable(&error) => {
                    remaining -= 1;
                    let delay = retry.map(|retry| retry.delay).unwrap_or_default();
                    debug!(key = %key, error = %error, "retrying query");
                    tokio::time::sleep(delay).await;
                }
                Err(error) if error.is_unauthorized() => return Err(error),
                Err(error) => return Err(self.inner.client.report(error)),
            }
        }
    }

    fn complete(&self, key: &QueryKey, seq: u64, result: &FetchResult) {
        let now = Instant::now();
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            debug!(key = %key, seq, "dropping response for collected query");
            return;
        };

        if entry
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.seq == seq)
        {
            entry.in_flight = None;
        }

        if seq <= entry.applied_seq {
            debug!(key = %key, seq, applied = entry.applied_seq, "discarding out-of-order response");
            return;
        }

        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.fetched_at = Some(now);
                entry.fetched_wall = Some(Utc::now());
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.applied_seq = seq;
                entry.invalidated = seq < entry.invalidated_before;
            }
            Err(error) => {
                entry.error = Some(error.clone());
                entry.status = QueryStatus::Error;
            }
        }
    }
}

fn is_retryable(error: &AppError) -> bool {
    matches!(error, AppError::Server(_) | AppError::Transport(_))
}

/// Interest in one cached query. Dropping it unsubscribes.
pub struct QuerySubscription {
    cache: QueryCache,
    key: QueryKey,
    policy: QueryPolicy,
}

impl QuerySubscription {
    /// Subscribed key.
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Fetches the subscribed key with its policy.
    pub async fn fetch(&self) -> QuerySnapshot {
        self.cache.fetch(&self.key, &self.policy).await
    }

    /// Current cached snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<QuerySnapshot> {
        self.cache.peek(&self.key)
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        let now = Instant::now();
        let mut state = self.cache.lock();
        if let Some(entry) = state.entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.idle_since = Some(now);
            }
        }
    }
}

/// Polling subscription. Dropping it stops the poll loop and unsubscribes.
pub struct PollHandle {
    subscription: QuerySubscription,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Underlying subscription.
    #[must_use]
    pub fn subscription(&self) -> &QuerySubscription {
        &self.subscription
    }

    /// Returns true while the poll loop runs.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
