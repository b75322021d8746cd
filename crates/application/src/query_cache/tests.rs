use std::collections::BTreeSet;
use std::time::Duration;

use fundline_core::{AppError, SERVER_ERROR_MESSAGE};
use fundline_domain::{Pagination, QueryKey, Resource};
use serde_json::json;

use super::{QueryCache, QueryPolicy, QueryStatus};
use crate::client_ports::HttpMethod;
use crate::test_support::Harness;

fn cache(harness: &Harness) -> QueryCache {
    QueryCache::new(harness.client.clone())
}

fn page_key(page: u32) -> QueryKey {
    let pagination = Pagination::new(page, 20).unwrap_or_else(|_| unreachable!());
    QueryKey::build(Resource::Cases, "/cases", &pagination)
}

#[tokio::test]
async fn fresh_hits_skip_the_network() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"cases": [], "total": 0}));
    let cache = cache(&harness);
    let key = QueryKey::root(Resource::Cases);

    let first = cache.fetch(&key, &QueryPolicy::list()).await;
    let second = cache.fetch(&key, &QueryPolicy::list()).await;

    assert_eq!(first.status, QueryStatus::Success);
    assert!(!second.is_stale);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 1);
}

#[tokio::test(start_paused = true)]
async fn identical_concurrent_fetches_share_one_request() {
    let harness = Harness::signed_in();
    harness.transport.respond_after(
        HttpMethod::Get,
        "/cases",
        Duration::from_millis(200),
        200,
        json!({"cases": [{"id": 1}]}),
    );
    let cache = cache(&harness);
    let key = page_key(1);
    let policy = QueryPolicy::list();

    let (left, right) = tokio::join!(cache.fetch(&key, &policy), cache.fetch(&key, &policy));

    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 1);
    assert_eq!(left.data, right.data);
    assert!(left.has_data());
}

#[tokio::test(start_paused = true)]
async fn stale_entries_refetch() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"cases": []}));
    let cache = cache(&harness);
    let key = page_key(1);

    cache.fetch(&key, &QueryPolicy::list()).await;
    tokio::time::sleep(Duration::from_secs(61)).await;
    let snapshot = cache.peek(&key).unwrap_or_else(|| unreachable!());
    assert!(snapshot.is_stale);

    cache.fetch(&key, &QueryPolicy::list()).await;
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 2);
}

#[tokio::test(start_paused = true)]
async fn slower_older_response_never_overwrites_newer_data() {
    let harness = Harness::signed_in();
    harness.transport.respond_after(
        HttpMethod::Get,
        "/cases",
        Duration::from_millis(500),
        200,
        json!({"version": 1}),
    );
    harness.transport.respond_after(
        HttpMethod::Get,
        "/cases",
        Duration::from_millis(10),
        200,
        json!({"version": 2}),
    );
    let cache = cache(&harness);
    let key = page_key(1);
    let policy = QueryPolicy::list();

    let slow = {
        let cache = cache.clone();
        let key = key.clone();
        let policy = policy.clone();
        tokio::spawn(async move { cache.fetch(&key, &policy).await })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert!(cache.invalidate_key(&key));
    let fast = cache.fetch(&key, &policy).await;
    assert_eq!(fast.data.as_deref(), Some(&json!({"version": 2})));

    let _ = slow.await;
    let settled = cache.peek(&key).unwrap_or_else(|| unreachable!());
    assert_eq!(settled.data.as_deref(), Some(&json!({"version": 2})));
    assert!(!settled.is_stale);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 2);
}

#[tokio::test(start_paused = true)]
async fn response_started_before_invalidation_stays_stale() {
    let harness = Harness::signed_in();
    harness.transport.respond_after(
        HttpMethod::Get,
        "/cases",
        Duration::from_millis(300),
        200,
        json!({"version": 1}),
    );
    let cache = cache(&harness);
    let key = page_key(1);

    let pending = {
        let cache = cache.clone();
        let key = key.clone();
        tokio::spawn(async move { cache.fetch(&key, &QueryPolicy::list()).await })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    cache.invalidate_resources(&BTreeSet::from([Resource::Cases]));
    let snapshot = pending.await.unwrap_or_else(|_| unreachable!());

    assert!(snapshot.has_data());
    assert!(snapshot.is_stale);
}

#[tokio::test]
async fn failures_keep_last_good_data() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"cases": [{"id": 1}]}));
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 500, json!({"detail": "db down"}));
    let cache = cache(&harness);
    let key = page_key(1);

    cache.fetch(&key, &QueryPolicy::list()).await;
    cache.invalidate_key(&key);
    let snapshot = cache.fetch(&key, &QueryPolicy::list()).await;

    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.data.as_deref(), Some(&json!({"cases": [{"id": 1}]})));
    assert!(matches!(snapshot.error, Some(AppError::Server(_))));
    assert_eq!(
        harness.notifier.messages(),
        vec![SERVER_ERROR_MESSAGE.to_owned()]
    );
}

#[tokio::test(start_paused = true)]
async fn invalidation_refetches_subscribed_entries_only() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"cases": []}));
    harness
        .transport
        .respond(HttpMethod::Get, "/dashboard/stats", 200, json!({"total_cases": 3}));
    let cache = cache(&harness);
    let cases = page_key(1);
    let stats = QueryKey::root(Resource::DashboardStats);

    let _subscription = cache.subscribe(&cases, &QueryPolicy::list());
    cache.fetch(&cases, &QueryPolicy::list()).await;
    cache.fetch(&stats, &QueryPolicy::dashboard()).await;

    let marked = cache.invalidate_resources(&Resource::Cases.invalidation_set());
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(marked, 2);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 2);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/dashboard/stats"), 1);
    let stats_snapshot = cache.peek(&stats).unwrap_or_else(|| unreachable!());
    assert!(stats_snapshot.is_stale);
    let cases_snapshot = cache.peek(&cases).unwrap_or_else(|| unreachable!());
    assert!(!cases_snapshot.is_stale);
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_entries_are_collected_after_gc_time() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"cases": []}));
    let cache = cache(&harness);
    let idle = page_key(1);
    let watched = page_key(2);
    let policy = QueryPolicy::list();

    cache.fetch(&idle, &policy).await;
    let subscription = cache.subscribe(&watched, &policy);
    subscription.fetch().await;

    tokio::time::sleep(policy.gc_time + Duration::from_secs(1)).await;
    assert_eq!(cache.collect_garbage(), 1);
    assert!(cache.peek(&idle).is_none());
    assert!(cache.peek(&watched).is_some());

    drop(subscription);
    assert_eq!(cache.collect_garbage(), 0);
    tokio::time::sleep(policy.gc_time).await;
    assert_eq!(cache.collect_garbage(), 1);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn fallback_data_is_flagged_and_not_cached() {
    let harness = Harness::signed_in();
    harness.transport.respond(
        HttpMethod::Get,
        "/settings/categories",
        500,
        json!({"detail": "boom"}),
    );
    let cache = cache(&harness);
    let key = QueryKey::root(Resource::Settings);

    let snapshot = cache
        .fetch_with_fallback(&key, &QueryPolicy::list(), json!([{"name": "system"}]))
        .await;

    assert!(snapshot.is_placeholder);
    assert_eq!(snapshot.data.as_deref(), Some(&json!([{"name": "system"}])));
    let cached = cache.peek(&key).unwrap_or_else(|| unreachable!());
    assert!(cached.data.is_none());
}

#[tokio::test(start_paused = true)]
async fn next_page_shows_previous_data_while_loading() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"page": 1}));
    harness.transport.respond_after(
        HttpMethod::Get,
        "/cases",
        Duration::from_millis(100),
        200,
        json!({"page": 2}),
    );
    let cache = cache(&harness);
    let policy = QueryPolicy::list();
    let first = page_key(1);
    let second = page_key(2);

    cache.fetch(&first, &policy).await;
    let loading = cache.fetch_paginated(&second, Some(&first), &policy).await;

    assert!(loading.is_previous);
    assert!(loading.is_fetching);
    assert_eq!(loading.data.as_deref(), Some(&json!({"page": 1})));

    tokio::time::sleep(Duration::from_millis(150)).await;
    let loaded = cache.fetch_paginated(&second, Some(&first), &policy).await;
    assert!(!loaded.is_previous);
    assert_eq!(loaded.data.as_deref(), Some(&json!({"page": 2})));

    let back = cache.fetch_paginated(&first, Some(&second), &policy).await;
    assert_eq!(back.data.as_deref(), Some(&json!({"page": 1})));
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 2);
}

#[tokio::test(start_paused = true)]
async fn reference_queries_retry_once() {
    let harness = Harness::signed_in();
    harness.transport.respond(
        HttpMethod::Get,
        "/communications/templates",
        503,
        json!({"detail": "warming up"}),
    );
    harness.transport.respond(
        HttpMethod::Get,
        "/communications/templates",
        200,
        json!([{"id": 1, "name": "Welcome"}]),
    );
    let cache = cache(&harness);
    let key = QueryKey::root(Resource::Templates);

    let snapshot = cache.fetch(&key, &QueryPolicy::reference()).await;

    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(
        harness
            .transport
            .count(HttpMethod::Get, "/communications/templates"),
        2
    );
    assert!(harness.notifier.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_toast_once() {
    let harness = Harness::signed_in();
    harness.transport.respond(
        HttpMethod::Get,
        "/communications/templates",
        503,
        json!({"detail": "warming up"}),
    );
    let cache = cache(&harness);
    let key = QueryKey::root(Resource::Templates);

    let snapshot = cache.fetch(&key, &QueryPolicy::reference()).await;

    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(
        harness
            .transport
            .count(HttpMethod::Get, "/communications/templates"),
        2
    );
    assert_eq!(harness.notifier.messages(), vec![SERVER_ERROR_MESSAGE.to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn list_queries_do_not_retry() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 500, json!({}));
    let cache = cache(&harness);

    let snapshot = cache.fetch(&page_key(1), &QueryPolicy::list()).await;

    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_runs_until_the_handle_is_dropped() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/agents/status", 200, json!([]));
    let cache = cache(&harness);
    let key = QueryKey::root(Resource::Agents);
    let policy = QueryPolicy::live();

    cache.fetch(&key, &policy).await;
    let handle = cache.poll(&key, &policy);
    assert!(handle.is_polling());

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(harness.transport.count(HttpMethod::Get, "/agents/status"), 3);

    drop(handle);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.transport.count(HttpMethod::Get, "/agents/status"), 3);
}

#[tokio::test(start_paused = true)]
async fn read_serves_stale_data_while_revalidating() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"version": 1}));
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"version": 2}));
    let cache = cache(&harness);
    let key = page_key(1);
    let policy = QueryPolicy::list();

    cache.read(&key, &policy).await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    let stale = cache.read(&key, &policy).await;
    assert_eq!(stale.data.as_deref(), Some(&json!({"version": 1})));
    assert!(stale.is_stale);
    assert!(stale.is_fetching);

    tokio::time::sleep(Duration::from_millis(1)).await;
    let fresh = cache.peek(&key).unwrap_or_else(|| unreachable!());
    assert_eq!(fresh.data.as_deref(), Some(&json!({"version": 2})));
}

#[tokio::test]
async fn snapshots_decode_typed_payloads() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/health", 200, json!({"status": "healthy"}));
    let cache = cache(&harness);

    let snapshot = cache
        .fetch(&QueryKey::root(Resource::Health), &QueryPolicy::live())
        .await;
    let health = snapshot.decode::<fundline_domain::HealthStatus>();

    assert!(health.is_ok());
    let health = health.unwrap_or_else(|_| unreachable!());
    assert!(health.is_some_and(|health| health.is_healthy()));
}

#[tokio::test(start_paused = true)]
async fn stale_page_is_served_at_once_and_settles_fresh() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/cases", 200, json!({"version": 1}));
    harness.transport.respond_after(
        HttpMethod::Get,
        "/cases",
        Duration::from_millis(100),
        200,
        json!({"version": 2}),
    );
    let cache = cache(&harness);
    let key = page_key(1);
    let policy = QueryPolicy::list();

    cache.fetch_paginated(&key, None, &policy).await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    let stale = cache.fetch_paginated(&key, None, &policy).await;
    assert_eq!(stale.data.as_deref(), Some(&json!({"version": 1})));
    assert!(!stale.is_previous);
    assert!(stale.is_stale);
    assert!(stale.is_fetching);

    let settled = cache.settle(&key).await;
    assert_eq!(settled.data.as_deref(), Some(&json!({"version": 2})));
    assert!(!settled.is_stale);
    assert!(!settled.is_fetching);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/cases"), 2);
}

#[tokio::test]
async fn settling_an_idle_key_returns_the_cached_snapshot() {
    let harness = Harness::signed_in();
    harness
        .transport
        .respond(HttpMethod::Get, "/health", 200, json!({"status": "healthy"}));
    let cache = cache(&harness);
    let key = QueryKey::root(Resource::Health);

    cache.fetch(&key, &QueryPolicy::live()).await;
    let settled = cache.settle(&key).await;

    assert_eq!(settled.status, QueryStatus::Success);
    assert!(!settled.is_fetching);
    assert_eq!(harness.transport.count(HttpMethod::Get, "/health"), 1);
}
