//! Tests for [`ResponseCache`] and cache key generation.

use std::sync::Arc;
use std::time::Duration;

use coinwatch::api::{Currency, Endpoints};
use coinwatch::cache::{DEFAULT_TTL, Payload, ResponseCache, generate_key};
use coinwatch::series::{Period, SourceInterval};
use serde_json::json;

fn payload(value: serde_json::Value) -> Payload {
    Arc::new(value)
}

// =========================================================================
// TTL
// =========================================================================

#[tokio::test(start_paused = true)]
async fn entry_is_fresh_until_ttl_elapses() {
    let cache = ResponseCache::new();
    let key = generate_key("https://api.test/global", &[]);
    cache.set(key.clone(), payload(json!({ "data": 1 })));

    tokio::time::advance(DEFAULT_TTL - Duration::from_millis(1)).await;
    assert_eq!(*cache.get(&key).unwrap(), json!({ "data": 1 }));

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(cache.get(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_removed_on_read() {
    let cache = ResponseCache::with_ttl(Duration::from_secs(5));
    let key = generate_key("https://api.test/search/trending", &[]);
    cache.set(key.clone(), payload(json!([])));

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(cache.get(&key).is_none());
    assert!(cache.entry(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn set_restamps_the_window() {
    let cache = ResponseCache::with_ttl(Duration::from_secs(10));
    let key = generate_key("https://api.test/global", &[]);
    cache.set(key.clone(), payload(json!(1)));

    tokio::time::advance(Duration::from_secs(8)).await;
    cache.set(key.clone(), payload(json!(2)));

    tokio::time::advance(Duration::from_secs(8)).await;
    assert_eq!(*cache.get(&key).unwrap(), json!(2));
}

#[tokio::test(start_paused = true)]
async fn hit_returns_the_stored_object() {
    let cache = ResponseCache::new();
    let key = generate_key("https://api.test/global", &[]);
    let stored = payload(json!({ "data": { "active_cryptocurrencies": 10 } }));
    cache.set(key.clone(), Arc::clone(&stored));

    let hit = cache.get(&key).unwrap();
    assert!(Arc::ptr_eq(&hit, &stored));
}

#[tokio::test(start_paused = true)]
async fn sweep_removes_only_expired_entries() {
    let cache = ResponseCache::with_ttl(Duration::from_secs(10));
    let old = generate_key("https://api.test/coins/bitcoin", &[]);
    let new = generate_key("https://api.test/coins/ethereum", &[]);

    cache.set(old.clone(), payload(json!("btc")));
    tokio::time::advance(Duration::from_secs(6)).await;
    cache.set(new.clone(), payload(json!("eth")));
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(cache.sweep(), 1);
    assert!(cache.entry(&old).is_none());
    assert!(cache.get(&new).is_some());
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_runs_on_interval() {
    let cache = Arc::new(ResponseCache::with_ttl(Duration::from_secs(1)));
    let key = generate_key("https://api.test/global", &[]);
    cache.set(key.clone(), payload(json!(null)));

    let sweeper = cache.spawn_sweeper(Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(61)).await;
    tokio::task::yield_now().await;

    assert!(cache.entry(&key).is_none());
    sweeper.abort();
}

#[test]
fn clear_empties_the_cache() {
    let cache = ResponseCache::new();
    cache.set(generate_key("https://api.test/a", &[]), payload(json!(1)));
    cache.set(generate_key("https://api.test/b", &[]), payload(json!(2)));
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

// =========================================================================
// Keys
// =========================================================================

#[test]
fn key_is_deterministic() {
    let url = "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd";
    assert_eq!(generate_key(url, &[]), generate_key(url, &[]));
}

#[test]
fn key_ignores_query_order() {
    let a = generate_key(
        "https://api.test/coins/bitcoin/market_chart?vs_currency=usd&days=7&interval=hourly",
        &[],
    );
    let b = generate_key(
        "https://api.test/coins/bitcoin/market_chart?interval=hourly&days=7&vs_currency=usd",
        &[],
    );
    assert_eq!(a, b);
}

#[test]
fn key_merges_extra_params() {
    let merged = generate_key("https://api.test/search", &[("query", "sol")]);
    let inline = generate_key("https://api.test/search?query=sol", &[]);
    assert_eq!(merged, inline);
}

#[test]
fn keys_differ_across_coin_currency_and_period() {
    let endpoints = Endpoints::new("https://api.test");
    let chart_key = |coin: &str, currency: Currency, period: Period| {
        let spec = period.plan().spec;
        generate_key(
            &endpoints.market_chart(coin, currency, spec.span_days, spec.source_interval),
            &[],
        )
    };

    let base = chart_key("bitcoin", Currency::Usd, Period::SevenDays);
    assert_ne!(base, chart_key("ethereum", Currency::Usd, Period::SevenDays));
    assert_ne!(base, chart_key("bitcoin", Currency::Eur, Period::SevenDays));
    assert_ne!(base, chart_key("bitcoin", Currency::Usd, Period::ThirtyDays));

    // 1H and 4H issue the same upstream query, so they share an entry.
    assert_eq!(
        chart_key("bitcoin", Currency::Usd, Period::OneHour),
        chart_key("bitcoin", Currency::Usd, Period::FourHours)
    );
    assert_ne!(
        generate_key(
            &endpoints.market_chart("bitcoin", Currency::Usd, 7, SourceInterval::Daily),
            &[]
        ),
        base
    );
}
