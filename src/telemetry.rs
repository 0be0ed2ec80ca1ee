//! Telemetry metric name constants.
//!
//! Centralised metric names for coinwatch operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `coinwatch_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: caller-supplied label for the request (e.g. "markets")
//! - `status`: outcome: "ok" or the classified error kind
//!   (e.g. "rate_limited", "timeout")

/// Total requests that reached the network.
///
/// Labels: `operation`, `status`.
pub const REQUESTS_TOTAL: &str = "coinwatch_requests_total";

/// Network request duration in seconds, throttle wait excluded.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "coinwatch_request_duration_seconds";

/// Total response cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "coinwatch_cache_hits_total";

/// Total response cache misses.
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "coinwatch_cache_misses_total";

/// Total expired entries removed from the response cache, lazily or by sweep.
pub const CACHE_EVICTIONS_TOTAL: &str = "coinwatch_cache_evictions_total";

/// Total calls the throttle had to delay.
pub const THROTTLE_WAITS_TOTAL: &str = "coinwatch_throttle_waits_total";

/// Total requests that joined an identical in-flight request instead of
/// issuing their own.
///
/// Labels: `operation`.
pub const COALESCED_TOTAL: &str = "coinwatch_coalesced_total";
