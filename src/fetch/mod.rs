//! Fetch orchestration.
//!
//! [`FetchOrchestrator::request`] is the single entry point for upstream
//! calls. It composes, in order:
//!
//! 1. response cache lookup (a hit returns immediately, no throttle, no network)
//! 2. the process-wide [`RequestThrottle`]
//! 3. the transport call, bounded by a timeout that cancels it on expiry
//! 4. status and body validation
//! 5. cache population on success
//! 6. failure classification
//!
//! Failures never escape as errors. Every path ends in a [`RequestOutcome`],
//! and retrying is the caller's decision: re-invoke `request`.
//!
//! # In-flight coalescing
//!
//! With coalescing enabled (the default), concurrent cached requests that
//! share a [`CacheKey`] share one network call and receive the same outcome.
//! The last waiter to finish or give up removes the map entry, so an
//! abandoned call is dropped rather than joined later.
//! Uncached requests (`use_cache = false`) always issue their own call.

mod builder;

pub use builder::{DEFAULT_REQUEST_TIMEOUT, FetchOrchestratorBuilder, is_usable_api_key};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheKey, Payload, ResponseCache, generate_key};
use crate::error::{ErrorKind, FetchError, classify};
use crate::telemetry;
use crate::throttle::RequestThrottle;
use crate::transport::{RawResponse, Transport};

/// Classified failure handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl RequestFailure {
    /// Classify `error` and attach the user-facing message for its kind.
    ///
    /// An empty response keeps its own "empty response" message.
    pub fn from_error(error: &FetchError) -> Self {
        let kind = classify(error);
        let message = match error {
            FetchError::EmptyResponse => error.to_string(),
            _ => kind.message().to_string(),
        };
        Self { kind, message }
    }
}

/// Result of [`FetchOrchestrator::request`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(Payload),
    Failure(RequestFailure),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            RequestOutcome::Success(payload) => Some(payload),
            RequestOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RequestFailure> {
        match self {
            RequestOutcome::Success(_) => None,
            RequestOutcome::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> std::result::Result<Payload, RequestFailure> {
        match self {
            RequestOutcome::Success(payload) => Ok(payload),
            RequestOutcome::Failure(failure) => Err(failure),
        }
    }
}

type SharedOutcome = Shared<BoxFuture<'static, RequestOutcome>>;

/// Cache-aware, throttled, timeout-bounded request pipeline.
///
/// Cheap to clone; clones share the cache, throttle, and in-flight map.
#[derive(Clone)]
pub struct FetchOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
    throttle: Arc<RequestThrottle>,
    request_timeout: Duration,
    headers: Vec<(&'static str, String)>,
    coalesce: bool,
    in_flight: Mutex<HashMap<CacheKey, SharedOutcome>>,
}

impl FetchOrchestrator {
    /// Create a new builder for configuring the orchestrator.
    pub fn builder() -> FetchOrchestratorBuilder {
        FetchOrchestratorBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        cache: Arc<ResponseCache>,
        throttle: Arc<RequestThrottle>,
        request_timeout: Duration,
        headers: Vec<(&'static str, String)>,
        coalesce: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cache,
                throttle,
                request_timeout,
                headers,
                coalesce,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Shared response cache.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.inner.cache
    }

    /// Shared request throttle.
    pub fn throttle(&self) -> &Arc<RequestThrottle> {
        &self.inner.throttle
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    /// Headers attached to every outbound call.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.headers.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Fetch `url`, consulting and populating the response cache when
    /// `use_cache` is set.
    ///
    /// `operation` labels the call in logs and metrics (e.g. "markets").
    pub async fn request(&self, url: &str, operation: &str, use_cache: bool) -> RequestOutcome {
        if !use_cache {
            return Arc::clone(&self.inner)
                .execute(url.to_owned(), operation.to_owned(), None)
                .await;
        }

        let key = generate_key(url, &[]);
        if let Some(payload) = self.inner.cache.get(&key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => operation.to_owned())
                .increment(1);
            debug!(operation, key = %key, "cache hit");
            return RequestOutcome::Success(payload);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => operation.to_owned())
            .increment(1);
        debug!(operation, key = %key, "cache miss");

        if !self.inner.coalesce {
            return Arc::clone(&self.inner)
                .execute(url.to_owned(), operation.to_owned(), Some(key))
                .await;
        }
        self.coalesced(url, operation, key).await
    }

    /// [`request`](Self::request) with the cache bypassed: always hits the
    /// network and never writes the result back.
    pub async fn request_fresh(&self, url: &str, operation: &str) -> RequestOutcome {
        self.request(url, operation, false).await
    }

    /// Number of distinct requests currently on the wire through the
    /// coalescing path.
    pub fn in_flight(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn coalesced(&self, url: &str, operation: &str, key: CacheKey) -> RequestOutcome {
        let shared = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&key) {
                Some(existing) => {
                    metrics::counter!(telemetry::COALESCED_TOTAL, "operation" => operation.to_owned())
                        .increment(1);
                    debug!(operation, key = %key, "joining in-flight request");
                    existing.clone()
                }
                None => {
                    let fut = Arc::clone(&self.inner)
                        .execute(url.to_owned(), operation.to_owned(), Some(key.clone()))
                        .boxed()
                        .shared();
                    in_flight.insert(key.clone(), fut.clone());
                    fut
                }
            }
        };

        let mut waiter = Waiter {
            inner: &self.inner,
            key,
            shared,
        };
        (&mut waiter.shared).await
    }
}

/// One caller's stake in a coalesced request. Dropping the last one removes
/// the in-flight entry, cancelling the call if it has not finished.
struct Waiter<'a> {
    inner: &'a Inner,
    key: CacheKey,
    shared: SharedOutcome,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(current) = in_flight.get(&self.key) else {
            return;
        };
        if !current.ptr_eq(&self.shared) {
            return;
        }
        // The map and this waiter hold two handles; more means others wait.
        if self.shared.strong_count().is_none_or(|count| count <= 2) {
            in_flight.remove(&self.key);
        }
    }
}

impl Inner {
    /// Throttle, call, validate, populate. `key` is `Some` when the result
    /// should be cached.
    async fn execute(
        self: Arc<Self>,
        url: String,
        operation: String,
        key: Option<CacheKey>,
    ) -> RequestOutcome {
        self.throttle.await_turn().await;

        let start = Instant::now();
        let result = self.call(&url).await;
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => operation.clone())
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(payload) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "operation" => operation.clone(),
                    "status" => "ok",
                )
                .increment(1);
                if let Some(key) = key {
                    self.cache.set(key, Arc::clone(&payload));
                }
                RequestOutcome::Success(payload)
            }
            Err(error) => {
                let failure = RequestFailure::from_error(&error);
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "operation" => operation.clone(),
                    "status" => failure.kind.as_str(),
                )
                .increment(1);
                warn!(
                    operation = %operation,
                    kind = %failure.kind,
                    error = %error,
                    "request failed"
                );
                RequestOutcome::Failure(failure)
            }
        }
    }

    /// One transport call under the request deadline. Dropping the transport
    /// future on expiry cancels the call.
    async fn call(&self, url: &str) -> crate::Result<Payload> {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();

        let response = tokio::time::timeout(
            self.request_timeout,
            self.transport.get(url, &headers),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.request_timeout))??;

        validate(response)
    }
}

/// Turn a raw response into a payload or a structured error.
fn validate(response: RawResponse) -> crate::Result<Payload> {
    if !response.is_success() {
        return Err(FetchError::status(
            response.status,
            body_error_message(&response.body),
        ));
    }

    if response.body.trim().is_empty() {
        return Err(FetchError::EmptyResponse);
    }
    let value: serde_json::Value = serde_json::from_str(&response.body)?;
    if value.is_null() {
        return Err(FetchError::EmptyResponse);
    }
    Ok(Arc::new(value))
}

/// Extract a human-readable message from an error body.
///
/// Understands `{"error": "..."}`, `{"error_message": "..."}`,
/// `{"message": "..."}` and CoinGecko's
/// `{"status": {"error_code": 429, "error_message": "..."}}`.
fn body_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.get("error"),
        value.get("error_message"),
        value.get("message"),
        value.get("status").and_then(|s| s.get("error_message")),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_json_object() {
        let payload = validate(RawResponse::new(200, r#"{"prices":[]}"#)).unwrap();
        assert_eq!(*payload, serde_json::json!({ "prices": [] }));
    }

    #[test]
    fn validate_rejects_blank_and_null_bodies() {
        assert_eq!(
            validate(RawResponse::new(200, "  ")).unwrap_err(),
            FetchError::EmptyResponse
        );
        assert_eq!(
            validate(RawResponse::new(200, "null")).unwrap_err(),
            FetchError::EmptyResponse
        );
    }

    #[test]
    fn validate_rejects_malformed_json() {
        assert!(matches!(
            validate(RawResponse::new(200, "<html>")).unwrap_err(),
            FetchError::Decode(_)
        ));
    }

    #[test]
    fn validate_carries_status_and_body_message() {
        let err = validate(RawResponse::new(404, r#"{"error":"coin not found"}"#)).unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 404,
                message: "coin not found".into()
            }
        );
    }

    #[test]
    fn coingecko_status_envelope_message() {
        let body = r#"{"status":{"error_code":429,"error_message":"You've exceeded the Rate Limit."}}"#;
        assert_eq!(
            body_error_message(body).as_deref(),
            Some("You've exceeded the Rate Limit.")
        );
    }

    #[test]
    fn unparseable_error_body_has_no_message() {
        assert_eq!(body_error_message("Bad Gateway"), None);
        assert_eq!(body_error_message(r#"{"error":""}"#), None);
    }

    #[test]
    fn empty_response_failure_keeps_its_message() {
        let failure = RequestFailure::from_error(&FetchError::EmptyResponse);
        assert_eq!(failure.kind, ErrorKind::Unknown);
        assert_eq!(failure.message, "empty response");
    }

    #[test]
    fn classified_failure_uses_fixed_message() {
        let failure = RequestFailure::from_error(&FetchError::status(429, None));
        assert_eq!(failure.kind, ErrorKind::RateLimited);
        assert_eq!(failure.message, ErrorKind::RateLimited.message());
    }
}
