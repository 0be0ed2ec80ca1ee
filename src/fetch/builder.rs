//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use super::FetchOrchestrator;
use crate::Result;
use crate::cache::ResponseCache;
use crate::throttle::RequestThrottle;
use crate::transport::{ReqwestTransport, Transport};

/// Default deadline for a single upstream call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Header carrying the CoinGecko demo API key.
pub(crate) const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Values shipped in sample configs that must never be sent as a key.
const PLACEHOLDER_KEYS: &[&str] = &[
    "your_api_key",
    "your_api_key_here",
    "your-api-key",
    "your-api-key-here",
    "changeme",
];

/// Whether `key` looks like a real API key rather than an empty or
/// placeholder value.
pub fn is_usable_api_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty()
        && !PLACEHOLDER_KEYS
            .iter()
            .any(|placeholder| key.eq_ignore_ascii_case(placeholder))
}

/// Builder for [`FetchOrchestrator`].
///
/// Unset collaborators get fresh defaults: a reqwest transport, a cache
/// with the process-wide TTL, and a throttle with the default spacing.
/// Pass shared `Arc`s to make several orchestrators use one cache or one
/// throttle.
pub struct FetchOrchestratorBuilder {
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<ResponseCache>>,
    throttle: Option<Arc<RequestThrottle>>,
    request_timeout: Duration,
    api_key: Option<String>,
    coalesce: bool,
}

impl FetchOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            cache: None,
            throttle: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            api_key: None,
            coalesce: true,
        }
    }

    /// Use a specific transport (scripted transports in tests).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn throttle(mut self, throttle: Arc<RequestThrottle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Set the per-call deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Attach an API key. Empty and placeholder keys are ignored.
    pub fn api_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.api_key = key.map(Into::into);
        self
    }

    /// Enable or disable coalescing of concurrent identical requests.
    pub fn coalesce_in_flight(mut self, enabled: bool) -> Self {
        self.coalesce = enabled;
        self
    }

    /// Build the orchestrator.
    ///
    /// Fails only if no transport was given and the default HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<FetchOrchestrator> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let mut headers = vec![("accept", "application/json".to_string())];
        if let Some(key) = self.api_key.filter(|k| is_usable_api_key(k)) {
            headers.push((API_KEY_HEADER, key.trim().to_string()));
        }

        Ok(FetchOrchestrator::from_parts(
            transport,
            self.cache.unwrap_or_default(),
            self.throttle.unwrap_or_default(),
            self.request_timeout,
            headers,
            self.coalesce,
        ))
    }
}

impl Default for FetchOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
