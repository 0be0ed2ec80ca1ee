//! HTTP transport seam.
//!
//! The orchestrator never talks to reqwest directly. It issues GETs through
//! the [`Transport`] trait, which keeps the fetch pipeline testable with
//! scripted transports and lets the timeout/cancellation policy live in one
//! place: the orchestrator drops the transport future when its deadline
//! passes, which aborts the in-flight request.
//!
//! [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{FetchError, Result};

/// Connection establishment limit for [`ReqwestTransport`]. The overall
/// request deadline is enforced by the orchestrator.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status line and body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET-only HTTP collaborator.
///
/// Implementations return `Ok` for any response that carries a status line,
/// including 4xx/5xx. `Err` is reserved for failures below HTTP, reported
/// as [`FetchError::Transport`] (or [`FetchError::TransportTimeout`] when
/// the transport itself gave up).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    /// Issue a GET request with the given headers.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport with default connection settings.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| FetchError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wrap an existing client.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(RawResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::TransportTimeout(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}
