//! Coinwatch error types and failure classification.
//!
//! [`FetchError`] is the one structured error shape every fetch failure is
//! converted into, whether it came from the transport, the HTTP status line,
//! or body decoding. [`classify`] maps it onto the small user-facing
//! [`ErrorKind`] taxonomy; each kind carries one fixed display message.

use std::fmt;
use std::time::Duration;

/// Coinwatch error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    // Timing errors
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The transport gave up on its own (connect or read limit).
    #[error("transport timed out: {0}")]
    TransportTimeout(String),

    #[error("request cancelled")]
    Cancelled,

    // HTTP errors
    #[error("HTTP error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Failure below HTTP: DNS, refused connection, reset, TLS.
    #[error("transport error: {0}")]
    Transport(String),

    // Data errors
    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("empty response")]
    EmptyResponse,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    /// Status-line error with the message parsed from the body, if any.
    pub fn status(status: u16, message: Option<String>) -> Self {
        FetchError::Status {
            status,
            message: message.unwrap_or_else(|| format!("HTTP error! status: {status}")),
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Result type alias for coinwatch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// User-facing failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    RateLimited,
    AuthDenied,
    NotFound,
    ServerError,
    BadRequest,
    Unknown,
}

impl ErrorKind {
    /// All kinds, in classification precedence order.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::Timeout,
        ErrorKind::RateLimited,
        ErrorKind::AuthDenied,
        ErrorKind::NotFound,
        ErrorKind::ServerError,
        ErrorKind::BadRequest,
        ErrorKind::Network,
        ErrorKind::Unknown,
    ];

    /// Fixed message shown to the user for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Network => "Network error. Please check your internet connection.",
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::RateLimited => "Rate limit exceeded. Please try again later.",
            ErrorKind::AuthDenied => "Access denied. Please check your API key.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::ServerError => "Server error. Please try again later.",
            ErrorKind::BadRequest => "The request was rejected by the server.",
            ErrorKind::Unknown => "Something went wrong. Please try again.",
        }
    }

    /// Short label used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::AuthDenied => "auth_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ServerError => "server_error",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a fetch failure onto its user-facing category.
///
/// First match wins: cancellation and timeout, then 429, 401/403, 404,
/// 5xx, remaining 4xx, status-less transport failures, and finally
/// everything else.
pub fn classify(error: &FetchError) -> ErrorKind {
    match error {
        FetchError::Timeout(_) | FetchError::TransportTimeout(_) | FetchError::Cancelled => {
            ErrorKind::Timeout
        }
        FetchError::Status { status, .. } => match *status {
            429 => ErrorKind::RateLimited,
            401 | 403 => ErrorKind::AuthDenied,
            404 => ErrorKind::NotFound,
            s if s >= 500 => ErrorKind::ServerError,
            400..=499 => ErrorKind::BadRequest,
            _ => ErrorKind::Unknown,
        },
        FetchError::Transport(_) => ErrorKind::Network,
        FetchError::Decode(_) | FetchError::EmptyResponse | FetchError::Configuration(_) => {
            ErrorKind::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_without_body_message_gets_generic_text() {
        let err = FetchError::status(418, None);
        assert_eq!(err.to_string(), "HTTP error (418): HTTP error! status: 418");
        assert_eq!(err.http_status(), Some(418));
    }

    #[test]
    fn non_status_errors_have_no_http_status() {
        assert_eq!(FetchError::Transport("refused".into()).http_status(), None);
        assert_eq!(FetchError::EmptyResponse.http_status(), None);
    }

    #[test]
    fn redirect_status_is_unknown() {
        assert_eq!(classify(&FetchError::status(304, None)), ErrorKind::Unknown);
    }

    #[test]
    fn messages_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in ErrorKind::ALL {
            assert!(seen.insert(kind.message()), "duplicate message for {kind}");
        }
    }

    #[test]
    fn serde_json_error_becomes_decode() {
        let err: FetchError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
