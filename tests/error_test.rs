use std::time::Duration;

use coinwatch::{ErrorKind, FetchError, RequestFailure, Result, classify};

#[test]
fn test_error_display() {
    let err = FetchError::status(404, Some("coin not found".to_string()));
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("coin not found"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(FetchError::EmptyResponse)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn status_classification() {
    let cases = [
        (429, ErrorKind::RateLimited),
        (401, ErrorKind::AuthDenied),
        (403, ErrorKind::AuthDenied),
        (404, ErrorKind::NotFound),
        (500, ErrorKind::ServerError),
        (502, ErrorKind::ServerError),
        (503, ErrorKind::ServerError),
        (400, ErrorKind::BadRequest),
        (422, ErrorKind::BadRequest),
    ];
    for (status, expected) in cases {
        assert_eq!(
            classify(&FetchError::status(status, None)),
            expected,
            "status {status}"
        );
    }
}

#[test]
fn status_classification_ignores_body_message() {
    let err = FetchError::status(429, Some("You've exceeded the Rate Limit.".to_string()));
    assert_eq!(classify(&err), ErrorKind::RateLimited);
}

#[test]
fn non_status_classification() {
    assert_eq!(
        classify(&FetchError::Timeout(Duration::from_secs(15))),
        ErrorKind::Timeout
    );
    assert_eq!(classify(&FetchError::Cancelled), ErrorKind::Timeout);
    assert_eq!(
        classify(&FetchError::TransportTimeout("operation timed out".into())),
        ErrorKind::Timeout
    );
    assert_eq!(
        classify(&FetchError::Transport("connection refused".into())),
        ErrorKind::Network
    );
    assert_eq!(
        classify(&FetchError::Decode("expected value".into())),
        ErrorKind::Unknown
    );
    assert_eq!(classify(&FetchError::EmptyResponse), ErrorKind::Unknown);
    assert_eq!(
        classify(&FetchError::Configuration("bad url".into())),
        ErrorKind::Unknown
    );
}

#[test]
fn every_failure_gets_a_message() {
    let errors = [
        FetchError::Timeout(Duration::from_secs(1)),
        FetchError::Cancelled,
        FetchError::TransportTimeout("connect".into()),
        FetchError::status(429, None),
        FetchError::status(401, None),
        FetchError::status(404, None),
        FetchError::status(503, None),
        FetchError::status(400, None),
        FetchError::Transport("reset".into()),
        FetchError::Decode("eof".into()),
        FetchError::EmptyResponse,
    ];
    for error in &errors {
        let failure = RequestFailure::from_error(error);
        assert!(!failure.message.is_empty(), "{error} has no message");
        assert_eq!(failure.kind, classify(error));
    }
}

#[test]
fn fixed_messages() {
    assert_eq!(
        ErrorKind::RateLimited.message(),
        "Rate limit exceeded. Please try again later."
    );
    assert_eq!(
        ErrorKind::Network.message(),
        "Network error. Please check your internet connection."
    );
    assert_eq!(
        ErrorKind::ServerError.message(),
        "Server error. Please try again later."
    );
}

#[test]
fn kind_serializes_as_snake_case() {
    let json = serde_json::to_string(&ErrorKind::RateLimited).unwrap();
    assert_eq!(json, "\"rate_limited\"");
    assert_eq!(ErrorKind::AuthDenied.to_string(), "auth_denied");
}
