//! Tests for config file loading.

use std::io::Write;
use std::time::Duration;

use coinwatch::{Config, Currency, FetchError};

#[test]
fn load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[api]
base_url = "http://localhost:8080/api/v3"

[fetch]
request_timeout_secs = 3
min_request_interval_ms = 500

[refresh]
interval_ms = 60000
currency = "eur"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:8080/api/v3");
    assert_eq!(config.request_timeout(), Duration::from_secs(3));
    assert_eq!(config.min_request_interval(), Duration::from_millis(500));
    assert_eq!(config.refresh_interval(), Duration::from_secs(60));
    assert_eq!(config.refresh.currency, Currency::Eur);
    assert!(config.fetch.coalesce_in_flight);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        Config::load(Some(&missing)),
        Err(FetchError::Configuration(msg)) if msg.contains("not found")
    ));
}

#[test]
fn malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[fetch]\nrequest_timeout_secs = \"soon\"").unwrap();

    assert!(matches!(
        Config::from_file(file.path()),
        Err(FetchError::Configuration(msg)) if msg.contains("parse")
    ));
}

#[test]
fn empty_file_gives_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.api.base_url, "https://api.coingecko.com/api/v3");
    assert_eq!(config.refresh_interval(), Duration::from_secs(10));
}

#[tokio::test]
async fn config_builds_a_client() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[api]\nbase_url = \"http://localhost:9/api/v3/\"\napi_key = \"CG-file\"\n\n[fetch]\ncoalesce_in_flight = false"
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    let client = config.client().unwrap();
    assert_eq!(client.endpoints().base_url(), "http://localhost:9/api/v3");
    assert!(
        client
            .orchestrator()
            .headers()
            .any(|(k, v)| k == "x-cg-demo-api-key" && v == "CG-file")
    );
    assert_eq!(client.orchestrator().request_timeout(), Duration::from_secs(15));
}
