//! Coinwatch - cached, throttled CoinGecko fetching for a crypto dashboard
//!
//! Every upstream call goes through one [`FetchOrchestrator`], which layers
//! a TTL response cache, a process-wide request throttle, a per-call
//! timeout and failure classification over a pluggable [`Transport`].
//! Callers get a [`RequestOutcome`] back instead of an error, and decide
//! for themselves whether to retry.
//!
//! On top of that sit typed CoinGecko endpoints ([`CoinGeckoClient`]), the
//! chart service that maps range selectors like `"1H"` or `"1Y"` to shaped
//! price series ([`ChartService`]), and a background listing refresher.
//!
//! # Example
//!
//! ```rust,no_run
//! use coinwatch::{ChartService, Config, Currency};
//!
//! #[tokio::main]
//! async fn main() -> coinwatch::Result<()> {
//!     let config = Config::load(None)?;
//!     let charts = ChartService::new(config.client()?);
//!
//!     match charts.fetch_chart_data("bitcoin", Currency::Usd, "7D").await {
//!         Ok(chart) => {
//!             println!("{} points at {} granularity", chart.prices.len(), chart.time_format)
//!         }
//!         Err(failure) => eprintln!("{failure}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod refresh;
pub mod series;
pub mod telemetry;
pub mod throttle;
pub mod transport;
mod version;

// Re-export main types at crate root
pub use api::{CoinGeckoClient, CoinMarket, Currency, Endpoints};
pub use cache::{CacheKey, ResponseCache, generate_key};
pub use chart::{ChartData, ChartService};
pub use config::Config;
pub use error::{ErrorKind, FetchError, Result, classify};
pub use fetch::{FetchOrchestrator, FetchOrchestratorBuilder, RequestFailure, RequestOutcome};
pub use refresh::{RefreshConfig, RefreshHandle, RefreshMessage};
pub use series::{FetchPlan, Period, PricePoint, Series, TimeFormat, resolve};
pub use throttle::RequestThrottle;
pub use transport::{RawResponse, ReqwestTransport, Transport};
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, version_string};
