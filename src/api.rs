//! CoinGecko v3 endpoints.
//!
//! [`Endpoints`] builds request URLs against a configurable base;
//! [`CoinGeckoClient`] routes them through a [`FetchOrchestrator`] so every
//! endpoint gets caching, throttling and failure classification.
//! See: <https://docs.coingecko.com/v3.0.1/reference/introduction>

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::fetch::{FetchOrchestrator, RequestOutcome};
use crate::series::SourceInterval;
use crate::{FetchError, Result};

/// Default base URL for the public CoinGecko API
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Quote currencies offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Inr];

    /// Code used in `vs_currency` query parameters.
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Inr => "inr",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Inr => "₹",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| FetchError::Configuration(format!("unsupported currency '{s}'")))
    }
}

/// URL builder for the endpoints the dashboard uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn markets(&self, currency: Currency) -> String {
        format!("{}/coins/markets?vs_currency={}", self.base_url, currency.code())
    }

    pub fn coin_details(&self, coin_id: &str) -> String {
        format!("{}/coins/{}", self.base_url, encode(coin_id))
    }

    pub fn market_chart(
        &self,
        coin_id: &str,
        currency: Currency,
        days: u32,
        interval: SourceInterval,
    ) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={days}&interval={interval}",
            self.base_url,
            encode(coin_id),
            currency.code(),
        )
    }

    pub fn trending(&self) -> String {
        format!("{}/search/trending", self.base_url)
    }

    pub fn global(&self) -> String {
        format!("{}/global", self.base_url)
    }

    pub fn search(&self, query: &str) -> String {
        format!("{}/search?query={}", self.base_url, encode(query.trim()))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn encode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// One row of the markets listing. Fields the dashboard does not need are
/// ignored; fields upstream may null out are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Decode a payload into a typed shape.
pub fn decode<T: DeserializeOwned>(payload: &serde_json::Value) -> Result<T> {
    Ok(T::deserialize(payload)?)
}

/// Typed entry points over the orchestrator.
#[derive(Clone)]
pub struct CoinGeckoClient {
    orchestrator: FetchOrchestrator,
    endpoints: Endpoints,
}

impl CoinGeckoClient {
    pub fn new(orchestrator: FetchOrchestrator, endpoints: Endpoints) -> Self {
        Self {
            orchestrator,
            endpoints,
        }
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Market listing in `currency`.
    pub async fn markets(&self, currency: Currency) -> RequestOutcome {
        self.orchestrator
            .request(&self.endpoints.markets(currency), "fetching all coins", true)
            .await
    }

    /// Market listing bypassing the response cache.
    pub async fn markets_fresh(&self, currency: Currency) -> RequestOutcome {
        self.orchestrator
            .request_fresh(&self.endpoints.markets(currency), "fetching all coins")
            .await
    }

    pub async fn coin_details(&self, coin_id: &str) -> RequestOutcome {
        self.orchestrator
            .request(&self.endpoints.coin_details(coin_id), "fetching coin details", true)
            .await
    }

    pub async fn market_chart(
        &self,
        coin_id: &str,
        currency: Currency,
        days: u32,
        interval: SourceInterval,
    ) -> RequestOutcome {
        let url = self
            .endpoints
            .market_chart(coin_id, currency, days, interval);
        self.orchestrator
            .request(&url, "fetching market chart", true)
            .await
    }

    pub async fn trending(&self) -> RequestOutcome {
        self.orchestrator
            .request(&self.endpoints.trending(), "fetching trending coins", true)
            .await
    }

    pub async fn global(&self) -> RequestOutcome {
        self.orchestrator
            .request(&self.endpoints.global(), "fetching global data", true)
            .await
    }

    pub async fn search(&self, query: &str) -> RequestOutcome {
        self.orchestrator
            .request(&self.endpoints.search(query), "searching coins", true)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls() {
        let endpoints = Endpoints::new("https://example.test/api/v3/");
        assert_eq!(
            endpoints.markets(Currency::Eur),
            "https://example.test/api/v3/coins/markets?vs_currency=eur"
        );
        assert_eq!(
            endpoints.market_chart("bitcoin", Currency::Usd, 365, SourceInterval::Daily),
            "https://example.test/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=365&interval=daily"
        );
        assert_eq!(
            endpoints.coin_details("wrapped-bitcoin"),
            "https://example.test/api/v3/coins/wrapped-bitcoin"
        );
        assert_eq!(endpoints.global(), "https://example.test/api/v3/global");
        assert_eq!(
            endpoints.trending(),
            "https://example.test/api/v3/search/trending"
        );
    }

    #[test]
    fn search_query_is_encoded() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.search("shiba inu&x"),
            "https://api.coingecko.com/api/v3/search?query=shiba+inu%26x"
        );
    }

    #[test]
    fn currency_parsing_and_symbols() {
        assert_eq!("INR".parse::<Currency>().unwrap(), Currency::Inr);
        assert_eq!(Currency::Eur.symbol(), "€");
        assert!("gbp".parse::<Currency>().is_err());
    }

    #[test]
    fn decode_market_rows_with_nulls() {
        let payload = serde_json::json!([{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 64000.5,
            "market_cap_rank": 1,
            "price_change_percentage_24h": null,
            "ath": 73000.0
        }]);
        let rows: Vec<CoinMarket> = decode(&payload).unwrap();
        assert_eq!(rows[0].id, "bitcoin");
        assert_eq!(rows[0].current_price, Some(64000.5));
        assert_eq!(rows[0].price_change_percentage_24h, None);
        assert_eq!(rows[0].image, None);
    }
}
