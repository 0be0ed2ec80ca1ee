//! Chart data service: period resolution, fetch, and series shaping.

use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::debug;

use crate::api::{CoinGeckoClient, Currency};
use crate::fetch::RequestFailure;
use crate::series::{Series, TimeDimension, TimeFormat, prices_from_payload, resolve};

/// A shaped series plus the granularity it should be labelled at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub prices: Series,
    pub time_format: TimeFormat,
}

impl ChartData {
    pub fn empty(time_format: TimeFormat) -> Self {
        Self {
            prices: Vec::new(),
            time_format,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Axis labels in the local timezone, one per point.
    pub fn labels(&self) -> Vec<String> {
        self.prices
            .iter()
            .map(|p| self.time_format.label(p.timestamp))
            .collect()
    }

    pub fn dimension(&self) -> TimeDimension {
        self.time_format.dimension(self.prices.len())
    }
}

/// Produces [`ChartData`] for a coin, currency and range selector.
pub struct ChartService {
    client: CoinGeckoClient,
    rng: Mutex<StdRng>,
}

impl ChartService {
    pub fn new(client: CoinGeckoClient) -> Self {
        Self::with_rng(client, StdRng::from_os_rng())
    }

    /// Deterministic synthesis for a given seed.
    pub fn seeded(client: CoinGeckoClient, seed: u64) -> Self {
        Self::with_rng(client, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(client: CoinGeckoClient, rng: StdRng) -> Self {
        Self {
            client,
            rng: Mutex::new(rng),
        }
    }

    pub fn client(&self) -> &CoinGeckoClient {
        &self.client
    }

    /// Fetch and shape chart data, anchoring synthesized series at the
    /// current wall-clock time.
    pub async fn fetch_chart_data(
        &self,
        coin_id: &str,
        currency: Currency,
        selector: &str,
    ) -> Result<ChartData, RequestFailure> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.fetch_chart_data_at(coin_id, currency, selector, now_ms)
            .await
    }

    /// As [`fetch_chart_data`](Self::fetch_chart_data), anchored at `now_ms`.
    ///
    /// A successful response without a usable `prices` array yields an
    /// empty series at day granularity.
    pub async fn fetch_chart_data_at(
        &self,
        coin_id: &str,
        currency: Currency,
        selector: &str,
        now_ms: i64,
    ) -> Result<ChartData, RequestFailure> {
        let plan = resolve(selector);
        let payload = self
            .client
            .market_chart(
                coin_id,
                currency,
                plan.spec.span_days,
                plan.spec.source_interval,
            )
            .await
            .into_result()?;

        let raw = prices_from_payload(&payload);
        if raw.is_empty() {
            debug!(coin_id, selector, "market chart has no prices");
            return Ok(ChartData::empty(TimeFormat::Day));
        }

        let fetched = raw.len();
        let prices = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            plan.post.apply(raw, now_ms, &mut *rng)
        };
        debug!(
            coin_id,
            selector,
            fetched,
            shaped = prices.len(),
            time_format = %plan.spec.target,
            "chart data ready"
        );

        Ok(ChartData {
            prices,
            time_format: plan.spec.target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;

    #[test]
    fn empty_chart_has_no_labels() {
        let data = ChartData::empty(TimeFormat::Day);
        assert!(data.is_empty());
        assert!(data.labels().is_empty());
        assert_eq!(data.dimension().total, "0 days");
    }

    #[test]
    fn serializes_prices_as_pairs() {
        let data = ChartData {
            prices: vec![PricePoint::new(1000, 2.5)],
            time_format: TimeFormat::Month,
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "prices": [[1000, 2.5]], "time_format": "month" })
        );
    }
}
