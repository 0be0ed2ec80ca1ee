//! Price series types and shaping.
//!
//! A [`Series`] is a `Vec<PricePoint>` in ascending timestamp order. Every
//! constructor in this module preserves that ordering, and downstream
//! consumers (chart rendering, sub-sampling) rely on it.
//!
//! - [`synth`]: synthetic fine-grained series from coarse anchors
//! - [`period`]: selector → upstream query + post-processing plan

pub mod period;
pub mod synth;

pub use period::{
    FetchPlan, Period, PeriodSpec, PostProcess, SourceInterval, resolve, stride_sample,
};
pub use synth::{synthesize_hours, synthesize_minutes};

use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// One observation: Unix timestamp in milliseconds and a non-negative price.
///
/// Serializes as the upstream `[timestamp, price]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, f64)", into = "(i64, f64)")]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }
}

impl From<(i64, f64)> for PricePoint {
    fn from((timestamp, price): (i64, f64)) -> Self {
        Self { timestamp, price }
    }
}

impl From<PricePoint> for (i64, f64) {
    fn from(point: PricePoint) -> Self {
        (point.timestamp, point.price)
    }
}

/// Price points in ascending timestamp order.
pub type Series = Vec<PricePoint>;

/// Extract the `prices` series from a market-chart payload.
///
/// Malformed pairs, negative and non-finite prices are skipped, and the
/// result is sorted by timestamp. A payload without a `prices` array
/// yields an empty series.
pub fn prices_from_payload(payload: &serde_json::Value) -> Series {
    let Some(raw) = payload.get("prices").and_then(|p| p.as_array()) else {
        return Vec::new();
    };

    let mut series: Series = raw
        .iter()
        .filter_map(|pair| {
            let pair = pair.as_array()?;
            let timestamp = pair.first()?.as_f64()?;
            let price = pair.get(1)?.as_f64()?;
            (timestamp.is_finite() && price.is_finite() && price >= 0.0)
                .then(|| PricePoint::new(timestamp as i64, price))
        })
        .collect();
    series.sort_by_key(|p| p.timestamp);
    series
}

/// Display granularity of a series; drives axis label formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    Minute,
    Hour,
    Day,
    Month,
}

impl TimeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFormat::Minute => "minute",
            TimeFormat::Hour => "hour",
            TimeFormat::Day => "day",
            TimeFormat::Month => "month",
        }
    }

    /// strftime pattern for axis labels at this granularity.
    pub fn pattern(self) -> &'static str {
        match self {
            TimeFormat::Minute => "%H:%M",
            TimeFormat::Hour => "%b %-d, %H:%M",
            TimeFormat::Day => "%b %-d",
            TimeFormat::Month => "%b %Y",
        }
    }

    /// Axis label for `timestamp` (millis) in the local timezone.
    pub fn label(self, timestamp: i64) -> String {
        self.label_in(timestamp, &Local)
    }

    /// Axis label for `timestamp` (millis) in `tz`.
    ///
    /// Out-of-range timestamps render as an empty string.
    pub fn label_in<Tz: TimeZone>(self, timestamp: i64, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        DateTime::from_timestamp_millis(timestamp)
            .map(|dt| dt.with_timezone(tz).format(self.pattern()).to_string())
            .unwrap_or_default()
    }

    /// Human description of a series of `len` points at this granularity.
    pub fn dimension(self, len: usize) -> TimeDimension {
        match self {
            TimeFormat::Minute => TimeDimension {
                unit: "minutes",
                interval: "1 min",
                total: format!("{len} minutes"),
                description: "Last hour with 1-minute intervals",
            },
            TimeFormat::Hour => TimeDimension {
                unit: "hours",
                interval: "1 hour",
                total: format!("{len} hours"),
                description: "Hourly price movements",
            },
            TimeFormat::Day => TimeDimension {
                unit: "days",
                interval: "1 day",
                total: format!("{len} days"),
                description: "Daily price movements",
            },
            TimeFormat::Month => TimeDimension {
                unit: "months",
                interval: "1 week",
                total: format!("{} weeks", (len as f64 / 4.0).round() as usize),
                description: "Weekly price averages",
            },
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a chart's time axis, for captions and legends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeDimension {
    pub unit: &'static str,
    pub interval: &'static str,
    pub total: String,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // 2024-03-05T14:07:00Z
    const TS: i64 = 1_709_647_620_000;

    #[test]
    fn labels_per_granularity() {
        assert_eq!(TimeFormat::Minute.label_in(TS, &Utc), "14:07");
        assert_eq!(TimeFormat::Hour.label_in(TS, &Utc), "Mar 5, 14:07");
        assert_eq!(TimeFormat::Day.label_in(TS, &Utc), "Mar 5");
        assert_eq!(TimeFormat::Month.label_in(TS, &Utc), "Mar 2024");
    }

    #[test]
    fn out_of_range_label_is_empty() {
        assert_eq!(TimeFormat::Day.label_in(i64::MAX, &Utc), "");
    }

    #[test]
    fn month_dimension_counts_weeks() {
        let dim = TimeFormat::Month.dimension(53);
        assert_eq!(dim.total, "13 weeks");
        assert_eq!(dim.interval, "1 week");
    }

    #[test]
    fn price_point_serializes_as_pair() {
        let json = serde_json::to_string(&PricePoint::new(1000, 10.5)).unwrap();
        assert_eq!(json, "[1000,10.5]");
        let back: PricePoint = serde_json::from_str("[2000, 3]").unwrap();
        assert_eq!(back, PricePoint::new(2000, 3.0));
    }

    #[test]
    fn payload_prices_are_cleaned_and_sorted() {
        let payload = serde_json::json!({
            "prices": [[3000, 3.0], [1000, 1.0], ["bad", 2.0], [2000, -1.0], [4000], [2500, 2.5]]
        });
        let series = prices_from_payload(&payload);
        let stamps: Vec<i64> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![1000, 2500, 3000]);
    }

    #[test]
    fn payload_without_prices_is_empty() {
        assert!(prices_from_payload(&serde_json::json!({ "error": "x" })).is_empty());
    }
}
