//! Chart period resolution.
//!
//! Maps the dashboard's range selectors ("1H", "7D", "1Y", ...) to the
//! upstream market-chart query and to the post-processing that turns the
//! upstream series into what the chart shows:
//!
//! | Selector | Days | Interval | Post-processing       | Granularity |
//! |----------|------|----------|-----------------------|-------------|
//! | 1H       | 1    | hourly   | synthesize 60 minutes | minute      |
//! | 4H       | 1    | hourly   | synthesize 4 hours    | hour        |
//! | 1D       | 1    | hourly   | synthesize 24 hours   | hour        |
//! | 7D       | 7    | hourly   | every 4th point       | day         |
//! | 30D      | 30   | daily    | none                  | day         |
//! | 1Y       | 365  | daily    | every 7th point       | month       |
//!
//! Anything else resolves to seven days of daily points, unprocessed.
//!
//! Coarsening uses stride sampling (keep every Kth point, original
//! timestamps intact), never averaging.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::synth::{synthesize_hours, synthesize_minutes};
use super::{PricePoint, Series, TimeFormat};

/// Upstream sampling interval for the market-chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceInterval {
    Minutely,
    Hourly,
    Daily,
}

impl SourceInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceInterval::Minutely => "minutely",
            SourceInterval::Hourly => "hourly",
            SourceInterval::Daily => "daily",
        }
    }
}

impl fmt::Display for SourceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A supported chart range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    OneHour,
    FourHours,
    OneDay,
    SevenDays,
    ThirtyDays,
    OneYear,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::OneHour,
        Period::FourHours,
        Period::OneDay,
        Period::SevenDays,
        Period::ThirtyDays,
        Period::OneYear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneHour => "1H",
            Period::FourHours => "4H",
            Period::OneDay => "1D",
            Period::SevenDays => "7D",
            Period::ThirtyDays => "30D",
            Period::OneYear => "1Y",
        }
    }

    /// The fixed fetch plan for this period.
    pub fn plan(self) -> FetchPlan {
        use PostProcess::*;
        use SourceInterval::*;

        let (span_days, source_interval, target, post) = match self {
            Period::OneHour => (1, Hourly, TimeFormat::Minute, SynthesizeMinutes { minutes: 60 }),
            Period::FourHours => (1, Hourly, TimeFormat::Hour, SynthesizeHours { hours: 4 }),
            Period::OneDay => (1, Hourly, TimeFormat::Hour, SynthesizeHours { hours: 24 }),
            Period::SevenDays => (7, Hourly, TimeFormat::Day, Stride(4)),
            Period::ThirtyDays => (30, Daily, TimeFormat::Day, PassThrough),
            Period::OneYear => (365, Daily, TimeFormat::Month, Stride(7)),
        };
        FetchPlan {
            spec: PeriodSpec {
                span_days,
                source_interval,
                target,
            },
            post,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    /// Exact match on the selector label ("1H", "7D", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown period '{s}'"))
    }
}

/// Upstream query parameters and display granularity for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSpec {
    pub span_days: u32,
    pub source_interval: SourceInterval,
    pub target: TimeFormat,
}

/// Transformation applied to the fetched series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Upstream resolution already matches.
    PassThrough,
    /// Finer than upstream: synthesize minute points.
    SynthesizeMinutes { minutes: u32 },
    /// Finer than upstream: synthesize hour points.
    SynthesizeHours { hours: u32 },
    /// Coarser than upstream: keep every Kth point.
    Stride(usize),
}

impl PostProcess {
    /// Run this step over `series`. `now_ms` anchors synthesized series.
    pub fn apply<R: Rng>(&self, series: Series, now_ms: i64, rng: &mut R) -> Series {
        match *self {
            PostProcess::PassThrough => series,
            PostProcess::SynthesizeMinutes { minutes } => {
                synthesize_minutes(&series, minutes, now_ms, rng)
            }
            PostProcess::SynthesizeHours { hours } => synthesize_hours(&series, hours, now_ms, rng),
            PostProcess::Stride(k) => stride_sample(&series, k),
        }
    }
}

/// What to fetch and how to shape it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub spec: PeriodSpec,
    pub post: PostProcess,
}

impl FetchPlan {
    /// Plan for selectors that match no [`Period`]: seven days of daily
    /// points, passed through.
    pub fn fallback() -> Self {
        FetchPlan {
            spec: PeriodSpec {
                span_days: 7,
                source_interval: SourceInterval::Daily,
                target: TimeFormat::Day,
            },
            post: PostProcess::PassThrough,
        }
    }
}

/// Resolve a user-facing selector to its fetch plan.
pub fn resolve(selector: &str) -> FetchPlan {
    selector
        .parse::<Period>()
        .map(Period::plan)
        .unwrap_or_else(|_| FetchPlan::fallback())
}

/// Keep the points at indices `0, k, 2k, ...`. A stride of 0 or 1 keeps
/// everything.
pub fn stride_sample(series: &[PricePoint], k: usize) -> Series {
    series.iter().step_by(k.max(1)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parsing_is_exact() {
        assert_eq!("1Y".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!("30D".parse::<Period>().unwrap(), Period::ThirtyDays);
        assert!("30d".parse::<Period>().is_err());
        assert!(" 1Y".parse::<Period>().is_err());
        assert!("2W".parse::<Period>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for period in Period::ALL {
            assert_eq!(period.to_string().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn stride_zero_keeps_everything() {
        let series: Series = (0..5).map(|i| PricePoint::new(i, 1.0)).collect();
        assert_eq!(stride_sample(&series, 0), series);
        assert_eq!(stride_sample(&series, 1), series);
    }

    #[test]
    fn stride_keeps_first_point() {
        let series: Series = (0..10).map(|i| PricePoint::new(i, i as f64)).collect();
        let sampled = stride_sample(&series, 4);
        let stamps: Vec<i64> = sampled.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![0, 4, 8]);
    }
}
