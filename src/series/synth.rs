//! Synthetic high-resolution series.
//!
//! When the upstream API can only serve a coarse series (hourly points for
//! a one-hour view, say), these functions fabricate a denser one that
//! keeps visual continuity with the real data: a straight line between the
//! last two coarse prices, perturbed by bounded uniform noise. This is a
//! rendering aid, not a forecast.
//!
//! Randomness comes from the caller's [`Rng`], so a seeded generator gives
//! reproducible output.

use std::f64::consts::PI;

use chrono::{DateTime, Local, TimeZone, Timelike};
use rand::Rng;

use super::{PricePoint, Series};

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Full noise width for minute synthesis, as a fraction of the trend price
/// (±0.5%).
pub const MINUTE_VOLATILITY: f64 = 0.01;

/// Full noise width for hour synthesis (±2%).
pub const HOUR_VOLATILITY: f64 = 0.04;

/// Amplitude of the hour-of-day multiplier applied in hour synthesis.
pub const DIURNAL_AMPLITUDE: f64 = 0.02;

/// `minutes + 1` minute-spaced points ending at `now_ms`, interpolated
/// between the last two prices of `coarse`.
///
/// Returns an empty series if `coarse` has fewer than two points or
/// `minutes` is zero.
pub fn synthesize_minutes<R: Rng>(
    coarse: &[PricePoint],
    minutes: u32,
    now_ms: i64,
    rng: &mut R,
) -> Series {
    synthesize(coarse, minutes, MINUTE_MS, now_ms, rng, |base, noise, _| {
        base + noise * MINUTE_VOLATILITY * base
    })
}

/// `hours + 1` hour-spaced points ending at `now_ms`, interpolated between
/// the last two prices of `coarse`, with a diurnal cycle on top.
///
/// The cycle is `1 + 0.02 * sin(2π * hour / 24)` with `hour` the local
/// hour of day of each point, the same clock [`TimeFormat::label`] uses.
///
/// [`TimeFormat::label`]: super::TimeFormat::label
pub fn synthesize_hours<R: Rng>(
    coarse: &[PricePoint],
    hours: u32,
    now_ms: i64,
    rng: &mut R,
) -> Series {
    synthesize(coarse, hours, HOUR_MS, now_ms, rng, |base, noise, timestamp| {
        (base + noise * HOUR_VOLATILITY * base) * diurnal_factor(timestamp)
    })
}

/// Multiplier emulating intraday trading patterns, on the local clock.
pub fn diurnal_factor(timestamp: i64) -> f64 {
    diurnal_factor_in(timestamp, &Local)
}

/// [`diurnal_factor`] with the hour of day taken in `tz`.
pub fn diurnal_factor_in<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> f64 {
    let hour = DateTime::from_timestamp_millis(timestamp)
        .map(|dt| dt.with_timezone(tz).hour())
        .unwrap_or(0);
    1.0 + DIURNAL_AMPLITUDE * (f64::from(hour) / 24.0 * 2.0 * PI).sin()
}

/// Shared interpolation loop. `shape(base, noise, timestamp)` turns the
/// trend price and a noise sample in `[-0.5, 0.5)` into the point's price.
fn synthesize<R, F>(
    coarse: &[PricePoint],
    steps: u32,
    unit_ms: i64,
    now_ms: i64,
    rng: &mut R,
    shape: F,
) -> Series
where
    R: Rng,
    F: Fn(f64, f64, i64) -> f64,
{
    let [.., previous, latest] = coarse else {
        return Vec::new();
    };
    if steps == 0 {
        return Vec::new();
    }

    let n = f64::from(steps);
    (0..=steps)
        .rev()
        .map(|i| {
            let timestamp = now_ms - i64::from(i) * unit_ms;
            let progress = (n - f64::from(i)) / n;
            let base = previous.price + (latest.price - previous.price) * progress;
            let noise = rng.random::<f64>() - 0.5;
            PricePoint::new(timestamp, shape(base, noise, timestamp).max(0.0))
        })
        .collect()
}
