//! Chart data pipeline: raw `/market_chart` series to aligned display points.

use chrono::{DateTime, TimeZone};
use gecko::MarketChart;
use serde::Serialize;

/// One aligned, display-ready sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// `HH:MM` label in the display time zone.
    pub time: String,
    pub timestamp_ms: i64,
    /// Price rounded to two decimals.
    pub price: f64,
    pub market_cap: f64,
    pub volume: f64,
}

/// Absolute and relative change between the first and last price sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceChange {
    pub absolute: f64,
    /// `None` when the opening price is zero.
    pub percent: Option<f64>,
}

/// Everything the detail view renders for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub points: Vec<ChartPoint>,
    pub live_price: f64,
    pub change: Option<PriceChange>,
}

impl ChartView {
    /// Shape a raw chart for display, falling back to `last_known` for the
    /// live price when the series is empty.
    pub fn from_chart<Tz>(chart: &MarketChart, last_known: f64, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            points: build_points(chart, tz),
            live_price: live_price(chart, last_known),
            change: change_24h(chart),
        }
    }

    /// The last `n` points, or all of them when `n` exceeds the series.
    pub fn tail(&self, n: usize) -> &[ChartPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }
}

/// One [`ChartPoint`] per price sample, in source order.
///
/// Market cap and volume are matched by index; a companion series that is
/// shorter than `prices` contributes `0.0` for the missing positions.
pub fn build_points<Tz>(chart: &MarketChart, tz: &Tz) -> Vec<ChartPoint>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    chart
        .prices
        .iter()
        .enumerate()
        .map(|(i, sample)| ChartPoint {
            time: time_label(sample.timestamp_ms(), tz),
            timestamp_ms: sample.timestamp_ms(),
            price: round_price(sample.value()),
            market_cap: chart.market_caps.get(i).map_or(0.0, |s| s.value()),
            volume: chart.total_volumes.get(i).map_or(0.0, |s| s.value()),
        })
        .collect()
}

/// Last price sample, or `last_known` if there is none usable.
pub fn live_price(chart: &MarketChart, last_known: f64) -> f64 {
    chart
        .prices
        .last()
        .map(|s| s.value())
        .filter(|p| p.is_finite())
        .unwrap_or(last_known)
}

/// Change across the whole series (24h for the default one-day window).
pub fn change_24h(chart: &MarketChart) -> Option<PriceChange> {
    let first = chart.prices.first()?.value();
    let last = chart.prices.last()?.value();
    if !first.is_finite() || !last.is_finite() {
        return None;
    }
    let absolute = last - first;
    let percent = (first != 0.0).then(|| absolute / first * 100.0);
    Some(PriceChange { absolute, percent })
}

/// `HH:MM` for an epoch-millisecond timestamp in `tz`.
///
/// Out-of-range timestamps render as `--:--`.
pub fn time_label<Tz>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(utc) => utc.with_timezone(tz).format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

/// Round a price to two decimals for display.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use gecko::ChartSample;

    const T0: f64 = 1_714_564_800_000.0; // 2024-05-01 12:00:00 UTC

    fn series(values: &[f64]) -> Vec<ChartSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ChartSample(T0 + i as f64 * 300_000.0, *v))
            .collect()
    }

    #[test]
    fn test_points_follow_price_length() {
        let chart = MarketChart {
            prices: series(&[100.0, 101.0, 102.0, 103.0]),
            market_caps: series(&[1e9, 1.1e9]),
            total_volumes: series(&[5e6, 6e6, 7e6, 8e6]),
        };
        let points = build_points(&chart, &Utc);
        assert_eq!(points.len(), 4);
        assert_eq!(points[1].market_cap, 1.1e9);
        assert_eq!(points[2].market_cap, 0.0);
        assert_eq!(points[3].market_cap, 0.0);
        assert_eq!(points[3].volume, 8e6);
    }

    #[test]
    fn test_missing_companions_default_to_zero() {
        let chart = MarketChart {
            prices: series(&[1.0, 2.0]),
            ..Default::default()
        };
        let points = build_points(&chart, &Utc);
        assert!(points.iter().all(|p| p.market_cap == 0.0 && p.volume == 0.0));
    }

    #[test]
    fn test_longer_companions_are_ignored() {
        let chart = MarketChart {
            prices: series(&[1.0]),
            market_caps: series(&[10.0, 20.0, 30.0]),
            total_volumes: series(&[1.0, 2.0]),
        };
        assert_eq!(build_points(&chart, &Utc).len(), 1);
    }

    #[test]
    fn test_price_rounding_and_labels() {
        let chart = MarketChart {
            prices: series(&[67_000.126, 67_001.5]),
            ..Default::default()
        };
        let points = build_points(&chart, &Utc);
        assert_eq!(points[0].price, 67_000.13);
        assert_eq!(points[0].time, "12:00");
        assert_eq!(points[1].time, "12:05");
        assert_eq!(points[0].timestamp_ms, 1_714_564_800_000);
    }

    #[test]
    fn test_label_uses_time_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(time_label(T0 as i64, &tz), "14:00");
        assert_eq!(time_label(i64::MAX, &Utc), "--:--");
    }

    #[test]
    fn test_live_price_is_last_sample() {
        let chart = MarketChart {
            prices: series(&[10.0, 11.0, 12.5]),
            ..Default::default()
        };
        assert_eq!(live_price(&chart, 99.0), 12.5);
    }

    #[test]
    fn test_live_price_empty_series_falls_back() {
        let chart = MarketChart::default();
        let price = live_price(&chart, 42.0);
        assert_eq!(price, 42.0);
        assert!(!price.is_nan());
    }

    #[test]
    fn test_change_24h() {
        let chart = MarketChart {
            prices: series(&[200.0, 190.0, 210.0]),
            ..Default::default()
        };
        let change = change_24h(&chart).unwrap();
        assert_eq!(change.absolute, 10.0);
        assert_eq!(change.percent, Some(5.0));

        let flat_zero = MarketChart {
            prices: series(&[0.0, 1.0]),
            ..Default::default()
        };
        assert_eq!(change_24h(&flat_zero).unwrap().percent, None);
        assert!(change_24h(&MarketChart::default()).is_none());
    }

    #[test]
    fn test_view_tail() {
        let chart = MarketChart {
            prices: series(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            ..Default::default()
        };
        let view = ChartView::from_chart(&chart, 0.0, &Utc);
        assert_eq!(view.live_price, 5.0);
        assert_eq!(view.tail(2).len(), 2);
        assert_eq!(view.tail(2)[0].price, 4.0);
        assert_eq!(view.tail(50).len(), 5);
    }
}
