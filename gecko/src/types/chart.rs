use serde::{Deserialize, Serialize};

/// One `[timestamp_ms, value]` pair of a `/market_chart` series.
///
/// The API encodes timestamps as JSON numbers that are occasionally
/// fractional, so both halves deserialize as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartSample(pub f64, pub f64);

impl ChartSample {
    /// Epoch milliseconds of the sample.
    pub fn timestamp_ms(&self) -> i64 {
        self.0 as i64
    }

    pub fn value(&self) -> f64 {
        self.1
    }
}

/// Time-series response of `/coins/{id}/market_chart`, oldest sample first.
///
/// `prices` is mandatory; the companion series may be missing or shorter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<ChartSample>,
    #[serde(default)]
    pub market_caps: Vec<ChartSample>,
    #[serde(default)]
    pub total_volumes: Vec<ChartSample>,
}
