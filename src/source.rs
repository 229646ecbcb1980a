//! The market-data operations the view controllers depend on.

use std::future::Future;

use gecko::{GeckoHttpClient, Instrument, MarketChart};
use tracing::warn;

/// Source of instrument listings and per-instrument charts.
///
/// Implemented by [`GeckoHttpClient`]; tests drive the controllers with
/// scripted in-memory sources instead.
pub trait MarketDataSource: Send + Sync + 'static {
    /// Current instruments, in the source's ranking order.
    fn list_instruments(&self) -> impl Future<Output = gecko::Result<Vec<Instrument>>> + Send;

    /// Time series for one instrument.
    fn market_chart(&self, id: &str) -> impl Future<Output = gecko::Result<MarketChart>> + Send;
}

impl MarketDataSource for GeckoHttpClient {
    fn list_instruments(&self) -> impl Future<Output = gecko::Result<Vec<Instrument>>> + Send {
        self.get_markets()
    }

    fn market_chart(&self, id: &str) -> impl Future<Output = gecko::Result<MarketChart>> + Send {
        self.get_market_chart(id)
    }
}

/// Report a failed fetch; the caller keeps whatever state it already had.
pub fn log_fetch_failure(op: &str, id: Option<&str>, err: &gecko::GeckoError) {
    let id = id.unwrap_or("-");
    if err.is_malformed() {
        warn!(op, id, error = %err, "malformed response, keeping previous state");
    } else {
        warn!(op, id, error = %err, "fetch failed, keeping previous state");
    }
}
