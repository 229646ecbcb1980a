//! Dashboard configuration.

use std::time::Duration;

/// Tuneable parameters for the ticker, list and detail views.
///
/// Use [`Default::default()`] for the stock intervals, then override from the
/// command line.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Interval between instrument list refreshes in milliseconds.
    pub refresh_interval_ms: u64,
    /// Interval between chart refreshes of an open detail view in milliseconds.
    pub chart_interval_ms: u64,
    /// Recompute each instrument's 24h change from its own chart every tick.
    pub enrich: bool,
    /// Maximum chart fetches in flight during one enrichment pass.
    pub enrich_concurrency: usize,
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn chart_interval(&self) -> Duration {
        Duration::from_millis(self.chart_interval_ms.max(1))
    }

    /// Concurrency limit when enrichment is on, `None` otherwise.
    pub fn enrichment(&self) -> Option<usize> {
        self.enrich.then_some(self.enrich_concurrency.max(1))
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5000,
            chart_interval_ms: 60_000,
            enrich: false,
            enrich_concurrency: 8,
        }
    }
}
