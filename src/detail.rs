//! Instrument detail view controller.
//!
//! Mounting a detail view starts a chart refresh loop for one instrument.
//! A chart fetch failure clears the view to [`DetailState::Empty`] rather than
//! keeping a stale chart around.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use gecko::Instrument;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chart::ChartView;
use crate::refresh::{spawn_refresh, RefreshHandle};
use crate::source::{log_fetch_failure, MarketDataSource};
use crate::state::{Snapshot, TickCell};

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    /// No chart tick has completed yet.
    Loading,
    Ready(ChartView),
    /// The last chart fetch failed.
    Empty,
}

impl DetailState {
    pub fn chart(&self) -> Option<&ChartView> {
        match self {
            DetailState::Ready(view) => Some(view),
            _ => None,
        }
    }
}

/// Last live price seen by a detail view, shared with its refresh ticks.
///
/// Survives `Empty` states so an empty series after a failed fetch still
/// falls back to the most recent price rather than the listed one.
#[derive(Debug)]
pub struct LastPrice(AtomicU64);

impl LastPrice {
    pub fn new(price: f64) -> Self {
        Self(AtomicU64::new(price.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, price: f64) {
        if price.is_finite() {
            self.0.store(price.to_bits(), Ordering::Release);
        }
    }
}

pub struct DetailView {
    instrument: Instrument,
    cell: TickCell<DetailState>,
    last_price: Arc<LastPrice>,
    handle: RefreshHandle,
}

impl DetailView {
    /// Open the detail view for `instrument` and keep its chart fresh.
    ///
    /// Labels are rendered in `tz`.
    pub fn mount<S, Tz>(
        source: Arc<S>,
        instrument: Instrument,
        period: Duration,
        tz: Tz,
        parent: &CancellationToken,
    ) -> Self
    where
        S: MarketDataSource,
        Tz: TimeZone + Send + Sync + 'static,
        Tz::Offset: Display,
    {
        let cell = TickCell::new(DetailState::Loading);
        info!(id = %instrument.id, period_ms = period.as_millis() as u64, "detail mounted");

        let id = instrument.id.clone();
        let last_price = Arc::new(LastPrice::new(instrument.current_price));
        let tracker = Arc::clone(&last_price);
        let handle = spawn_refresh("detail", period, parent.child_token(), cell.clone(), move || {
            let source = Arc::clone(&source);
            let id = id.clone();
            let tz = tz.clone();
            let tracker = Arc::clone(&tracker);
            async move {
                let state = load_chart(source.as_ref(), &id, tracker.get(), &tz).await;
                if let Some(view) = state.chart() {
                    tracker.set(view.live_price);
                }
                Some(state)
            }
        });

        Self {
            instrument,
            cell,
            last_price,
            handle,
        }
    }

    /// Most recent live price, or the listed price before any chart arrived.
    pub fn last_price(&self) -> f64 {
        self.last_price.get()
    }

    /// The instrument as it was listed when the view was opened.
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn state(&self) -> Arc<DetailState> {
        self.cell.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<DetailState>> {
        self.cell.subscribe()
    }

    pub async fn unmount(self) {
        self.handle.deactivate().await;
        debug!(id = %self.instrument.id, "detail unmounted");
    }
}

/// Fetch and shape one instrument's chart.
pub async fn load_chart<S, Tz>(source: &S, id: &str, last_known: f64, tz: &Tz) -> DetailState
where
    S: MarketDataSource,
    Tz: TimeZone + Sync,
    Tz::Offset: Display,
{
    match source.market_chart(id).await {
        Ok(chart) => DetailState::Ready(ChartView::from_chart(&chart, last_known, tz)),
        Err(e) => {
            log_fetch_failure("market_chart", Some(id), &e);
            DetailState::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{instrument, price_chart, ScriptedSource};
    use chrono::Utc;

    const PERIOD: Duration = Duration::from_secs(60);

    fn mount(source: &Arc<ScriptedSource>, price: f64) -> DetailView {
        DetailView::mount(
            Arc::clone(source),
            instrument("bitcoin", price),
            PERIOD,
            Utc,
            &CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_then_ready() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[100.0, 101.0, 102.25]));

        let view = mount(&source, 99.0);
        assert_eq!(*view.state(), DetailState::Loading);

        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        let state = view.state();
        let chart = state.chart().unwrap();
        assert_eq!(chart.points.len(), 3);
        assert_eq!(chart.points[0].time, "12:00");
        assert_eq!(chart.live_price, 102.25);

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_clears_chart() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[100.0, 101.0]));

        let view = mount(&source, 99.0);
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        assert!(view.state().chart().is_some());

        source.remove_chart("bitcoin");
        rx.changed().await.unwrap();
        assert_eq!(*view.state(), DetailState::Empty);

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_series_uses_listed_price() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[]));

        let view = mount(&source, 64_250.5);
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        let state = view.state();
        let chart = state.chart().unwrap();
        assert!(chart.points.is_empty());
        assert_eq!(chart.live_price, 64_250.5);
        assert!(chart.change.is_none());

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_series_after_data_keeps_last_live_price() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[100.0, 105.5]));

        let view = mount(&source, 1.0);
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();

        source.set_chart("bitcoin", price_chart(&[]));
        rx.changed().await.unwrap();
        assert_eq!(view.state().chart().unwrap().live_price, 105.5);

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_last_live_price() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[100.0, 105.5]));

        let view = mount(&source, 1.0);
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(view.last_price(), 105.5);

        source.remove_chart("bitcoin");
        rx.changed().await.unwrap();
        assert_eq!(*view.state(), DetailState::Empty);
        assert_eq!(view.last_price(), 105.5);

        source.set_chart("bitcoin", price_chart(&[]));
        rx.changed().await.unwrap();
        assert_eq!(view.state().chart().unwrap().live_price, 105.5);

        view.unmount().await;
    }

    #[test]
    fn test_last_price_ignores_non_finite() {
        let price = LastPrice::new(42.0);
        price.set(f64::NAN);
        assert_eq!(price.get(), 42.0);
        price.set(43.5);
        assert_eq!(price.get(), 43.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_chart_refresh() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[1.0]));

        let view = mount(&source, 1.0);
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        view.unmount().await;

        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(
            source.chart_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_load_chart_reports_empty_on_error() {
        let source = ScriptedSource::default();
        let state = load_chart(&source, "missing", 1.0, &Utc).await;
        assert_eq!(state, DetailState::Empty);
    }
}
