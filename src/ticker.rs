//! Ticker / instrument-list view controller.
//!
//! Each tick lists the current instruments, deduplicates them by id and,
//! when enrichment is on, recomputes every instrument's 24h change from its
//! own one-day chart. Per-instrument chart fetches fan out concurrently; one
//! failing instrument keeps its listed values while the rest are enriched.
//! All ticks of one view draw from a single permit pool, so the concurrency
//! limit holds even when slow ticks overlap.

use std::sync::Arc;

use gecko::Instrument;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chart::change_24h;
use crate::config::DashboardConfig;
use crate::refresh::{spawn_refresh, RefreshHandle};
use crate::source::{log_fetch_failure, MarketDataSource};
use crate::state::{merge_instruments, Snapshot, TickCell};

/// A mounted ticker: live instrument collection plus the loop feeding it.
pub struct TickerView {
    cell: TickCell<Vec<Instrument>>,
    handle: RefreshHandle,
}

impl TickerView {
    /// Start refreshing immediately and then every `refresh_interval_ms`.
    ///
    /// The view runs under a child of `parent`, so cancelling `parent` also
    /// unmounts it.
    pub fn mount<S: MarketDataSource>(
        source: Arc<S>,
        config: &DashboardConfig,
        parent: &CancellationToken,
    ) -> Self {
        let cell = TickCell::new(Vec::new());
        let permits = config
            .enrichment()
            .map(|limit| Arc::new(Semaphore::new(limit)));
        info!(
            interval_ms = config.refresh_interval_ms,
            enrich = permits.is_some(),
            "ticker mounted"
        );
        let handle = spawn_refresh(
            "ticker",
            config.refresh_interval(),
            parent.child_token(),
            cell.clone(),
            move || {
                let source = Arc::clone(&source);
                let permits = permits.clone();
                async move { refresh_instruments(&source, permits.as_ref()).await }
            },
        );
        Self { cell, handle }
    }

    /// Latest instrument collection (empty until the first successful tick).
    pub fn instruments(&self) -> Arc<Vec<Instrument>> {
        self.cell.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Vec<Instrument>>> {
        self.cell.subscribe()
    }

    /// Stop refreshing; no state is written after this returns.
    pub async fn unmount(self) {
        self.handle.deactivate().await;
        debug!("ticker unmounted");
    }
}

/// One refresh tick: list, dedup, and enrich when a permit pool is given.
///
/// Returns `None` when the list fetch failed or came back empty, meaning the
/// view keeps its previous collection.
pub async fn refresh_instruments<S: MarketDataSource>(
    source: &Arc<S>,
    permits: Option<&Arc<Semaphore>>,
) -> Option<Vec<Instrument>> {
    let fetched = match source.list_instruments().await {
        Ok(list) => list,
        Err(e) => {
            log_fetch_failure("list_instruments", None, &e);
            return None;
        }
    };
    if fetched.is_empty() {
        warn!(op = "list_instruments", "empty instrument list, keeping previous state");
        return None;
    }

    let fetched_len = fetched.len();
    let merged = merge_instruments(fetched);
    if merged.len() < fetched_len {
        debug!(
            fetched = fetched_len,
            unique = merged.len(),
            "dropped duplicate instrument ids"
        );
    }

    Some(match permits {
        Some(permits) => enrich_instruments(source, merged, permits).await,
        None => merged,
    })
}

/// Recompute the 24h change of every instrument from its own chart.
///
/// Each chart fetch holds one of `permits` while it runs. The call returns
/// once every fetch has settled; output order matches input order. Aborting
/// the calling task aborts the spawned fetches too.
pub async fn enrich_instruments<S: MarketDataSource>(
    source: &Arc<S>,
    instruments: Vec<Instrument>,
    permits: &Arc<Semaphore>,
) -> Vec<Instrument> {
    let mut tasks = JoinSet::new();
    for (idx, inst) in instruments.iter().cloned().enumerate() {
        let source = Arc::clone(source);
        let permits = Arc::clone(permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            (idx, enrich_instrument(source.as_ref(), inst).await)
        });
    }

    let mut enriched = instruments;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, inst)) => enriched[idx] = inst,
            Err(e) => warn!(op = "enrich", error = %e, "enrichment task failed"),
        }
    }
    enriched
}

/// Enrich a single instrument, returning it unchanged on any failure.
async fn enrich_instrument<S: MarketDataSource>(source: &S, mut inst: Instrument) -> Instrument {
    let chart = match source.market_chart(&inst.id).await {
        Ok(chart) => chart,
        Err(e) => {
            log_fetch_failure("market_chart", Some(&inst.id), &e);
            return inst;
        }
    };
    match change_24h(&chart) {
        Some(change) => {
            inst.price_change_24h = Some(change.absolute);
            if let Some(pct) = change.percent {
                inst.price_change_percentage_24h = Some(pct);
            }
        }
        None => debug!(id = %inst.id, "empty price series, keeping listed change"),
    }
    inst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{instrument, price_chart, ScriptedSource};
    use std::collections::HashSet;
    use std::time::Duration;

    fn fast_config() -> DashboardConfig {
        DashboardConfig {
            refresh_interval_ms: 5000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_dedups_listing() {
        let source = Arc::new(ScriptedSource::default());
        source.push_list(vec![
            instrument("bitcoin", 1.0),
            instrument("ethereum", 2.0),
            instrument("bitcoin", 3.0),
        ]);
        let list = refresh_instruments(&source, None).await.unwrap();
        let ids: HashSet<&str> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(list.len(), 2);
        assert_eq!(ids.len(), 2);
        assert_eq!(list[0].current_price, 3.0);
    }

    #[tokio::test]
    async fn test_refresh_failure_and_empty_mean_no_change() {
        let source = Arc::new(ScriptedSource::default());
        source.push_list_error(500);
        source.push_list(Vec::new());
        assert!(refresh_instruments(&source, None).await.is_none());
        assert!(refresh_instruments(&source, None).await.is_none());
    }

    #[tokio::test]
    async fn test_one_failed_enrichment_leaves_that_instrument_unchanged() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[100.0, 110.0]));
        source.set_chart("solana", price_chart(&[50.0, 45.0]));
        // No chart for "ethereum": its fetch answers 404.
        let listed = vec![
            instrument("bitcoin", 110.0),
            instrument("ethereum", 3000.0),
            instrument("solana", 45.0),
        ];

        let permits = Arc::new(Semaphore::new(2));
        let enriched = enrich_instruments(&source, listed.clone(), &permits).await;
        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[1], listed[1]);
        assert_eq!(enriched[0].price_change_24h, Some(10.0));
        assert_eq!(enriched[0].price_change_percentage_24h, Some(10.0));
        assert_eq!(enriched[2].price_change_24h, Some(-5.0));
        assert_eq!(enriched[2].price_change_percentage_24h, Some(-10.0));
        assert_eq!(
            source.chart_calls.load(std::sync::atomic::Ordering::SeqCst),
            3
        );
    }

    #[tokio::test]
    async fn test_empty_series_keeps_listed_change() {
        let source = Arc::new(ScriptedSource::default());
        source.set_chart("bitcoin", price_chart(&[]));
        let mut listed = instrument("bitcoin", 1.0);
        listed.price_change_24h = Some(0.5);
        let permits = Arc::new(Semaphore::new(4));
        let enriched = enrich_instruments(&source, vec![listed.clone()], &permits).await;
        assert_eq!(enriched, vec![listed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_failure_keeps_previous_collection() {
        let source = Arc::new(ScriptedSource::default());
        source.push_list(vec![instrument("bitcoin", 1.0), instrument("ethereum", 2.0)]);
        source.push_list_error(502);

        let view = TickerView::mount(source.clone(), &fast_config(), &CancellationToken::new());
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        let before = view.instruments();
        assert_eq!(before.len(), 2);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(source.list_calls(), 2);
        assert!(Arc::ptr_eq(&before, &view.instruments()));

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_tick_drops_missing_instrument() {
        let source = Arc::new(ScriptedSource::default());
        source.push_list(vec![
            instrument("bitcoin", 67_000.0),
            instrument("ethereum", 3_100.0),
            instrument("solana", 150.0),
        ]);
        source.push_list(vec![
            instrument("bitcoin", 67_100.0),
            instrument("ethereum", 3_090.0),
        ]);

        let view = TickerView::mount(source.clone(), &fast_config(), &CancellationToken::new());
        let mut rx = view.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().value.len(), 3);

        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.tick, 2);
        assert_eq!(snap.value.len(), 2);
        assert!(snap.value.iter().all(|i| i.id != "solana"));
        assert_eq!(snap.value[0].current_price, 67_100.0);

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enriched_ticker_publishes_derived_change() {
        let source = Arc::new(ScriptedSource::default());
        source.push_list(vec![instrument("bitcoin", 110.0), instrument("ethereum", 2.0)]);
        source.set_chart("bitcoin", price_chart(&[100.0, 110.0]));
        let config = DashboardConfig {
            enrich: true,
            ..fast_config()
        };

        let view = TickerView::mount(source.clone(), &config, &CancellationToken::new());
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        let list = view.instruments();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].price_change_24h, Some(10.0));
        assert_eq!(list[1].price_change_24h, None);

        view.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrichment_limit_holds_across_overlapping_ticks() {
        let source = Arc::new(ScriptedSource::default());
        let listed: Vec<Instrument> = (0..6)
            .map(|i| instrument(&format!("coin-{i}"), 10.0))
            .collect();
        for _ in 0..20 {
            source.push_list(listed.clone());
        }
        for inst in &listed {
            source.set_chart(&inst.id, price_chart(&[9.0, 10.0]));
        }
        // Each tick needs 30s of chart fetches against a 5s refresh period.
        source.set_chart_delay(Duration::from_secs(10));
        let config = DashboardConfig {
            enrich: true,
            enrich_concurrency: 2,
            ..fast_config()
        };

        let view = TickerView::mount(source.clone(), &config, &CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(source.chart_peak(), 2);
        let list = view.instruments();
        assert_eq!(list.len(), 6);
        assert!(list.iter().all(|i| i.price_change_24h == Some(1.0)));

        view.unmount().await;
        // Let the runtime drop the aborted chart fetches.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.charts_in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancel_unmounts() {
        let source = Arc::new(ScriptedSource::default());
        source.push_list(vec![instrument("bitcoin", 1.0)]);
        let parent = CancellationToken::new();

        let view = TickerView::mount(source.clone(), &fast_config(), &parent);
        let mut rx = view.subscribe();
        rx.changed().await.unwrap();
        parent.cancel();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.list_calls(), 1);
        view.unmount().await;
    }
}
