mod chart;
mod cli;
mod config;
mod detail;
mod error;
mod format;
mod monitor;
mod output;
mod refresh;
mod source;
mod state;
mod ticker;

use std::io;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use cli::{ChartArgs, Command, ListArgs, TickerArgs};
use gecko::{GeckoConfig, GeckoHttpClient, Instrument};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chart::ChartView;
use crate::config::DashboardConfig;
use crate::detail::{DetailState, DetailView};
use crate::error::AppError;
use crate::source::MarketDataSource;
use crate::ticker::TickerView;

#[tokio::main]
async fn main() {
    // Load .env before parsing so COINGECKO_* can fill the global flags.
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    // Initialize tracing
    let filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut gecko_config = GeckoConfig {
        api_key: cli.api_key,
        ..Default::default()
    };
    if let Some(url) = cli.base_url {
        gecko_config.base_url = url;
    }
    let client = match GeckoHttpClient::new(gecko_config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(error = %e, "failed to build market data client");
            std::process::exit(1);
        }
    };
    info!(base_url = client.base_url(), "market data client ready");

    // Shared cancellation token + signal handlers.
    let cancel = setup_signal_handlers();

    let result = match cli.command {
        Command::Ticker(args) => run_ticker(client, args, cancel).await,
        Command::List(args) => run_list(client, args).await,
        Command::Chart(args) => run_chart(client, args, cancel).await,
        Command::Monitor(args) => {
            let config = DashboardConfig {
                refresh_interval_ms: args.interval_ms,
                chart_interval_ms: args.chart_interval_ms,
                enrich: args.enrich,
                enrich_concurrency: args.enrich_concurrency,
            };
            monitor::run_monitor(client, config, cancel).await
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

/// Mount the ticker and print every applied update until shutdown.
async fn run_ticker<S: MarketDataSource>(
    source: Arc<S>,
    args: TickerArgs,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let config = DashboardConfig {
        refresh_interval_ms: args.interval_ms,
        enrich: args.enrich,
        enrich_concurrency: args.enrich_concurrency,
        ..Default::default()
    };
    let view = TickerView::mount(source, &config, &cancel);
    let mut rx = view.subscribe();
    let mut buf = String::with_capacity(4096);

    let result = loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snap = rx.borrow_and_update().clone();
                if let Err(e) = output::write_ticker(
                    &mut io::stdout().lock(),
                    snap.tick,
                    &snap.value,
                    args.json,
                    &mut buf,
                ) {
                    break Err(e);
                }
            }
            _ = cancel.cancelled() => break Ok(()),
        }
    };

    view.unmount().await;
    result
}

/// One list fetch, deduplicated, printed as a table.
async fn run_list<S: MarketDataSource>(source: Arc<S>, args: ListArgs) -> Result<(), AppError> {
    let fetched = source.list_instruments().await?;
    if fetched.is_empty() {
        warn!(op = "list_instruments", "source returned no instruments");
    }
    let instruments = state::merge_instruments(fetched);
    output::write_table(&mut io::stdout().lock(), &instruments, args.json)
}

/// Print one instrument's chart, or keep it mounted with `--watch`.
async fn run_chart<S: MarketDataSource>(
    source: Arc<S>,
    args: ChartArgs,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    // The listing supplies the fallback price for an empty series.
    let listed = source.list_instruments().await?;
    let inst = find_instrument(&listed, &args.id)
        .cloned()
        .ok_or_else(|| AppError::InstrumentNotFound(args.id.clone()))?;

    if !args.watch {
        let chart = source.market_chart(&inst.id).await?;
        let view = ChartView::from_chart(&chart, inst.current_price, &Local);
        return output::write_chart(&mut io::stdout().lock(), &inst.id, &view, args.points, args.json);
    }

    let id = inst.id.clone();
    let config = DashboardConfig {
        chart_interval_ms: args.interval_ms,
        ..Default::default()
    };
    let view = DetailView::mount(source, inst, config.chart_interval(), Local, &cancel);
    let mut rx = view.subscribe();

    let result = loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snap = rx.borrow_and_update().clone();
                let DetailState::Ready(chart) = snap.value.as_ref() else {
                    // Failure was already logged; nothing to reprint.
                    continue;
                };
                if let Err(e) = output::write_chart(
                    &mut io::stdout().lock(),
                    &id,
                    chart,
                    args.points,
                    args.json,
                ) {
                    break Err(e);
                }
            }
            _ = cancel.cancelled() => break Ok(()),
        }
    };

    view.unmount().await;
    result
}

/// Look an instrument up by id, falling back to a case-insensitive symbol match.
fn find_instrument<'a>(instruments: &'a [Instrument], query: &str) -> Option<&'a Instrument> {
    instruments.iter().find(|i| i.id == query).or_else(|| {
        instruments
            .iter()
            .find(|i| i.symbol.eq_ignore_ascii_case(query))
    })
}

/// Register SIGINT and SIGTERM handlers that trigger the returned token.
fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
        cancel_clone.cancel();
    });

    #[cfg(unix)]
    {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("received SIGTERM, shutting down");
                    cancel_clone.cancel();
                }
                Err(e) => warn!(error = %e, "failed to register SIGTERM handler"),
            }
        });
    }

    cancel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_instrument_by_id_then_symbol() {
        let list = vec![
            Instrument::new("bitcoin", "btc", "Bitcoin", 1.0),
            Instrument::new("wrapped-bitcoin", "wbtc", "Wrapped Bitcoin", 1.0),
        ];
        assert_eq!(find_instrument(&list, "bitcoin").unwrap().id, "bitcoin");
        assert_eq!(find_instrument(&list, "WBTC").unwrap().id, "wrapped-bitcoin");
        assert!(find_instrument(&list, "dogecoin").is_none());
    }
}
