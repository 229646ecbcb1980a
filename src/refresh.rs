//! Timer-driven refresh loop.
//!
//! The loop fetches immediately on activation and then once per period until
//! its cancellation token fires. Every tick runs as its own task, so a slow
//! fetch never holds up the schedule; results land in a [`TickCell`] that
//! discards anything older than what it already shows.
//!
//! At most [`MAX_IN_FLIGHT_TICKS`] ticks run at once; a period that finds the
//! limit reached is skipped. Once a tick is applied, every older tick still
//! running is aborted since its result could only be discarded.

use std::future::Future;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::state::TickCell;

/// Upper bound on concurrently running ticks of one loop.
pub const MAX_IN_FLIGHT_TICKS: usize = 3;

/// Owner of a running refresh loop.
///
/// Dropping the handle does not stop the loop; call [`deactivate`] or cancel
/// the token it was spawned with.
///
/// [`deactivate`]: RefreshHandle::deactivate
pub struct RefreshHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    /// Stop the loop and wait until no in-flight tick can touch state.
    pub async fn deactivate(self) {
        if !self.is_active() {
            debug!("refresh loop already stopped");
        }
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "refresh loop panicked");
        }
    }
}

/// Spawn a refresh loop that publishes into `cell`.
///
/// `fetch` is called once per tick. It resolves to `Some(value)` for fresh
/// data or `None` for "no change" (the failure has already been logged), in
/// which case the cell keeps its current snapshot.
pub fn spawn_refresh<T, F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    cell: TickCell<T>,
    mut fetch: F,
) -> RefreshHandle
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    let loop_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        let cancel = loop_cancel;
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut running: Vec<(u64, AbortHandle)> = Vec::new();
        let mut seq: u64 = 0;

        debug!(view = name, period_ms = period.as_millis() as u64, "refresh loop started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    // Waits for aborted ticks so none can write after we return.
                    in_flight.shutdown().await;
                    debug!(view = name, ticks = seq, "refresh loop stopped");
                    return;
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(view = name, error = %e, "refresh tick panicked");
                        }
                    }
                    let applied = cell.snapshot().tick;
                    running.retain(|(tick, handle)| {
                        if *tick < applied && !handle.is_finished() {
                            debug!(view = name, tick, applied, "superseded tick aborted");
                            handle.abort();
                            return false;
                        }
                        !handle.is_finished()
                    });
                }

                _ = interval.tick() => {
                    if in_flight.len() >= MAX_IN_FLIGHT_TICKS {
                        warn!(
                            view = name,
                            in_flight = in_flight.len(),
                            "previous ticks still running, skipping refresh"
                        );
                        continue;
                    }
                    seq += 1;
                    let tick = seq;
                    let pending = fetch();
                    let cell = cell.clone();
                    let cancel = cancel.clone();
                    let handle = in_flight.spawn(async move {
                        let Some(value) = pending.await else {
                            return;
                        };
                        if cancel.is_cancelled() {
                            debug!(view = name, tick, "view deactivated, result dropped");
                            return;
                        }
                        if !cell.apply(tick, value) {
                            debug!(view = name, tick, "stale tick discarded");
                        }
                    });
                    running.push((tick, handle));
                }
            }
        }
    });

    RefreshHandle { cancel, task }
}
