//! View state shared between a refresh loop and its readers.
//!
//! A [`TickCell`] publishes [`Snapshot`]s through a `watch` channel. Each
//! write carries the sequence number of the refresh tick that produced it and
//! is rejected unless it is newer than the last applied one, so a slow tick
//! that resolves late can never overwrite fresher state.

use std::collections::HashMap;
use std::sync::Arc;

use gecko::Instrument;
use tokio::sync::watch;

/// State published by a view, tagged with the tick that produced it.
#[derive(Debug)]
pub struct Snapshot<T> {
    /// Tick sequence number; `0` for the initial state.
    pub tick: u64,
    pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            tick: self.tick,
            value: Arc::clone(&self.value),
        }
    }
}

/// Tick-guarded, single-writer view state.
#[derive(Debug)]
pub struct TickCell<T> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T> Clone for TickCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> TickCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            tick: 0,
            value: Arc::new(initial),
        });
        Self { tx }
    }

    /// Publish `value` as the result of tick `tick`.
    ///
    /// Returns `false`, leaving the state untouched, when a tick with an equal
    /// or higher sequence number has already been applied.
    pub fn apply(&self, tick: u64, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|current| {
            if tick <= current.tick {
                return false;
            }
            if let Some(v) = value.take() {
                *current = Snapshot {
                    tick,
                    value: Arc::new(v),
                };
            }
            true
        })
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    /// Latest published value.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow().value)
    }

    /// Receiver notified on every applied tick.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }
}

/// Deduplicate instruments by `id`.
///
/// The last record seen for an id wins and takes the slot of that id's first
/// occurrence, so the output order is stable for a given input.
pub fn merge_instruments(fetched: Vec<Instrument>) -> Vec<Instrument> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(fetched.len());
    let mut merged: Vec<Instrument> = Vec::with_capacity(fetched.len());
    for inst in fetched {
        match slots.get(&inst.id) {
            Some(&slot) => merged[slot] = inst,
            None => {
                slots.insert(inst.id.clone(), merged.len());
                merged.push(inst);
            }
        }
    }
    merged
}
