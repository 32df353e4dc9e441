//! Fixed-interval stats poller.
//!
//! A scheduler thread issues one poll immediately and then one per period.
//! Each poll runs on its own short-lived worker thread so a slow response
//! never delays the schedule, and every result travels back over a single
//! channel. The channel's only consumer is whoever owns the
//! [`StatsStore`](crate::store::StatsStore): [`Poller::drain_into`] is the
//! one serialization point where poll results become store mutations.
//!
//! Overlapping polls are resolved by ticket: results are applied in issue
//! order, and a result that completes after a newer one has been applied is
//! dropped (see [`StatsStore::apply`](crate::store::StatsStore::apply)).
//!
//! Cancellation is immediate. [`Poller::shutdown`] wakes the scheduler, joins
//! it, and raises a flag that both workers and `drain_into` check, so no
//! merge can happen after teardown even if a worker is still mid-request.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::client::RouterApi;
use crate::error::Result;
use crate::store::{ApplyOutcome, PollTicket, StatsPatch, StatsStore};

/// A completed poll, in completion order.
#[derive(Debug)]
pub struct PollOutcome {
    pub ticket: PollTicket,
    pub result: Result<StatsPatch>,
}

/// Counts from one [`Poller::drain_into`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub stale: usize,
    pub failed: usize,
}

/// Handle to a running poll schedule.
pub struct Poller {
    outcomes: Receiver<PollOutcome>,
    stop: Option<Sender<()>>,
    cancelled: Arc<AtomicBool>,
    issued: Arc<AtomicU64>,
    scheduler: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling `api` every `interval`, beginning immediately.
    pub fn spawn(api: Arc<dyn RouterApi>, interval: Duration) -> io::Result<Self> {
        let (outcome_tx, outcomes) = mpsc::channel();
        let (stop, stop_rx) = mpsc::channel::<()>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let issued = Arc::new(AtomicU64::new(0));

        let scheduler = {
            let cancelled = Arc::clone(&cancelled);
            let issued = Arc::clone(&issued);
            thread::Builder::new()
                .name("routescope-poller".to_string())
                .spawn(move || {
                    schedule(api, interval, outcome_tx, stop_rx, cancelled, issued);
                })?
        };

        Ok(Self {
            outcomes,
            stop: Some(stop),
            cancelled,
            issued,
            scheduler: Some(scheduler),
        })
    }

    /// Apply every completed poll waiting in the channel to `store`.
    ///
    /// Failed polls are logged and leave the store untouched. Does nothing
    /// once the poller has been shut down.
    pub fn drain_into(&self, store: &mut StatsStore) -> DrainReport {
        let mut report = DrainReport::default();
        while !self.is_cancelled() {
            let Ok(outcome) = self.outcomes.try_recv() else {
                break;
            };
            report.record(apply_one(outcome, store));
        }
        report
    }

    /// Block until at least one poll completes (or `timeout` elapses), then
    /// drain everything pending.
    pub fn wait_and_drain(&self, store: &mut StatsStore, timeout: Duration) -> DrainReport {
        let mut report = DrainReport::default();
        if self.is_cancelled() {
            return report;
        }
        if let Ok(first) = self.outcomes.recv_timeout(timeout)
            && !self.is_cancelled()
        {
            report.record(apply_one(first, store));
        }
        report.record(self.drain_into(store));
        report
    }

    /// Newest ticket handed out so far.
    pub fn last_issued(&self) -> Option<PollTicket> {
        self.issued.load(Ordering::SeqCst).checked_sub(1).map(PollTicket)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop the schedule. Idempotent.
    pub fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Dropping the sender wakes the scheduler out of its wait.
        self.stop.take();
        if let Some(handle) = self.scheduler.take()
            && handle.join().is_err()
        {
            tracing::error!("poller scheduler thread panicked");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl DrainReport {
    fn record(&mut self, other: DrainReport) {
        self.applied += other.applied;
        self.stale += other.stale;
        self.failed += other.failed;
    }
}

fn apply_one(outcome: PollOutcome, store: &mut StatsStore) -> DrainReport {
    let mut report = DrainReport::default();
    match outcome.result {
        Ok(patch) => match store.apply(outcome.ticket, patch) {
            ApplyOutcome::Applied => report.applied = 1,
            ApplyOutcome::Stale => {
                tracing::debug!(ticket = outcome.ticket.0, "dropping stale stats poll");
                report.stale = 1;
            }
        },
        Err(e) => {
            tracing::warn!(
                ticket = outcome.ticket.0,
                kind = e.kind(),
                error = %e,
                "stats poll failed; keeping previous snapshot"
            );
            report.failed = 1;
        }
    }
    report
}

fn schedule(
    api: Arc<dyn RouterApi>,
    interval: Duration,
    outcome_tx: Sender<PollOutcome>,
    stop_rx: Receiver<()>,
    cancelled: Arc<AtomicBool>,
    issued: Arc<AtomicU64>,
) {
    loop {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        let ticket = PollTicket(issued.fetch_add(1, Ordering::SeqCst));
        let worker = {
            let api = Arc::clone(&api);
            let tx = outcome_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            thread::Builder::new()
                .name(format!("routescope-poll-{}", ticket.0))
                .spawn(move || {
                    let result = api.fetch_stats();
                    if !cancelled.load(Ordering::SeqCst) {
                        // The receiver is gone once the poller is dropped.
                        let _ = tx.send(PollOutcome { ticket, result });
                    }
                })
        };
        if let Err(e) = worker {
            tracing::warn!(ticket = ticket.0, error = %e, "could not start poll worker");
        }

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
