//! Root console context.
//!
//! Owns the stats store and the poller that feeds it. The poller's result
//! channel is drained only here, so every store mutation happens on the
//! thread that owns the `Console`. Dropping the console stops polling.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::chart::{self, ChartSeries};
use crate::client::RouterApi;
use crate::error::{ConsoleError, Result};
use crate::poller::{DrainReport, Poller};
use crate::purge::{self, Confirm, PurgeOutcome};
use crate::store::{PollTicket, StatsSnapshot, StatsStore};

pub struct Console {
    api: Arc<dyn RouterApi>,
    store: StatsStore,
    poller: Option<Poller>,
}

impl Console {
    /// Mount the console: start polling `api` every `interval`.
    pub fn mount(api: Arc<dyn RouterApi>, interval: Duration) -> io::Result<Self> {
        let poller = Poller::spawn(Arc::clone(&api), interval)?;
        tracing::debug!(interval_ms = interval.as_millis() as u64, "console mounted");
        Ok(Self {
            api,
            store: StatsStore::new(),
            poller: Some(poller),
        })
    }

    /// A console that never polls (one-shot commands).
    pub fn detached(api: Arc<dyn RouterApi>) -> Self {
        Self {
            api,
            store: StatsStore::new(),
            poller: None,
        }
    }

    pub fn api(&self) -> &Arc<dyn RouterApi> {
        &self.api
    }

    pub fn is_mounted(&self) -> bool {
        self.poller.is_some()
    }

    /// Apply completed polls without blocking.
    pub fn pump(&mut self) -> DrainReport {
        match &self.poller {
            Some(poller) => poller.drain_into(&mut self.store),
            None => DrainReport::default(),
        }
    }

    /// Wait up to `timeout` for a poll to complete, then apply everything
    /// pending.
    pub fn wait_and_pump(&mut self, timeout: Duration) -> DrainReport {
        match &self.poller {
            Some(poller) => poller.wait_and_drain(&mut self.store, timeout),
            None => DrainReport::default(),
        }
    }

    /// Fetch stats once and merge them. Only for detached consoles; a
    /// mounted console gets its stats from the poller.
    pub fn refresh_once(&mut self) -> Result<()> {
        if self.is_mounted() {
            return Err(ConsoleError::validation(
                "console is polling; use pump instead",
            ));
        }
        let patch = self.api.fetch_stats()?;
        let ticket = self
            .store
            .last_applied()
            .map_or(PollTicket(0), |t| PollTicket(t.0 + 1));
        self.store.apply(ticket, patch);
        Ok(())
    }

    pub fn snapshot(&self) -> &StatsSnapshot {
        self.store.snapshot()
    }

    pub fn chart(&self) -> ChartSeries {
        chart::project(self.store.snapshot())
    }

    /// Confirm, clear the router's cache, and reset local stats.
    pub fn purge(&mut self, confirm: &mut dyn Confirm) -> PurgeOutcome {
        purge::run(
            self.api.as_ref(),
            &mut self.store,
            self.poller.as_ref(),
            confirm,
        )
    }

    /// Stop polling. Further pumps are no-ops. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.shutdown();
            tracing::debug!("console unmounted");
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.unmount();
    }
}
