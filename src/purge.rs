//! Cache purge: ask the router to drop its cache and reset the local store.
//!
//! Destructive: the router's accumulated savings and hit-rate history are
//! discarded along with its cache entries, so the action only runs after an
//! explicit [`Confirm`]. Once confirmed the local store is always reset, but
//! a failed remote call is logged and reported as
//! [`PurgeOutcome::LocalOnly`] so the display never implies the router was
//! cleared when it may not have been.

use std::io::{self, BufRead, Write};

use crate::client::RouterApi;
use crate::error::ConsoleError;
use crate::poller::Poller;
use crate::store::StatsStore;

/// Prompt text shown before a purge.
pub const CONFIRM_PROMPT: &str =
    "Are you sure you want to purge the cache? This will reset all stats.";

/// Source of operator confirmation.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Pre-answered confirmation (`--yes`, tests).
pub struct Assume(pub bool);

impl Confirm for Assume {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

/// Ask on a terminal: `y`/`yes` confirms, anything else declines.
pub struct TerminalConfirm<R, W> {
    input: R,
    output: W,
}

impl TerminalConfirm<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> TerminalConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> bool {
        if write!(self.output, "{prompt} [y/N] ").is_err() || self.output.flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// What a purge attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Operator declined; nothing changed.
    Declined,
    /// Router cleared and local store reset.
    Purged,
    /// Local store reset, but the router call failed.
    LocalOnly(ConsoleError),
}

impl PurgeOutcome {
    pub fn remote_cleared(&self) -> bool {
        matches!(self, Self::Purged)
    }
}

/// Run the purge: confirm, clear remotely, reset locally.
///
/// `poller` (if running) is drained before the reset, and every poll it has
/// issued up to the end of the remote call is fenced off, so a response
/// carrying pre-purge counters cannot repopulate the store afterwards.
///
/// The local reset happens only after `clear_cache` returns or hits its
/// `timeouts.purge_ms` limit, so a slow router holds the caller until then.
pub fn run(
    api: &dyn RouterApi,
    store: &mut StatsStore,
    poller: Option<&Poller>,
    confirm: &mut dyn Confirm,
) -> PurgeOutcome {
    if !confirm.confirm(CONFIRM_PROMPT) {
        tracing::debug!("cache purge declined");
        return PurgeOutcome::Declined;
    }

    let remote = api.clear_cache();

    let issued = poller.and_then(|p| {
        p.drain_into(store);
        p.last_issued()
    });
    store.reset(issued);

    match remote {
        Ok(()) => {
            tracing::info!("router cache purged; local stats reset");
            PurgeOutcome::Purged
        }
        Err(e) => {
            tracing::error!(
                kind = e.kind(),
                error = %e,
                "cache purge failed on the router; local stats were reset but router state may be unchanged"
            );
            PurgeOutcome::LocalOnly(e)
        }
    }
}
