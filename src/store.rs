//! Snapshot store: the console's in-memory copy of the router's counters.
//!
//! The router reports aggregate counters through `GET /api/stats`. Each
//! response is a [`StatsPatch`]: any field may be absent, and an absent field
//! means "unchanged". [`StatsSnapshot::merge`] folds a patch into the prior
//! state field by field.
//!
//! [`StatsStore`] wraps the snapshot with the ordering rule for overlapping
//! polls: every poll carries the [`PollTicket`] it was issued with, and a
//! result is only applied if its ticket is newer than the last applied one.

use serde::{Deserialize, Serialize};

/// Provider label the router reports before any request has been routed.
pub const WAITING_SENTINEL: &str = "Waiting...";

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The router's aggregate counters at the last applied poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    /// Estimated savings in USD versus sending everything to the declared model.
    pub savings: f64,
    /// Cache hit rate as a percentage, 0–100.
    pub hit_rate: f64,
    pub provider_groq: u64,
    pub provider_local: u64,
    pub cache_hits: u64,
    pub latest_request: Option<RoutedRequestSummary>,
}

/// The last request the router processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedRequestSummary {
    #[serde(default)]
    pub provider: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl RoutedRequestSummary {
    /// Whether this is the router's "nothing routed yet" placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.provider.is_empty() || self.provider == WAITING_SENTINEL
    }

    /// Whether the route went to the local model.
    pub fn is_local(&self) -> bool {
        self.provider.contains("LOCAL")
    }
}

/// A partial update as returned by the stats endpoint.
///
/// `null` and missing are treated alike.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsPatch {
    #[serde(default)]
    pub requests: Option<u64>,
    #[serde(default)]
    pub savings: Option<f64>,
    #[serde(default)]
    pub hit_rate: Option<f64>,
    #[serde(default)]
    pub provider_groq: Option<u64>,
    #[serde(default)]
    pub provider_local: Option<u64>,
    #[serde(default)]
    pub cache_hits: Option<u64>,
    #[serde(default)]
    pub latest_request: Option<RoutedRequestSummary>,
}

impl StatsSnapshot {
    /// Fold a partial update into this snapshot.
    ///
    /// Present fields replace the current value; absent ones are kept.
    pub fn merge(&mut self, patch: StatsPatch) {
        if let Some(v) = patch.requests {
            self.requests = v;
        }
        if let Some(v) = patch.savings {
            self.savings = v.max(0.0);
        }
        if let Some(v) = patch.hit_rate {
            self.hit_rate = v.clamp(0.0, 100.0);
        }
        if let Some(v) = patch.provider_groq {
            self.provider_groq = v;
        }
        if let Some(v) = patch.provider_local {
            self.provider_local = v;
        }
        if let Some(v) = patch.cache_hits {
            self.cache_hits = v;
        }
        if let Some(v) = patch.latest_request {
            self.latest_request = Some(v);
        }
    }

    /// The latest routed request, unless the router has only reported its
    /// placeholder so far.
    pub fn live_request(&self) -> Option<&RoutedRequestSummary> {
        self.latest_request.as_ref().filter(|r| !r.is_placeholder())
    }

    /// Rendering policy: with zero requests the chart shows a placeholder.
    pub fn has_traffic(&self) -> bool {
        self.requests > 0
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Issue-order sequence number of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollTicket(pub u64);

/// What happened to a poll result handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A poll issued later has already been applied.
    Stale,
}

/// Owner of the current snapshot. Only the poller's consumer writes to it.
#[derive(Debug, Default)]
pub struct StatsStore {
    snapshot: StatsSnapshot,
    last_applied: Option<PollTicket>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &StatsSnapshot {
        &self.snapshot
    }

    /// Apply a completed poll unless a newer one already landed.
    pub fn apply(&mut self, ticket: PollTicket, patch: StatsPatch) -> ApplyOutcome {
        if self.last_applied.is_some_and(|last| ticket <= last) {
            return ApplyOutcome::Stale;
        }
        self.snapshot.merge(patch);
        self.last_applied = Some(ticket);
        ApplyOutcome::Applied
    }

    /// Back to the all-zero state.
    ///
    /// `issued` is the newest ticket handed out before the reset. Results of
    /// polls up to it are dropped so they cannot resurrect pre-reset counters.
    pub fn reset(&mut self, issued: Option<PollTicket>) {
        self.snapshot = StatsSnapshot::default();
        self.last_applied = self.last_applied.max(issued);
    }

    pub fn last_applied(&self) -> Option<PollTicket> {
        self.last_applied
    }
}
