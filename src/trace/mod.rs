//! Trace session: one operator-initiated submit-and-observe cycle.
//!
//! ```text
//!            submit (non-empty)            response
//!   Idle ───────────────────────▶ Submitting ─────────▶ Succeeded
//!    ▲                                 │
//!    │  edit prompt                    │ transport / protocol error
//!    └──────────── Succeeded | Failed ◀┘
//! ```
//!
//! A session is driven in two halves so the network call can run on another
//! thread while the caller animates progress: [`TraceSession::begin`] freezes
//! the prompt and hands out a [`Submission`]; [`TraceSession::finish`] takes
//! that submission back together with the router's answer. A blocking
//! [`TraceSession::submit`] combines both.
//!
//! Failures always land in an explicit [`TraceState::Failed`]; a session never
//! stays in `Submitting` once its request has returned.
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

pub mod classify;

use crate::client::RouterApi;
use crate::client::wire::{CompletionRequest, CompletionResponse};
use crate::error::{ConsoleError, Result};
use classify::RouteDisplay;

/// Labels shown while the router is working, in display order.
pub const PROGRESS_STAGES: [&str; 3] = [
    "Scanning for PII...",
    "Calculating Complexity...",
    "Checking Cache...",
];

/// The router's answer, as the harness displays it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceResult {
    /// Model the router reports having used.
    pub model_id: String,
    pub content: String,
    /// Wall time between submit and response.
    pub duration_ms: u64,
    pub is_cached: bool,
}

impl TraceResult {
    pub fn route(&self) -> RouteDisplay {
        classify::describe(&self.model_id)
    }

    /// Completed-stage lines for the result view.
    pub fn completed_stages(&self) -> [String; 3] {
        [
            "1. PII Scan Passed".to_string(),
            format!("2. Complexity Analysis: {}", self.route().complexity),
            format!("3. Final Destination: {}", self.model_id),
        ]
    }
}

/// A terminal failure with how long the attempt took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFailure {
    pub error: ConsoleError,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceState {
    Idle,
    Submitting { started_at: Instant },
    Succeeded(TraceResult),
    Failed(TraceFailure),
}

impl TraceState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting { .. } => "submitting",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Proof of an in-flight submission, returned by [`TraceSession::begin`].
#[derive(Debug)]
pub struct Submission {
    epoch: u64,
    started_at: Instant,
    request: CompletionRequest,
}

impl Submission {
    /// The request to send to the completions endpoint.
    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

/// The harness's prompt buffer plus the state of its current submission.
#[derive(Debug, Clone)]
pub struct TraceSession {
    prompt: String,
    state: TraceState,
    epoch: u64,
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSession {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            state: TraceState::Idle,
            epoch: 0,
        }
    }

    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::new()
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn state(&self) -> &TraceState {
        &self.state
    }

    /// The result, present only in the `Succeeded` state.
    pub fn result(&self) -> Option<&TraceResult> {
        match &self.state {
            TraceState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, TraceState::Submitting { .. })
    }

    /// Replace the prompt buffer.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> Result<()> {
        self.edit(|buf| *buf = prompt.into())
    }

    /// Append to the prompt buffer.
    pub fn append_prompt(&mut self, text: &str) -> Result<()> {
        self.edit(|buf| buf.push_str(text))
    }

    /// Edit the prompt in place. Editing after a terminal state returns the
    /// session to idle; editing while submitting is refused.
    pub fn edit(&mut self, f: impl FnOnce(&mut String)) -> Result<()> {
        if self.is_submitting() {
            return Err(ConsoleError::validation(
                "prompt is frozen while a submission is in flight",
            ));
        }
        f(&mut self.prompt);
        if self.state.is_terminal() {
            self.state = TraceState::Idle;
        }
        Ok(())
    }

    /// Freeze the prompt and start a submission.
    ///
    /// Rejected without side effects if the prompt is blank or another
    /// submission is still in flight.
    pub fn begin(&mut self, declared_model: &str) -> Result<Submission> {
        if self.is_submitting() {
            return Err(ConsoleError::validation("a submission is already in flight"));
        }
        if self.prompt.trim().is_empty() {
            return Err(ConsoleError::validation("prompt is empty"));
        }

        self.epoch += 1;
        let started_at = Instant::now();
        self.state = TraceState::Submitting { started_at };
        Ok(Submission {
            epoch: self.epoch,
            started_at,
            request: CompletionRequest::single_prompt(self.prompt.clone(), declared_model),
        })
    }

    /// Settle a submission with the router's answer.
    ///
    /// A submission from an earlier epoch, or one arriving when the session is
    /// no longer submitting, is ignored.
    pub fn finish(
        &mut self,
        submission: Submission,
        outcome: Result<CompletionResponse>,
    ) -> &TraceState {
        if submission.epoch != self.epoch || !self.is_submitting() {
            tracing::debug!(epoch = submission.epoch, "ignoring superseded trace response");
            return &self.state;
        }

        let duration_ms = submission.started_at.elapsed().as_millis() as u64;
        let outcome = outcome.and_then(|resp| {
            let content = resp.first_content()?.to_string();
            Ok(TraceResult {
                is_cached: classify::is_cached_model(&resp.model),
                model_id: resp.model,
                content,
                duration_ms,
            })
        });

        self.state = match outcome {
            Ok(result) => {
                tracing::info!(
                    model = %result.model_id,
                    duration_ms = result.duration_ms,
                    cached = result.is_cached,
                    "trace succeeded"
                );
                TraceState::Succeeded(result)
            }
            Err(error) => {
                tracing::warn!(kind = error.kind(), error = %error, duration_ms, "trace failed");
                TraceState::Failed(TraceFailure { error, duration_ms })
            }
        };
        &self.state
    }

    /// Blocking submit: begin, call the router, finish.
    ///
    /// Validation errors are returned before any network call; router errors
    /// are reported through the resulting `Failed` state.
    pub fn submit(&mut self, api: &dyn RouterApi, declared_model: &str) -> Result<&TraceState> {
        let submission = self.begin(declared_model)?;
        let outcome = api.complete(submission.request());
        Ok(self.finish(submission, outcome))
    }

    /// Submit with the router call on a worker thread, invoking `on_tick`
    /// with an increasing counter every `tick` until the response arrives.
    pub fn drive(
        &mut self,
        api: Arc<dyn RouterApi>,
        declared_model: &str,
        tick: Duration,
        mut on_tick: impl FnMut(usize),
    ) -> Result<&TraceState> {
        let submission = self.begin(declared_model)?;
        let (tx, rx) = mpsc::channel();
        let request = submission.request().clone();
        let spawned = thread::Builder::new()
            .name("routescope-trace".to_string())
            .spawn(move || {
                let _ = tx.send(api.complete(&request));
            });
        if let Err(e) = spawned {
            let error = ConsoleError::transport(format!("could not start request: {e}"));
            return Ok(self.finish(submission, Err(error)));
        }

        let mut ticks = 0;
        let outcome = loop {
            on_tick(ticks);
            match rx.recv_timeout(tick) {
                Ok(outcome) => break outcome,
                Err(RecvTimeoutError::Timeout) => ticks += 1,
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(ConsoleError::transport("request worker exited without a result"));
                }
            }
        };
        Ok(self.finish(submission, outcome))
    }
}

/// Progress stage shown at animation tick `tick`; the last stage holds until
/// the response arrives.
pub fn stage_at(tick: usize, ticks_per_stage: usize) -> &'static str {
    let idx = tick / ticks_per_stage.max(1);
    PROGRESS_STAGES[idx.min(PROGRESS_STAGES.len() - 1)]
}
