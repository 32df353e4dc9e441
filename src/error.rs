//! Error taxonomy shared by every router-facing operation.
//!
//! Three classes, each mapped onto a failure path of its own:
//!
//! - **Transport**: the router could not be reached or the call timed out.
//! - **Protocol**: the router answered, but not with what we expected
//!   (non-2xx status, malformed JSON, a missing `choices[0]`).
//! - **Validation**: the operator asked for something we refuse to send
//!   (empty prompt, no file selected, a submission already in flight).

use thiserror::Error;

/// Errors produced by the console's router operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("router unreachable: {0}")]
    Transport(String),
    #[error("unexpected router response: {0}")]
    Protocol(String),
    #[error("{0}")]
    Validation(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short machine-friendly name of the error class, used in log fields
    /// and in the failed-trace banner.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Validation(_) => "validation",
        }
    }
}

impl From<ureq::Error> for ConsoleError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, resp) => {
                let body = resp.into_string().unwrap_or_default();
                let body = body.trim();
                if body.is_empty() {
                    Self::Protocol(format!("HTTP {code}"))
                } else {
                    Self::Protocol(format!("HTTP {code}: {}", truncate(body, 200)))
                }
            }
            ureq::Error::Transport(t) => Self::Transport(t.to_string()),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}
