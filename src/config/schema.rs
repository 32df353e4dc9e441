/// Configuration schema and defaults for the routescope console.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[router]`, `[poller]`, `[timeouts]`, `[trace]` and `[logging]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override.
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level console configuration.
///
/// Maps directly to the `~/.routescope/config.toml` and `.routescope.toml`
/// file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub router: RouterConfig,
    pub poller: PollerConfig,
    pub timeouts: TimeoutConfig,
    pub trace: TraceConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [router]
// ---------------------------------------------------------------------------

/// Where the router lives and which paths it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Base URL of the router, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub stats_path: String,
    pub cache_clear_path: String,
    pub completions_path: String,
    pub parse_document_path: String,
    pub health_path: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            stats_path: "/api/stats".to_string(),
            cache_clear_path: "/api/cache/clear".to_string(),
            completions_path: "/v1/chat/completions".to_string(),
            parse_document_path: "/api/parse-document".to_string(),
            health_path: "/health".to_string(),
        }
    }
}

impl RouterConfig {
    /// Join the base URL with an endpoint path, tolerating stray slashes on
    /// either side.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

// ---------------------------------------------------------------------------
// [poller]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Period between stats polls (milliseconds).
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        // A zero period would spin the scheduler.
        Duration::from_millis(self.interval_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// [timeouts]
// ---------------------------------------------------------------------------

/// Per-endpoint request timeouts (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub stats_ms: u64,
    pub completion_ms: u64,
    pub upload_ms: u64,
    pub purge_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            stats_ms: 3000,
            completion_ms: 60_000,
            upload_ms: 30_000,
            purge_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// [trace]
// ---------------------------------------------------------------------------

/// Settings for the interactive trace harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Model id declared in every completion request. The router treats it
    /// as an arbitrage signal and may substitute a cheaper provider.
    pub declared_model: String,
    /// Redraw period of the staged progress display (milliseconds).
    pub stage_tick_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            declared_model: "gpt-4o".to_string(),
            stage_tick_ms: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Write log lines to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl ConsoleConfig {
    /// Annotated default config written by `routescope config init`.
    pub fn default_toml() -> String {
        r#"# routescope configuration
# Global: ~/.routescope/config.toml   Project: ./.routescope.toml
# Environment overrides: ROUTESCOPE_URL, ROUTESCOPE_MODEL,
# ROUTESCOPE_POLL_MS, ROUTESCOPE_LOG

[router]
base_url = "http://localhost:8000"
stats_path = "/api/stats"
cache_clear_path = "/api/cache/clear"
completions_path = "/v1/chat/completions"
parse_document_path = "/api/parse-document"
health_path = "/health"

[poller]
interval_ms = 1000

[timeouts]
stats_ms = 3000
completion_ms = 60000
upload_ms = 30000
purge_ms = 5000

[trace]
declared_model = "gpt-4o"
stage_tick_ms = 120

[logging]
level = "warn"
# file = "/tmp/routescope.log"
"#
        .to_string()
    }
}
