//! Diagnostic logging.
//!
//! Log lines go to stderr (or `logging.file`) so they never interleave with
//! the dashboard on stdout. `RUST_LOG` wins over the configured level.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::schema::LoggingConfig;

/// Filter used when neither `RUST_LOG` nor the config gives a usable one.
const FALLBACK_FILTER: &str = "warn";

/// Build the filter: `RUST_LOG` first, then the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber. Calling it twice is harmless; the first
/// subscriber stays in place.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_names(false)
        .compact();

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(env_filter(config))
                .with(layer.with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(env_filter(config))
            .with(layer.with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_falls_back() {
        let config = LoggingConfig {
            level: "not a [valid filter".to_string(),
            file: None,
        };
        // Must not panic regardless of RUST_LOG in the test environment.
        let _ = env_filter(&config);
    }

    #[test]
    fn init_twice_is_ok() {
        let config = LoggingConfig::default();
        assert!(init(&config).is_ok());
        assert!(init(&config).is_ok());
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let config = LoggingConfig {
            level: "info".to_string(),
            file: Some("/definitely/not/a/dir/routescope.log".into()),
        };
        assert!(init(&config).is_err());
    }
}
