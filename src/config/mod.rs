/// Configuration system for routescope.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::ConsoleConfig::default()`]
/// 2. **User global config**: `~/.routescope/config.toml`
/// 3. **Project local config**: `.routescope.toml` in the current directory
/// 4. **Environment variables**: `ROUTESCOPE_*` overrides (highest precedence)
///
/// Later layers override earlier ones at the key level: the TOML layers are
/// merged as value trees before deserialization, so a project file that
/// only sets `router.base_url` keeps the global file's timeouts.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::ConsoleConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved console configuration.
pub fn load() -> ConsoleConfig {
    let layers = [global_config_path(), project_config_path()];
    let mut config = resolve_layers(layers.into_iter().filter_map(load_toml_value));
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Read a TOML file into a raw value tree.
///
/// Missing or malformed files are skipped; the console must still start
/// against a router with nothing but defaults.
fn load_toml_value(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str::<toml::Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Fold TOML layers over the defaults and deserialize the result.
///
/// A layer whose values do not fit the schema is skipped as a whole; the
/// layers before and after it still apply.
fn resolve_layers(layers: impl IntoIterator<Item = toml::Value>) -> ConsoleConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());
    for layer in layers {
        let mut candidate = merged.clone();
        merge_values(&mut candidate, layer);
        match candidate.clone().try_into::<ConsoleConfig>() {
            Ok(_) => merged = candidate,
            Err(e) => tracing::debug!(error = %e, "ignoring config layer with invalid values"),
        }
    }
    merged.try_into().unwrap_or_default()
}

/// Deep-merge `overlay` into `base`: tables merge key by key, any other
/// value replaces what was there.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.routescope/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".routescope").join("config.toml"))
}

/// Path to the project local config: `.routescope.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".routescope.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `ROUTESCOPE_URL`: router base URL
/// - `ROUTESCOPE_MODEL`: declared target model for trace sessions
/// - `ROUTESCOPE_POLL_MS`: stats poll period
/// - `ROUTESCOPE_LOG`: default log filter
///
/// `lookup` is injected so tests never touch process-wide state.
fn apply_env_overrides(config: &mut ConsoleConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("ROUTESCOPE_URL")
        && !val.is_empty()
    {
        config.router.base_url = val;
    }
    if let Some(val) = lookup("ROUTESCOPE_MODEL")
        && !val.is_empty()
    {
        config.trace.declared_model = val;
    }
    if let Some(val) = lookup("ROUTESCOPE_POLL_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.poller.interval_ms = ms;
    }
    if let Some(val) = lookup("ROUTESCOPE_LOG")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.routescope/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.routescope/ directory")?;
    }

    fs::write(&path, ConsoleConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key in the global config file.
///
/// Supports dotted keys like `router.base_url`. The key must exist in the
/// schema; the value is parsed according to the type of the current value.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&ConsoleConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Refuse to write a file the loader would then discard.
    let _: ConsoleConfig = root
        .clone()
        .try_into()
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Keys that are absent from a serialized config until first set.
const OPTIONAL_KEYS: &[&str] = &["logging.file"];

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected a table above '{key}'"))?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None if OPTIONAL_KEYS.contains(&key) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key: {key}"),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
