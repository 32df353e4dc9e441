//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `routescope watch`: live dashboard, redrawn every poll
//! - `routescope stats`: one poll, printed as a table or JSON
//! - `routescope trace "prompt"`: one trace session with staged progress
//! - `routescope repl`: interactive trace harness
//! - `routescope purge`: clear the router cache and reset stats
//! - `routescope health`: router reachability and config presence
//! - `routescope config show|init|set|reset`: configuration management

pub mod repl;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::client::{RouterApi, RouterClient};
use crate::config::{self, ConsoleConfig};
use crate::console::Console;
use crate::ingest::DocumentIngestor;
use crate::purge::{Assume, Confirm, PurgeOutcome, TerminalConfirm};
use crate::render;
use crate::trace::{TraceSession, TraceState};

/// Output format for `stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

/// The router client for a resolved config.
pub fn router(config: &ConsoleConfig) -> Arc<dyn RouterApi> {
    Arc::new(RouterClient::from_config(config))
}

// ---------------------------------------------------------------------------
// routescope watch
// ---------------------------------------------------------------------------

/// Live dashboard. Reads `purge` and `quit` from stdin between redraws.
pub fn run_watch(config: &ConsoleConfig, once: bool) -> Result<()> {
    let interval = config.poller.interval();
    let mut console = Console::mount(router(config), interval)
        .context("Failed to start the stats poller")?;

    if once {
        let wait = Duration::from_millis(config.timeouts.stats_ms) + interval;
        if console.wait_and_pump(wait).applied == 0 {
            eprintln!(
                "{} no stats received from {}",
                "warning:".yellow().bold(),
                config.router.base_url
            );
        }
        print!("{}", render::dashboard(console.snapshot(), &console.chart()));
        return Ok(());
    }

    let lines = spawn_line_reader();
    let mut stdin_open = true;
    let mut notice: Option<String> = None;
    loop {
        console.pump();
        redraw(&console, &config.router.base_url, notice.as_deref());

        let next = if stdin_open {
            lines.recv_timeout(interval)
        } else {
            thread::sleep(interval);
            Err(RecvTimeoutError::Timeout)
        };
        match next {
            Ok(line) => match line.trim() {
                "quit" | "exit" | "q" => break,
                "purge" => {
                    let mut confirm = ChannelConfirm { lines: &lines };
                    notice = Some(purge_notice(&console.purge(&mut confirm)));
                }
                "" => {}
                other => notice = Some(format!("unknown command: {other}")),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => stdin_open = false,
        }
    }

    console.unmount();
    Ok(())
}

fn redraw(console: &Console, base_url: &str, notice: Option<&str>) {
    // Clear screen, cursor home.
    print!("\x1b[2J\x1b[H");
    print!("{}", render::dashboard(console.snapshot(), &console.chart()));
    println!();
    println!(
        "  {} {}  {} {}",
        "Router:".dimmed(),
        base_url.dimmed(),
        "Updated:".dimmed(),
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
    );
    if let Some(notice) = notice {
        println!("  {notice}");
    }
    println!("  {}", "Type `purge` or `quit` and press Enter.".dimmed());
    let _ = io::stdout().flush();
}

fn spawn_line_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let _ = thread::Builder::new()
        .name("routescope-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    rx
}

/// Confirmation read from the watch loop's stdin channel.
struct ChannelConfirm<'a> {
    lines: &'a Receiver<String>,
}

impl Confirm for ChannelConfirm<'_> {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("  {prompt} [y/N] ");
        let _ = io::stdout().flush();
        self.lines
            .recv()
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }
}

fn purge_notice(outcome: &PurgeOutcome) -> String {
    match outcome {
        PurgeOutcome::Declined => "Purge cancelled.".dimmed().to_string(),
        PurgeOutcome::Purged => format!("{} Cache purged; stats reset", "✓".green().bold()),
        PurgeOutcome::LocalOnly(e) => format!(
            "{} Router purge failed ({e}); local display reset, router state may not be cleared",
            "✗".red().bold()
        ),
    }
}

// ---------------------------------------------------------------------------
// routescope stats
// ---------------------------------------------------------------------------

/// Poll once and print the snapshot.
pub fn run_stats(config: &ConsoleConfig, format: OutputFormat) -> Result<()> {
    let mut console = Console::detached(router(config));
    console
        .refresh_once()
        .with_context(|| format!("Failed to fetch stats from {}", config.router.base_url))?;

    match format {
        OutputFormat::Table => print!("{}", render::dashboard(console.snapshot(), &console.chart())),
        OutputFormat::Json => {
            let value = render::stats_json(console.snapshot(), &console.chart());
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// routescope trace
// ---------------------------------------------------------------------------

/// Run one trace session. Attachments are ingested, in order, before submit.
pub fn run_trace(
    config: &ConsoleConfig,
    prompt: &str,
    attachments: &[PathBuf],
    model: Option<&str>,
) -> Result<()> {
    let api = router(config);
    let mut session = TraceSession::with_prompt(prompt);

    let ingestor = DocumentIngestor::new(Arc::clone(&api));
    for path in attachments {
        let outcome = ingestor.ingest_path(path)?;
        print_attachment_status(&outcome);
        outcome.splice_into(&mut session)?;
    }

    let declared = model.unwrap_or(&config.trace.declared_model);
    let succeeded = drive_and_print(&mut session, api, declared, config.trace.stage_tick_ms)?;
    if !succeeded {
        bail!("trace failed");
    }
    Ok(())
}

pub(crate) fn print_attachment_status(outcome: &crate::ingest::IngestOutcome) {
    if outcome.is_attached() {
        println!(
            "{} Attached {}",
            "✓".green().bold(),
            outcome.file_name().bold()
        );
    } else {
        println!(
            "{} Upload failed for {} (marker added to prompt)",
            "✗".red().bold(),
            outcome.file_name().bold()
        );
    }
}

/// Submit, animate the stages, print the outcome. Returns whether the
/// session succeeded.
pub(crate) fn drive_and_print(
    session: &mut TraceSession,
    api: Arc<dyn RouterApi>,
    declared_model: &str,
    stage_tick_ms: u64,
) -> Result<bool> {
    let tick = Duration::from_millis(stage_tick_ms.max(1));
    // Roughly half a second per stage.
    let ticks_per_stage = (500 / stage_tick_ms.max(1)).max(1) as usize;
    let mut stdout = io::stdout();

    let state = session.drive(api, declared_model, tick, |t| {
        let _ = write!(stdout, "\r\x1b[2K{}", render::trace_progress(t, ticks_per_stage));
        let _ = stdout.flush();
    })?;
    print!("\r\x1b[2K");

    Ok(match state {
        TraceState::Succeeded(result) => {
            print!("{}", render::trace_result(result));
            true
        }
        TraceState::Failed(failure) => {
            print!("{}", render::trace_failure(failure));
            false
        }
        TraceState::Idle | TraceState::Submitting { .. } => false,
    })
}

// ---------------------------------------------------------------------------
// routescope purge
// ---------------------------------------------------------------------------

/// Clear the router cache. Fails if the router call fails.
pub fn run_purge(config: &ConsoleConfig, yes: bool) -> Result<()> {
    let mut console = Console::detached(router(config));
    let outcome = if yes {
        console.purge(&mut Assume(true))
    } else {
        console.purge(&mut TerminalConfirm::stdio())
    };
    println!("{}", purge_notice(&outcome));
    if let PurgeOutcome::LocalOnly(e) = outcome {
        bail!("router purge failed: {e}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// routescope health
// ---------------------------------------------------------------------------

/// Check the router and the config files.
pub fn run_health(config: &ConsoleConfig) -> Result<()> {
    println!("{}", "RouteScope Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!(
        "{}",
        render::status_line(
            "Global config",
            global_exists,
            if global_exists {
                "~/.routescope/config.toml found"
            } else {
                "not found (run `routescope config init` to create)"
            },
        )
    );
    println!(
        "{}",
        render::status_line(
            "Project config",
            project_exists,
            if project_exists {
                ".routescope.toml found"
            } else {
                "none (optional)"
            },
        )
    );

    let api = router(config);
    let detail = match api.health() {
        Ok(()) => format!("reachable at {}", config.router.base_url),
        Err(e) => format!("not reachable at {}: {e}", config.router.base_url),
    };
    let reachable = detail.starts_with("reachable");
    println!("{}", render::status_line("Router", reachable, &detail));
    println!(
        "{}",
        render::status_line("Declared model", true, &config.trace.declared_model)
    );

    if let Some(path) = &config.logging.file {
        let exists = path.exists();
        println!(
            "{}",
            render::status_line(
                "Log file",
                exists,
                &if exists {
                    path.display().to_string()
                } else {
                    format!("{} (not created yet)", path.display())
                },
            )
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// routescope config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective RouteScope Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.routescope/config.toml", global_exists);
    print_source(".routescope.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "ROUTESCOPE_* environment variables".dimmed()
    );
    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.routescope/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}
