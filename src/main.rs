use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use routescope::{cli, config, logging};

#[derive(Debug, Parser)]
#[command(name = "routescope")]
#[command(about = "Operator console for an LLM cost-arbitrage router")]
struct App {
    /// Router base URL (overrides config and ROUTESCOPE_URL)
    #[arg(long, global = true)]
    url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Live dashboard, refreshed every poll interval
    Watch {
        /// Print one dashboard after the first poll and exit
        #[arg(long)]
        once: bool,
    },
    /// Fetch stats once and print them
    Stats {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Submit a prompt and show how the router handled it
    Trace {
        /// Prompt text
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Upload a document and append its text to the prompt (repeatable)
        #[arg(long = "attach", value_name = "FILE")]
        attach: Vec<PathBuf>,
        /// Declared target model sent with the request
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive harness: each line is submitted as a prompt
    Repl,
    /// Purge the router cache and reset stats
    Purge {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check router reachability and config files
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective (merged) configuration
    Show,
    /// Write a default config file to ~/.routescope/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value (e.g. `router.base_url http://host:8000`)
    Set { key: String, value: String },
    /// Reset configuration to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    let mut cfg = config::load();
    if let Some(url) = app.url {
        cfg.router.base_url = url;
    }
    logging::init(&cfg.logging)?;

    match app.command {
        Commands::Watch { once } => cli::run_watch(&cfg, once),
        Commands::Stats { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(&cfg, fmt)
        }
        Commands::Trace {
            prompt,
            attach,
            model,
        } => cli::run_trace(&cfg, &prompt.join(" "), &attach, model.as_deref()),
        Commands::Repl => cli::repl::run(&cfg),
        Commands::Purge { yes } => cli::run_purge(&cfg, yes),
        Commands::Health => cli::run_health(&cfg),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_trace(args: &[&str]) -> (Vec<String>, Vec<PathBuf>, Option<String>) {
        let app = App::try_parse_from(args).unwrap();
        match app.command {
            Commands::Trace {
                prompt,
                attach,
                model,
            } => (prompt, attach, model),
            other => panic!("expected trace, got {other:?}"),
        }
    }

    #[test]
    fn trace_flags_after_prompt_are_parsed() {
        let (prompt, attach, model) =
            parse_trace(&["routescope", "trace", "a", "b", "--attach", "f"]);
        assert_eq!(prompt, ["a", "b"]);
        assert_eq!(attach, [PathBuf::from("f")]);
        assert!(model.is_none());
    }

    #[test]
    fn trace_flags_mix_with_prompt_words() {
        let (prompt, attach, model) = parse_trace(&[
            "routescope",
            "trace",
            "--model",
            "gpt-4o",
            "summarize",
            "--attach",
            "one.pdf",
            "this",
            "--attach",
            "two.txt",
        ]);
        assert_eq!(prompt, ["summarize", "this"]);
        assert_eq!(attach, [PathBuf::from("one.pdf"), PathBuf::from("two.txt")]);
        assert_eq!(model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn trace_requires_prompt() {
        assert!(App::try_parse_from(["routescope", "trace", "--attach", "f"]).is_err());
    }
}
