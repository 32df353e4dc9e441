//! `routescope repl`: the interactive trace harness.
//!
//! Each plain line is appended to the prompt buffer and submitted. Slash
//! commands manage attachments and the dashboard. The stats poller runs in the
//! background for the whole session; uploads run on their own threads and are
//! spliced into the buffer when they arrive.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::ingest::{DocumentIngestor, PendingIngest};
use crate::purge::TerminalConfirm;
use crate::render;
use crate::trace::TraceSession;

/// One parsed REPL input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Skip,
    Attach(PathBuf),
    Stats,
    Purge,
    Clear,
    Show,
    Help,
    Unknown(String),
    Prompt(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Skip;
    }
    if matches!(trimmed.to_ascii_lowercase().as_str(), "exit" | "quit") {
        return ReplCommand::Quit;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Prompt(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "quit" | "exit" => ReplCommand::Quit,
        "attach" => ReplCommand::Attach(PathBuf::from(arg)),
        "stats" => ReplCommand::Stats,
        "purge" => ReplCommand::Purge,
        "clear" => ReplCommand::Clear,
        "prompt" => ReplCommand::Show,
        "help" => ReplCommand::Help,
        _ => ReplCommand::Unknown(trimmed.to_string()),
    }
}

const HELP: &str = "\
  <text>          append to the prompt and submit
  /attach <path>  upload a document into the prompt
  /prompt         show the pending prompt
  /clear          discard the pending prompt
  /stats          show the live dashboard
  /purge          purge the router cache (asks first)
  /quit           leave";

pub fn run(config: &ConsoleConfig) -> Result<()> {
    let api = super::router(config);
    let mut console = Console::mount(Arc::clone(&api), config.poller.interval())?;
    let ingestor = DocumentIngestor::new(Arc::clone(&api));
    let mut session = TraceSession::new();
    let mut pending: Vec<PendingIngest> = Vec::new();

    println!("{}", "RouteScope interactive harness".bold().cyan());
    println!("  Router: {}", config.router.base_url);
    println!("  {}", "Type /help for commands, `exit` to quit.".dimmed());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        splice_finished(&mut pending, &mut session);
        print!("\n{} ", "routescope>".green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        splice_finished(&mut pending, &mut session);

        match parse_line(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Skip => {}
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Unknown(cmd) => {
                println!("{} unknown command {cmd}; try /help", "✗".red().bold())
            }
            ReplCommand::Attach(path) => match ingestor.spawn(&path) {
                Ok(upload) => {
                    println!("  Uploading {}...", upload.file_name().bold());
                    pending.push(upload);
                }
                Err(e) => println!("{} {e}", "✗".red().bold()),
            },
            ReplCommand::Show => {
                if session.prompt().is_empty() {
                    println!("  {}", "(prompt is empty)".dimmed());
                } else {
                    println!("{}", session.prompt());
                }
            }
            ReplCommand::Clear => {
                session.set_prompt("")?;
                println!("  {}", "Prompt cleared.".dimmed());
            }
            ReplCommand::Stats => {
                console.pump();
                print!("{}", render::dashboard(console.snapshot(), &console.chart()));
            }
            ReplCommand::Purge => {
                let mut confirm = TerminalConfirm::new(&mut input, io::stdout());
                let outcome = console.purge(&mut confirm);
                println!("{}", super::purge_notice(&outcome));
            }
            ReplCommand::Prompt(text) => {
                submit(&mut session, config, &api, &pending, &text)?;
            }
        }
        console.pump();
    }

    console.unmount();
    println!("Goodbye.");
    Ok(())
}

fn submit(
    session: &mut TraceSession,
    config: &ConsoleConfig,
    api: &Arc<dyn crate::client::RouterApi>,
    pending: &[PendingIngest],
    text: &str,
) -> Result<()> {
    for upload in pending {
        println!(
            "  {} {} is still uploading; it will join the next prompt",
            "note:".yellow().bold(),
            upload.file_name()
        );
    }
    if !session.prompt().is_empty() {
        session.append_prompt("\n")?;
    }
    session.append_prompt(text)?;
    super::drive_and_print(
        session,
        Arc::clone(api),
        &config.trace.declared_model,
        config.trace.stage_tick_ms,
    )?;
    // The next line starts a fresh prompt.
    session.set_prompt("")?;
    Ok(())
}

fn splice_finished(pending: &mut Vec<PendingIngest>, session: &mut TraceSession) {
    pending.retain_mut(|upload| match upload.try_take() {
        Some(outcome) => {
            super::print_attachment_status(&outcome);
            if let Err(e) = outcome.splice_into(session) {
                tracing::warn!(error = %e, "could not add attachment to prompt");
            }
            false
        }
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_exit_lines() {
        assert_eq!(parse_line("   \n"), ReplCommand::Skip);
        assert_eq!(parse_line("exit\n"), ReplCommand::Quit);
        assert_eq!(parse_line("QUIT"), ReplCommand::Quit);
        assert_eq!(parse_line("/quit"), ReplCommand::Quit);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(
            parse_line("/attach  docs/report.pdf \n"),
            ReplCommand::Attach(PathBuf::from("docs/report.pdf"))
        );
        assert_eq!(parse_line("/attach"), ReplCommand::Attach(PathBuf::new()));
        assert_eq!(parse_line("/stats"), ReplCommand::Stats);
        assert_eq!(parse_line("/purge"), ReplCommand::Purge);
        assert_eq!(parse_line("/clear"), ReplCommand::Clear);
        assert_eq!(parse_line("/prompt"), ReplCommand::Show);
        assert_eq!(parse_line("/nope"), ReplCommand::Unknown("/nope".to_string()));
    }

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            parse_line("  explain quicksort\r\n"),
            ReplCommand::Prompt("  explain quicksort".to_string())
        );
    }
}
