//! Terminal rendering for the dashboard and trace harness.
//!
//! Every function returns a `String` so callers decide where it goes and
//! tests can inspect it. Colors come from `colored`, which turns itself off
//! when stdout is not a terminal or `NO_COLOR` is set.

use colored::{ColoredString, Colorize};

use crate::chart::{ChartSeries, SegmentKind};
use crate::store::StatsSnapshot;
use crate::trace::classify::{Complexity, Tint};
use crate::trace::{self, TraceFailure, TraceResult};

const RULE_WIDTH: usize = 60;
const BAR_WIDTH: usize = 30;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Shown in place of the chart before any request has been routed.
pub const NO_DATA_PLACEHOLDER: &str = "Waiting for data...";
/// Shown in place of the live dispatcher line.
pub const NO_TRAFFIC_PLACEHOLDER: &str = "Waiting for incoming traffic...";

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Full dashboard: metric cards, model distribution, live dispatcher.
pub fn dashboard(snapshot: &StatsSnapshot, chart: &ChartSeries) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "RouteScope Live Dashboard".bold().cyan()));
    out.push_str(&format!("{}\n\n", "=".repeat(RULE_WIDTH)));
    out.push_str(&metric_cards(snapshot));
    out.push('\n');
    out.push_str(&distribution(snapshot, chart));
    out.push('\n');
    out.push_str(&dispatcher(snapshot));
    out
}

pub fn metric_cards(snapshot: &StatsSnapshot) -> String {
    format!(
        "  {} {}\n  {} {} {}\n  {} {}\n",
        "Total Requests:".bold(),
        format_number(snapshot.requests),
        "Est. Savings:  ".bold(),
        format_savings(snapshot.savings).green(),
        "vs Pure GPT-4o".dimmed(),
        "Cache Hit Rate:".bold(),
        format_percent(snapshot.hit_rate),
    )
}

/// Model distribution bars, or the placeholder when nothing has been routed.
pub fn distribution(snapshot: &StatsSnapshot, chart: &ChartSeries) -> String {
    let mut out = format!("{}\n", "Model Distribution".bold().cyan());
    if !snapshot.has_traffic() {
        out.push_str(&format!("  {}\n", NO_DATA_PLACEHOLDER.dimmed()));
        return out;
    }
    for segment in &chart.segments {
        let pct = chart.pct(segment.kind);
        out.push_str(&format!(
            "  {:<14} {} {:>6} ({:.0}%)\n",
            segment.kind.legend(),
            segment_color(segment.kind, &bar(pct)),
            format_number(segment.value),
            pct,
        ));
    }
    out
}

/// The "type → provider" line for the most recent routed request.
pub fn dispatcher(snapshot: &StatsSnapshot) -> String {
    let mut out = format!("{}\n", "Live Dispatcher".bold().cyan());
    match snapshot.live_request() {
        Some(req) => {
            let provider = truncate(&req.provider, 40);
            let provider = if req.is_local() {
                provider.magenta().bold()
            } else {
                provider.cyan().bold()
            };
            out.push_str(&format!("  {} → {}\n", req.kind, provider));
        }
        None => out.push_str(&format!("  {}\n", NO_TRAFFIC_PLACEHOLDER.dimmed())),
    }
    out
}

fn bar(pct: f64) -> String {
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn segment_color(kind: SegmentKind, s: &str) -> ColoredString {
    match kind {
        SegmentKind::Groq => s.cyan(),
        SegmentKind::Local => s.magenta(),
        SegmentKind::Cached => s.yellow(),
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// One frame of the in-progress view.
pub fn trace_progress(tick: usize, ticks_per_stage: usize) -> String {
    format!(
        "{} {}",
        SPINNER[tick % SPINNER.len()].cyan(),
        trace::stage_at(tick, ticks_per_stage)
    )
}

pub fn trace_result(result: &TraceResult) -> String {
    let route = result.route();
    let mut out = format!("{}\n", "Route Analysis".bold().cyan());
    for stage in result.completed_stages() {
        out.push_str(&format!("  {} {}\n", "✓".green().bold(), stage));
    }
    out.push('\n');

    let mut destination = format!(
        "  {} {} {}",
        "Destination:".bold(),
        tint(route.tint, &route.label).bold(),
        complexity_badge(route.complexity),
    );
    if result.is_cached {
        destination.push_str(&format!(" {}", "⚡ CACHED".yellow().bold()));
    }
    out.push_str(&destination);
    out.push('\n');
    out.push_str(&format!("  {} {}ms\n\n", "Latency:    ".bold(), result.duration_ms));
    out.push_str(&format!("{}\n{}\n", "Response".bold().cyan(), result.content));
    out
}

pub fn trace_failure(failure: &TraceFailure) -> String {
    format!(
        "{} {}\n  {} {}\n  {} {}ms\n",
        "✗".red().bold(),
        "Route analysis failed".red().bold(),
        format!("{}:", failure.error.kind()).bold(),
        failure.error,
        "after".dimmed(),
        failure.duration_ms,
    )
}

/// Map a route tint slot onto a terminal color.
pub fn tint(t: Tint, s: &str) -> ColoredString {
    match t {
        Tint::Purple => s.magenta(),
        Tint::Indigo => s.blue(),
        Tint::Primary => s.cyan(),
        Tint::Neutral => s.white(),
    }
}

fn complexity_badge(c: Complexity) -> ColoredString {
    let badge = format!("[{c}]");
    match c {
        Complexity::High => badge.red(),
        Complexity::Low => badge.green(),
    }
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

/// A ✓/✗ status line.
pub fn status_line(name: &str, ok: bool, detail: &str) -> String {
    let icon = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    format!("  {icon} {:<16} {detail}", name)
}

/// Snapshot plus chart as a JSON document.
pub fn stats_json(snapshot: &StatsSnapshot, chart: &ChartSeries) -> serde_json::Value {
    let segments: Vec<_> = chart
        .segments
        .iter()
        .map(|s| {
            serde_json::json!({
                "name": s.kind.legend(),
                "value": s.value,
                "pct": chart.pct(s.kind),
            })
        })
        .collect();
    serde_json::json!({
        "snapshot": snapshot,
        "chart": segments,
    })
}

pub fn format_savings(savings: f64) -> String {
    format!("${savings:.4}")
}

/// Whole percentages print without decimals.
pub fn format_percent(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{pct:.0}%")
    } else {
        format!("{pct:.1}%")
    }
}

/// Format a number with comma separators for readability.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
