//! End-to-end console flows against a mock router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockRouter, unreachable_config};
use routescope::chart::SegmentKind;
use routescope::client::{RouterApi, RouterClient};
use routescope::console::Console;
use routescope::purge::{Assume, PurgeOutcome};

fn api(config: &routescope::config::ConsoleConfig) -> Arc<dyn RouterApi> {
    Arc::new(RouterClient::from_config(config))
}

// ---------------------------------------------------------------------------
// Stats polling
// ---------------------------------------------------------------------------

#[test]
fn poll_merges_router_stats() {
    let router = MockRouter::start(|req| match req.url.as_str() {
        "/api/stats" => (
            200,
            r#"{"requests": 12, "savings": 0.0421, "hit_rate": 0,
                "provider_groq": 7, "provider_local": 3, "cache_hits": 2,
                "latest_request": {"provider": "GROQ (Llama-3)", "type": "Simple"}}"#
                .to_string(),
        ),
        _ => (404, "{}".to_string()),
    });
    let config = router.config();
    let mut console = Console::mount(api(&config), Duration::from_secs(3600)).unwrap();
    let report = console.wait_and_pump(Duration::from_secs(5));
    assert_eq!(report.applied, 1);

    let snap = console.snapshot();
    assert_eq!(snap.requests, 12);
    assert_eq!(snap.savings, 0.0421);
    assert_eq!(snap.hit_rate, 0.0);
    assert_eq!(snap.live_request().unwrap().provider, "GROQ (Llama-3)");

    let chart = console.chart();
    assert_eq!(chart.value(SegmentKind::Groq), 7);
    assert_eq!(chart.value(SegmentKind::Local), 3);
    assert_eq!(chart.value(SegmentKind::Cached), 2);
    assert_eq!(chart.total(), 12);
}

#[test]
fn placeholder_request_is_not_live_traffic() {
    let router = MockRouter::start(|_| {
        (
            200,
            r#"{"requests": 0, "latest_request": {"type": "Waiting...", "provider": "Waiting..."}}"#
                .to_string(),
        )
    });
    let config = router.config();
    let mut console = Console::detached(api(&config));
    console.refresh_once().unwrap();
    assert!(console.snapshot().live_request().is_none());
    assert!(!console.snapshot().has_traffic());
}

#[test]
fn failed_poll_keeps_previous_numbers() {
    let router = MockRouter::start(|_| (500, "boom".to_string()));
    let config = router.config();
    let mut console = Console::detached(api(&config));
    let err = console.refresh_once().unwrap_err();
    assert!(err.is_protocol());
    assert!(err.to_string().contains("HTTP 500"));
    assert_eq!(console.snapshot().requests, 0);
}

#[test]
fn malformed_stats_are_protocol_errors() {
    let router = MockRouter::start(|_| (200, "not json".to_string()));
    let client = RouterClient::from_config(&router.config());
    assert!(client.fetch_stats().unwrap_err().is_protocol());
}

#[test]
fn unreachable_router_is_transport_error() {
    let client = RouterClient::from_config(&unreachable_config());
    assert!(client.fetch_stats().unwrap_err().is_transport());
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

#[test]
fn purge_clears_router_and_resets_locally() {
    let router = MockRouter::start(|req| match req.url.as_str() {
        "/api/stats" => (200, r#"{"requests": 9, "savings": 1.5, "hit_rate": 40}"#.to_string()),
        "/api/cache/clear" => (200, r#"{"status": "Cache cleared"}"#.to_string()),
        _ => (404, "{}".to_string()),
    });
    let config = router.config();
    let mut console = Console::detached(api(&config));
    console.refresh_once().unwrap();
    assert_eq!(console.snapshot().requests, 9);

    assert_eq!(console.purge(&mut Assume(true)), PurgeOutcome::Purged);
    let snap = console.snapshot();
    assert_eq!(snap.requests, 0);
    assert_eq!(snap.savings, 0.0);
    assert_eq!(snap.hit_rate, 0.0);

    let clears = router.requests_to("/api/cache/clear");
    assert_eq!(clears.len(), 1);
    assert_eq!(clears[0].method, "POST");
}

#[test]
fn declined_purge_sends_nothing() {
    let router = MockRouter::start(|_| (200, "{}".to_string()));
    let config = router.config();
    let mut console = Console::detached(api(&config));
    assert_eq!(console.purge(&mut Assume(false)), PurgeOutcome::Declined);
    assert!(router.requests_to("/api/cache/clear").is_empty());
}

#[test]
fn purge_failure_is_surfaced() {
    let router = MockRouter::start(|req| match req.url.as_str() {
        "/api/stats" => (200, r#"{"requests": 4}"#.to_string()),
        _ => (503, "cache backend down".to_string()),
    });
    let config = router.config();
    let mut console = Console::detached(api(&config));
    console.refresh_once().unwrap();

    match console.purge(&mut Assume(true)) {
        PurgeOutcome::LocalOnly(e) => {
            assert!(e.is_protocol());
            assert!(e.to_string().contains("503"));
        }
        other => panic!("expected LocalOnly, got {other:?}"),
    }
    assert_eq!(console.snapshot().requests, 0);
}
