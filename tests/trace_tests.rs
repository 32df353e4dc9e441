//! Trace sessions and document ingestion against a mock router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockRouter, completion, unreachable_config};
use routescope::client::RouterClient;
use routescope::ingest::DocumentIngestor;
use routescope::trace::classify::{Complexity, RouteFamily};
use routescope::trace::{TraceSession, TraceState};

// ---------------------------------------------------------------------------
// Trace sessions
// ---------------------------------------------------------------------------

#[test]
fn hello_is_routed_to_groq() {
    let router = MockRouter::start(|_| (200, completion("llama3-70b", "hi")));
    let client = RouterClient::from_config(&router.config());

    let mut session = TraceSession::with_prompt("hello");
    session.submit(&client, "gpt-4o").unwrap();

    let result = session.result().expect("session succeeded");
    assert_eq!(result.model_id, "llama3-70b");
    assert_eq!(result.content, "hi");
    assert!(!result.is_cached);
    let route = result.route();
    assert_eq!(route.label, "Groq Llama-3");
    assert_eq!(route.family, RouteFamily::GroqLlama);
    assert_eq!(route.complexity, Complexity::Low);

    let sent = router.requests_to("/v1/chat/completions");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "POST");
    let body = sent[0].body_json();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hello");
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[test]
fn cached_response_is_flagged() {
    let router = MockRouter::start(|_| (200, completion("cached-gpt-4o", "from cache")));
    let client = RouterClient::from_config(&router.config());

    let mut session = TraceSession::with_prompt("what is rust?");
    session.submit(&client, "gpt-4o").unwrap();

    let result = session.result().unwrap();
    assert!(result.is_cached);
    assert_eq!(result.route().label, "OpenAI GPT-4o");
    assert_eq!(result.route().complexity, Complexity::High);
}

#[test]
fn router_cache_suffix_is_flagged() {
    let router = MockRouter::start(|_| (200, completion("llama-3.1-8b-instant (Cached)", "ok")));
    let client = RouterClient::from_config(&router.config());
    let mut session = TraceSession::with_prompt("again");
    session.submit(&client, "gpt-4o").unwrap();
    assert!(session.result().unwrap().is_cached);
}

#[test]
fn empty_choices_fail_the_session() {
    let router = MockRouter::start(|_| (200, r#"{"model": "llama3-70b", "choices": []}"#.to_string()));
    let client = RouterClient::from_config(&router.config());
    let mut session = TraceSession::with_prompt("hello");
    match session.submit(&client, "gpt-4o").unwrap() {
        TraceState::Failed(f) => assert!(f.error.is_protocol()),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn server_error_fails_the_session() {
    let router = MockRouter::start(|_| (500, r#"{"detail": "provider exploded"}"#.to_string()));
    let client = RouterClient::from_config(&router.config());
    let mut session = TraceSession::with_prompt("hello");
    match session.submit(&client, "gpt-4o").unwrap() {
        TraceState::Failed(f) => {
            assert!(f.error.is_protocol());
            assert!(f.error.to_string().contains("provider exploded"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn unreachable_router_fails_the_session() {
    let client = RouterClient::from_config(&unreachable_config());
    let mut session = TraceSession::with_prompt("hello");
    let state = session.submit(&client, "gpt-4o").unwrap();
    assert!(matches!(state, TraceState::Failed(f) if f.error.is_transport()));
    assert!(!session.is_submitting());
}

#[test]
fn empty_prompt_makes_no_request() {
    let router = MockRouter::start(|_| (200, completion("llama3-70b", "hi")));
    let client = RouterClient::from_config(&router.config());
    let mut session = TraceSession::with_prompt("  ");
    assert!(session.submit(&client, "gpt-4o").unwrap_err().is_validation());
    assert_eq!(session.state(), &TraceState::Idle);
    assert!(router.requests().is_empty());
}

#[test]
fn threaded_drive_reaches_terminal_state() {
    let router = MockRouter::start(|_| (200, completion("mythomax-l2-13b", "local answer")));
    let client = Arc::new(RouterClient::from_config(&router.config()));
    let mut session = TraceSession::with_prompt("write a poem");
    let state = session
        .drive(client, "gpt-4o", Duration::from_millis(5), |_| {})
        .unwrap();
    assert_eq!(state.name(), "succeeded");
    assert_eq!(session.result().unwrap().route().label, "Local Mythomax 13B");
}

// ---------------------------------------------------------------------------
// Document ingestion
// ---------------------------------------------------------------------------

#[test]
fn upload_is_multipart_with_file_field() {
    let router = MockRouter::start(|_| (200, r#"{"text": "Quarterly revenue rose."}"#.to_string()));
    let ingestor = DocumentIngestor::new(Arc::new(RouterClient::from_config(&router.config())));

    let mut session = TraceSession::with_prompt("Summarize:");
    let outcome = ingestor.ingest_bytes("report.pdf", b"%PDF-1.4 fake");
    assert!(outcome.is_attached());
    outcome.splice_into(&mut session).unwrap();
    assert_eq!(
        session.prompt(),
        "Summarize:\n\n[Attached File: report.pdf]\nQuarterly revenue rose.\n\n"
    );

    let sent = router.requests_to("/api/parse-document");
    assert_eq!(sent.len(), 1);
    let content_type = sent[0].content_type.clone().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = sent[0].body_text();
    assert!(body.contains(r#"name="file"; filename="report.pdf""#));
    assert!(body.contains("%PDF-1.4 fake"));
}

#[test]
fn rejected_upload_leaves_error_marker() {
    let router = MockRouter::start(|_| (400, r#"{"detail": "Invalid PDF file"}"#.to_string()));
    let ingestor = DocumentIngestor::new(Arc::new(RouterClient::from_config(&router.config())));

    let mut session = TraceSession::with_prompt("Read this");
    let outcome = ingestor.ingest_bytes("broken.pdf", b"nope");
    assert!(!outcome.is_attached());
    outcome.splice_into(&mut session).unwrap();
    assert!(session.prompt().starts_with("Read this\n[Error uploading broken.pdf: "));
    assert!(session.prompt().contains("HTTP 400"));
}
