//! Throwaway router for integration tests.
//!
//! Binds `127.0.0.1:0`, records every request, and answers through a
//! per-test handler.

#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use routescope::config::ConsoleConfig;
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

type Handler = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

pub struct MockRouter {
    server: Arc<Server>,
    port: u16,
    requests: Arc<Mutex<Vec<Recorded>>>,
    thread: Option<JoinHandle<()>>,
}

impl MockRouter {
    pub fn start(handler: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind mock router"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("mock router has an IP address")
            .port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let thread = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = Vec::new();
                    let _ = request.as_reader().read_to_end(&mut body);
                    let recorded = Recorded {
                        method: request.method().to_string(),
                        url: request.url().to_string(),
                        content_type: request
                            .headers()
                            .iter()
                            .find(|h| h.field.equiv("Content-Type"))
                            .map(|h| h.value.to_string()),
                        body,
                    };
                    let (status, text) = handler(&recorded);
                    requests.lock().unwrap().push(recorded);
                    let response = Response::from_string(text)
                        .with_status_code(status)
                        .with_header(
                            Header::from_bytes("Content-Type", "application/json").unwrap(),
                        );
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            port,
            requests,
            thread: Some(thread),
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Default config pointed at this router.
    pub fn config(&self) -> ConsoleConfig {
        let mut config = ConsoleConfig::default();
        config.router.base_url = self.url();
        config
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == path)
            .collect()
    }
}

impl Drop for MockRouter {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// A config pointing at a port nothing listens on.
pub fn unreachable_config() -> ConsoleConfig {
    let mut config = ConsoleConfig::default();
    config.router.base_url = "http://127.0.0.1:9".to_string();
    config.timeouts.stats_ms = 500;
    config.timeouts.completion_ms = 500;
    config.timeouts.upload_ms = 500;
    config.timeouts.purge_ms = 500;
    config
}

pub fn completion(model: &str, content: &str) -> String {
    serde_json::json!({
        "model": model,
        "choices": [{ "message": { "content": content } }],
    })
    .to_string()
}
