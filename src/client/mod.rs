//! Router HTTP client.
//!
//! The router is an opaque collaborator reachable through four endpoints plus
//! a health check. [`RouterApi`] is the seam the console, poller, and trace
//! harness are written against; [`RouterClient`] implements it with the
//! synchronous `ureq` client, one call per thread, each endpoint with its
//! own timeout from [`TimeoutConfig`].
use std::time::Duration;

pub mod multipart;
pub mod wire;

use crate::config::schema::{ConsoleConfig, RouterConfig, TimeoutConfig};
use crate::error::{ConsoleError, Result};
use crate::store::StatsPatch;
use wire::{CompletionRequest, CompletionResponse, ParseDocumentResponse};

/// Operations the console needs from the router.
pub trait RouterApi: Send + Sync {
    /// `GET stats`: a partial snapshot of the aggregate counters.
    fn fetch_stats(&self) -> Result<StatsPatch>;

    /// `POST chat/completions`.
    fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// `POST parse-document`: returns the extracted plain text.
    fn parse_document(&self, file_name: &str, data: &[u8]) -> Result<String>;

    /// `POST cache/clear`: the response body is not inspected.
    fn clear_cache(&self) -> Result<()>;

    /// `GET health`.
    fn health(&self) -> Result<()>;
}

/// `ureq`-backed [`RouterApi`].
#[derive(Debug, Clone)]
pub struct RouterClient {
    router: RouterConfig,
    timeouts: TimeoutConfig,
}

impl RouterClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self {
            router: config.router.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.router.base_url.trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        // On Windows, "localhost" may try IPv6 (::1) first and stall when the
        // router only binds IPv4.
        self.router
            .endpoint(path)
            .replacen("://localhost", "://127.0.0.1", 1)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(resp: ureq::Response, what: &str) -> Result<T> {
    resp.into_json()
        .map_err(|e| ConsoleError::protocol(format!("malformed {what} response: {e}")))
}

impl RouterApi for RouterClient {
    fn fetch_stats(&self) -> Result<StatsPatch> {
        let resp = ureq::get(&self.url(&self.router.stats_path))
            .timeout(Duration::from_millis(self.timeouts.stats_ms))
            .call()?;
        read_json(resp, "stats")
    }

    fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let resp = ureq::post(&self.url(&self.router.completions_path))
            .timeout(Duration::from_millis(self.timeouts.completion_ms))
            .send_json(request)?;
        let parsed: CompletionResponse = read_json(resp, "completion")?;
        parsed.first_content()?;
        Ok(parsed)
    }

    fn parse_document(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let body = multipart::single_file("file", file_name, data);
        let resp = ureq::post(&self.url(&self.router.parse_document_path))
            .timeout(Duration::from_millis(self.timeouts.upload_ms))
            .set("Content-Type", &body.content_type)
            .send_bytes(&body.bytes)?;
        let parsed: ParseDocumentResponse = read_json(resp, "parse-document")?;
        Ok(parsed.text)
    }

    fn clear_cache(&self) -> Result<()> {
        ureq::post(&self.url(&self.router.cache_clear_path))
            .timeout(Duration::from_millis(self.timeouts.purge_ms))
            .call()?;
        Ok(())
    }

    fn health(&self) -> Result<()> {
        ureq::get(&self.url(&self.router.health_path))
            .timeout(Duration::from_secs(5))
            .call()?;
        Ok(())
    }
}
