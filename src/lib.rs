//! RouteScope: an operator console for an LLM cost-arbitrage router.
//!
//! The console polls the router's aggregate stats into a [`store`], projects
//! them onto a model-distribution [`chart`], and runs [`trace`] sessions that
//! submit a prompt and show which model actually served it.

pub mod chart;
pub mod cli;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod poller;
pub mod purge;
pub mod render;
pub mod store;
pub mod trace;
