//! threadrelay Server Library
//!
//! HTTP relay between a web chat client and an assistant threads API:
//! - Startup configuration and validation
//! - reqwest client for the remote threads/runs/messages endpoints
//! - The per-request relay pipeline (thread → message → run → poll → reply)
//! - axum routes, CORS, and error responses

pub mod assistant;
pub mod config;
pub mod relay;
pub mod routes;

pub use config::RelayConfig;
pub use relay::{Relay, RelayError, RelayReply};
