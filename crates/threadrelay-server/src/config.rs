//! Relay configuration.
//!
//! Built once at startup from CLI flags / environment and shared read-only
//! by every request.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use threadrelay_core::{CitationSanitizer, Error, PollPolicy, Result};
use tower_http::cors::{Any, CorsLayer};

use crate::assistant::AssistantConfig;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address.
    pub addr: SocketAddr,

    /// Upstream assistant API settings.
    pub assistant: AssistantConfig,

    /// Run status polling schedule.
    pub poll: PollPolicy,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<HeaderValue>,

    /// Reply sanitizer: the built-in citation rule plus any extra patterns.
    pub sanitizer: CitationSanitizer,
}

impl RelayConfig {
    /// Create a config with the default poll schedule and permissive CORS.
    pub fn new(addr: SocketAddr, assistant: AssistantConfig) -> Result<Self> {
        if assistant.api_key.trim().is_empty() {
            return Err(Error::Config("API key is required".into()));
        }
        if assistant.assistant_id.trim().is_empty() {
            return Err(Error::Config("assistant id is required".into()));
        }
        Ok(Self {
            addr,
            assistant,
            poll: PollPolicy::default(),
            cors_origins: Vec::new(),
            sanitizer: CitationSanitizer::default(),
        })
    }

    /// Set the poll schedule.
    pub fn with_poll(mut self, interval: Duration, max_attempts: u32) -> Result<Self> {
        self.poll = PollPolicy::new(interval, max_attempts)?;
        Ok(self)
    }

    /// Restrict CORS to the given origins.
    pub fn with_cors_origins<S: AsRef<str>>(mut self, origins: &[S]) -> Result<Self> {
        self.cors_origins = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o.as_ref())
                    .map_err(|_| Error::Config(format!("invalid CORS origin: {}", o.as_ref())))
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Strip matches of `patterns` from replies in addition to the built-in
    /// citation rule.
    pub fn with_strip_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            self.sanitizer = self.sanitizer.with_rule(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// CORS layer for the public routes.
    pub fn cors_layer(&self) -> CorsLayer {
        if self.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            CorsLayer::new()
                .allow_origin(self.cors_origins.clone())
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        }
    }
}
