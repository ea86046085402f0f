//! Assistant threads API client.
//!
//! Uses reqwest to call the thread, message, and run endpoints. Every call
//! carries the bearer credential and the `OpenAI-Beta: assistants=v2`
//! feature header.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::types::{
    ApiErrorBody, CreateMessageRequest, CreateRunRequest, MessageList, RunObject, ThreadMessage,
    ThreadObject,
};

/// Public endpoint of the assistant API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

const BETA_HEADER: &str = "openai-beta";
const BETA_ASSISTANTS_V2: &str = "assistants=v2";

/// Assistant API client errors.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response carried an `error` object.
    #[error("Assistant API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// An id that cannot be carried as a single URL path segment.
    #[error("Invalid path segment: {0:?}")]
    InvalidPathSegment(String),
}

/// Configuration for connecting to the assistant API.
#[derive(Clone)]
pub struct AssistantConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Secret key sent as a bearer token.
    pub api_key: String,
    /// Assistant that runs are started with.
    pub assistant_id: String,
    /// Timeout applied to each individual HTTP call.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("assistant_id", &self.assistant_id)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Assistant threads API client.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: Url,
    assistant_id: String,
}

impl AssistantClient {
    /// Create a new assistant API client.
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        if config.base_url.is_empty() {
            return Err(AssistantError::Config("base_url is empty".into()));
        }
        if config.api_key.is_empty() {
            return Err(AssistantError::Config("api_key is empty".into()));
        }
        if config.assistant_id.is_empty() {
            return Err(AssistantError::Config("assistant_id is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let token_val = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| AssistantError::Config("Invalid api_key format".into()))?;
        headers.insert(AUTHORIZATION, token_val);
        headers.insert(
            HeaderName::from_static(BETA_HEADER),
            HeaderValue::from_static(BETA_ASSISTANTS_V2),
        );

        // reqwest is built with rustls-no-provider; an `Err` here only means a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| AssistantError::Config(format!("invalid base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AssistantError::Config("base_url cannot carry a path".into()));
        }
        Ok(Self {
            http,
            base_url,
            assistant_id: config.assistant_id.clone(),
        })
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// Build the full URL for an API path given as raw segments.
    ///
    /// Each segment is percent-encoded on its own, so an id containing `/`
    /// or `..` stays one segment. Segments that URL parsing would collapse
    /// (empty, `.`, `..`) are rejected.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, AssistantError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(AssistantError::InvalidPathSegment((*bad).to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AssistantError::Config("base_url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode its JSON body.
    ///
    /// The body is inspected for an `error` key before decoding into `T`,
    /// regardless of the HTTP status code.
    async fn send<T: DeserializeOwned>(
        op: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AssistantError> {
        let resp = request.send().await?;
        let status = resp.status();
        let payload: serde_json::Value = resp.json().await?;
        debug!(op, status = status.as_u16(), %payload, "Assistant API response");

        Self::decode_payload(status.as_u16(), payload)
    }

    pub(crate) fn decode_payload<T: DeserializeOwned>(
        status: u16,
        payload: serde_json::Value,
    ) -> Result<T, AssistantError> {
        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            let body = ApiErrorBody::from_value(error);
            return Err(AssistantError::Api {
                status,
                message: body.message_or_unknown().to_string(),
            });
        }
        Ok(serde_json::from_value(payload)?)
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// Create an empty thread.
    pub async fn create_thread(&self) -> Result<ThreadObject, AssistantError> {
        let url = self.api_url(&["threads"])?;
        Self::send(
            "create_thread",
            self.http.post(url).json(&serde_json::json!({})),
        )
        .await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append a user-authored message to a thread.
    pub async fn add_user_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, AssistantError> {
        let url = self.api_url(&["threads", thread_id, "messages"])?;
        let body = CreateMessageRequest {
            role: "user",
            content,
        };
        Self::send("add_message", self.http.post(url).json(&body)).await
    }

    /// List a thread's messages, newest first.
    pub async fn list_messages(&self, thread_id: &str) -> Result<MessageList, AssistantError> {
        let url = self.api_url(&["threads", thread_id, "messages"])?;
        Self::send("list_messages", self.http.get(url)).await
    }

    // =========================================================================
    // Runs
    // =========================================================================

    /// Start a run of the configured assistant on a thread.
    pub async fn create_run(&self, thread_id: &str) -> Result<RunObject, AssistantError> {
        let url = self.api_url(&["threads", thread_id, "runs"])?;
        let body = CreateRunRequest {
            assistant_id: &self.assistant_id,
        };
        Self::send("create_run", self.http.post(url).json(&body)).await
    }

    /// Fetch the current state of a run.
    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, AssistantError> {
        let url = self.api_url(&["threads", thread_id, "runs", run_id])?;
        Self::send("get_run", self.http.get(url)).await
    }
}
