//! The per-request relay pipeline.
//!
//! `thread → message → run → poll → reply`, executed sequentially for each
//! incoming chat message. Nothing is shared between requests except the
//! read-only client and configuration held by [`Relay`].

use serde::Serialize;
use thiserror::Error;
use tracing::{Span, debug, field, info, instrument, warn};

use threadrelay_core::{CitationSanitizer, PollOutcome, PollPolicy, poll_until};

use crate::assistant::{AssistantClient, AssistantError, ReplyText, RunStatus};

/// Reply text used when a completed run left no readable assistant text.
pub const MISSING_REPLY_TEXT: &str = "No response content was found.";

/// Successful relay result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayReply {
    pub response: String,
    pub thread_id: String,
}

/// Relay failures. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to create thread: {0}")]
    UpstreamCreate(String),

    #[error("Failed to add message: {0}")]
    UpstreamMessage(String),

    #[error("Failed to start run: {0}")]
    UpstreamRun(String),

    #[error("Failed to check run status: {0}")]
    UpstreamStatus(String),

    #[error("Failed to fetch messages: {0}")]
    UpstreamMessages(String),

    #[error("The assistant run failed.")]
    RunFailed { thread_id: String },

    #[error("The assistant run expired.")]
    RunExpired { thread_id: String },

    #[error("No response received. Status: {status}")]
    RunTimedOutOrUnknown { thread_id: String, status: String },

    #[error("Server error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Thread the caller can retry in, for failures that happen after the
    /// run was started.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::RunFailed { thread_id }
            | Self::RunExpired { thread_id }
            | Self::RunTimedOutOrUnknown { thread_id, .. } => Some(thread_id),
            _ => None,
        }
    }

    /// Map a client error onto the step that produced it. Only error
    /// payloads from the API are step errors; transport and decoding
    /// failures are internal.
    fn upstream(err: AssistantError, step: fn(String) -> Self) -> Self {
        match err {
            AssistantError::Api { message, .. } => step(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Relays chat messages to the assistant API.
#[derive(Debug, Clone)]
pub struct Relay {
    client: AssistantClient,
    poll: PollPolicy,
    sanitizer: CitationSanitizer,
}

impl Relay {
    pub fn new(client: AssistantClient, poll: PollPolicy) -> Self {
        Self {
            client,
            poll,
            sanitizer: CitationSanitizer::default(),
        }
    }

    /// Replace the reply sanitizer.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: CitationSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Send `message` into `thread_id` (or a new thread) and wait for the
    /// assistant's reply.
    ///
    /// An empty `thread_id` is treated as absent.
    #[instrument(skip_all, fields(thread_id = field::Empty))]
    pub async fn handle(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<RelayReply, RelayError> {
        let thread_id = match thread_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.create_thread().await?,
        };
        Span::current().record("thread_id", thread_id.as_str());

        let added = self
            .client
            .add_user_message(&thread_id, message)
            .await
            .map_err(|e| RelayError::upstream(e, RelayError::UpstreamMessage))?;
        debug!(%thread_id, message_id = ?added.id, "Added user message");

        let run_id = self.start_run(&thread_id).await?;
        let status = self.wait_for_run(&thread_id, &run_id).await?;

        match status {
            RunStatus::Completed => {
                let response = self.fetch_reply(&thread_id).await?;
                info!(%thread_id, %run_id, "Relayed assistant reply");
                Ok(RelayReply {
                    response,
                    thread_id,
                })
            }
            RunStatus::Failed => Err(RelayError::RunFailed { thread_id }),
            RunStatus::Expired => Err(RelayError::RunExpired { thread_id }),
            other => Err(RelayError::RunTimedOutOrUnknown {
                thread_id,
                status: other.to_string(),
            }),
        }
    }

    async fn create_thread(&self) -> Result<String, RelayError> {
        let thread = self
            .client
            .create_thread()
            .await
            .map_err(|e| RelayError::upstream(e, RelayError::UpstreamCreate))?;
        let id = thread
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::UpstreamCreate("thread id missing from response".into()))?;
        info!(thread_id = %id, "Created thread");
        Ok(id)
    }

    async fn start_run(&self, thread_id: &str) -> Result<String, RelayError> {
        let run = self
            .client
            .create_run(thread_id)
            .await
            .map_err(|e| RelayError::upstream(e, RelayError::UpstreamRun))?;
        let id = run
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::UpstreamRun("run id missing from response".into()))?;
        debug!(thread_id, run_id = %id, assistant_id = self.client.assistant_id(), "Started run");
        Ok(id)
    }

    /// Poll the run until it reaches a terminal status or the budget is
    /// spent, returning the last status seen.
    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, RelayError> {
        let client = &self.client;
        let outcome = poll_until(
            &self.poll,
            move |attempt| async move {
                let run = client.get_run(thread_id, run_id).await?;
                let status = run.status();
                debug!(thread_id, run_id, attempt, %status, "Run status");
                Ok::<_, AssistantError>(status)
            },
            RunStatus::is_terminal,
        )
        .await
        .map_err(|e| RelayError::upstream(e, RelayError::UpstreamStatus))?;

        match &outcome {
            PollOutcome::Ready { value, attempts } => {
                debug!(thread_id, run_id, attempts, status = %value, "Run reached terminal status");
            }
            PollOutcome::Exhausted { .. } => {
                warn!(
                    thread_id,
                    run_id,
                    attempts = outcome.attempts(),
                    "Run did not finish within the poll budget"
                );
            }
        }
        Ok(outcome.last().cloned().unwrap_or(RunStatus::Unreported))
    }

    async fn fetch_reply(&self, thread_id: &str) -> Result<String, RelayError> {
        let messages = self
            .client
            .list_messages(thread_id)
            .await
            .map_err(|e| RelayError::upstream(e, RelayError::UpstreamMessages))?;

        let reply = messages.latest_assistant_reply();
        if !matches!(reply, ReplyText::Found(_)) {
            warn!(thread_id, ?reply, "No assistant text in thread, using fallback");
        }
        Ok(self.sanitizer.sanitize(&reply.or_fallback(MISSING_REPLY_TEXT)))
    }
}
