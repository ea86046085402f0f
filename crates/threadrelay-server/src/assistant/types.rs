//! Assistant API request and response types.
//!
//! Every response field the relay reads is optional here; absence is
//! resolved by the caller with an explicit fallback instead of failing
//! deserialization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error object returned under the `error` key of a failed call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Interpret the value found under `error`.
    ///
    /// A bare string is taken as the message; any other non-object shape
    /// yields an empty body.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(message) => Self {
                message: Some(message.clone()),
                ..Self::default()
            },
            other => serde_json::from_value(other.clone()).unwrap_or_default(),
        }
    }

    pub fn message_or_unknown(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown error")
    }
}

/// `POST /threads/{id}/messages` body.
#[derive(Debug, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// `POST /threads/{id}/runs` body.
#[derive(Debug, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

/// Thread object (subset of fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadObject {
    #[serde(default)]
    pub id: Option<String>,
}

/// Run object (subset of fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<RunStatus>,
}

impl RunObject {
    /// The reported status, or [`RunStatus::Unreported`] when absent.
    pub fn status(&self) -> RunStatus {
        self.status.clone().unwrap_or(RunStatus::Unreported)
    }
}

/// Lifecycle state of a run.
///
/// Unknown values are kept verbatim so they can be reported back to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    /// The run object carried no status.
    Unreported,
    Other(String),
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            "expired" => Self::Expired,
            "incomplete" => Self::Incomplete,
            "" => Self::Unreported,
            _ => Self::Other(value),
        }
    }
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Incomplete => "incomplete",
            Self::Unreported => "",
            Self::Other(s) => s,
        }
    }

    /// Statuses after which the relay stops polling.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /threads/{id}/messages` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Option<Vec<ThreadMessage>>,
}

/// A message in a thread (subset of fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<MessageContent>>,
}

/// One content part of a message. Only text parts carry `text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageContent {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub value: Option<String>,
}

/// What was found when looking for the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyText {
    Found(String),
    /// No message in the list was authored by the assistant.
    NoAssistantMessage,
    /// The assistant message had no content parts.
    NoContent,
    /// The first content part had no `text.value`.
    NoText,
}

impl ReplyText {
    /// The reply text, or `fallback` for every kind of absence.
    pub fn or_fallback(self, fallback: &str) -> String {
        match self {
            Self::Found(text) => text,
            Self::NoAssistantMessage | Self::NoContent | Self::NoText => fallback.to_string(),
        }
    }
}

impl MessageList {
    /// Text of the first assistant-authored message.
    ///
    /// The list endpoint returns newest messages first, so the first
    /// assistant entry is the reply to the run that just completed.
    pub fn latest_assistant_reply(&self) -> ReplyText {
        let Some(message) = self
            .data
            .iter()
            .flatten()
            .find(|m| m.role.as_deref() == Some("assistant"))
        else {
            return ReplyText::NoAssistantMessage;
        };
        let Some(first) = message.content.as_deref().and_then(<[_]>::first) else {
            return ReplyText::NoContent;
        };
        first
            .text
            .as_ref()
            .and_then(|t| t.value.clone())
            .map_or(ReplyText::NoText, ReplyText::Found)
    }
}
