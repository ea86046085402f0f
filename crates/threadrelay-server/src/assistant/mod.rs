//! Assistant threads API integration.
//!
//! Provides a reqwest-based client for the threads, messages, and runs
//! endpoints of the assistant API (v2 beta).

mod client;
pub mod types;


pub use client::{AssistantClient, AssistantConfig, AssistantError, DEFAULT_API_BASE_URL};
pub use types::{MessageList, ReplyText, RunObject, RunStatus, ThreadObject};
