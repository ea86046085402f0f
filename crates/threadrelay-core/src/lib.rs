//! `threadrelay` Core Library
//!
//! Shared functionality for the relay service:
//! - Citation tag sanitizing for assistant replies
//! - Bounded fixed-interval polling
//! - Tracing/logging initialization
//! - Common error types

pub mod citation;
pub mod error;
pub mod poll;
pub mod tracing_init;

pub use citation::CitationSanitizer;
pub use error::{Error, Result};
pub use poll::{PollOutcome, PollPolicy, poll_until};
