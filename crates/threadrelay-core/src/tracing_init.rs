//! Tracing/logging initialization.
//!
//! `RUST_LOG` wins when set; otherwise every relay crate logs at the
//! requested level. Output is human-readable or JSON lines.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Filter directive enabling `level` for the relay crates and HTTP tracing.
pub fn default_filter(level: &str) -> String {
    format!(
        "threadrelay={level},threadrelay_server={level},threadrelay_core={level},tower_http={level}"
    )
}

/// Resolve the filter: `RUST_LOG` if set and valid, else [`default_filter`].
pub fn resolve_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(level)))
        .map_err(|e| Error::Config(format!("invalid log level {level:?}: {e}")))
}

/// Install the global tracing subscriber.
///
/// * `level` -- default level when `RUST_LOG` is not set (e.g. `"info"`).
/// * `log_json` -- emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(level: &str, log_json: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(resolve_filter(level)?);
    let installed = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| Error::Config(format!("tracing already initialised: {e}")))
}
