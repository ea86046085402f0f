//! threadrelay
//!
//! Relays chat messages from a web client to an assistant threads API and
//! returns the sanitized reply.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use threadrelay_server::assistant::{AssistantClient, AssistantConfig, DEFAULT_API_BASE_URL};
use threadrelay_server::routes::{AppState, build_router};
use threadrelay_server::{Relay, RelayConfig};

#[derive(Parser)]
#[command(name = "threadrelay")]
#[command(version, about = "Chat relay for the assistant threads API")]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:5001", env = "THREADRELAY_ADDR")]
    addr: SocketAddr,

    /// Assistant API secret key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Assistant that handles every run
    #[arg(long, env = "ASSISTANT_ID")]
    assistant_id: String,

    /// Assistant API base URL
    #[arg(long, default_value = DEFAULT_API_BASE_URL, env = "THREADRELAY_API_BASE_URL")]
    api_base_url: String,

    /// Milliseconds between run status checks
    #[arg(long, default_value_t = 1000, env = "THREADRELAY_POLL_INTERVAL_MS")]
    poll_interval_ms: u64,

    /// Maximum number of run status checks per request
    #[arg(long, default_value_t = 30, env = "THREADRELAY_POLL_MAX_ATTEMPTS")]
    poll_max_attempts: u32,

    /// Timeout in seconds for each upstream HTTP call
    #[arg(long, default_value_t = 60, env = "THREADRELAY_REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// Allowed CORS origin (repeatable). Any origin is allowed when unset.
    #[arg(long = "cors-origin", env = "THREADRELAY_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Log level filter (e.g. "info", "debug").
    #[arg(long, default_value = "info", env = "THREADRELAY_LOG_LEVEL")]
    log_level: String,

    /// Extra regex removed from replies (repeatable), on top of the
    /// built-in citation tag rule.
    #[arg(long = "strip-pattern", env = "THREADRELAY_STRIP_PATTERNS", value_delimiter = ';')]
    strip_patterns: Vec<String>,

    /// Output logs as JSON.
    #[arg(long, env = "THREADRELAY_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    threadrelay_core::tracing_init::init_tracing(&args.log_level, args.log_json)?;

    let assistant = AssistantConfig {
        base_url: args.api_base_url,
        api_key: args.api_key,
        assistant_id: args.assistant_id,
        request_timeout: Duration::from_secs(args.request_timeout),
    };
    let config = RelayConfig::new(args.addr, assistant)?
        .with_poll(
            Duration::from_millis(args.poll_interval_ms),
            args.poll_max_attempts,
        )?
        .with_cors_origins(&args.cors_origins)?
        .with_strip_patterns(&args.strip_patterns)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.addr,
        api = %config.assistant.base_url,
        assistant_id = %config.assistant.assistant_id,
        poll_interval_ms = args.poll_interval_ms,
        poll_max_attempts = config.poll.max_attempts,
        poll_max_wait_secs = config.poll.max_wait().as_secs(),
        sanitizer_rules = config.sanitizer.rule_count(),
        "Starting threadrelay"
    );

    let client = AssistantClient::new(&config.assistant)?;
    let state = AppState {
        relay: Arc::new(Relay::new(client, config.poll).with_sanitizer(config.sanitizer.clone())),
    };
    let app = build_router(state, config.cors_layer());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("threadrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received terminate signal, shutting down"),
    }
}
