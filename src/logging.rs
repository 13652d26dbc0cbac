//! Tracing subscriber setup.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, RelayConfig};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_tracing(config: &RelayConfig) -> anyhow::Result<()> {
    let env_override = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.log_filter, env_override.as_deref());

    let installed = match config.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.log_format,
        pid = std::process::id(),
        "=== toolrelay starting ==="
    );
    Ok(())
}

fn build_filter(configured: &str, env_override: Option<&str>) -> EnvFilter {
    env_override
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("toolrelay=info,warn"))
}
