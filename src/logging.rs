//! Tracing subscriber setup

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter from `RUST_LOG` when set, otherwise from the configured level
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aqiroute={}", config.level)))
}

/// Install the global subscriber. Logs go to stderr so tables on stdout stay clean.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.format.as_str() {
        "json" => registry.with(layer.json()).try_init()?,
        "compact" => registry.with(layer.compact()).try_init()?,
        _ => registry.with(layer.pretty()).try_init()?,
    }
    Ok(())
}
