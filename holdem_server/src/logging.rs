//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed
//! here captures those records alongside the binary's own `tracing`
//! events. Log levels are configurable via the `RUST_LOG` env var.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
