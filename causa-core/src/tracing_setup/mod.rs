//! Tracing setup: subscriber installation and span definitions.

pub mod spans;

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

static INIT: Once = Once::new();

/// Initialize the causa tracing subscriber.
///
/// `CAUSA_LOG` overrides the configured level, e.g.
/// `CAUSA_LOG=causa_models=debug,causa_graphs=info`.
/// Calling it more than once is a no-op, as is calling it when another
/// global subscriber is already installed.
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("CAUSA_LOG")
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

        let registry = tracing_subscriber::registry().with(filter);
        // A host application may already own the global subscriber.
        let _ = if config.json {
            registry
                .with(fmt::layer().json().with_target(true))
                .try_init()
        } else {
            registry.with(fmt::layer().with_target(true)).try_init()
        };
    });
}
