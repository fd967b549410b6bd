//! Tracing subscriber presets.
//!
//! The engine only emits `tracing` events; the embedding process decides
//! where they go. `LOGGING_MODE=prod` selects the compact production
//! preset, any other value (or none) the verbose development preset.
//! `RUST_LOG` overrides the default filter either way.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let prod = std::env::var("LOGGING_MODE")
        .is_ok_and(|mode| mode.eq_ignore_ascii_case("prod"));

    let _ = if prod {
        tracing_subscriber::registry()
            .with(fmt::layer().compact().with_target(false))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry().with(fmt::layer().pretty()).with(filter).try_init()
    };
}
