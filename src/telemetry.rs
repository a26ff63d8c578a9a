//! Opt-in tracing subscriber wiring.
//!
//! Library code only emits `tracing` events; binaries that embed the crate
//! call [`init`] once at startup to get formatted output with env-filter
//! control (`RUST_LOG`) and span-aware error context.

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the default subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}
