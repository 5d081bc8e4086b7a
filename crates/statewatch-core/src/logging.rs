#![forbid(unsafe_code)]

//! JSON log output for production builds.
//!
//! The crate emits `tracing` events unconditionally; this module only wires
//! a subscriber that prints them as JSON lines. Filtering follows `RUST_LOG`
//! (default `statewatch_core=info`).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

const DEFAULT_FILTER: &str = "statewatch_core=info";

/// Install a global JSON subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_json_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(false)
        .try_init()
        .is_ok()
}
