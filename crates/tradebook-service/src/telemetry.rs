//! # Tracing Bootstrap
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=tradebook_db=trace` - Trace the ledger layer only
//! - unset - `info` everywhere, `debug` for tradebook crates, `warn` for sqlx

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,tradebook=debug,sqlx=warn";

/// Installs the global subscriber.
///
/// Fails only when a subscriber is already installed.
pub fn init_tracing() -> Result<(), TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish()
        .try_init()
}
