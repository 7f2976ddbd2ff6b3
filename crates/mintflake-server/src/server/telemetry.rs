//! # Logging
//!
//! Console logging through `tracing` and `tracing_subscriber::fmt`.
//!
//! The filter is read from `RUST_LOG` and defaults to `info`. Useful levels:
//!
//! - `info`: startup, shutdown, listener details.
//! - `warn`/`error`: rejected handshakes, malformed requests, clock
//!   regressions, accept failures.
//! - `debug`: connection open/close.
//! - `trace`: every served batch and every allocation.
//!
//! ```bash
//! RUST_LOG=mintflake_server=debug,mintflake=warn cargo run
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;

    Ok(())
}
