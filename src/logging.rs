//! Tracing setup for the `dh` binary.
//!
//! Logs go to stderr through a compact formatter so stdout stays reserved
//! for command output. `RUST_LOG` controls filtering; the default is
//! `info` for this crate and `warn` for everything else.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "warn,doc_harness=info,dh=info";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
