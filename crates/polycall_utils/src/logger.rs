use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_FILTER: &str = "polycall=info";

static INIT: Once = Once::new();

/// Initialise the tracing subscriber once per process.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_logging(default_filter: Option<&str>) {
    INIT.call_once(|| {
        let fallback = default_filter.unwrap_or(DEFAULT_FILTER);
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    });
}
