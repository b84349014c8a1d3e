//! Process-wide tracing setup for binaries built on this crate.

use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Environment variable that switches log output to JSON when set to `json`.
pub const LOG_FORMAT_ENV: &str = "CINCH_LOG_FORMAT";

/// Install a stderr subscriber once for the process.
///
/// `RUST_LOG` controls filtering, falling back to `default_filter` when unset
/// or unparsable. Later calls are no-ops, as is a call made after another
/// global subscriber was installed.
pub fn init_tracing(default_filter: &str) {
    TRACING_INIT.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        let json = std::env::var(LOG_FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let result = if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}
