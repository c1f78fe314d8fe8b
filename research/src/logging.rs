//! Diagnostic tracing for the research binaries.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. Product output
//! (batch summaries, the step trace, exported JSON) goes to stdout or files
//! and is unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const FILTER_ENV: &str = "RUST_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Load `.env` and initialize the tracing subscriber.
///
/// `.env` is read first so a `RUST_LOG` set there applies. Defaults to
/// `warn` if unset. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=research=debug research run components.txt
/// ```
pub fn init() {
    // A missing .env is fine; settings may come from the environment.
    let _ = dotenvy::dotenv();

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter_from_env(FILTER_ENV))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

fn filter_from_env(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
