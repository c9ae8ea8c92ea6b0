// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset: our own progress at info, while the HTTP and
/// HTML parsing stacks only speak up on warnings.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,html5ever=warn,selectors=warn";

/// Sets up the logging framework using tracing_subscriber.
/// Log lines go to stderr; filters come from `RUST_LOG`, or `DEFAULT_DIRECTIVES`.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Logging setup complete.");
}
