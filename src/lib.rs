pub mod cli;
pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Logs go to stderr so stdout stays
/// clean for JSON output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
