use std::process::ExitCode;

use clap::Parser;
use skinsight_lib::{cli, config, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match cli::run(cli::Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
