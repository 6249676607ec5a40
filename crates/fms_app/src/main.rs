mod app;
mod cli;

use std::process::ExitCode;

use clap::Parser;
use fms_core::logging;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();

    let (config, config_fallback) = match app::load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("fms-export: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Without a log directory, diagnostics fall back to plain stderr.
    let log_guard = match logging::init_logging(&config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("fms-export: file logging disabled: {e:#}");
            None
        }
    };
    info!("Starting fms-export v{VERSION}");
    if let Some(e) = config_fallback {
        if log_guard.is_some() {
            warn!("Unusable config file, using defaults: {e}");
        } else {
            eprintln!("fms-export: unusable config file, using defaults: {e}");
        }
    }

    match app::run(&args, &config).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed: {e:#}");
            eprintln!("fms-export: {e:#}");
            ExitCode::FAILURE
        }
    }
}
