//! Miniblog Server: resource server with token authentication and
//! policy-based authorization.
//!
//! Main entry point that loads configuration, sets up logging, and
//! dispatches to the server or the policy management commands.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use miniblog_core::config::{AppConfig, LogFormat};
use miniblog_core::error::AppError;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = cli.execute(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

/// Load configuration from an explicit file, or from `config/` using the
/// `MINIBLOG_ENV` overlay.
fn load_configuration(path: Option<&str>) -> Result<AppConfig, AppError> {
    match path {
        Some(path) => AppConfig::load_file(path),
        None => {
            let env = std::env::var("MINIBLOG_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
