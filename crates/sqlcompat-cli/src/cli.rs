//! `sqlcompat` - MyBatis mapper SQL compatibility validator

mod app;
mod args;
mod config;
mod logging;

use args::Cli;
use clap::Parser;
use config::Settings;
use logging::LoggingConfig;
use sqlcompat_validator::CancellationToken;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match logging::init(LoggingConfig::from_cli(&cli)) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to initialize logging: {:#}", err);
            return ExitCode::from(1);
        }
    };

    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!("{:#}", err);
            return ExitCode::from(1);
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping validation");
            on_interrupt.cancel();
        }
    });

    match app::run(&settings, cancel).await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::from(1)
        }
    }
}
