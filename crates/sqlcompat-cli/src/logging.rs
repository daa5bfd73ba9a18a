//! Logging setup for the `sqlcompat` binary
//!
//! Console output is human-readable or JSON. A daily-rolling JSON file can
//! be added with `--log-dir`. `RUST_LOG` overrides the default filter.

use crate::args::{Cli, LogFormat};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "warn,sqlcompat=info,sqlcompat_validator=info,sqlcompat_scanner=info,sqlcompat_templates=warn,sqlcompat_connection=warn,sqlcompat_driver_postgres=warn";

const LOG_FILE_PREFIX: &str = "sqlcompat.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub console_format: LogFormat,

    /// Directory for JSON log files, if any
    pub log_dir: Option<PathBuf>,

    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_format: LogFormat::Pretty,
            log_dir: None,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            console_format: cli.log_format,
            log_dir: cli.log_dir.clone(),
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped and must be
/// held until the program exits.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let mut layers = Vec::new();

    let console_layer = match config.console_format {
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_filter(config.env_filter())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_filter(config.env_filter())
            .boxed(),
    };
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(config.env_filter())
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = ?config.log_dir,
        format = ?config.console_format,
        "Logging initialized"
    );
    Ok(guard)
}
