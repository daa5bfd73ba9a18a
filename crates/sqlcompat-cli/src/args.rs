//! Command-line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Validate MyBatis mapper SQL against an origin and a target database
#[derive(Debug, Parser)]
#[command(name = "sqlcompat", version, about)]
pub struct Cli {
    /// Origin database URL (e.g. postgresql://host:5432/app)
    #[arg(long, env = "SQLCOMPAT_ORIGIN_URL")]
    pub origin_url: Option<String>,

    #[arg(long, env = "SQLCOMPAT_ORIGIN_USERNAME")]
    pub origin_username: Option<String>,

    #[arg(long, env = "SQLCOMPAT_ORIGIN_PASSWORD", hide_env_values = true)]
    pub origin_password: Option<String>,

    /// Target database URL
    #[arg(long, env = "SQLCOMPAT_TARGET_URL")]
    pub target_url: Option<String>,

    #[arg(long, env = "SQLCOMPAT_TARGET_USERNAME")]
    pub target_username: Option<String>,

    #[arg(long, env = "SQLCOMPAT_TARGET_PASSWORD", hide_env_values = true)]
    pub target_password: Option<String>,

    /// Directory to scan for mapper files (repeatable)
    #[arg(long = "mapper-dir", env = "SQLCOMPAT_MAPPER_DIRS", value_delimiter = ',')]
    pub mapper_dirs: Vec<PathBuf>,

    /// Glob of mapper files to take, relative to each directory (repeatable)
    #[arg(long = "include", env = "SQLCOMPAT_INCLUDES", value_delimiter = ',')]
    pub includes: Vec<String>,

    /// Glob of files or directories to skip (repeatable)
    #[arg(long = "exclude", env = "SQLCOMPAT_EXCLUDES", value_delimiter = ',')]
    pub excludes: Vec<String>,

    /// Per-statement timeout in seconds, 0 for none
    #[arg(long, env = "SQLCOMPAT_STATEMENT_TIMEOUT", value_name = "SECONDS")]
    pub statement_timeout: Option<u64>,

    /// Execute statements in a rolled-back transaction instead of EXPLAIN
    #[arg(long, env = "SQLCOMPAT_EXECUTE")]
    pub execute: bool,

    /// Statements validated concurrently per database
    #[arg(long, env = "SQLCOMPAT_THREADS")]
    pub threads: Option<usize>,

    /// Where to write the JSON report
    #[arg(long, env = "SQLCOMPAT_REPORT", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Do not write a report
    #[arg(long, conflicts_with = "report")]
    pub no_report: bool,

    /// TOML configuration file
    #[arg(long, env = "SQLCOMPAT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SQLCOMPAT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write daily-rolling JSON logs to this directory
    #[arg(long, env = "SQLCOMPAT_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeatable_and_delimited_lists() {
        let cli = Cli::try_parse_from([
            "sqlcompat",
            "--mapper-dir",
            "a",
            "--mapper-dir",
            "b,c",
            "--include",
            "**/*Mapper.xml",
            "--threads",
            "8",
            "--execute",
        ])
        .unwrap();

        assert_eq!(
            cli.mapper_dirs,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert_eq!(cli.includes, vec!["**/*Mapper.xml"]);
        assert_eq!(cli.threads, Some(8));
        assert!(cli.execute);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn report_and_no_report_conflict() {
        let err = Cli::try_parse_from(["sqlcompat", "--report", "r.json", "--no-report"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn json_log_format() {
        let cli = Cli::try_parse_from(["sqlcompat", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
