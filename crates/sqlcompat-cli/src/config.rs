//! Settings resolution
//!
//! Values come from the command line (or its environment variables), then
//! an optional TOML file, then built-in defaults.

use crate::args::Cli;
use anyhow::{Context, bail};
use serde::Deserialize;
use sqlcompat_core::ConnectionConfig;
use sqlcompat_scanner::ScanConfig;
use sqlcompat_validator::{DEFAULT_CONCURRENCY, DEFAULT_STATEMENT_TIMEOUT, ValidationOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAPPER_DIRECTORY: &str = "src/main/resources";
pub const DEFAULT_MAPPER_INCLUDE: &str = "**/*Mapper.xml";
pub const DEFAULT_REPORT_PATH: &str = "target/sql-valid-report.json";

/// Contents of a `--config` file
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub origin: DatabaseSection,
    pub target: DatabaseSection,
    pub mapper_directories: Option<Vec<PathBuf>>,
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    /// Seconds
    pub statement_timeout: Option<u64>,
    pub execute: Option<bool>,
    pub threads: Option<usize>,
    /// Empty string disables the report
    pub report: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Connection details for one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DatabaseSettings {
    fn resolve(
        label: &str,
        url: Option<&String>,
        username: Option<&String>,
        password: Option<&String>,
        section: &DatabaseSection,
    ) -> anyhow::Result<Self> {
        let Some(url) = url.or(section.url.as_ref()).filter(|u| !u.trim().is_empty()) else {
            bail!(
                "{} database URL is required (--{}-url or [{}] url)",
                label,
                label,
                label
            );
        };
        Ok(Self {
            url: url.clone(),
            username: username.or(section.username.as_ref()).cloned(),
            password: password.or(section.password.as_ref()).cloned(),
        })
    }

    pub fn connection_config(&self, label: &str) -> sqlcompat_core::Result<ConnectionConfig> {
        ConnectionConfig::from_url(
            label,
            &self.url,
            self.username.as_deref(),
            self.password.as_deref(),
        )
    }
}

/// Fully resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub origin: DatabaseSettings,
    pub target: DatabaseSettings,
    pub scan: ScanConfig,
    pub validation: ValidationOptions,
    pub report: Option<PathBuf>,
}

impl Settings {
    /// Read the config file named on the command line, if any, and merge
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    pub fn resolve(cli: &Cli, file: FileConfig) -> anyhow::Result<Self> {
        let origin = DatabaseSettings::resolve(
            "origin",
            cli.origin_url.as_ref(),
            cli.origin_username.as_ref(),
            cli.origin_password.as_ref(),
            &file.origin,
        )?;
        let target = DatabaseSettings::resolve(
            "target",
            cli.target_url.as_ref(),
            cli.target_username.as_ref(),
            cli.target_password.as_ref(),
            &file.target,
        )?;

        let directories = first_non_empty(cli.mapper_dirs.clone(), file.mapper_directories)
            .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_MAPPER_DIRECTORY)]);
        let includes = first_non_empty(cli.includes.clone(), file.includes)
            .unwrap_or_else(|| vec![DEFAULT_MAPPER_INCLUDE.to_string()]);
        let excludes = first_non_empty(cli.excludes.clone(), file.excludes).unwrap_or_default();

        let statement_timeout = cli
            .statement_timeout
            .or(file.statement_timeout)
            .map_or(DEFAULT_STATEMENT_TIMEOUT, Duration::from_secs);
        let validation = ValidationOptions {
            execute: cli.execute || file.execute.unwrap_or(false),
            statement_timeout,
            concurrency: cli.threads.or(file.threads).unwrap_or(DEFAULT_CONCURRENCY),
        };

        let report = if cli.no_report {
            None
        } else {
            match (&cli.report, file.report) {
                (Some(path), _) => Some(path.clone()),
                (None, Some(path)) if path.trim().is_empty() => None,
                (None, Some(path)) => Some(PathBuf::from(path)),
                (None, None) => Some(PathBuf::from(DEFAULT_REPORT_PATH)),
            }
        };

        Ok(Self {
            origin,
            target,
            scan: ScanConfig::new(directories)
                .with_includes(includes)
                .with_excludes(excludes),
            validation,
            report,
        })
    }
}

fn first_non_empty<T>(cli: Vec<T>, file: Option<Vec<T>>) -> Option<Vec<T>> {
    if !cli.is_empty() {
        return Some(cli);
    }
    file.filter(|values| !values.is_empty())
}
