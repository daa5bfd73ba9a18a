//! One validation run: resolve databases, scan, validate, report

use crate::config::{DatabaseSettings, Settings};
use anyhow::Context;
use sqlcompat_connection::DriverConnectionFactory;
use sqlcompat_drivers::DriverRegistry;
use sqlcompat_scanner::MapperScanner;
use sqlcompat_validator::{
    CancellationToken, DatabaseTarget, ValidationEngine, log_outcome, run_validation, write_report,
};
use std::process::ExitCode;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Passed => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::from(1),
            Outcome::Interrupted => ExitCode::from(130),
        }
    }
}

pub async fn run(settings: &Settings, cancel: CancellationToken) -> anyhow::Result<Outcome> {
    let registry = DriverRegistry::with_defaults();
    let origin = database_target("origin", &settings.origin, &registry)?;
    let target = database_target("target", &settings.target, &registry)?;

    let scanner = MapperScanner::new(settings.scan.clone());
    let scanned = tokio::task::spawn_blocking(move || scanner.scan())
        .await
        .context("Mapper scan task failed")?
        .context("Failed to scan mapper files")?;

    if scanned.statements.is_empty() {
        tracing::warn!("No mapper statements found. Check mapper directories, includes and excludes.");
        return Ok(Outcome::Passed);
    }

    let engine = ValidationEngine::new(settings.validation.clone());
    let run = match run_validation(&engine, &origin, &target, &scanned.statements, &cancel).await {
        Ok(run) => run,
        Err(err) => {
            tracing::error!("{}", err);
            return Ok(Outcome::Interrupted);
        }
    };

    log_outcome(&run);
    let written = write_report(&run, settings.report.as_deref());

    if !run.passed() {
        tracing::error!("Validation failed for {} statement(s)", run.failures());
        return Ok(Outcome::Failed);
    }

    let report = written.map_or_else(|| "none".to_string(), |path| path.display().to_string());
    tracing::info!(
        "SQL compatibility validation passed for {} statement(s). Report: {}",
        run.total(),
        report
    );
    Ok(Outcome::Passed)
}

/// Build the pass target for one configured database without connecting
fn database_target(
    label: &str,
    settings: &DatabaseSettings,
    registry: &DriverRegistry,
) -> anyhow::Result<DatabaseTarget> {
    let config = settings
        .connection_config(label)
        .with_context(|| format!("Invalid {} database configuration", label))?;
    let driver = registry
        .resolve(&config)
        .with_context(|| format!("Unsupported {} database", label))?;

    tracing::debug!(database = label, driver = driver.id(), "resolved database driver");
    Ok(DatabaseTarget::new(
        label,
        driver.build_connection_string(&config),
        driver.dialect_info(),
        DriverConnectionFactory::new(driver, config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use crate::args::Cli;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn settings(origin_url: &str, mapper_dir: &Path) -> Settings {
        let cli = Cli::try_parse_from([
            "sqlcompat",
            "--origin-url",
            origin_url,
            "--target-url",
            "postgresql://localhost:5432/target",
            "--mapper-dir",
            mapper_dir.to_str().unwrap(),
            "--no-report",
        ])
        .unwrap();
        Settings::resolve(&cli, FileConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn no_statements_is_a_pass() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings("postgresql://localhost:5432/origin", dir.path());

        let outcome = run(&settings, CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, Outcome::Passed);
    }

    #[tokio::test]
    async fn unknown_scheme_fails_before_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings("oracle://localhost:1521/orcl", dir.path());

        let err = run(&settings, CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.to_string(), "Unsupported origin database");
        assert!(format!("{:#}", err).contains("No database driver for 'oracle'"));
    }

    #[tokio::test]
    async fn malformed_mapper_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BrokenMapper.xml"), "<mapper namespace=\"x\"><select id=\"a\">").unwrap();
        let settings = settings("postgresql://localhost:5432/origin", dir.path());

        let err = run(&settings, CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to scan mapper files");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Passed.exit_code(), ExitCode::SUCCESS);
        assert_eq!(Outcome::Failed.exit_code(), ExitCode::from(1));
        assert_eq!(Outcome::Interrupted.exit_code(), ExitCode::from(130));
    }
}
