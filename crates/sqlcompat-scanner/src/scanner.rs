//! Mapped statement extraction

use crate::files::{DiscoveredFile, FileMatcher, discover_files};
use crate::hints::{collect_condition_paths, hint_key};
use crate::{ScanConfig, ScanError};
use indexmap::{IndexMap, IndexSet};
use sqlcompat_core::{StatementIdentity, StatementKind, StatementRecord};
use sqlcompat_templates::{
    MapperDocument, MapperTemplateEngine, SELECT_KEY_SUFFIX, SampleParams, SkippedStatement,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A statement dropped because an identical identity was already scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateStatement {
    pub full_id: String,
    pub kind: StatementKind,
    pub file: PathBuf,
}

/// Everything a scan produced
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Deduplicated records in directory, file and document order
    pub statements: Vec<Arc<StatementRecord>>,
    /// Configured directories that did not exist
    pub skipped_directories: Vec<PathBuf>,
    pub duplicates: Vec<DuplicateStatement>,
    /// Statements the template engine could not compile
    pub skipped_statements: Vec<SkippedStatement>,
    pub files_scanned: usize,
}

struct LoadedMapper {
    file: DiscoveredFile,
    document: MapperDocument,
    hints: IndexMap<String, IndexSet<String>>,
}

/// Discovers mapper files and turns their statements into records
pub struct MapperScanner {
    config: ScanConfig,
}

impl MapperScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every configured directory.
    ///
    /// Missing directories are skipped with a warning. A file that cannot
    /// be read or compiled aborts the scan.
    #[tracing::instrument(skip(self), fields(directories = self.config.directories.len()))]
    pub fn scan(&self) -> Result<ScanOutcome, ScanError> {
        let matcher = FileMatcher::from_config(&self.config)?;
        let engine = MapperTemplateEngine::new();
        let mut outcome = ScanOutcome::default();
        let mut loaded = Vec::new();

        // Directory order decides which duplicate is kept
        for directory in &self.config.directories {
            if !directory.is_dir() {
                tracing::warn!(directory = %directory.display(), "mapper directory does not exist, skipping");
                outcome.skipped_directories.push(directory.clone());
                continue;
            }
            for file in discover_files(directory, &matcher)? {
                loaded.push(load_mapper(&engine, file)?);
            }
        }
        outcome.files_scanned = loaded.len();

        let mut seen: IndexSet<StatementIdentity> = IndexSet::new();
        for mapper in &loaded {
            let built = engine
                .build(&mapper.document)
                .map_err(|source| ScanError::Parse {
                    path: mapper.file.path.clone(),
                    source,
                })?;
            outcome.skipped_statements.extend(built.skipped);

            for statement in &built.statements {
                if statement.id().contains(SELECT_KEY_SUFFIX) {
                    continue;
                }
                let Some(kind) = StatementKind::from_tag_name(statement.tag()) else {
                    tracing::debug!(statement = statement.id(), tag = statement.tag(), "ignoring unclassifiable statement");
                    continue;
                };

                let (namespace, local_id) = split_id(statement.id(), mapper.document.namespace());
                let params = match mapper.hints.get(statement.id()) {
                    Some(paths) => SampleParams::from_paths(paths),
                    None => SampleParams::new(),
                };
                let bound = statement.bound_sql(&params);

                let record = StatementRecord::new(
                    namespace,
                    local_id,
                    kind,
                    absolute(&mapper.file.path),
                    mapper.file.relative.clone(),
                    &bound.sql,
                    bound.parameters,
                );

                if !seen.insert(record.identity()) {
                    tracing::info!(
                        statement = %record.full_id(),
                        kind = %kind,
                        file = %record.source_file().display(),
                        "Skipping duplicate mapped statement"
                    );
                    outcome.duplicates.push(DuplicateStatement {
                        full_id: record.full_id(),
                        kind,
                        file: record.source_file().to_path_buf(),
                    });
                    continue;
                }

                tracing::debug!(
                    statement = %record.full_id(),
                    kind = %kind,
                    file = %record.relative_path().display(),
                    parameters = record.parameters().len(),
                    sql = record.resolved_sql(),
                    "resolved mapped statement"
                );
                outcome.statements.push(Arc::new(record));
            }
        }

        tracing::info!(
            files = outcome.files_scanned,
            statements = outcome.statements.len(),
            duplicates = outcome.duplicates.len(),
            "mapper scan complete"
        );
        Ok(outcome)
    }
}

fn load_mapper(
    engine: &MapperTemplateEngine,
    file: DiscoveredFile,
) -> Result<LoadedMapper, ScanError> {
    let xml = std::fs::read_to_string(&file.path).map_err(|source| ScanError::Read {
        path: file.path.clone(),
        source,
    })?;
    let document = engine
        .load(&xml, &file.path)
        .map_err(|source| ScanError::Parse {
            path: file.path.clone(),
            source,
        })?;

    let mut hints = IndexMap::new();
    for element in document.statement_elements() {
        let id = element.attribute("id").unwrap_or_default();
        hints.insert(
            hint_key(document.namespace(), id),
            collect_condition_paths(element),
        );
    }

    tracing::debug!(file = %file.path.display(), namespace = document.namespace(), "loaded mapper");
    Ok(LoadedMapper {
        file,
        document,
        hints,
    })
}

/// Split a qualified id at its last dot. An id without a dot belongs to
/// the document namespace.
fn split_id<'a>(id: &'a str, document_namespace: &'a str) -> (&'a str, &'a str) {
    match id.rsplit_once('.') {
        Some((namespace, local)) => (namespace, local),
        None => (document_namespace, id),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
