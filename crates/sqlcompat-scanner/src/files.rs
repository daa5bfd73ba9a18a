//! Mapper file discovery

use crate::{DEFAULT_EXCLUDES, ScanConfig, ScanError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file selected for scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Path relative to the scanned directory
    pub relative: PathBuf,
}

/// Include/exclude filter over `/`-separated relative paths
#[derive(Debug, Clone)]
pub struct FileMatcher {
    includes: GlobSet,
    excludes: GlobSet,
}

impl FileMatcher {
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let excludes = DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(config.excludes.iter().cloned());
        Ok(Self {
            includes: build_set(config.effective_includes())?,
            excludes: build_set(excludes)?,
        })
    }

    pub fn is_included(&self, relative: &str) -> bool {
        self.includes.is_match(relative) && !self.excludes.is_match(relative)
    }

    pub(crate) fn is_excluded(&self, relative: &str) -> bool {
        self.excludes.is_match(relative)
    }
}

fn build_set(patterns: impl IntoIterator<Item = String>) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim().replace('\\', "/");
        if pattern.is_empty() {
            continue;
        }
        // A trailing slash selects everything below the directory
        let normalized = if pattern.ends_with('/') {
            format!("{}**", pattern)
        } else {
            pattern.clone()
        };
        let glob = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .build()
            .map_err(|source| ScanError::Pattern { pattern, source })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::Pattern {
        pattern: "<set>".to_string(),
        source,
    })
}

/// List files under `root` accepted by `matcher`, sorted by path.
///
/// Excluded directories are not descended into.
pub fn discover_files(root: &Path, matcher: &FileMatcher) -> Result<Vec<DiscoveredFile>, ScanError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !matcher.is_excluded(&relative_str(root, entry.path()))
        });

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_str(root, entry.path());
        if matcher.is_included(&relative) {
            files.push(DiscoveredFile {
                path: entry.path().to_path_buf(),
                relative: PathBuf::from(relative),
            });
        }
    }

    Ok(files)
}

fn relative_str(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
