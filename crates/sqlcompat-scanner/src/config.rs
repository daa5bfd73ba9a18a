use std::path::PathBuf;

/// Include pattern used when none is configured
pub const DEFAULT_INCLUDE: &str = "**/*.xml";

/// Version-control and editor artifacts that are never scanned
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/.DS_Store",
    "**/CVS",
    "**/CVS/**",
    "**/SCCS",
    "**/SCCS/**",
    "**/.svn",
    "**/.svn/**",
    "**/.git",
    "**/.git/**",
    "**/.hg",
    "**/.hg/**",
    "**/.bzr",
    "**/.bzr/**",
];

/// Where to look for mapper files and which ones to take
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub directories: Vec<PathBuf>,
    /// Glob patterns relative to each directory; empty means [`DEFAULT_INCLUDE`]
    pub includes: Vec<String>,
    /// Glob patterns relative to each directory, applied after [`DEFAULT_EXCLUDES`]
    pub excludes: Vec<String>,
}

impl ScanConfig {
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self {
            directories,
            ..Default::default()
        }
    }

    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = includes;
        self
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Configured includes, or the default when none are set
    pub fn effective_includes(&self) -> Vec<String> {
        let includes: Vec<String> = self
            .includes
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if includes.is_empty() {
            vec![DEFAULT_INCLUDE.to_string()]
        } else {
            includes
        }
    }
}
