//! Resolved mapped statements and their bind parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name used for a placeholder whose token carries no usable name
pub const DEFAULT_PARAMETER_NAME: &str = "param";

/// One bound SQL parameter: a logical name and an optional declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    name: String,
    declared_type: Option<String>,
}

impl ParameterSpec {
    /// Create a parameter spec. Blank names become `param`, declared types
    /// are upper-cased and blank types are treated as absent.
    pub fn new(name: impl Into<String>, declared_type: Option<&str>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_PARAMETER_NAME.to_string()
        } else {
            name.trim().to_string()
        };
        let declared_type = declared_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_uppercase());
        Self {
            name,
            declared_type,
        }
    }

    /// Parse the inside of a `#{...}` placeholder, e.g. `id,jdbcType=integer`.
    ///
    /// Only the name and the `jdbcType` (or `type`) modifier are kept. Other
    /// modifiers such as `javaType` or `typeHandler` are ignored.
    pub fn from_token(token: &str) -> Self {
        let mut parts = token.split(',');
        let name = parts.next().unwrap_or_default();

        let declared_type = parts.find_map(|part| {
            let (key, value) = part.split_once('=')?;
            let key = key.trim();
            (key.eq_ignore_ascii_case("jdbcType") || key.eq_ignore_ascii_case("type"))
                .then_some(value)
        });

        Self::new(name, declared_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declared_type {
            Some(declared) => write!(f, "{}:{}", self.name, declared),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Category of a mapped statement, taken from its element name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Classify a statement element name, case-insensitively.
    ///
    /// Returns `None` for anything that is not one of the four DML tags.
    pub fn from_tag_name(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "select" => Some(Self::Select),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key used to drop repeated declarations of the same statement.
///
/// The declaring file is not part of the key: the same statement found
/// in two mapper files counts once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementIdentity {
    pub full_id: String,
    pub kind: StatementKind,
}

/// A mapped statement resolved to concrete SQL
///
/// Built once by the scanner and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRecord {
    local_id: String,
    namespace: String,
    kind: StatementKind,
    source_file: PathBuf,
    relative_path: PathBuf,
    resolved_sql: String,
    parameters: Vec<ParameterSpec>,
}

impl StatementRecord {
    /// Create a record. The SQL text is whitespace-normalized here.
    ///
    /// `relative_path` is the source file relative to the directory it was
    /// discovered under and is part of the record's identity.
    pub fn new(
        namespace: impl Into<String>,
        local_id: impl Into<String>,
        kind: StatementKind,
        source_file: impl Into<PathBuf>,
        relative_path: impl Into<PathBuf>,
        resolved_sql: &str,
        parameters: Vec<ParameterSpec>,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            namespace: namespace.into(),
            kind,
            source_file: source_file.into(),
            relative_path: relative_path.into(),
            resolved_sql: normalize_whitespace(resolved_sql),
            parameters,
        }
    }

    /// `namespace.local_id`, or just `local_id` when the namespace is empty
    pub fn full_id(&self) -> String {
        if self.namespace.is_empty() {
            self.local_id.clone()
        } else {
            format!("{}.{}", self.namespace, self.local_id)
        }
    }

    pub fn identity(&self) -> StatementIdentity {
        StatementIdentity {
            full_id: self.full_id(),
            kind: self.kind,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn resolved_sql(&self) -> &str {
        &self.resolved_sql
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }
}

/// Collapse line breaks, tabs and repeated spaces into single spaces and trim.
pub fn normalize_whitespace(sql: &str) -> String {
    sql.split([' ', '\n', '\r', '\t'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests;
