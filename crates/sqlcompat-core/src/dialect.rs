//! SQL dialect metadata
//!
//! Drivers describe how their dialect marks bind parameters and how an
//! analysis-only (EXPLAIN) statement is spelled. The validator rewrites
//! resolved mapper SQL using this metadata instead of hardcoding
//! per-driver logic.

use std::borrow::Cow;

/// How positional bind parameters are written in SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` for every parameter (JDBC, MySQL, SQLite)
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

impl PlaceholderStyle {
    /// Marker for the parameter at a 1-based position
    pub fn marker(&self, position: usize) -> Cow<'static, str> {
        match self {
            PlaceholderStyle::QuestionMark => Cow::Borrowed("?"),
            PlaceholderStyle::Numbered => Cow::Owned(format!("${}", position)),
        }
    }
}

/// Comment style support
#[derive(Debug, Clone, Default)]
pub struct CommentStyles {
    /// Single-line comment prefix (e.g., "--")
    pub line_comment: Option<Cow<'static, str>>,
    /// Block comment start (e.g., "/*")
    pub block_comment_start: Option<Cow<'static, str>>,
    /// Block comment end (e.g., "*/")
    pub block_comment_end: Option<Cow<'static, str>>,
}

impl CommentStyles {
    pub const fn sql_standard() -> Self {
        Self {
            line_comment: Some(Cow::Borrowed("--")),
            block_comment_start: Some(Cow::Borrowed("/*")),
            block_comment_end: Some(Cow::Borrowed("*/")),
        }
    }
}

/// Configuration for EXPLAIN functionality
///
/// Different databases have different EXPLAIN syntax. Format strings use
/// `{sql}` as the placeholder for the statement being analyzed.
#[derive(Debug, Clone)]
pub struct ExplainConfig {
    /// Plan-only EXPLAIN that never executes the statement
    pub explain_format: Cow<'static, str>,

    /// Optional EXPLAIN that executes the statement (e.g. EXPLAIN ANALYZE)
    pub analyze_format: Option<Cow<'static, str>>,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            explain_format: Cow::Borrowed("EXPLAIN {sql}"),
            analyze_format: None,
        }
    }
}

impl ExplainConfig {
    /// PostgreSQL EXPLAIN configuration
    pub fn postgresql() -> Self {
        Self {
            explain_format: Cow::Borrowed("EXPLAIN (FORMAT JSON) {sql}"),
            analyze_format: Some(Cow::Borrowed("EXPLAIN (ANALYZE, FORMAT JSON) {sql}")),
        }
    }

    /// Format the plan-only EXPLAIN SQL
    pub fn format_explain(&self, sql: &str) -> String {
        self.explain_format.replace("{sql}", sql)
    }

    /// Format the EXPLAIN ANALYZE SQL (if available)
    pub fn format_analyze(&self, sql: &str) -> Option<String> {
        self.analyze_format
            .as_ref()
            .map(|fmt| fmt.replace("{sql}", sql))
    }
}

/// Dialect information provided by a driver
#[derive(Debug, Clone)]
pub struct DialectInfo {
    /// Dialect identifier (e.g., "postgresql")
    pub id: Cow<'static, str>,
    /// Display name
    pub display_name: Cow<'static, str>,
    /// Identifier quote character (e.g., '"' for SQL standard, '`' for MySQL)
    pub identifier_quote: char,
    /// String literal quote (usually '\'')
    pub string_quote: char,
    /// How bind parameters are written
    pub placeholder_style: PlaceholderStyle,
    /// Comment styles supported
    pub comment_styles: CommentStyles,
    /// EXPLAIN configuration for analysis-only validation
    pub explain_config: ExplainConfig,
}

impl Default for DialectInfo {
    fn default() -> Self {
        Self {
            id: Cow::Borrowed("generic"),
            display_name: Cow::Borrowed("SQL"),
            identifier_quote: '"',
            string_quote: '\'',
            placeholder_style: PlaceholderStyle::QuestionMark,
            comment_styles: CommentStyles::sql_standard(),
            explain_config: ExplainConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_markers_are_one_based() {
        assert_eq!(PlaceholderStyle::Numbered.marker(1), "$1");
        assert_eq!(PlaceholderStyle::Numbered.marker(12), "$12");
        assert_eq!(PlaceholderStyle::QuestionMark.marker(3), "?");
    }

    #[test]
    fn postgres_explain_is_json_plan_only() {
        let config = ExplainConfig::postgresql();
        assert_eq!(
            config.format_explain("SELECT 1"),
            "EXPLAIN (FORMAT JSON) SELECT 1"
        );
        assert_eq!(
            config.format_analyze("SELECT 1").as_deref(),
            Some("EXPLAIN (ANALYZE, FORMAT JSON) SELECT 1")
        );
    }

    #[test]
    fn generic_dialect_has_no_analyze() {
        let dialect = DialectInfo::default();
        assert_eq!(dialect.explain_config.format_explain("SELECT 1"), "EXPLAIN SELECT 1");
        assert!(dialect.explain_config.format_analyze("SELECT 1").is_none());
    }
}
