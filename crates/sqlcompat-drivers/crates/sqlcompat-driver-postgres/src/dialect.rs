//! PostgreSQL dialect information

use std::borrow::Cow;

use sqlcompat_core::{CommentStyles, DialectInfo, ExplainConfig, PlaceholderStyle};

/// Dialect info for PostgreSQL: `$n` bind markers and JSON plans
pub fn postgres_dialect() -> DialectInfo {
    DialectInfo {
        id: Cow::Borrowed("postgresql"),
        display_name: Cow::Borrowed("PostgreSQL"),
        identifier_quote: '"',
        string_quote: '\'',
        placeholder_style: PlaceholderStyle::Numbered,
        comment_styles: CommentStyles::sql_standard(),
        explain_config: ExplainConfig::postgresql(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_markers_and_json_explain() {
        let dialect = postgres_dialect();
        assert_eq!(dialect.placeholder_style.marker(3), "$3");
        assert_eq!(
            dialect.explain_config.format_explain("SELECT 1"),
            "EXPLAIN (FORMAT JSON) SELECT 1"
        );
    }
}
