use crate::tokens::{PLACEHOLDER_OPEN, replace_tokens};
use sqlcompat_core::ParameterSpec;

/// Rendered SQL with `#{...}` placeholders turned into `?` markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSql {
    pub sql: String,
    /// One entry per `?` produced from a placeholder, in text order
    pub parameters: Vec<ParameterSpec>,
}

impl BoundSql {
    pub(crate) fn from_rendered(rendered: &str) -> Self {
        let mut parameters = Vec::new();
        let sql = replace_tokens(rendered, PLACEHOLDER_OPEN, |token| {
            parameters.push(ParameterSpec::from_token(token));
            "?".to_string()
        });
        Self { sql, parameters }
    }
}
