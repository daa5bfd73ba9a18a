//! Condition pre-scan
//!
//! Collects the property paths referenced by `test` attributes so the
//! synthetic parameter object can expose them as nested leaves before the
//! statement is rendered.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlcompat_templates::XmlElement;

static CONDITION_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][\w.]+").expect("condition token pattern is valid")
});

const CONDITION_ELEMENTS: &[&str] = &["if", "when"];

const KEYWORDS: &[&str] = &["null", "and", "or", "not", "true", "false", "empty"];

/// Id under which a statement's hints are stored
pub fn hint_key(namespace: &str, id: &str) -> String {
    let id = id.trim();
    let id = if id.is_empty() { "<unnamed>" } else { id };
    if namespace.is_empty() || id.contains('.') {
        id.to_string()
    } else {
        format!("{}.{}", namespace, id)
    }
}

/// Property paths used in conditional `test` attributes anywhere below `statement`
pub fn collect_condition_paths(statement: &XmlElement) -> IndexSet<String> {
    let mut paths = IndexSet::new();
    for element in statement.descendants() {
        if !CONDITION_ELEMENTS.contains(&element.name.as_str()) {
            continue;
        }
        let Some(test) = element.attribute("test") else {
            continue;
        };
        for token in CONDITION_TOKEN.find_iter(test) {
            let token = token.as_str();
            if !KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(token)) {
                paths.insert(token.to_string());
            }
        }
    }
    paths
}
