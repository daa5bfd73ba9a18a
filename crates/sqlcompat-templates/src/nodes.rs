//! Dynamic SQL node tree
//!
//! Statement bodies are compiled once into [`SqlNode`]s with `<include>`
//! fragments already inlined, then rendered per parameter object.

use crate::document::{XmlElement, XmlNode};
use crate::expression::{ExpressionEvaluator, Scope};
use crate::params::{SENTINEL, SampleParams};
use crate::tokens::{PLACEHOLDER_OPEN, SUBSTITUTION_OPEN, replace_tokens};
use crate::TemplateError;
use indexmap::IndexMap;
use minijinja::Value;
use std::collections::HashMap;
use std::sync::Arc;

const WHERE_PREFIX_OVERRIDES: &[&str] = &[
    "AND ", "OR ", "AND\n", "OR\n", "AND\r", "OR\r", "AND\t", "OR\t",
];

#[derive(Debug, Clone)]
pub(crate) enum SqlNode {
    Text(String),
    If {
        test: String,
        contents: Vec<SqlNode>,
    },
    Choose {
        whens: Vec<(String, Vec<SqlNode>)>,
        otherwise: Option<Vec<SqlNode>>,
    },
    Trim {
        prefix: Option<String>,
        suffix: Option<String>,
        prefix_overrides: Vec<String>,
        suffix_overrides: Vec<String>,
        contents: Vec<SqlNode>,
    },
    ForEach {
        collection: String,
        item: Option<String>,
        index: Option<String>,
        open: Option<String>,
        close: Option<String>,
        contents: Vec<SqlNode>,
    },
    Bind {
        name: String,
        value: String,
    },
}

/// `<sql>` fragment registered for inclusion
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub(crate) element: XmlElement,
}

/// Compiles statement bodies, resolving includes against known fragments
pub(crate) struct NodeBuilder<'a> {
    pub(crate) statement_id: &'a str,
    pub(crate) namespace: &'a str,
    pub(crate) fragments: &'a IndexMap<String, Arc<Fragment>>,
}

impl NodeBuilder<'_> {
    pub(crate) fn build(&self, element: &XmlElement) -> Result<Vec<SqlNode>, TemplateError> {
        let mut include_stack = Vec::new();
        self.build_children(element, &HashMap::new(), &mut include_stack)
    }

    fn build_children(
        &self,
        element: &XmlElement,
        properties: &HashMap<String, String>,
        include_stack: &mut Vec<String>,
    ) -> Result<Vec<SqlNode>, TemplateError> {
        let mut nodes = Vec::new();
        for child in &element.children {
            match child {
                XmlNode::Text(text) => {
                    nodes.push(SqlNode::Text(apply_properties(text, properties)));
                }
                XmlNode::Element(child) => {
                    nodes.extend(self.build_element(child, properties, include_stack)?);
                }
            }
        }
        Ok(nodes)
    }

    fn build_element(
        &self,
        element: &XmlElement,
        properties: &HashMap<String, String>,
        include_stack: &mut Vec<String>,
    ) -> Result<Vec<SqlNode>, TemplateError> {
        let attr = |name: &str| {
            element
                .attribute(name)
                .map(|value| apply_properties(value, properties))
        };
        let required = |name: &'static str| {
            element
                .required_attribute(name)
                .map(|value| apply_properties(value, properties))
        };

        let node = match element.name.as_str() {
            "include" => {
                let refid = required("refid")?;
                return self.build_include(element, &refid, properties, include_stack);
            }
            // Emitted as its own statement by the engine
            "selectKey" => return Ok(Vec::new()),
            "if" => SqlNode::If {
                test: required("test")?,
                contents: self.build_children(element, properties, include_stack)?,
            },
            "choose" => {
                let mut whens = Vec::new();
                let mut otherwise = None;
                for branch in element.child_elements() {
                    let contents = self.build_children(branch, properties, include_stack)?;
                    match branch.name.as_str() {
                        "when" => {
                            let test = branch
                                .required_attribute("test")
                                .map(|value| apply_properties(value, properties))?;
                            whens.push((test, contents));
                        }
                        "otherwise" => otherwise = Some(contents),
                        other => return Err(self.unknown(other)),
                    }
                }
                SqlNode::Choose { whens, otherwise }
            }
            "where" => SqlNode::Trim {
                prefix: Some("WHERE".to_string()),
                suffix: None,
                prefix_overrides: WHERE_PREFIX_OVERRIDES.iter().map(|s| s.to_string()).collect(),
                suffix_overrides: Vec::new(),
                contents: self.build_children(element, properties, include_stack)?,
            },
            "set" => SqlNode::Trim {
                prefix: Some("SET".to_string()),
                suffix: None,
                prefix_overrides: vec![",".to_string()],
                suffix_overrides: vec![",".to_string()],
                contents: self.build_children(element, properties, include_stack)?,
            },
            "trim" => SqlNode::Trim {
                prefix: attr("prefix"),
                suffix: attr("suffix"),
                prefix_overrides: parse_overrides(attr("prefixOverrides")),
                suffix_overrides: parse_overrides(attr("suffixOverrides")),
                contents: self.build_children(element, properties, include_stack)?,
            },
            "foreach" => SqlNode::ForEach {
                collection: required("collection")?,
                item: attr("item"),
                index: attr("index"),
                open: attr("open"),
                close: attr("close"),
                contents: self.build_children(element, properties, include_stack)?,
            },
            "bind" => SqlNode::Bind {
                name: required("name")?,
                value: required("value")?,
            },
            other => return Err(self.unknown(other)),
        };
        Ok(vec![node])
    }

    fn build_include(
        &self,
        element: &XmlElement,
        refid: &str,
        properties: &HashMap<String, String>,
        include_stack: &mut Vec<String>,
    ) -> Result<Vec<SqlNode>, TemplateError> {
        let qualified = qualify(self.namespace, refid);
        let fragment = self
            .fragments
            .get(&qualified)
            .ok_or_else(|| TemplateError::UnresolvedInclude {
                refid: qualified.clone(),
                statement: self.statement_id.to_string(),
            })?;

        if include_stack.contains(&qualified) {
            return Err(TemplateError::IncludeCycle { refid: qualified });
        }

        let mut scoped = properties.clone();
        for property in element.child_elements().filter(|e| e.name == "property") {
            let name = property.required_attribute("name")?;
            let value = property.required_attribute("value")?;
            scoped.insert(name.to_string(), apply_properties(value, properties));
        }

        include_stack.push(qualified);
        let nodes = self.build_children(&fragment.element, &scoped, include_stack);
        include_stack.pop();
        nodes
    }

    fn unknown(&self, element: &str) -> TemplateError {
        TemplateError::UnknownElement {
            element: element.to_string(),
            statement: self.statement_id.to_string(),
        }
    }
}

/// Prefix an id with the namespace unless it is already qualified
pub(crate) fn qualify(namespace: &str, id: &str) -> String {
    if id.contains('.') || namespace.is_empty() {
        id.to_string()
    } else {
        format!("{}.{}", namespace, id)
    }
}

fn parse_overrides(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split('|')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_uppercase())
            .collect()
    })
    .unwrap_or_default()
}

/// Substitute `${name}` for include properties; other tokens are kept
fn apply_properties(text: &str, properties: &HashMap<String, String>) -> String {
    if properties.is_empty() || !text.contains(SUBSTITUTION_OPEN) {
        return text.to_string();
    }
    replace_tokens(text, SUBSTITUTION_OPEN, |name| match properties.get(name.trim()) {
        Some(value) => value.clone(),
        None => format!("{}{}}}", SUBSTITUTION_OPEN, name),
    })
}

/// Mutable state while rendering one statement
pub(crate) struct RenderContext<'a> {
    evaluator: &'a ExpressionEvaluator,
    root: Arc<SampleParams>,
    locals: IndexMap<String, Value>,
    sql: String,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(evaluator: &'a ExpressionEvaluator, root: Arc<SampleParams>) -> Self {
        Self {
            evaluator,
            root,
            locals: IndexMap::new(),
            sql: String::new(),
        }
    }

    pub(crate) fn finish(self) -> String {
        self.sql
    }

    fn append(&mut self, text: &str) {
        if !self.sql.is_empty() {
            self.sql.push(' ');
        }
        self.sql.push_str(text);
    }

    fn scope(&self) -> Value {
        Scope::value(&self.locals, &self.root)
    }

    /// Render nodes into a fresh buffer and hand the buffer back
    fn capture(&mut self, nodes: &[SqlNode]) -> String {
        let outer = std::mem::take(&mut self.sql);
        render(nodes, self);
        std::mem::replace(&mut self.sql, outer)
    }
}

pub(crate) fn render(nodes: &[SqlNode], ctx: &mut RenderContext<'_>) {
    for node in nodes {
        render_node(node, ctx);
    }
}

fn render_node(node: &SqlNode, ctx: &mut RenderContext<'_>) {
    match node {
        SqlNode::Text(text) => {
            let text = if text.contains(SUBSTITUTION_OPEN) {
                let scope = ctx.scope();
                replace_tokens(text, SUBSTITUTION_OPEN, |expr| {
                    let value = ctx.evaluator.value(expr, &scope);
                    if value.is_none() {
                        String::new()
                    } else {
                        value.to_string()
                    }
                })
            } else {
                text.clone()
            };
            ctx.append(&text);
        }
        SqlNode::If { test, contents } => {
            if ctx.evaluator.test(test, &ctx.scope()) {
                render(contents, ctx);
            }
        }
        SqlNode::Choose { whens, otherwise } => {
            let scope = ctx.scope();
            let branch = whens
                .iter()
                .find(|(test, _)| ctx.evaluator.test(test, &scope))
                .map(|(_, contents)| contents)
                .or(otherwise.as_ref());
            if let Some(contents) = branch {
                render(contents, ctx);
            }
        }
        SqlNode::Trim {
            prefix,
            suffix,
            prefix_overrides,
            suffix_overrides,
            contents,
        } => {
            let body = ctx.capture(contents);
            if let Some(trimmed) = apply_trim(
                &body,
                prefix.as_deref(),
                suffix.as_deref(),
                prefix_overrides,
                suffix_overrides,
            ) {
                ctx.append(&trimmed);
            }
        }
        SqlNode::ForEach {
            collection,
            item,
            index,
            open,
            close,
            contents,
        } => render_foreach(ctx, collection, item, index, open, close, contents),
        SqlNode::Bind { name, value } => {
            let bound = ctx.evaluator.value(value, &ctx.scope());
            ctx.locals.insert(name.clone(), bound);
        }
    }
}

/// Renders a single iteration. Item placeholders are renamed to
/// `collection[0]` so the parameter names stay meaningful in reports.
fn render_foreach(
    ctx: &mut RenderContext<'_>,
    collection: &str,
    item: &Option<String>,
    index: &Option<String>,
    open: &Option<String>,
    close: &Option<String>,
    contents: &[SqlNode],
) {
    let saved: Vec<(String, Option<Value>)> = [item, index]
        .into_iter()
        .flatten()
        .map(|name| (name.clone(), ctx.locals.get(name).cloned()))
        .collect();

    if let Some(item) = item {
        ctx.locals.insert(item.clone(), Value::from(SENTINEL));
    }
    if let Some(index) = index {
        ctx.locals.insert(index.clone(), Value::from(0));
    }

    let body = ctx.capture(contents);
    let body = match item {
        Some(item) => rename_item_placeholders(&body, item, collection),
        None => body,
    };

    for (name, previous) in saved {
        match previous {
            Some(value) => ctx.locals.insert(name, value),
            None => ctx.locals.shift_remove(&name),
        };
    }

    let mut rendered = String::new();
    if let Some(open) = open {
        rendered.push_str(open);
    }
    rendered.push_str(&body);
    if let Some(close) = close {
        rendered.push_str(close);
    }
    ctx.append(&rendered);
}

fn rename_item_placeholders(body: &str, item: &str, collection: &str) -> String {
    replace_tokens(body, PLACEHOLDER_OPEN, |token| {
        let trimmed = token.trim_start();
        let renamed = trimmed
            .strip_prefix(item)
            .filter(|rest| rest.is_empty() || rest.starts_with(['.', '[', ',', ' ']))
            .map(|rest| format!("{}[0]{}", collection.trim(), rest));
        format!("{}{}}}", PLACEHOLDER_OPEN, renamed.as_deref().unwrap_or(token))
    })
}

fn apply_trim(
    body: &str,
    prefix: Option<&str>,
    suffix: Option<&str>,
    prefix_overrides: &[String],
    suffix_overrides: &[String],
) -> Option<String> {
    let mut trimmed = body.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_ascii_uppercase();
    if let Some(matched) = prefix_overrides.iter().find(|o| upper.starts_with(o.as_str())) {
        trimmed = trimmed[matched.len()..].trim_start().to_string();
    }
    let upper = trimmed.to_ascii_uppercase();
    if let Some(matched) = suffix_overrides.iter().find(|o| upper.ends_with(o.as_str())) {
        trimmed = trimmed[..trimmed.len() - matched.len()].trim_end().to_string();
    }

    let mut out = String::new();
    if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
        out.push_str(prefix);
        out.push(' ');
    }
    out.push_str(&trimmed);
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        out.push(' ');
        out.push_str(suffix);
    }
    Some(out)
}
