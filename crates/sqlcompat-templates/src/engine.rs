//! Mapper template engine

use crate::document::{XmlElement, parse_document};
use crate::expression::ExpressionEvaluator;
use crate::nodes::{Fragment, NodeBuilder, RenderContext, SqlNode, qualify, render};
use crate::params::SampleParams;
use crate::{BoundSql, TemplateError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appended to a statement id for its `<selectKey>` sub-statement
pub const SELECT_KEY_SUFFIX: &str = "!selectKey";

const STATEMENT_TAGS: &[&str] = &["select", "insert", "update", "delete"];

/// Parses mapper documents and compiles their statements.
///
/// Each document keeps its own `<sql>` fragments. Includes only resolve
/// against fragments declared in the including document.
pub struct MapperTemplateEngine {
    evaluator: Arc<ExpressionEvaluator>,
}

impl MapperTemplateEngine {
    pub fn new() -> Self {
        Self {
            evaluator: Arc::new(ExpressionEvaluator::new()),
        }
    }

    /// Parse a mapper document and collect its `<sql>` fragments.
    pub fn load(&self, xml: &str, source: &Path) -> Result<MapperDocument, TemplateError> {
        let root = parse_document(xml)?;
        if root.name != "mapper" {
            return Err(TemplateError::NotAMapper(root.name));
        }
        let namespace = root.attribute("namespace").unwrap_or_default().trim().to_string();

        let mut fragments = IndexMap::new();
        for fragment in root.child_elements().filter(|e| e.name == "sql") {
            let id = fragment.required_attribute("id")?;
            let qualified = qualify(&namespace, id);
            if fragments.contains_key(&qualified) {
                tracing::debug!(fragment = %qualified, source = %source.display(), "SQL fragment redefined, keeping first");
                continue;
            }
            fragments.insert(
                qualified,
                Arc::new(Fragment {
                    element: fragment.clone(),
                }),
            );
        }

        Ok(MapperDocument {
            namespace,
            source: source.to_path_buf(),
            root,
            fragments,
        })
    }

    /// Compile every statement of a loaded document.
    ///
    /// Statements whose includes cannot be resolved, or that are tied to a
    /// specific `databaseId`, are reported as skipped. Any other problem
    /// fails the whole document.
    pub fn build(&self, document: &MapperDocument) -> Result<BuiltMapper, TemplateError> {
        let mut built = BuiltMapper::default();

        for element in document.statement_elements() {
            let local_id = element.required_attribute("id")?.trim();
            let id = qualify(&document.namespace, local_id);

            if let Some(database_id) = element.attribute("databaseId") {
                built.skipped.push(SkippedStatement {
                    id,
                    reason: format!("bound to databaseId '{}'", database_id),
                });
                continue;
            }

            let builder = NodeBuilder {
                statement_id: &id,
                namespace: &document.namespace,
                fragments: &document.fragments,
            };

            let nodes = match builder.build(element) {
                Ok(nodes) => nodes,
                Err(err @ TemplateError::UnresolvedInclude { .. }) => {
                    tracing::warn!(statement = %id, error = %err, "skipping statement");
                    built.skipped.push(SkippedStatement {
                        id,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            for select_key in element.child_elements().filter(|e| e.name == "selectKey") {
                let key_id = format!("{}{}", id, SELECT_KEY_SUFFIX);
                let key_builder = NodeBuilder {
                    statement_id: &key_id,
                    ..builder
                };
                built.statements.push(MappedStatement {
                    nodes: key_builder.build(select_key)?,
                    id: key_id,
                    tag: select_key.name.clone(),
                    evaluator: self.evaluator.clone(),
                });
            }

            built.statements.push(MappedStatement {
                id,
                tag: element.name.clone(),
                nodes,
                evaluator: self.evaluator.clone(),
            });
        }

        Ok(built)
    }
}

impl Default for MapperTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed mapper file
#[derive(Debug, Clone)]
pub struct MapperDocument {
    namespace: String,
    source: PathBuf,
    root: XmlElement,
    fragments: IndexMap<String, Arc<Fragment>>,
}

impl MapperDocument {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of distinct `<sql>` fragments declared in the document
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Top-level `select|insert|update|delete` elements in document order
    pub fn statement_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.root
            .child_elements()
            .filter(|e| STATEMENT_TAGS.contains(&e.name.as_str()))
    }
}

/// Result of compiling one document
#[derive(Debug, Default)]
pub struct BuiltMapper {
    pub statements: Vec<MappedStatement>,
    pub skipped: Vec<SkippedStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStatement {
    pub id: String,
    pub reason: String,
}

/// A compiled statement ready to render
#[derive(Debug, Clone)]
pub struct MappedStatement {
    id: String,
    tag: String,
    nodes: Vec<SqlNode>,
    evaluator: Arc<ExpressionEvaluator>,
}

impl MappedStatement {
    /// Qualified id (`namespace.local`), possibly carrying `!selectKey`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Element name the statement was declared with
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Render against a parameter object and extract bind parameters.
    pub fn bound_sql(&self, params: &Arc<SampleParams>) -> BoundSql {
        let mut ctx = RenderContext::new(&self.evaluator, params.clone());
        render(&self.nodes, &mut ctx);
        BoundSql::from_rendered(&ctx.finish())
    }
}
