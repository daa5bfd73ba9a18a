//! sqlcompat templates - mapper XML dynamic SQL resolution
//!
//! This crate turns MyBatis-style mapper documents into concrete SQL. It
//! replaces a live parameter object with [`SampleParams`], a synthetic map
//! that answers every lookup with a sentinel, so conditional fragments
//! resolve without real application data. Expressions in `test`, `bind`
//! and `${...}` are evaluated with MiniJinja.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlcompat_templates::{MapperTemplateEngine, SampleParams};
//!
//! let engine = MapperTemplateEngine::new();
//! let document = engine.load(xml, Path::new("UserMapper.xml"))?;
//! let mapper = engine.build(&document)?;
//!
//! let params = SampleParams::from_paths(["customer.id"]);
//! for statement in &mapper.statements {
//!     let bound = statement.bound_sql(&params);
//!     println!("{} -> {}", statement.id(), bound.sql);
//! }
//! ```

mod bound;
mod document;
mod engine;
mod error;
mod expression;
mod nodes;
mod params;
mod tokens;

pub use bound::BoundSql;
pub use document::{XmlElement, XmlNode, parse_document};
pub use engine::{
    BuiltMapper, MappedStatement, MapperDocument, MapperTemplateEngine, SELECT_KEY_SUFFIX,
    SkippedStatement,
};
pub use error::TemplateError;
pub use expression::{ExpressionEvaluator, translate_ognl};
pub use params::{SENTINEL, SampleParams, SampleValue};
