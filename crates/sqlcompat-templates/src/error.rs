//! Error types for mapper templating

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("malformed mapper XML at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("expected a <mapper> root element, found <{0}>")]
    NotAMapper(String),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("unsupported element <{element}> in statement '{statement}'")]
    UnknownElement { element: String, statement: String },

    #[error("statement '{statement}' includes unknown SQL fragment '{refid}'")]
    UnresolvedInclude { refid: String, statement: String },

    #[error("SQL fragment include cycle through '{refid}'")]
    IncludeCycle { refid: String },
}
