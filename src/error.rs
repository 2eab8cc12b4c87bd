//! Error types for template rendering and expression evaluation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a render.
///
/// All variants short-circuit the entire `render` call; no partial SQL text
/// or partial parameter list is ever returned. A value that fails to resolve
/// is *not* an error (it evaluates to `Value::Null`); only structural,
/// type, and registry failures appear here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("expression parse error: {0}")]
    Parse(String),

    #[error("expression evaluation error: {0}")]
    Eval(String),

    #[error("<{tag}> is missing required attribute `{attribute}`")]
    MissingAttribute { tag: String, attribute: String },

    #[error("foreach collection `{0}` not found in scope")]
    UnknownCollection(String),

    #[error("foreach collection `{0}` is not a sequence")]
    WrongCollectionType(String),

    #[error("no handler registered for tag <{0}>")]
    UnregisteredTag(String),

    #[error("no fragment with id `{0}` for <include>")]
    MissingFragment(String),

    #[error("no statement with id `{0}`")]
    UnknownStatement(String),

    /// Top-level context wrapper: which statement the failure happened in.
    #[error("render of statement `{id}` failed: {source}")]
    Statement {
        id: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a failure with the id of the statement being rendered.
    pub(crate) fn in_statement(self, id: &str) -> Error {
        Error::Statement {
            id: id.to_string(),
            source: Box::new(self),
        }
    }
}
