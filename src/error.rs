//! Error taxonomy for parsing, compiling, combining and applying filters.
//!
//! Every variant is recoverable: callers surface the message and keep the
//! last filter that applied cleanly.

use thiserror::Error;

use crate::predicate::CombinationMode;

/// Errors produced by the filter core and the filter session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The query text could not be parsed.
    #[error("malformed query '{query}': {reason}")]
    MalformedQuery { query: String, reason: String },

    /// A leaf references a field the target collection does not have.
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    /// The combination mode needs a previous filter and there is none.
    #[error("combination mode '{mode}' requires a previous filter")]
    NoPreviousFilter { mode: CombinationMode },

    /// An ordering comparison met a value that cannot be ordered.
    #[error("type mismatch on field '{field}': {detail}")]
    TypeMismatch { field: String, detail: String },

    /// The session was asked to apply an empty query.
    #[error("query is empty")]
    EmptyQuery,

    /// The session has no layer registered under this name.
    #[error("unknown layer '{layer}'")]
    UnknownLayer { layer: String },

    /// A combination targeted a different layer than the active filter.
    #[error("cannot combine a filter on layer '{requested}' with the active filter on layer '{active}'")]
    LayerMismatch { active: String, requested: String },

    /// Saved query index out of range.
    #[error("no saved query at index {index}")]
    NoSuchSavedQuery { index: usize },

    /// Only a filter that applied cleanly can be saved.
    #[error("there is no applied query to save")]
    NothingToSave,
}

impl FilterError {
    pub(crate) fn malformed(query: &str, reason: impl Into<String>) -> Self {
        FilterError::MalformedQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}
