//! Error handling for the vectorq execution engine.

use thiserror::Error;

/// The taxonomy of errors the engine distinguishes (see spec §7).
///
/// Every fatal variant carries enough context (operator name, column
/// name) to be actionable without re-running the query.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("type mismatch in {operator}: column '{column}' expected {expected}, found {found}")]
    TypeMismatch {
        operator: &'static str,
        column: String,
        expected: String,
        found: String,
    },

    #[error("column '{0}' does not exist")]
    MissingColumn(String),

    #[error("cyclic join detected among tables: {0:?}")]
    CyclicJoin(Vec<String>),

    #[error("invalid operator option '{option}': {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Build an [`EngineError::Internal`] with a formatted message.
#[macro_export]
macro_rules! internal_err {
    ($msg:expr) => {
        $crate::common::error::EngineError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::EngineError::Internal(format!($fmt, $($arg)*))
    };
}
