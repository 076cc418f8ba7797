//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula translation, parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Expression parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Expression evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Unknown symbol
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// A referenced cell holds no value
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A lookup found no matching key
    #[error("Not found: {0}")]
    NotFound(String),
}

impl FormulaError {
    /// Whether the failure is a lookup miss rather than a broken formula
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, FormulaError::NotFound(_))
    }
}
