//! Formula error types

use tabulon_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// A spreadsheet error value such as `#DIV/0!`
    #[error("{0}")]
    Cell(CellError),

    /// No function of that name is registered
    #[error("not support {0} function")]
    UnsupportedFunction(String),

    /// Wrong number of arguments
    #[error("{function} requires {expected} arguments")]
    ArgumentCount { function: String, expected: String },

    /// Invalid argument
    #[error("{0}")]
    Argument(String),

    /// An operand that should be numeric is not
    #[error("cannot parse {0:?} as a number")]
    NumberParse(String),

    /// Operator or token sequence the evaluator cannot handle
    #[error("invalid formula: {0}")]
    InvalidFormula(String),

    /// Reference to invalid cell
    #[error(transparent)]
    Reference(#[from] tabulon_core::Error),
}

impl FormulaError {
    /// The spreadsheet error code, for errors that are one
    pub fn cell_error(&self) -> Option<CellError> {
        match self {
            FormulaError::Cell(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<CellError> for FormulaError {
    fn from(e: CellError) -> Self {
        FormulaError::Cell(e)
    }
}
