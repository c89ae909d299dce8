//! Error type of the public API

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Any error raised by a [`File`](crate::File) operation
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid reference, coordinate or worksheet operation
    #[error(transparent)]
    Core(#[from] tabulon_core::Error),

    /// Formula evaluation failed
    #[error(transparent)]
    Formula(#[from] tabulon_formula::FormulaError),

    /// Reading or writing the package failed
    #[error(transparent)]
    Xlsx(#[from] tabulon_xlsx::XlsxError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Xlsx(e.into())
    }
}

impl Error {
    /// The spreadsheet error code of a failed calculation
    pub fn cell_error(&self) -> Option<tabulon_core::CellError> {
        match self {
            Error::Formula(e) => e.cell_error(),
            _ => None,
        }
    }
}
