//! Error types for tabulon-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tabulon-core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Cell reference does not match the `A1` grammar or is out of bounds
    #[error("cannot convert cell \"{0}\" to coordinates: invalid cell name \"{0}\"")]
    InvalidCellName(String),

    /// Column/row pair cannot be turned into a cell name
    #[error("invalid cell coordinates [{col}, {row}]")]
    InvalidCoordinates { col: u32, row: u32 },

    /// Column letters are empty, non-alphabetic or past `XFD`
    #[error("invalid column name \"{0}\"")]
    InvalidColumnName(String),

    /// Column number is zero or past 16384
    #[error("invalid column number {0}")]
    InvalidColumnNumber(u32),

    /// Row number is zero or past 1048576
    #[error("invalid row number {0}")]
    InvalidRowNumber(i64),

    /// Area reference is not exactly two colon-separated cells
    #[error("invalid area \"{0}\"")]
    InvalidArea(String),

    /// Sheet name not present in the workbook
    #[error("sheet {0} is not exist")]
    SheetNotFound(String),

    /// Index past the end of an indexed collection
    #[error("index {index} out of range (len: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Row height above the format maximum
    #[error("the height of the row must be smaller than or equal to 409 points")]
    RowHeightTooLarge,

    /// Outline level outside 1..=7
    #[error("invalid outline level")]
    InvalidOutlineLevel,

    /// Too many hyperlinks in one worksheet
    #[error("over maximum limit hyperlinks in a worksheet")]
    TotalSheetHyperlinks,

    /// Hyperlink type other than `External` or `Location`
    #[error("invalid link type \"{0}\"")]
    InvalidLinkType(String),

    /// Formula options that cannot be applied
    #[error("invalid formula options: {0}")]
    InvalidFormulaOptions(String),

    /// Text of one cell longer than the format allows
    #[error("cell value must be 0-32767 characters")]
    CellCharsLength,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
