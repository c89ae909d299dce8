//! # tabulon
//!
//! A Rust library for reading, writing and calculating XLSX spreadsheets.
//!
//! The [`File`] type is the entry point. It opens a package lazily: a
//! worksheet, the shared string table, the style sheet and the calculation
//! chain are decoded the first time something touches them, and saving
//! re-encodes only what was loaded.
//!
//! ## Features
//!
//! - Open and save `.xlsx` files, keeping parts that are not modelled
//! - Typed cell values: numbers, booleans, text, dates and durations
//! - Shared and array formulas, with a built-in math evaluator
//! - Merged cells, hyperlinks, row properties
//! - Row and column insertion and removal that rewrites references
//!
//! ## Example
//!
//! ```rust
//! use tabulon::prelude::*;
//!
//! let file = File::new();
//! file.set_cell_value("Sheet1", "A1", 40).unwrap();
//! file.set_cell_value("Sheet1", "A2", 2).unwrap();
//! file.set_cell_formula("Sheet1", "A3", "=SUM(A1:A2)", &FormulaOpts::default())
//!     .unwrap();
//! assert_eq!(file.calc_cell_value("Sheet1", "A3").unwrap(), "42");
//!
//! // file.save_as("book.xlsx").unwrap();
//! ```

mod calc;
mod cell;
pub mod error;
mod file;
mod merge;
pub mod options;
pub mod prelude;
mod rows;

pub use cell::{HyperlinkKind, HyperlinkOpts};
pub use error::{Error, Result};
pub use file::File;
pub use merge::MergeCell;
pub use options::{Options, UNZIP_SIZE_LIMIT};
pub use rows::Rows;

// Re-export core types
pub use tabulon_core::coordinate::{
    cell_name_to_coordinates, column_name_to_number, column_number_to_name,
    coordinates_to_cell_name, split_cell_name,
};
pub use tabulon_core::{
    Area, CellAddress, CellError, CellType, CellValue, FormulaKind, FormulaOpts,
    NumberFormatRenderer, RichTextFont, RichTextRun, MAX_COLS, MAX_ROWS, MAX_ROW_HEIGHT, TOTAL_CELL_CHARS,
};

// Re-export formula types
pub use tabulon_formula::FormulaError;
pub use tabulon_xlsx::XlsxError;
