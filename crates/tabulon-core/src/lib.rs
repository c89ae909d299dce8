//! # tabulon-core
//!
//! Core data model for the tabulon spreadsheet library.
//!
//! This crate provides the in-memory representation of a workbook's
//! sheets, independent of any file format:
//! - [`coordinate`] - `A1` references, areas and their integer coordinates
//! - [`Worksheet`] - dense rows of [`Cell`]s, merged cells, hyperlinks and
//!   shared formulas
//! - [`WorksheetStore`] - load-once cache of worksheets
//! - [`SharedStringTable`] - deduplicated string pool
//! - [`StyleTable`] and [`numfmt`] - number formats and value rendering
//!
//! ## Example
//!
//! ```rust
//! use tabulon_core::{FormulaOpts, Worksheet};
//!
//! let mut sheet = Worksheet::new();
//! sheet.prepare_cell("A1").unwrap().set_int(1);
//! sheet
//!     .set_cell_formula("C1", "=A1+B1", &FormulaOpts::shared("C1:C3"))
//!     .unwrap();
//! assert_eq!(sheet.get_cell_formula("C2").unwrap(), "=A2+B2");
//! ```

pub mod adjust;
pub mod calc_chain;
pub mod cell;
pub mod column;
pub mod coordinate;
pub mod date;
pub mod error;
pub mod formula;
pub mod numfmt;
pub mod row;
pub mod sst;
pub mod store;
pub mod style;
pub mod worksheet;

pub use adjust::Axis;
pub use calc_chain::{CalcChain, CalcChainEntry};
pub use cell::{Cell, CellError, CellFormula, CellType, CellValue, FormulaKind, RawType};
pub use column::ColumnDef;
pub use coordinate::{Area, CellAddress};
pub use error::{Error, Result};
pub use numfmt::{BuiltinRenderer, NumberFormatRenderer};
pub use row::Row;
pub use sst::{RichTextFont, RichTextRun, SharedStringItem, SharedStringTable};
pub use store::{SharedWorksheet, WorksheetStore};
pub use style::{CellFormat, StyleTable};
pub use worksheet::{
    FormulaOpts, FormulaUpdate, Hyperlink, PreservedElement, SheetFormat, Worksheet,
};

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u32 = 16_384;

/// Maximum number of characters in a string cell
pub const TOTAL_CELL_CHARS: usize = 32_767;

/// Highest hyperlink count a worksheet may reach before adding one more
/// is refused
pub const TOTAL_SHEET_HYPERLINKS: usize = 65_529;

/// Maximum row height in points
pub const MAX_ROW_HEIGHT: f64 = 409.0;

/// Height of rows that do not set one, in points
pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
