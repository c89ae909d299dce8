//! # tabulon-xlsx
//!
//! Office Open XML (`.xlsx`) codecs for tabulon.
//!
//! A workbook is a ZIP [`Package`] of XML parts. This crate reads the
//! container and decodes or encodes the parts the spreadsheet model edits:
//! the sheet list, worksheets, shared strings, styles and the calculation
//! chain. Parts it does not understand stay in the package as bytes.

pub mod calc_chain;
pub mod content_types;
pub mod error;
pub mod package;
pub mod relationships;
pub mod rows;
pub mod sst;
pub mod styles;
pub mod template;
pub mod workbook;
pub mod worksheet;
pub mod xml;

pub use calc_chain::{read_calc_chain, write_calc_chain};
pub use content_types::ContentTypes;
pub use error::{XlsxError, XlsxResult};
pub use package::{Package, PackageStore, CONTENT_TYPES_PATH};
pub use relationships::{Relationship, Relationships};
pub use rows::RowReader;
pub use sst::{append_shared_strings, read_shared_strings, write_shared_strings};
pub use styles::{read_styles, write_styles};
pub use template::blank_package;
pub use workbook::{read_sheets, write_sheets, SheetEntry};
pub use worksheet::{read_worksheet, write_worksheet};
