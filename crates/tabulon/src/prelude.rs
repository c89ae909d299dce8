//! Common imports for tabulon users
//!
//! ```rust
//! use tabulon::prelude::*;
//! ```

pub use crate::{
    Area, CellError, CellType, CellValue, Error, File, FormulaOpts, HyperlinkKind, HyperlinkOpts,
    MergeCell, Options, Result, RichTextFont, RichTextRun,
};
