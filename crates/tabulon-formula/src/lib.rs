//! # tabulon-formula
//!
//! Formula evaluation for tabulon.
//!
//! This crate provides:
//! - A formula tokenizer (text → token stream)
//! - A stack-based infix evaluator (token stream → value text)
//! - Reference and range resolution over any [`CellSource`]
//! - Built-in math functions
//!
//! ## Example
//!
//! ```rust
//! use tabulon_formula::{evaluate_formula, CellSource};
//!
//! struct Fixed;
//!
//! impl CellSource for Fixed {
//!     fn cell_value(&self, _sheet: &str, cell: &str) -> tabulon_core::Result<String> {
//!         Ok(if cell == "A1" { "1".into() } else { "2".into() })
//!     }
//! }
//!
//! assert_eq!(evaluate_formula(&Fixed, "Sheet1", "=SUM(A1,B1)*2").unwrap(), "6");
//! ```

pub mod error;
pub mod evaluator;
pub mod functions;
pub mod resolver;
pub mod tokenizer;

pub use error::{FormulaError, FormulaResult};
pub use evaluator::evaluate_formula;
pub use functions::{registry, FunctionDef, FunctionRegistry};
pub use resolver::{parse_reference, resolve_reference, CellRange, CellRef, CellSource};
pub use tokenizer::{tokenize, Token, TokenSubType, TokenType};
