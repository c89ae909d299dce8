//! Formula calculation against the workbook

use tabulon_formula::{evaluate_formula, CellSource};

use crate::error::{Error, Result};
use crate::file::File;
use crate::options::Options;

impl CellSource for File {
    fn cell_value(&self, sheet: &str, cell: &str) -> tabulon_core::Result<String> {
        let raw = Options {
            raw_cell_value: true,
            ..self.options.clone()
        };
        self.get_cell_value_with(sheet, cell, &raw).map_err(|e| match e {
            Error::Core(e) => e,
            other => tabulon_core::Error::other(other.to_string()),
        })
    }
}

impl File {
    /// Evaluate the formula of `cell` and return the result as text.
    ///
    /// A cell without a formula yields `""`. When the formula reduces to a
    /// spreadsheet error the call fails with it; see [`Error::cell_error`].
    pub fn calc_cell_value(&self, sheet: &str, cell: &str) -> Result<String> {
        let formula = self.get_cell_formula(sheet, cell)?;
        if formula.is_empty() {
            return Ok(String::new());
        }
        Ok(evaluate_formula(self, sheet, &formula)?)
    }
}
