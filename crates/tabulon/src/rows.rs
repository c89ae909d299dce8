//! Row reading, row properties and row/column insertion and removal

use tabulon_core::coordinate::column_name_to_number;
use tabulon_core::{Axis, Row};
use tabulon_xlsx::{write_worksheet, PackageStore, RowReader, XlsxError};

use crate::error::Result;
use crate::file::File;

/// Iterator over the rows of a sheet, yielding the display text of every
/// cell. Rows missing from the sheet come out empty, so the `n`th item is
/// always row `n`.
#[derive(Debug)]
pub struct Rows<'a> {
    file: &'a File,
    rows: std::vec::IntoIter<Row>,
    pending: Option<Row>,
    current: u32,
}

impl<'a> Rows<'a> {
    fn columns(&self, row: &Row) -> Result<Vec<String>> {
        let mut columns = Vec::with_capacity(row.cells.len());
        for cell in &row.cells {
            let (col, _) = tabulon_core::coordinate::cell_name_to_coordinates(&cell.reference)?;
            columns.resize(col.saturating_sub(1) as usize, String::new());
            columns.push(self.file.display_value(cell, &self.file.options)?);
        }
        Ok(columns)
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_none() {
            self.pending = self.rows.next();
        }
        let number = self.pending.as_ref()?.number;
        self.current += 1;
        if number > self.current {
            return Some(Ok(Vec::new()));
        }
        let row = self.pending.take()?;
        Some(self.columns(&row))
    }
}

impl File {
    /// Every row of `sheet` as display text, see [`File::rows`].
    pub fn get_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.rows(sheet)?.collect()
    }

    /// Iterate the rows of `sheet`, decoded straight from its part. A loaded
    /// sheet is written back to the package first so pending edits show up.
    pub fn rows(&self, sheet: &str) -> Result<Rows<'_>> {
        let path = self.sheet_info(sheet)?.path;
        if let Some(ws) = self.worksheets.get(&path) {
            let xml = write_worksheet(&ws.read())?;
            self.package.write().store(&path, xml.into_bytes());
        }
        let package = self.package.read();
        let bytes = package
            .load(&path)
            .ok_or_else(|| XlsxError::MissingPart(path.clone()))?;
        let mut rows = RowReader::new(bytes).collect::<std::result::Result<Vec<Row>, _>>()?;
        rows.retain(|r| !r.cells.is_empty() || r.has_custom_settings());
        Ok(Rows {
            file: self,
            rows: rows.into_iter(),
            pending: None,
            current: 0,
        })
    }

    /// Set the height of `row` in points (at most 409).
    pub fn set_row_height(&self, sheet: &str, row: u32, height: f64) -> Result<()> {
        self.worksheet(sheet)?.write().set_row_height(row, height)?;
        Ok(())
    }

    /// Height of `row`, or the sheet's default height.
    pub fn get_row_height(&self, sheet: &str, row: u32) -> Result<f64> {
        Ok(self.worksheet(sheet)?.read().get_row_height(row)?)
    }

    pub fn set_row_visible(&self, sheet: &str, row: u32, visible: bool) -> Result<()> {
        self.worksheet(sheet)?.write().set_row_visible(row, visible)?;
        Ok(())
    }

    pub fn get_row_visible(&self, sheet: &str, row: u32) -> Result<bool> {
        Ok(self.worksheet(sheet)?.read().get_row_visible(row)?)
    }

    /// Group `row` at outline `level` (1 to 7).
    pub fn set_row_outline_level(&self, sheet: &str, row: u32, level: u8) -> Result<()> {
        self.worksheet(sheet)?
            .write()
            .set_row_outline_level(row, level)?;
        Ok(())
    }

    pub fn get_row_outline_level(&self, sheet: &str, row: u32) -> Result<u8> {
        Ok(self.worksheet(sheet)?.read().get_row_outline_level(row)?)
    }

    /// Insert a blank row before `row`.
    pub fn insert_row(&self, sheet: &str, row: u32) -> Result<()> {
        self.worksheet(sheet)?.write().insert_rows(sheet, row, 1)?;
        self.adjust_calc_chain(sheet, Axis::Rows, row, 1)
    }

    /// Remove `row`; formulas pointing into it become `#REF!`.
    pub fn remove_row(&self, sheet: &str, row: u32) -> Result<()> {
        self.worksheet(sheet)?.write().remove_row(sheet, row)?;
        self.adjust_calc_chain(sheet, Axis::Rows, row, -1)
    }

    /// Insert a copy of `row` right below it.
    pub fn duplicate_row(&self, sheet: &str, row: u32) -> Result<()> {
        self.duplicate_row_to(sheet, row, row.saturating_add(1))
    }

    /// Insert a copy of `row` before `row2`.
    pub fn duplicate_row_to(&self, sheet: &str, row: u32, row2: u32) -> Result<()> {
        self.worksheet(sheet)?
            .write()
            .duplicate_row_to(sheet, row, row2)?;
        if row != 0 && row2 != 0 && row != row2 {
            self.adjust_calc_chain(sheet, Axis::Rows, row2, 1)?;
        }
        Ok(())
    }

    /// Insert a blank column before column `col` (e.g. `"C"`).
    pub fn insert_col(&self, sheet: &str, col: &str) -> Result<()> {
        let num = column_name_to_number(col)?;
        self.worksheet(sheet)?.write().insert_cols(sheet, num, 1)?;
        self.adjust_calc_chain(sheet, Axis::Columns, num, 1)
    }

    /// Remove column `col`; formulas pointing into it become `#REF!`.
    pub fn remove_col(&self, sheet: &str, col: &str) -> Result<()> {
        let num = column_name_to_number(col)?;
        self.worksheet(sheet)?.write().remove_col(sheet, num)?;
        self.adjust_calc_chain(sheet, Axis::Columns, num, -1)
    }

    fn adjust_calc_chain(&self, sheet: &str, axis: Axis, num: u32, offset: i32) -> Result<()> {
        let sheet_id = self.sheet_info(sheet)?.sheet_id;
        self.calc_chain()?.write().adjust(sheet_id, axis, num, offset);
        Ok(())
    }
}
