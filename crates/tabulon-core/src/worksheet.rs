//! Worksheet type
//!
//! A worksheet is kept dense once loaded: `rows[i]` is row `i + 1` and
//! `rows[i].cells[j]` is the cell of column `j + 1`. Writes grow the grid
//! through [`Worksheet::prepare`] so positional access never meets a gap.

use crate::cell::{Cell, CellFormula, FormulaKind, RawType};
use crate::column::ColumnDef;
use crate::coordinate::{
    cell_name_to_coordinates, column_name_to_number, coordinates_to_cell_name, split_cell_name,
    Area,
};
use crate::error::{Error, Result};
use crate::formula::shift_formula;
use crate::row::Row;
use crate::{DEFAULT_ROW_HEIGHT, MAX_ROW_HEIGHT, TOTAL_SHEET_HYPERLINKS};
use log::{debug, warn};

/// `<sheetFormatPr>`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetFormat {
    pub default_row_height: f64,
    pub custom_height: bool,
    /// Attributes not modelled above
    pub extra_attrs: Vec<(String, String)>,
}

/// One `<hyperlink>` entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hyperlink {
    /// Cell the link is attached to
    pub reference: String,
    /// Relationship id of an external target
    pub rid: Option<String>,
    /// In-document target such as `Sheet1!A1`
    pub location: Option<String>,
    pub display: Option<String>,
    pub tooltip: Option<String>,
}

/// A top-level worksheet element that is not modelled, kept as raw XML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedElement {
    /// Local element name, e.g. `sheetViews`
    pub name: String,
    pub xml: String,
}

/// Options accepted by [`Worksheet::set_cell_formula`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaOpts {
    pub kind: Option<FormulaKind>,
    /// Range of an array formula or of a shared group
    pub reference: Option<String>,
}

impl FormulaOpts {
    pub fn shared<S: Into<String>>(reference: S) -> Self {
        Self {
            kind: Some(FormulaKind::Shared),
            reference: Some(reference.into()),
        }
    }

    pub fn array<S: Into<String>>(reference: S) -> Self {
        Self {
            kind: Some(FormulaKind::Array),
            reference: Some(reference.into()),
        }
    }
}

/// What [`Worksheet::set_cell_formula`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaUpdate {
    /// The formula was stored
    Set,
    /// An empty formula removed the existing one
    Cleared,
    /// Data table formulas are never written
    Skipped,
}

/// A worksheet (single sheet in a workbook)
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    pub rows: Vec<Row>,
    pub cols: Vec<ColumnDef>,
    /// Merged areas, always normalized (`"A1:B2"`)
    pub merge_cells: Vec<String>,
    pub hyperlinks: Vec<Hyperlink>,
    pub sheet_format: Option<SheetFormat>,
    /// Unmodelled top-level elements in document order
    pub preserved: Vec<PreservedElement>,
    /// Attributes of the `<worksheet>` root, namespace declarations included
    pub root_attrs: Vec<(String, String)>,
    densified: bool,
}

impl Worksheet {
    /// Create an empty, already dense worksheet
    pub fn new() -> Self {
        Self {
            densified: true,
            ..Default::default()
        }
    }

    pub fn is_densified(&self) -> bool {
        self.densified
    }

    /// Fill every positionally implied row and cell.
    ///
    /// Rows without a number continue from the previous row and cells
    /// without a reference continue from the previous cell. Afterwards row
    /// `n` sits at index `n - 1` and every cell up to the last referenced
    /// column of its row exists. Running it again changes nothing.
    pub fn densify(&mut self) -> Result<()> {
        if self.densified {
            return Ok(());
        }
        let mut rows = std::mem::take(&mut self.rows);
        let mut prev = 0u32;
        for row in &mut rows {
            if row.number == 0 {
                row.number = prev + 1;
            }
            prev = row.number;
        }
        let last_row = rows.iter().map(|r| r.number).max().unwrap_or(0);
        if last_row > crate::MAX_ROWS {
            return Err(Error::InvalidRowNumber(i64::from(last_row)));
        }

        let mut dense: Vec<Row> = (1..=last_row).map(Row::new).collect();
        for mut row in rows {
            // Duplicate row numbers keep the attributes of the last one and
            // the cells of all of them.
            let slot = &mut dense[(row.number - 1) as usize];
            let mut cells = std::mem::take(&mut slot.cells);
            cells.append(&mut row.cells);
            row.cells = cells;
            *slot = row;
        }
        for row in &mut dense {
            densify_row(row)?;
        }
        debug!("densified worksheet with {} rows", dense.len());
        self.rows = dense;
        self.densified = true;
        Ok(())
    }

    /// Grow the grid so that `(col, row)` exists. `col == 0` only grows rows.
    ///
    /// New rows inherit a custom default row height.
    pub fn prepare(&mut self, col: u32, row: u32) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        self.densify()?;
        let (height, custom_height) = match &self.sheet_format {
            Some(fmt) if fmt.custom_height => (Some(fmt.default_row_height), true),
            _ => (None, false),
        };
        let size_hint = self.rows.last().map_or(0, |r| r.cells.len());
        while (self.rows.len() as u32) < row {
            let mut new_row = Row::new(self.rows.len() as u32 + 1);
            new_row.height = height;
            new_row.custom_height = custom_height;
            new_row.cells.reserve(size_hint);
            self.rows.push(new_row);
        }
        let row_data = &mut self.rows[(row - 1) as usize];
        while (row_data.cells.len() as u32) < col {
            let name = coordinates_to_cell_name(row_data.cells.len() as u32 + 1, row)?;
            row_data.cells.push(Cell::blank(name));
        }
        Ok(())
    }

    pub fn cell(&self, col: u32, row: u32) -> Option<&Cell> {
        self.rows.get(row.checked_sub(1)? as usize)?.cell(col)
    }

    pub fn cell_mut(&mut self, col: u32, row: u32) -> Option<&mut Cell> {
        self.rows
            .get_mut(row.checked_sub(1)? as usize)?
            .cell_mut(col)
    }

    /// Look a cell up by name. Cells outside the grid are `None`.
    pub fn cell_by_name(&self, cell: &str) -> Result<Option<&Cell>> {
        let (col, row) = cell_name_to_coordinates(cell)?;
        Ok(self.cell(col, row))
    }

    /// Name of the cell a write to `cell` really lands on: the anchor of the
    /// merged area containing it, or the upper-cased name itself.
    pub fn merge_cells_parser(&self, cell: &str) -> Result<String> {
        let cell = cell.to_ascii_uppercase();
        let (col, row) = cell_name_to_coordinates(&cell)?;
        for merged in &self.merge_cells {
            let Ok(area) = Area::parse(merged) else {
                warn!("skipping malformed merge cell {merged:?}");
                continue;
            };
            if area.contains(col, row) {
                let (c, r) = area.first();
                return coordinates_to_cell_name(c, r);
            }
        }
        Ok(cell)
    }

    /// Style a new value at `(col, row)` should carry: the cell's own style,
    /// else the column style, else the row style.
    pub fn prepare_cell_style(&self, col: u32, row: u32, style: u32) -> u32 {
        if style != 0 {
            return style;
        }
        if let Some(c) = self.cols.iter().find(|c| c.covers(col) && c.style != 0) {
            return c.style;
        }
        self.rows
            .get(row.saturating_sub(1) as usize)
            .map_or(0, |r| r.style)
    }

    /// Resolve merge redirection, grow the grid and cascade the style for a
    /// write to `cell`. Returns the cell to mutate.
    pub fn prepare_cell(&mut self, cell: &str) -> Result<&mut Cell> {
        let target = self.merge_cells_parser(cell)?;
        let (col, row) = cell_name_to_coordinates(&target)?;
        self.prepare(col, row)?;
        let style = self
            .cell(col, row)
            .map_or(0, |c| self.prepare_cell_style(col, row, c.style));
        let cell = self
            .cell_mut(col, row)
            .ok_or_else(|| Error::other(format!("cell {target} missing after prepare")))?;
        cell.style = style;
        Ok(cell)
    }

    /// Set the style of every cell in `area`, growing the grid as needed.
    pub fn set_area_style(&mut self, area: &Area, style: u32) -> Result<()> {
        let [x1, y1, x2, y2] = area.coordinates();
        for row in y1..=y2 {
            self.prepare(x2, row)?;
            for col in x1..=x2 {
                if let Some(cell) = self.cell_mut(col, row) {
                    cell.style = style;
                }
            }
        }
        Ok(())
    }

    /// Formula text of `cell`. Members of a shared group get the master's
    /// formula shifted to their own position.
    pub fn get_cell_formula(&self, cell: &str) -> Result<String> {
        let target = self.merge_cells_parser(cell)?;
        let (col, row) = cell_name_to_coordinates(&target)?;
        let Some(formula) = self.cell(col, row).and_then(|c| c.formula.as_ref()) else {
            return Ok(String::new());
        };
        match (formula.kind, formula.shared_index) {
            (FormulaKind::Shared, Some(si)) => Ok(self.shared_formula(si, col, row)),
            _ => Ok(formula.content.clone()),
        }
    }

    /// Master formula of group `si` shifted onto `(col, row)`.
    fn shared_formula(&self, si: u32, col: u32, row: u32) -> String {
        for r in &self.rows {
            for (i, c) in r.cells.iter().enumerate() {
                let Some(f) = c.formula.as_ref().filter(|f| f.is_shared_master(si)) else {
                    continue;
                };
                let (master_col, master_row) = match cell_name_to_coordinates(&c.reference) {
                    Ok(coords) => coords,
                    Err(_) => (i as u32 + 1, r.number),
                };
                return shift_formula(
                    &f.content,
                    i64::from(col) - i64::from(master_col),
                    i64::from(row) - i64::from(master_row),
                );
            }
        }
        warn!("shared formula group {si} has no master cell");
        String::new()
    }

    /// Next free shared formula group id
    pub fn count_shared_formula(&self) -> u32 {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter_map(|c| c.formula.as_ref()?.shared_index)
            .map(|si| si + 1)
            .max()
            .unwrap_or(0)
    }

    /// Store, replace or clear the formula of `cell`.
    pub fn set_cell_formula(
        &mut self,
        cell: &str,
        formula: &str,
        opts: &FormulaOpts,
    ) -> Result<FormulaUpdate> {
        let target = self.merge_cells_parser(cell)?;
        let (col, row) = cell_name_to_coordinates(&target)?;
        if opts.kind == Some(FormulaKind::DataTable) {
            return Ok(FormulaUpdate::Skipped);
        }
        if opts.kind == Some(FormulaKind::Shared) && opts.reference.is_none() {
            return Err(Error::InvalidFormulaOptions(
                "shared formula requires a reference".to_string(),
            ));
        }
        self.prepare_cell(&target)?;

        if formula.is_empty() {
            if let Some(c) = self.cell_mut(col, row) {
                c.formula = None;
            }
            return Ok(FormulaUpdate::Cleared);
        }

        if let Some(c) = self.cell_mut(col, row) {
            c.formula
                .get_or_insert_with(CellFormula::default)
                .content = formula.to_string();
        }
        if let Some(kind) = opts.kind {
            if kind == FormulaKind::Shared {
                if let Some(reference) = &opts.reference {
                    self.set_shared_formula(reference)?;
                }
            }
            if let Some(f) = self.cell_mut(col, row).and_then(|c| c.formula.as_mut()) {
                f.kind = kind;
            }
        }
        if let Some(c) = self.cell_mut(col, row) {
            if let Some(f) = c.formula.as_mut() {
                if opts.reference.is_some() {
                    f.reference = opts.reference.clone();
                }
            }
            if c.raw_type() == RawType::InlineStr {
                c.clear_value();
            }
            c.inline = None;
        }
        Ok(FormulaUpdate::Set)
    }

    /// Put every cell of `reference` into a new shared formula group.
    fn set_shared_formula(&mut self, reference: &str) -> Result<()> {
        let area = Area::parse(reference)?;
        let si = self.count_shared_formula();
        for (col, row) in area.cells() {
            self.prepare(col, row)?;
            if let Some(c) = self.cell_mut(col, row) {
                let f = c.formula.get_or_insert_with(CellFormula::default);
                f.kind = FormulaKind::Shared;
                f.shared_index = Some(si);
            }
        }
        Ok(())
    }

    /// Merge `area`, absorbing every merge it overlaps into the bounding box.
    /// The cells of the result take the style of its top-left cell.
    pub fn merge_cell(&mut self, area: Area) -> Result<()> {
        let mut merged = area;
        loop {
            let before = self.merge_cells.len();
            self.merge_cells.retain(|existing| match Area::parse(existing) {
                Ok(other) if other.overlaps(&merged) => {
                    merged = merged.union(&other);
                    false
                }
                _ => true,
            });
            if self.merge_cells.len() == before {
                break;
            }
        }
        self.merge_cells.push(merged.to_string());

        let (col, row) = merged.first();
        let style = self.cell(col, row).map_or(0, |c| c.style);
        self.set_area_style(&merged, style)
    }

    /// Remove every merge overlapping `area`.
    pub fn unmerge_cell(&mut self, area: Area) {
        self.merge_cells.retain(|existing| match Area::parse(existing) {
            Ok(other) => !other.overlaps(&area),
            Err(_) => true,
        });
    }

    pub fn hyperlink(&self, cell: &str) -> Option<&Hyperlink> {
        self.hyperlinks.iter().find(|h| h.reference == cell)
    }

    /// Add a hyperlink or replace the one on the same cell.
    pub fn upsert_hyperlink(&mut self, link: Hyperlink) -> Result<()> {
        if self.hyperlinks.len() > TOTAL_SHEET_HYPERLINKS {
            return Err(Error::TotalSheetHyperlinks);
        }
        match self
            .hyperlinks
            .iter_mut()
            .find(|h| h.reference == link.reference)
        {
            Some(existing) => *existing = link,
            None => self.hyperlinks.push(link),
        }
        Ok(())
    }

    /// Drop cached results of formula cells.
    pub fn clear_formula_values(&mut self) {
        for cell in self.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
            if cell.formula.is_some() && !cell.value().is_empty() {
                cell.clear_value();
            }
        }
    }

    /// Default height of rows without their own height
    pub fn default_row_height(&self) -> f64 {
        match &self.sheet_format {
            Some(fmt) if fmt.custom_height => fmt.default_row_height,
            _ => DEFAULT_ROW_HEIGHT,
        }
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        if height > MAX_ROW_HEIGHT {
            return Err(Error::RowHeightTooLarge);
        }
        self.prepare(0, row)?;
        let r = &mut self.rows[(row - 1) as usize];
        r.height = Some(height);
        r.custom_height = true;
        Ok(())
    }

    pub fn get_row_height(&self, row: u32) -> Result<f64> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        Ok(self
            .rows
            .get((row - 1) as usize)
            .and_then(|r| r.height)
            .filter(|h| *h != 0.0)
            .unwrap_or_else(|| self.default_row_height()))
    }

    pub fn set_row_visible(&mut self, row: u32, visible: bool) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        self.prepare(0, row)?;
        self.rows[(row - 1) as usize].hidden = !visible;
        Ok(())
    }

    pub fn get_row_visible(&self, row: u32) -> Result<bool> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        Ok(self.rows.get((row - 1) as usize).map_or(true, |r| !r.hidden))
    }

    pub fn set_row_outline_level(&mut self, row: u32, level: u8) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        if !(1..=7).contains(&level) {
            return Err(Error::InvalidOutlineLevel);
        }
        self.prepare(0, row)?;
        self.rows[(row - 1) as usize].outline_level = level;
        Ok(())
    }

    pub fn get_row_outline_level(&self, row: u32) -> Result<u8> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        Ok(self.rows.get((row - 1) as usize).map_or(0, |r| r.outline_level))
    }

    /// Last row and column holding a cell with content, if any
    pub fn used_extent(&self) -> Option<(u32, u32)> {
        let mut extent: Option<(u32, u32)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(last) = row.cells.iter().rposition(Cell::has_value) {
                let (cols, _) = extent.unwrap_or((0, 0));
                extent = Some((cols.max(last as u32 + 1), i as u32 + 1));
            }
        }
        extent
    }
}

/// Give unnamed cells names and place every cell at its column index.
fn densify_row(row: &mut Row) -> Result<()> {
    let cells = std::mem::take(&mut row.cells);
    let mut placed: Vec<(u32, Cell)> = Vec::with_capacity(cells.len());
    let mut prev = 0u32;
    for mut cell in cells {
        let col = if cell.reference.is_empty() {
            prev + 1
        } else {
            let (letters, _) = split_cell_name(&cell.reference)?;
            column_name_to_number(&letters)
                .map_err(|_| Error::InvalidCellName(cell.reference.clone()))?
        };
        cell.reference = coordinates_to_cell_name(col, row.number)?;
        prev = col;
        placed.push((col, cell));
    }
    let last_col = placed.iter().map(|(c, _)| *c).max().unwrap_or(0);
    let mut dense: Vec<Option<Cell>> = (0..last_col).map(|_| None).collect();
    for (col, cell) in placed {
        dense[(col - 1) as usize] = Some(cell);
    }
    row.cells = dense
        .into_iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Some(cell) => Ok(cell),
            None => coordinates_to_cell_name(i as u32 + 1, row.number).map(Cell::blank),
        })
        .collect::<Result<_>>()?;
    Ok(())
}
