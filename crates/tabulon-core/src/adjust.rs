//! Row and column insertion and removal
//!
//! Moving lines renumbers the cells behind them and rewrites everything
//! that points into the grid: column definitions, merged areas,
//! hyperlinks and the formulas of the sheet itself. References to a
//! removed line become `#REF!`.

use crate::cell::Cell;
use crate::coordinate::{cell_name_to_coordinates, coordinates_to_cell_name, Area};
use crate::error::{Error, Result};
use crate::formula::map_cell_refs;
use crate::row::Row;
use crate::worksheet::Worksheet;
use crate::{MAX_COLS, MAX_ROWS};

/// Direction of an adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl Axis {
    fn max(self) -> u32 {
        match self {
            Axis::Rows => MAX_ROWS,
            Axis::Columns => MAX_COLS,
        }
    }
}

/// New position of line `pos` after inserting `offset` lines before line
/// `num` (`offset > 0`) or removing line `num` (`offset < 0`).
/// `None` when `pos` itself was removed.
pub fn adjust_line(pos: u32, num: u32, offset: i32) -> Option<u32> {
    if offset < 0 {
        match pos.cmp(&num) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(pos - 1),
            std::cmp::Ordering::Less => Some(pos),
        }
    } else if pos >= num {
        pos.checked_add(offset as u32)
    } else {
        Some(pos)
    }
}

/// Like [`adjust_line`] for a span `start..=end`: a span grows when lines
/// are inserted inside it, shrinks when one of its lines is removed and is
/// gone only when its single line is removed.
pub fn adjust_span(start: u32, end: u32, num: u32, offset: i32) -> Option<(u32, u32)> {
    if offset < 0 {
        if start == num && end == num {
            return None;
        }
        let start = if start > num { start - 1 } else { start };
        let end = if end >= num { end - 1 } else { end };
        Some((start, end))
    } else if start >= num {
        Some((start.checked_add(offset as u32)?, end.checked_add(offset as u32)?))
    } else if end >= num {
        Some((start, end.checked_add(offset as u32)?))
    } else {
        Some((start, end))
    }
}

fn adjust_area(area: &Area, axis: Axis, num: u32, offset: i32) -> Option<Area> {
    let [x1, y1, x2, y2] = area.coordinates();
    let area = match axis {
        Axis::Rows => {
            let (y1, y2) = adjust_span(y1, y2, num, offset)?;
            Area::new(x1, y1, x2, y2)
        }
        Axis::Columns => {
            let (x1, x2) = adjust_span(x1, x2, num, offset)?;
            Area::new(x1, y1, x2, y2)
        }
    };
    (area.last().0 <= MAX_COLS && area.last().1 <= MAX_ROWS).then_some(area)
}

/// Adjust a `ref` attribute, either a single cell or an area.
fn adjust_ref(reference: &str, axis: Axis, num: u32, offset: i32) -> Option<String> {
    if reference.contains(':') {
        let area = Area::parse(reference).ok()?;
        return adjust_area(&area, axis, num, offset).map(|a| a.to_string());
    }
    let (col, row) = cell_name_to_coordinates(reference).ok()?;
    let (col, row) = match axis {
        Axis::Rows => (col, adjust_line(row, num, offset)?),
        Axis::Columns => (adjust_line(col, num, offset)?, row),
    };
    coordinates_to_cell_name(col, row).ok()
}

impl Worksheet {
    /// Insert `count` blank rows before `row`.
    pub fn insert_rows(&mut self, sheet: &str, row: u32, count: u32) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        if count == 0 || count > MAX_ROWS {
            return Err(Error::other("parameter is invalid"));
        }
        self.adjust_helper(sheet, Axis::Rows, row, count as i32)
    }

    /// Remove `row`, moving the rows below it up.
    pub fn remove_row(&mut self, sheet: &str, row: u32) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        self.adjust_helper(sheet, Axis::Rows, row, -1)
    }

    /// Insert `count` blank columns before `col`.
    pub fn insert_cols(&mut self, sheet: &str, col: u32, count: u32) -> Result<()> {
        if col == 0 || col > MAX_COLS {
            return Err(Error::InvalidColumnNumber(col));
        }
        if count == 0 || count > MAX_COLS {
            return Err(Error::other("parameter is invalid"));
        }
        self.adjust_helper(sheet, Axis::Columns, col, count as i32)
    }

    /// Remove `col`, moving the columns right of it to the left.
    pub fn remove_col(&mut self, sheet: &str, col: u32) -> Result<()> {
        if col == 0 || col > MAX_COLS {
            return Err(Error::InvalidColumnNumber(col));
        }
        self.adjust_helper(sheet, Axis::Columns, col, -1)
    }

    /// Copy `row` into a new row inserted before `row2`. Single-row merges
    /// of the source are repeated on the copy.
    pub fn duplicate_row_to(&mut self, sheet: &str, row: u32, row2: u32) -> Result<()> {
        if row == 0 {
            return Err(Error::InvalidRowNumber(0));
        }
        if row2 == 0 || row == row2 {
            return Ok(());
        }
        self.densify()?;
        let source = self.rows.get((row - 1) as usize).cloned();
        self.adjust_helper(sheet, Axis::Rows, row2, 1)?;
        let Some(mut copy) = source else {
            return Ok(());
        };
        copy.number = row2;
        rename_cells(&mut copy)?;
        self.prepare(0, row2)?;
        self.rows[(row2 - 1) as usize] = copy;
        self.duplicate_merge_cells(row, row2)
    }

    fn duplicate_merge_cells(&mut self, row: u32, row2: u32) -> Result<()> {
        // The source moved down if the copy went in above it.
        let row = if row > row2 { row + 1 } else { row };
        let areas: Vec<Area> = self
            .merge_cells
            .iter()
            .filter_map(|m| Area::parse(m).ok())
            .collect();
        if areas.iter().any(|a| {
            let [_, y1, _, y2] = a.coordinates();
            y1 < row2 && row2 < y2
        }) {
            return Ok(());
        }
        for area in areas {
            let [x1, y1, x2, y2] = area.coordinates();
            if y1 == y2 && y1 == row {
                self.merge_cell(Area::new(x1, row2, x2, row2))?;
            }
        }
        Ok(())
    }

    fn adjust_helper(&mut self, sheet: &str, axis: Axis, num: u32, offset: i32) -> Result<()> {
        self.densify()?;
        match axis {
            Axis::Rows => self.adjust_row_dimensions(num, offset)?,
            Axis::Columns => self.adjust_col_dimensions(num, offset)?,
        }

        if axis == Axis::Columns {
            self.cols.retain_mut(|c| match adjust_span(c.min, c.max, num, offset) {
                Some((min, max)) if min <= MAX_COLS => {
                    c.min = min;
                    c.max = max.min(MAX_COLS);
                    true
                }
                _ => false,
            });
        }

        self.merge_cells = self
            .merge_cells
            .iter()
            .filter_map(|m| adjust_ref(m, axis, num, offset))
            .collect();

        self.hyperlinks.retain_mut(|h| match adjust_ref(&h.reference, axis, num, offset) {
            Some(reference) => {
                h.reference = reference;
                true
            }
            None => false,
        });

        for cell in self.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
            let Some(formula) = cell.formula.as_mut() else {
                continue;
            };
            if !formula.content.is_empty() {
                formula.content = map_cell_refs(&formula.content, |qualifier, mut address| {
                    if qualifier.map_or(false, |q| !q.eq_ignore_ascii_case(sheet)) {
                        return Some(address);
                    }
                    let pos = match axis {
                        Axis::Rows => &mut address.row,
                        Axis::Columns => &mut address.col,
                    };
                    *pos = adjust_line(*pos, num, offset).filter(|p| *p <= axis.max())?;
                    Some(address)
                });
            }
            if let Some(reference) = formula.reference.take() {
                formula.reference = adjust_ref(&reference, axis, num, offset);
            }
        }
        Ok(())
    }

    fn adjust_row_dimensions(&mut self, num: u32, offset: i32) -> Result<()> {
        let idx = (num - 1) as usize;
        if idx >= self.rows.len() {
            return Ok(());
        }
        if offset < 0 {
            self.rows.remove(idx);
        } else {
            if self.rows.len() as u64 + offset as u64 > u64::from(MAX_ROWS) {
                return Err(Error::InvalidRowNumber(
                    self.rows.len() as i64 + i64::from(offset),
                ));
            }
            let tail = self.rows.split_off(idx);
            self.rows.extend((0..offset as u32).map(|i| Row::new(num + i)));
            self.rows.extend(tail);
        }
        for (i, row) in self.rows.iter_mut().enumerate().skip(idx) {
            row.number = i as u32 + 1;
            rename_cells(row)?;
        }
        Ok(())
    }

    fn adjust_col_dimensions(&mut self, num: u32, offset: i32) -> Result<()> {
        let idx = (num - 1) as usize;
        for row in &mut self.rows {
            if idx >= row.cells.len() {
                continue;
            }
            if offset < 0 {
                row.cells.remove(idx);
            } else {
                if row.cells.len() as u64 + offset as u64 > u64::from(MAX_COLS) {
                    return Err(Error::InvalidColumnNumber(
                        (row.cells.len() as u32).saturating_add(offset as u32),
                    ));
                }
                let tail = row.cells.split_off(idx);
                row.cells.extend((0..offset as u32).map(|_| Cell::default()));
                row.cells.extend(tail);
            }
            rename_cells(row)?;
        }
        Ok(())
    }
}

fn rename_cells(row: &mut Row) -> Result<()> {
    for (j, cell) in row.cells.iter_mut().enumerate() {
        cell.reference = coordinates_to_cell_name(j as u32 + 1, row.number)?;
    }
    Ok(())
}
