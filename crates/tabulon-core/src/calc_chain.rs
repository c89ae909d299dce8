//! Calculation chain (`xl/calcChain.xml`)

use crate::adjust::{adjust_line, Axis};
use crate::coordinate::{cell_name_to_coordinates, coordinates_to_cell_name};
use log::warn;

/// One `<c>` entry of the calc chain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalcChainEntry {
    /// Sheet id (`i`), resolved even where the file leaves it implicit
    pub sheet_id: u32,
    pub reference: String,
    /// Attributes other than `r` and `i`, kept as read
    pub extra_attrs: Vec<(String, String)>,
}

/// The order in which formula cells were last calculated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalcChain {
    entries: Vec<CalcChainEntry>,
}

impl CalcChain {
    pub fn new(entries: Vec<CalcChainEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CalcChainEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove the entry for `cell` on sheet `sheet_id`. An empty `cell`
    /// removes every entry of the sheet.
    pub fn delete(&mut self, sheet_id: u32, cell: &str) {
        self.entries.retain(|e| {
            !(e.sheet_id == sheet_id && (cell.is_empty() || e.reference == cell))
        });
    }

    /// Follow a row or column insertion (`offset > 0`) or removal
    /// (`offset == -1`) at line `num` of sheet `sheet_id`.
    pub fn adjust(&mut self, sheet_id: u32, axis: Axis, num: u32, offset: i32) {
        self.entries.retain_mut(|e| {
            if e.sheet_id != sheet_id {
                return true;
            }
            let Ok((col, row)) = cell_name_to_coordinates(&e.reference) else {
                warn!("dropping calc chain entry with bad reference {:?}", e.reference);
                return false;
            };
            let moved = match axis {
                Axis::Rows => adjust_line(row, num, offset).map(|r| (col, r)),
                Axis::Columns => adjust_line(col, num, offset).map(|c| (c, row)),
            };
            match moved.and_then(|(c, r)| coordinates_to_cell_name(c, r).ok()) {
                Some(name) => {
                    e.reference = name;
                    true
                }
                None => false,
            }
        });
    }
}
