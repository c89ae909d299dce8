//! Row types

use crate::cell::Cell;

/// One `<row>` of a worksheet.
///
/// Once a worksheet is densified, `cells[i]` is the cell of column `i + 1`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Row number (1-based)
    pub number: u32,
    pub cells: Vec<Cell>,
    /// Row-level style index (`s`), used when `custom_format` is set
    pub style: u32,
    pub custom_format: bool,
    /// Height in points (`ht`)
    pub height: Option<f64>,
    pub custom_height: bool,
    pub hidden: bool,
    /// Outline/grouping level (0-7)
    pub outline_level: u8,
    pub collapsed: bool,
    /// Attributes not modelled above, written back unchanged
    pub extra_attrs: Vec<(String, String)>,
}

impl Row {
    /// Create an empty row
    pub fn new(number: u32) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    /// Cell of 1-based column `col`, if the row is dense up to it
    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.get(col.checked_sub(1)? as usize)
    }

    pub fn cell_mut(&mut self, col: u32) -> Option<&mut Cell> {
        self.cells.get_mut(col.checked_sub(1)? as usize)
    }

    /// Find a cell by its reference, whatever its position
    pub fn find(&self, reference: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.reference == reference)
    }

    /// Check if this row has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.height.is_some()
            || self.hidden
            || self.outline_level > 0
            || self.custom_format
            || self.collapsed
            || !self.extra_attrs.is_empty()
    }

    /// Whether the row has to be written out at all
    pub fn has_content(&self) -> bool {
        self.has_custom_settings() || self.cells.iter().any(Cell::has_value)
    }
}
