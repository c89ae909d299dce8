//! Merged cell ranges

use log::warn;
use tabulon_core::coordinate::coordinates_to_cell_name;
use tabulon_core::Area;

use crate::error::Result;
use crate::file::File;

/// A merged range together with the value of its top-left cell
#[derive(Debug, Clone, PartialEq)]
pub struct MergeCell {
    area: Area,
    value: String,
}

impl MergeCell {
    pub fn area(&self) -> Area {
        self.area
    }

    /// Display value of the top-left cell
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Top-left cell name, e.g. `"A1"`
    pub fn start_axis(&self) -> String {
        let (col, row) = self.area.first();
        coordinates_to_cell_name(col, row).unwrap_or_default()
    }

    /// Bottom-right cell name
    pub fn end_axis(&self) -> String {
        let (col, row) = self.area.last();
        coordinates_to_cell_name(col, row).unwrap_or_default()
    }
}

impl File {
    /// Merge the cells between `from` and `to`, given in any corner order.
    /// Merges overlapping the new range are folded into it.
    pub fn merge_cell(&self, sheet: &str, from: &str, to: &str) -> Result<()> {
        let area = Area::from_corners(from, to)?;
        self.worksheet(sheet)?.write().merge_cell(area)?;
        Ok(())
    }

    /// Drop every merge overlapping the range between `from` and `to`.
    pub fn unmerge_cell(&self, sheet: &str, from: &str, to: &str) -> Result<()> {
        let area = Area::from_corners(from, to)?;
        self.worksheet(sheet)?.write().unmerge_cell(area);
        Ok(())
    }

    /// All merged ranges of `sheet` in document order.
    pub fn get_merge_cells(&self, sheet: &str) -> Result<Vec<MergeCell>> {
        let areas: Vec<Area> = {
            let ws = self.worksheet(sheet)?;
            let ws = ws.read();
            ws.merge_cells
                .iter()
                .filter_map(|m| match Area::parse(m) {
                    Ok(area) => Some(area),
                    Err(_) => {
                        warn!("skipping malformed merge cell {m:?}");
                        None
                    }
                })
                .collect()
        };
        let mut merged = Vec::with_capacity(areas.len());
        for area in areas {
            let (col, row) = area.first();
            let value = self.get_cell_value(sheet, &coordinates_to_cell_name(col, row)?)?;
            merged.push(MergeCell { area, value });
        }
        Ok(merged)
    }
}
