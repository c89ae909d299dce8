//! Reference and range resolution
//!
//! Turns the text of a reference token (`A1`, `$B$2:C3`, `'Q1 data'!A1`)
//! into the values of the cells it names. Values are read through
//! [`CellSource`], so the resolver never touches a workbook directly.

use crate::error::{FormulaError, FormulaResult};
use ahash::AHashSet;
use tabulon_core::coordinate::{cell_name_to_coordinates, coordinates_to_cell_name};
use tabulon_core::{Area, CellError};

/// Read access to cell values
pub trait CellSource {
    /// Value of `cell` on `sheet` as text; blank cells are `""`.
    fn cell_value(&self, sheet: &str, cell: &str) -> tabulon_core::Result<String>;
}

/// A single cell on a named sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub sheet: String,
    pub col: u32,
    pub row: u32,
}

/// Two corners of a range, each with its sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub from: CellRef,
    pub to: CellRef,
}

/// Single references and ranges found in one reference token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReference {
    pub cell_refs: Vec<CellRef>,
    pub cell_ranges: Vec<CellRange>,
}

/// Split reference text into ranges and single cells.
///
/// Parts are separated by `:`. A part closes the range opened by the part
/// before it; a part with no open range opens one. So `A1:A2:A2:B3` is read
/// as the two ranges `A1:A2` and `A2:B3`, and `A1:B2:C3` as the range
/// `A1:B2` plus the cell `C3`. A part without a sheet qualifier belongs to
/// the sheet of the range it closes, else to `default_sheet`.
pub fn parse_reference(default_sheet: &str, reference: &str) -> FormulaResult<ParsedReference> {
    let reference = reference.replace('$', "");
    let mut parsed = ParsedReference::default();
    let mut pending: Option<CellRef> = None;

    for part in reference.split(':') {
        let (sheet, cell) = match part.rfind('!') {
            Some(i) => (Some(unquote_sheet(&part[..i])), &part[i + 1..]),
            None => (None, part),
        };
        let (col, row) =
            cell_name_to_coordinates(cell).map_err(|_| FormulaError::Cell(CellError::Name))?;
        match pending.take() {
            Some(from) => {
                let sheet = sheet.unwrap_or_else(|| from.sheet.clone());
                parsed.cell_ranges.push(CellRange {
                    from,
                    to: CellRef { sheet, col, row },
                });
            }
            None => {
                let sheet = sheet.unwrap_or_else(|| default_sheet.to_string());
                pending = Some(CellRef { sheet, col, row });
            }
        }
    }
    parsed.cell_refs.extend(pending);
    Ok(parsed)
}

/// Values of every cell named by `reference`.
///
/// Ranges expand column by column, top to bottom. Ranges come first in the
/// order written, then single cells. A cell named twice appears once, at
/// its first position. A range whose corners are on different sheets is a
/// `#VALUE!` error; anything unreadable is `#NAME?`.
pub fn resolve_reference<S: CellSource + ?Sized>(
    source: &S,
    default_sheet: &str,
    reference: &str,
) -> FormulaResult<Vec<String>> {
    let parsed = parse_reference(default_sheet, reference)?;
    let mut seen: AHashSet<(String, u32, u32)> = AHashSet::new();
    let mut values = Vec::new();
    let mut read = |sheet: &str, col: u32, row: u32| -> FormulaResult<()> {
        if !seen.insert((sheet.to_string(), col, row)) {
            return Ok(());
        }
        let cell = coordinates_to_cell_name(col, row)?;
        let value = source
            .cell_value(sheet, &cell)
            .map_err(|_| FormulaError::Cell(CellError::Name))?;
        values.push(value);
        Ok(())
    };

    for range in &parsed.cell_ranges {
        if range.from.sheet != range.to.sheet {
            return Err(FormulaError::Cell(CellError::Value));
        }
        let area = Area::new(range.from.col, range.from.row, range.to.col, range.to.row);
        for (col, row) in area.cells() {
            read(&range.from.sheet, col, row)?;
        }
    }
    for cell in &parsed.cell_refs {
        read(&cell.sheet, cell.col, cell.row)?;
    }
    Ok(values)
}

/// `'Q1 ''24'` becomes `Q1 '24`; unquoted names are returned as is.
fn unquote_sheet(name: &str) -> String {
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct Grid(HashMap<(String, String), String>);

    impl Grid {
        fn new(cells: &[(&str, &str, &str)]) -> Self {
            Self(
                cells
                    .iter()
                    .map(|(s, c, v)| ((s.to_string(), c.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl CellSource for Grid {
        fn cell_value(&self, sheet: &str, cell: &str) -> tabulon_core::Result<String> {
            if sheet == "Missing" {
                return Err(tabulon_core::Error::SheetNotFound(sheet.to_string()));
            }
            Ok(self
                .0
                .get(&(sheet.to_string(), cell.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn cell(sheet: &str, col: u32, row: u32) -> CellRef {
        CellRef {
            sheet: sheet.to_string(),
            col,
            row,
        }
    }

    #[test]
    fn test_parse_reference() {
        let parsed = parse_reference("Sheet1", "$A$1:B2").unwrap();
        assert_eq!(
            parsed.cell_ranges,
            vec![CellRange {
                from: cell("Sheet1", 1, 1),
                to: cell("Sheet1", 2, 2)
            }]
        );
        assert!(parsed.cell_refs.is_empty());

        let parsed = parse_reference("Sheet1", "'Q1 ''24'!C3").unwrap();
        assert_eq!(parsed.cell_refs, vec![cell("Q1 '24", 3, 3)]);

        let parsed = parse_reference("Sheet1", "Data!A1:B1").unwrap();
        assert_eq!(parsed.cell_ranges[0].to.sheet, "Data");
    }

    #[test]
    fn test_three_level_range_is_two_ranges() {
        let parsed = parse_reference("S", "A1:A2:A2:B3").unwrap();
        assert_eq!(parsed.cell_ranges.len(), 2);
        assert_eq!(parsed.cell_ranges[1].from, cell("S", 1, 2));
        assert_eq!(parsed.cell_ranges[1].to, cell("S", 2, 3));

        let parsed = parse_reference("S", "A1:B2:C3").unwrap();
        assert_eq!(parsed.cell_ranges.len(), 1);
        assert_eq!(parsed.cell_refs, vec![cell("S", 3, 3)]);
    }

    #[test]
    fn test_bad_reference_is_name_error() {
        assert_eq!(
            parse_reference("S", "NOPE"),
            Err(FormulaError::Cell(CellError::Name))
        );
        let grid = Grid::new(&[]);
        assert_eq!(
            resolve_reference(&grid, "Missing", "A1"),
            Err(FormulaError::Cell(CellError::Name))
        );
    }

    #[test]
    fn test_resolve_column_major_and_dedup() {
        let grid = Grid::new(&[
            ("S", "A1", "1"),
            ("S", "A2", "2"),
            ("S", "B1", "3"),
            ("S", "B2", "4"),
        ]);
        assert_eq!(
            resolve_reference(&grid, "S", "B2:A1").unwrap(),
            vec!["1", "2", "3", "4"]
        );
        assert_eq!(
            resolve_reference(&grid, "S", "A1:A2:B2:A2").unwrap(),
            vec!["1", "2", "4"]
        );
    }

    #[test]
    fn test_cross_sheet_range() {
        let grid = Grid::new(&[]);
        assert_eq!(
            resolve_reference(&grid, "S", "S!A1:T!B2"),
            Err(FormulaError::Cell(CellError::Value))
        );
    }
}
