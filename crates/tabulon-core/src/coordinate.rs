//! Cell references, coordinates and areas
//!
//! All coordinates are 1-based: column `A` is 1 and row `1` is 1.
//! Column letters are matched case-insensitively and `$` markers are
//! tolerated wherever a reference is parsed.

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// Split a cell name into its upper-cased column letters and row number.
///
/// ```
/// use tabulon_core::coordinate::split_cell_name;
///
/// assert_eq!(split_cell_name("$ab$12").unwrap(), ("AB".to_string(), 12));
/// ```
pub fn split_cell_name(cell: &str) -> Result<(String, u32)> {
    let invalid = || Error::InvalidCellName(cell.to_string());
    let bytes = cell.as_bytes();
    let mut pos = 0;

    if bytes.get(pos) == Some(&b'$') {
        pos += 1;
    }
    let col_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
        pos += 1;
    }
    if pos == col_start {
        return Err(invalid());
    }
    let letters = cell[col_start..pos].to_ascii_uppercase();

    if bytes.get(pos) == Some(&b'$') {
        pos += 1;
    }
    let digits = &cell[pos..];
    // Rows never start with zero and are pure ASCII digits.
    if digits.is_empty()
        || digits.starts_with('0')
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    let row: u32 = digits.parse().map_err(|_| invalid())?;
    Ok((letters, row))
}

/// Convert column letters to a 1-based column number (`A` = 1, `XFD` = 16384).
pub fn column_name_to_number(name: &str) -> Result<u32> {
    if name.is_empty() {
        return Err(Error::InvalidColumnName(name.to_string()));
    }
    let mut col: u32 = 0;
    for b in name.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(Error::InvalidColumnName(name.to_string()));
        }
        col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
        if col > MAX_COLS {
            return Err(Error::InvalidColumnName(name.to_string()));
        }
    }
    Ok(col)
}

/// Convert a 1-based column number to its letters (1 = `A`, 27 = `AA`).
pub fn column_number_to_name(num: u32) -> Result<String> {
    if num == 0 || num > MAX_COLS {
        return Err(Error::InvalidColumnNumber(num));
    }
    let mut letters = Vec::with_capacity(3);
    let mut n = num;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    Ok(String::from_utf8_lossy(&letters).into_owned())
}

/// Parse a cell name such as `"B3"` or `"$c$10"` into `(col, row)`.
pub fn cell_name_to_coordinates(cell: &str) -> Result<(u32, u32)> {
    let (letters, row) = split_cell_name(cell)?;
    let col =
        column_name_to_number(&letters).map_err(|_| Error::InvalidCellName(cell.to_string()))?;
    if row > MAX_ROWS {
        return Err(Error::InvalidCellName(cell.to_string()));
    }
    Ok((col, row))
}

/// Build a cell name from a 1-based `(col, row)` pair.
pub fn coordinates_to_cell_name(col: u32, row: u32) -> Result<String> {
    if row == 0 || row > MAX_ROWS || col == 0 || col > MAX_COLS {
        return Err(Error::InvalidCoordinates { col, row });
    }
    Ok(format!("{}{}", column_number_to_name(col)?, row))
}

/// Parse `"A1:B3"` into `[x1, y1, x2, y2]` exactly as written.
pub fn area_ref_to_coordinates(area: &str) -> Result<[u32; 4]> {
    let mut parts = area.split(':');
    let (first, last) = match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(last), None) => (first, last),
        _ => return Err(Error::InvalidArea(area.to_string())),
    };
    let (x1, y1) = cell_name_to_coordinates(first)?;
    let (x2, y2) = cell_name_to_coordinates(last)?;
    Ok([x1, y1, x2, y2])
}

/// Normalize `[x1, y1, x2, y2]` in place so that `x1 <= x2` and `y1 <= y2`.
pub fn sort_coordinates(coordinates: &mut [u32; 4]) {
    if coordinates[2] < coordinates[0] {
        coordinates.swap(0, 2);
    }
    if coordinates[3] < coordinates[1] {
        coordinates.swap(1, 3);
    }
}

/// Whether `(col, row)` lies inside the rectangle `[x1, y1, x2, y2]`.
pub fn cell_in_ref(cell: (u32, u32), rect: &[u32; 4]) -> bool {
    cell.0 >= rect[0] && cell.0 <= rect[2] && cell.1 >= rect[1] && cell.1 <= rect[3]
}

/// Whether two normalized rectangles share at least one cell.
pub fn is_overlap(a: &[u32; 4], b: &[u32; 4]) -> bool {
    a[0] <= b[2] && a[2] >= b[0] && a[1] <= b[3] && a[3] >= b[1]
}

/// Whether `cell` lies inside `area`, reading the area corner to corner as
/// written. An area without exactly one colon contains nothing.
pub fn check_cell_in_area(cell: &str, area: &str) -> Result<bool> {
    let coordinates = cell_name_to_coordinates(cell)?;
    if area.split(':').count() != 2 {
        return Ok(false);
    }
    let rect = area_ref_to_coordinates(area)?;
    Ok(cell_in_ref(coordinates, &rect))
}

/// A parsed cell reference keeping its `$` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Column number (1-based)
    pub col: u32,
    /// Row number (1-based)
    pub row: u32,
    /// Whether the column is anchored with `$`
    pub col_absolute: bool,
    /// Whether the row is anchored with `$`
    pub row_absolute: bool,
}

impl CellAddress {
    /// Create a relative address. Coordinates are not validated.
    pub fn new(col: u32, row: u32) -> Self {
        Self {
            col,
            row,
            col_absolute: false,
            row_absolute: false,
        }
    }

    /// Parse an `A1`-style reference.
    ///
    /// ```
    /// use tabulon_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B2").unwrap();
    /// assert_eq!((addr.col, addr.row), (2, 2));
    /// assert!(addr.col_absolute);
    /// assert!(!addr.row_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let (col, row) = cell_name_to_coordinates(s)?;
        let col_absolute = s.starts_with('$');
        let row_absolute = s.rfind('$').map_or(false, |i| i > 0);
        Ok(Self {
            col,
            row,
            col_absolute,
            row_absolute,
        })
    }

    /// Plain cell name without `$` markers.
    pub fn name(&self) -> Result<String> {
        coordinates_to_cell_name(self.col, self.row)
    }

    /// Move the relative parts of the reference, keeping anchored parts.
    /// Returns `None` when the result leaves the grid.
    pub fn offset(&self, d_col: i64, d_row: i64) -> Option<Self> {
        let shift = |v: u32, d: i64, absolute: bool, max: u32| -> Option<u32> {
            if absolute {
                return Some(v);
            }
            let moved = i64::from(v) + d;
            (moved >= 1 && moved <= i64::from(max)).then_some(moved as u32)
        };
        Some(Self {
            col: shift(self.col, d_col, self.col_absolute, MAX_COLS)?,
            row: shift(self.row, d_row, self.row_absolute, MAX_ROWS)?,
            ..*self
        })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.col_absolute {
            f.write_str("$")?;
        }
        match column_number_to_name(self.col) {
            Ok(letters) => f.write_str(&letters)?,
            Err(_) => return Err(fmt::Error),
        }
        if self.row_absolute {
            f.write_str("$")?;
        }
        write!(f, "{}", self.row)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A normalized rectangular area of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Area {
    coordinates: [u32; 4],
}

impl Area {
    /// Create an area from two corners in any order.
    pub fn new(col1: u32, row1: u32, col2: u32, row2: u32) -> Self {
        let mut coordinates = [col1, row1, col2, row2];
        sort_coordinates(&mut coordinates);
        Self { coordinates }
    }

    /// Parse `"A1:B3"` (corners in any order).
    pub fn parse(s: &str) -> Result<Self> {
        let [x1, y1, x2, y2] = area_ref_to_coordinates(s)?;
        Ok(Self::new(x1, y1, x2, y2))
    }

    /// Area spanned by two corner cells such as `"C3"` and `"A1"`.
    pub fn from_corners(from: &str, to: &str) -> Result<Self> {
        let (x1, y1) = cell_name_to_coordinates(from)?;
        let (x2, y2) = cell_name_to_coordinates(to)?;
        Ok(Self::new(x1, y1, x2, y2))
    }

    /// `[x1, y1, x2, y2]` with `x1 <= x2` and `y1 <= y2`.
    pub fn coordinates(&self) -> [u32; 4] {
        self.coordinates
    }

    pub fn first(&self) -> (u32, u32) {
        (self.coordinates[0], self.coordinates[1])
    }

    pub fn last(&self) -> (u32, u32) {
        (self.coordinates[2], self.coordinates[3])
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        cell_in_ref((col, row), &self.coordinates)
    }

    pub fn overlaps(&self, other: &Area) -> bool {
        is_overlap(&self.coordinates, &other.coordinates)
    }

    /// Smallest area covering both.
    pub fn union(&self, other: &Area) -> Area {
        let [a1, b1, a2, b2] = self.coordinates;
        let [c1, d1, c2, d2] = other.coordinates;
        Area::new(a1.min(c1), b1.min(d1), a2.max(c2), b2.max(d2))
    }

    /// Iterate cells column by column, top to bottom within a column.
    pub fn cells(&self) -> AreaCells {
        AreaCells {
            area: *self,
            col: self.coordinates[0],
            row: self.coordinates[1],
        }
    }

    pub fn cell_count(&self) -> u64 {
        let [x1, y1, x2, y2] = self.coordinates;
        u64::from(x2 - x1 + 1) * u64::from(y2 - y1 + 1)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x1, y1, x2, y2] = self.coordinates;
        let first = coordinates_to_cell_name(x1, y1).map_err(|_| fmt::Error)?;
        let last = coordinates_to_cell_name(x2, y2).map_err(|_| fmt::Error)?;
        write!(f, "{first}:{last}")
    }
}

impl FromStr for Area {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Column-major iterator over an [`Area`]
pub struct AreaCells {
    area: Area,
    col: u32,
    row: u32,
}

impl Iterator for AreaCells {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let [_, y1, x2, y2] = self.area.coordinates;
        if self.col > x2 {
            return None;
        }
        let item = (self.col, self.row);
        self.row += 1;
        if self.row > y2 {
            self.row = y1;
            self.col += 1;
        }
        Some(item)
    }
}
