//! Cell format table
//!
//! Only the parts of `styles.xml` that affect value rendering are modelled:
//! the cell formats (`cellXfs`) and the custom number formats (`numFmts`).
//! Each format keeps its original XML so untouched entries are written back
//! as they were read.

use crate::numfmt::builtin_format_code;
use ahash::AHashMap;

/// First id available for custom number formats
pub const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;

/// One `<xf>` of `cellXfs`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellFormat {
    pub num_fmt_id: u32,
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    pub xf_id: u32,
    /// The element as read, if it came from a file
    pub raw: Option<String>,
}

impl CellFormat {
    pub fn with_num_fmt(num_fmt_id: u32) -> Self {
        Self {
            num_fmt_id,
            ..Default::default()
        }
    }

    /// Whether the format only sets a number format on top of the defaults
    fn is_plain(&self) -> bool {
        self.font_id == 0 && self.fill_id == 0 && self.border_id == 0 && self.xf_id == 0
    }
}

/// Cell formats and custom number formats of a workbook
#[derive(Debug, Clone)]
pub struct StyleTable {
    cell_formats: Vec<CellFormat>,
    number_formats: AHashMap<u32, String>,
    /// Custom number format ids in document order
    number_format_order: Vec<u32>,
    dirty: bool,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    /// A table holding only the default format at index 0
    pub fn new() -> Self {
        Self {
            cell_formats: vec![CellFormat::default()],
            number_formats: AHashMap::new(),
            number_format_order: Vec::new(),
            dirty: false,
        }
    }

    /// Build a table from decoded parts. An empty format list still gets the
    /// default format.
    pub fn from_parts(cell_formats: Vec<CellFormat>, number_formats: Vec<(u32, String)>) -> Self {
        let mut table = Self {
            cell_formats,
            number_formats: AHashMap::with_capacity(number_formats.len()),
            number_format_order: Vec::with_capacity(number_formats.len()),
            dirty: false,
        };
        if table.cell_formats.is_empty() {
            table.cell_formats.push(CellFormat::default());
        }
        for (id, code) in number_formats {
            if table.number_formats.insert(id, code).is_none() {
                table.number_format_order.push(id);
            }
        }
        table
    }

    pub fn cell_format(&self, style: u32) -> Option<&CellFormat> {
        self.cell_formats.get(style as usize)
    }

    pub fn cell_formats(&self) -> &[CellFormat] {
        &self.cell_formats
    }

    pub fn len(&self) -> usize {
        self.cell_formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_formats.is_empty()
    }

    /// Custom number formats in document order
    pub fn number_formats(&self) -> impl Iterator<Item = (u32, &str)> {
        self.number_format_order
            .iter()
            .filter_map(|id| self.number_formats.get(id).map(|code| (*id, code.as_str())))
    }

    /// Number format code applied by `style`, built-in or custom.
    ///
    /// `None` when the style index is unknown or names a format id that is
    /// neither built in nor defined.
    pub fn number_format_code(&self, style: u32) -> Option<&str> {
        let id = self.cell_format(style)?.num_fmt_id;
        builtin_format_code(id).or_else(|| self.number_formats.get(&id).map(String::as_str))
    }

    /// Index of a cell format applying number format `num_fmt_id`, adding
    /// one if none exists yet.
    pub fn add_number_format_style(&mut self, num_fmt_id: u32) -> u32 {
        if let Some(i) = self
            .cell_formats
            .iter()
            .position(|xf| xf.num_fmt_id == num_fmt_id && xf.is_plain())
            .filter(|&i| i > 0)
        {
            return i as u32;
        }
        self.cell_formats.push(CellFormat::with_num_fmt(num_fmt_id));
        self.dirty = true;
        (self.cell_formats.len() - 1) as u32
    }

    /// Register a custom number format code, reusing an existing id for an
    /// identical code.
    pub fn add_custom_number_format(&mut self, code: &str) -> u32 {
        if let Some(id) = self
            .number_format_order
            .iter()
            .find(|id| self.number_formats.get(id).map(String::as_str) == Some(code))
        {
            return *id;
        }
        let id = self
            .number_format_order
            .iter()
            .copied()
            .max()
            .map_or(FIRST_CUSTOM_NUM_FMT_ID, |max| {
                (max + 1).max(FIRST_CUSTOM_NUM_FMT_ID)
            });
        self.number_formats.insert(id, code.to_string());
        self.number_format_order.push(id);
        self.dirty = true;
        id
    }

    /// Whether formats were added since the table was read
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
