//! Cell-related types
//!
//! This module contains:
//! - [`Cell`] - One `<c>` entry of a worksheet: raw value, type tag, style, formula
//! - [`CellFormula`] - Formula storage (normal, shared, array, data table)
//! - [`CellValue`] - Typed input accepted by the value setters
//! - [`CellError`] - Spreadsheet error codes

mod value;

pub use value::{CellError, CellValue};

use crate::numfmt;

/// Semantic type of a cell as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    #[default]
    Unset,
    Bool,
    Date,
    Error,
    Number,
    String,
}

/// The `t` attribute of a `<c>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RawType {
    /// No attribute; numbers and blanks
    #[default]
    Unset,
    Bool,
    Date,
    Error,
    Number,
    /// Index into the shared string table
    SharedString,
    /// Literal string, usually a formula result
    Str,
    /// Rich or plain text stored in `<is>`
    InlineStr,
}

impl RawType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawType::Unset => "",
            RawType::Bool => "b",
            RawType::Date => "d",
            RawType::Error => "e",
            RawType::Number => "n",
            RawType::SharedString => "s",
            RawType::Str => "str",
            RawType::InlineStr => "inlineStr",
        }
    }

    pub fn from_attr(s: &str) -> Option<Self> {
        Some(match s {
            "" => RawType::Unset,
            "b" => RawType::Bool,
            "d" => RawType::Date,
            "e" => RawType::Error,
            "n" => RawType::Number,
            "s" => RawType::SharedString,
            "str" => RawType::Str,
            "inlineStr" => RawType::InlineStr,
            _ => return None,
        })
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            RawType::Unset => CellType::Unset,
            RawType::Bool => CellType::Bool,
            RawType::Date => CellType::Date,
            RawType::Error => CellType::Error,
            RawType::Number => CellType::Number,
            RawType::SharedString | RawType::Str | RawType::InlineStr => CellType::String,
        }
    }
}

/// The `t` attribute of an `<f>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormulaKind {
    #[default]
    Normal,
    Shared,
    Array,
    /// Stored and written back, never evaluated
    DataTable,
}

impl FormulaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaKind::Normal => "normal",
            FormulaKind::Shared => "shared",
            FormulaKind::Array => "array",
            FormulaKind::DataTable => "dataTable",
        }
    }

    pub fn from_attr(s: &str) -> Option<Self> {
        Some(match s {
            "normal" => FormulaKind::Normal,
            "shared" => FormulaKind::Shared,
            "array" => FormulaKind::Array,
            "dataTable" => FormulaKind::DataTable,
            _ => return None,
        })
    }
}

/// Formula attached to a cell
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellFormula {
    pub kind: FormulaKind,
    /// Formula text; empty for non-master members of a shared group
    pub content: String,
    /// `ref` attribute: the spanned range of an array formula or the
    /// extent of a shared group on its master cell
    pub reference: Option<String>,
    /// `si` attribute: shared group id
    pub shared_index: Option<u32>,
}

impl CellFormula {
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Whether this is the master cell of shared group `si`
    pub fn is_shared_master(&self, si: u32) -> bool {
        self.kind == FormulaKind::Shared
            && self.shared_index == Some(si)
            && self.reference.as_deref().map_or(false, |r| !r.is_empty())
    }
}

/// One cell of a worksheet.
///
/// The raw value is always text, whatever the type tag says. The tag and
/// the value are only ever changed together through [`Cell::set_raw`] or one
/// of the typed setters built on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// Cell name, e.g. `"B3"`
    pub reference: String,
    /// Index into the workbook's cell formats (`cellXfs`)
    pub style: u32,
    raw_type: RawType,
    value: String,
    /// Text of an `inlineStr` cell
    pub inline: Option<String>,
    pub formula: Option<CellFormula>,
}

impl Cell {
    /// A blank cell with only its reference set
    pub fn blank<S: Into<String>>(reference: S) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    /// Build a cell from decoded parts. Unknown `t` values fall back to
    /// [`RawType::Unset`].
    pub fn from_parts(reference: String, style: u32, raw_type: RawType, value: String) -> Self {
        Self {
            reference,
            style,
            raw_type,
            value,
            inline: None,
            formula: None,
        }
    }

    pub fn raw_type(&self) -> RawType {
        self.raw_type
    }

    /// The raw `<v>` text
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the cell carries anything worth writing out
    pub fn has_value(&self) -> bool {
        self.style != 0
            || !self.value.is_empty()
            || self.formula.is_some()
            || self.raw_type != RawType::Unset
            || self.inline.is_some()
    }

    /// Replace tag and value together.
    pub fn set_raw<S: Into<String>>(&mut self, raw_type: RawType, value: S) {
        self.raw_type = raw_type;
        self.value = value.into();
        if raw_type != RawType::InlineStr {
            self.inline = None;
        }
    }

    /// Drop the cached value, keeping formula and style.
    pub fn clear_value(&mut self) {
        self.set_raw(RawType::Unset, String::new());
    }

    pub fn set_int(&mut self, value: i64) {
        self.set_raw(RawType::Unset, value.to_string());
    }

    pub fn set_uint(&mut self, value: u64) {
        self.set_raw(RawType::Unset, value.to_string());
    }

    /// Store a float. `precision` of `None` keeps the shortest text that
    /// round-trips at the given bit size.
    pub fn set_float(&mut self, value: f64, precision: Option<usize>, bit_size: u32) {
        self.set_raw(
            RawType::Unset,
            numfmt::format_float(value, precision, bit_size),
        );
    }

    pub fn set_bool(&mut self, value: bool) {
        self.set_raw(RawType::Bool, if value { "1" } else { "0" });
    }

    /// Store text verbatim: numeric text stays untyped, anything else is
    /// tagged `str`.
    pub fn set_default<S: Into<String>>(&mut self, value: S) {
        let value = value.into();
        let raw_type = if numfmt::is_numeric(&value).is_some() {
            RawType::Unset
        } else {
            RawType::Str
        };
        self.set_raw(raw_type, value);
    }

    /// Point the cell at shared string `index`.
    pub fn set_shared_string(&mut self, index: usize) {
        self.set_raw(RawType::SharedString, index.to_string());
    }

    /// Store an inline string (`<is><t>..</t></is>`).
    pub fn set_inline_str<S: Into<String>>(&mut self, text: S) {
        self.raw_type = RawType::InlineStr;
        self.value.clear();
        self.inline = Some(text.into());
    }

    pub fn cell_type(&self) -> CellType {
        self.raw_type.cell_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_pair_tag_and_value() {
        let mut cell = Cell::blank("A1");
        assert!(!cell.has_value());

        cell.set_bool(true);
        assert_eq!((cell.raw_type(), cell.value()), (RawType::Bool, "1"));

        cell.set_int(-12);
        assert_eq!((cell.raw_type(), cell.value()), (RawType::Unset, "-12"));

        cell.set_default("12.5");
        assert_eq!(cell.raw_type(), RawType::Unset);
        cell.set_default("hello");
        assert_eq!((cell.raw_type(), cell.value()), (RawType::Str, "hello"));

        cell.set_inline_str("rich");
        assert_eq!(cell.inline.as_deref(), Some("rich"));
        cell.set_shared_string(3);
        assert_eq!((cell.raw_type(), cell.value()), (RawType::SharedString, "3"));
        assert!(cell.inline.is_none());
    }

    #[test]
    fn test_set_float() {
        let mut cell = Cell::blank("A1");
        cell.set_float(0.1 + 0.2, None, 64);
        assert_eq!(cell.value(), "0.30000000000000004");
        cell.set_float(f64::from(1.325f32), None, 32);
        assert_eq!(cell.value(), "1.325");
        cell.set_float(1.325, Some(2), 64);
        assert_eq!(cell.value(), "1.32");
    }

    #[test]
    fn test_raw_type_mapping() {
        for tag in ["", "b", "d", "e", "n", "s", "str", "inlineStr"] {
            assert_eq!(RawType::from_attr(tag).unwrap().as_str(), tag);
        }
        assert_eq!(RawType::from_attr("x"), None);
        assert_eq!(RawType::Str.cell_type(), CellType::String);
        assert_eq!(RawType::InlineStr.cell_type(), CellType::String);
        assert_eq!(RawType::Unset.cell_type(), CellType::Unset);
    }

    #[test]
    fn test_shared_master() {
        let mut f = CellFormula::new("A1+B1");
        f.kind = FormulaKind::Shared;
        f.shared_index = Some(0);
        assert!(!f.is_shared_master(0));
        f.reference = Some("C1:C5".into());
        assert!(f.is_shared_master(0));
        assert!(!f.is_shared_master(1));
    }
}
