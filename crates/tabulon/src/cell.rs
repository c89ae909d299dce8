//! Cell values, styles, formulas and hyperlinks
//!
//! Every setter goes through [`Worksheet::prepare_cell`], so a write inside
//! a merged area lands on the area's top-left cell and a new value picks up
//! the column or row style when the cell has none of its own.

use chrono::{SecondsFormat, TimeZone, Utc};
use tabulon_core::coordinate::{cell_name_to_coordinates, coordinates_to_cell_name};
use tabulon_core::date::{datetime_to_serial, duration_to_days};
use tabulon_core::numfmt::{format_float, precise_value};
use tabulon_core::{
    Area, Cell, CellType, CellValue, FormulaOpts, FormulaUpdate, Hyperlink, RawType, RichTextRun,
};
use tabulon_xlsx::relationships::{rels_path, REL_HYPERLINK};
use tabulon_xlsx::PackageStore;

use crate::error::Result;
use crate::file::{part_rels, File};
use crate::options::Options;

/// Built-in number format `h:mm:ss`, applied to durations
const DURATION_FORMAT: u32 = 21;
/// Built-in number format `m/d/yy h:mm`, applied to timestamps
const DATETIME_FORMAT: u32 = 22;

/// Where a hyperlink points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HyperlinkKind {
    /// A URL outside the workbook, stored as a worksheet relationship
    External,
    /// A place inside the workbook such as `Sheet2!A1`
    Location,
}

impl std::str::FromStr for HyperlinkKind {
    type Err = tabulon_core::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "External" => Ok(HyperlinkKind::External),
            "Location" => Ok(HyperlinkKind::Location),
            _ => Err(tabulon_core::Error::InvalidLinkType(s.to_string())),
        }
    }
}

/// Optional attributes of a hyperlink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HyperlinkOpts {
    pub display: Option<String>,
    pub tooltip: Option<String>,
}

impl File {
    /// Run `f` on the prepared target cell of a write, under one lock.
    fn with_cell<T, F>(&self, sheet: &str, cell: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Cell) -> Result<T>,
    {
        let ws = self.worksheet(sheet)?;
        let mut ws = ws.write();
        f(ws.prepare_cell(cell)?)
    }

    /// Store `value` in `cell`, choosing the representation from its kind.
    ///
    /// Text goes into the shared string table; durations and timestamps are
    /// stored as serial numbers and get a time format when the cell has no
    /// style. Timestamps before 1900 are stored as RFC 3339 text.
    pub fn set_cell_value<V: Into<CellValue>>(&self, sheet: &str, cell: &str, value: V) -> Result<()> {
        match value.into() {
            CellValue::Empty => self.set_cell_default(sheet, cell, ""),
            CellValue::Bool(b) => self.set_cell_bool(sheet, cell, b),
            CellValue::Int(n) => self.set_cell_int(sheet, cell, n),
            CellValue::UInt(n) => self.with_cell(sheet, cell, |c| {
                c.set_uint(n);
                Ok(())
            }),
            CellValue::Float32(n) => self.set_cell_float(sheet, cell, f64::from(n), None, 32),
            CellValue::Float(n) => self.set_cell_float(sheet, cell, n, None, 64),
            CellValue::Text(s) => self.set_cell_str(sheet, cell, &s),
            CellValue::Bytes(b) => self.set_cell_str(sheet, cell, &String::from_utf8_lossy(&b)),
            CellValue::Duration(d) => {
                let days = format_float(duration_to_days(d), None, 32);
                self.set_cell_time(sheet, cell, &days, DURATION_FORMAT)
            }
            CellValue::DateTime(t) => {
                let serial = datetime_to_serial(t);
                if serial > 0.0 {
                    let serial = format_float(serial, None, 64);
                    self.set_cell_time(sheet, cell, &serial, DATETIME_FORMAT)
                } else {
                    let text = Utc
                        .from_utc_datetime(&t)
                        .to_rfc3339_opts(SecondsFormat::AutoSi, true);
                    self.set_cell_default(sheet, cell, &text)
                }
            }
        }
    }

    pub fn set_cell_int(&self, sheet: &str, cell: &str, value: i64) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            c.set_int(value);
            Ok(())
        })
    }

    /// Store a float. `precision` of `None` keeps the shortest text that
    /// reads back as the same `bit_size`-bit float.
    pub fn set_cell_float(
        &self,
        sheet: &str,
        cell: &str,
        value: f64,
        precision: Option<usize>,
        bit_size: u32,
    ) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            c.set_float(value, precision, bit_size);
            Ok(())
        })
    }

    /// Store text through the shared string table.
    pub fn set_cell_str(&self, sheet: &str, cell: &str, value: &str) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            let index = self.shared_strings()?.write().table.intern(value);
            c.set_shared_string(index);
            Ok(())
        })
    }

    pub fn set_cell_bool(&self, sheet: &str, cell: &str, value: bool) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            c.set_bool(value);
            Ok(())
        })
    }

    /// Store text as is: numeric text untyped, anything else as `t="str"`.
    pub fn set_cell_default(&self, sheet: &str, cell: &str, value: &str) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            c.set_default(value);
            Ok(())
        })
    }

    /// Write `values` into consecutive cells of one row, starting at `cell`.
    pub fn set_sheet_row<I, V>(&self, sheet: &str, cell: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let (col, row) = cell_name_to_coordinates(cell)?;
        for (i, value) in values.into_iter().enumerate() {
            let name = coordinates_to_cell_name(col + i as u32, row)?;
            self.set_cell_value(sheet, &name, value)?;
        }
        Ok(())
    }

    /// Apply cell format `style` to the area spanned by two corner cells.
    pub fn set_cell_style(&self, sheet: &str, h_cell: &str, v_cell: &str, style: u32) -> Result<()> {
        let len = self.styles()?.read().len();
        if style as usize >= len {
            return Err(tabulon_core::Error::IndexOutOfRange {
                index: style as usize,
                len,
            }
            .into());
        }
        let area = Area::from_corners(h_cell, v_cell)?;
        let ws = self.worksheet(sheet)?;
        ws.write().set_area_style(&area, style)?;
        Ok(())
    }

    /// Style a write to `cell` would use: its own, else its column's or
    /// row's.
    pub fn get_cell_style(&self, sheet: &str, cell: &str) -> Result<u32> {
        let ws = self.worksheet(sheet)?;
        let ws = ws.read();
        let target = ws.merge_cells_parser(cell)?;
        let (col, row) = cell_name_to_coordinates(&target)?;
        let own = ws.cell(col, row).map_or(0, |c| c.style);
        Ok(ws.prepare_cell_style(col, row, own))
    }

    /// Store a serial number and give the target cell `num_fmt_id` unless
    /// it already resolves to a style.
    fn set_cell_time(&self, sheet: &str, cell: &str, serial: &str, num_fmt_id: u32) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            c.set_default(serial);
            if c.style == 0 {
                c.style = self.styles()?.write().add_number_format_style(num_fmt_id);
            }
            Ok(())
        })
    }

    /// Store `runs` as one rich text entry of the shared string table. An
    /// identical rich entry is reused.
    pub fn set_cell_rich_text(&self, sheet: &str, cell: &str, runs: &[RichTextRun]) -> Result<()> {
        self.with_cell(sheet, cell, |c| {
            let index = self.shared_strings()?.write().table.intern_rich(runs)?;
            c.set_shared_string(index);
            Ok(())
        })
    }

    /// Rich text runs of `cell`. Plain shared or inline text comes back as
    /// a single run without a font; other cells have no runs.
    pub fn get_cell_rich_text(&self, sheet: &str, cell: &str) -> Result<Vec<RichTextRun>> {
        let ws = self.worksheet(sheet)?;
        let ws = ws.read();
        let target = ws.merge_cells_parser(cell)?;
        let Some(c) = ws.cell_by_name(&target)? else {
            return Ok(Vec::new());
        };
        match c.raw_type() {
            RawType::SharedString => {
                let Ok(index) = c.value().parse::<usize>() else {
                    return Ok(Vec::new());
                };
                let strings = self.shared_strings()?.read();
                Ok(match strings.table.runs(index)? {
                    Some(runs) => runs.to_vec(),
                    None => vec![RichTextRun::new(strings.table.get(index)?)],
                })
            }
            RawType::InlineStr => {
                let text = c.inline.clone().unwrap_or_else(|| c.value().to_string());
                Ok(vec![RichTextRun::new(text)])
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Display text of `cell` using the file's [`Options`].
    pub fn get_cell_value(&self, sheet: &str, cell: &str) -> Result<String> {
        self.get_cell_value_with(sheet, cell, &self.options)
    }

    /// Display text of `cell`. Cells outside the populated area read as
    /// `""`; merged cells read as their area's top-left cell.
    pub fn get_cell_value_with(&self, sheet: &str, cell: &str, options: &Options) -> Result<String> {
        let ws = self.worksheet(sheet)?;
        let ws = ws.read();
        let target = ws.merge_cells_parser(cell)?;
        let (col, row) = cell_name_to_coordinates(&target)?;
        match ws.cell(col, row) {
            Some(c) => self.display_value(c, options),
            None => Ok(String::new()),
        }
    }

    /// Text of a cell as shown to callers: shared and inline strings
    /// resolved, then rounded and formatted unless `options` asks for raw
    /// values.
    pub(crate) fn display_value(&self, c: &Cell, options: &Options) -> Result<String> {
        let value = match c.raw_type() {
            RawType::SharedString => {
                let strings = self.shared_strings()?.read();
                match c.value().parse::<usize>() {
                    Ok(index) => strings.table.get(index)?.to_string(),
                    Err(_) => c.value().to_string(),
                }
            }
            RawType::InlineStr => c.inline.clone().unwrap_or_else(|| c.value().to_string()),
            _ => c.value().to_string(),
        };
        self.formatted_value(c, value, options)
    }

    fn formatted_value(&self, cell: &Cell, value: String, options: &Options) -> Result<String> {
        if options.raw_cell_value {
            return Ok(value);
        }
        let value = match cell.cell_type() {
            CellType::String => value,
            _ => precise_value(&value),
        };
        if cell.style == 0 {
            return Ok(value);
        }
        let styles = self.styles()?.read();
        Ok(match styles.number_format_code(cell.style) {
            Some(code) => options.number_format_renderer.render(&value, code),
            None => value,
        })
    }

    /// Semantic type of `cell`, from its type tag
    pub fn get_cell_type(&self, sheet: &str, cell: &str) -> Result<CellType> {
        let ws = self.worksheet(sheet)?;
        let ws = ws.read();
        let target = ws.merge_cells_parser(cell)?;
        let (col, row) = cell_name_to_coordinates(&target)?;
        Ok(ws.cell(col, row).map_or(CellType::Unset, Cell::cell_type))
    }

    /// Formula of `cell`; shared formula members get the master formula
    /// moved to their position.
    pub fn get_cell_formula(&self, sheet: &str, cell: &str) -> Result<String> {
        let ws = self.worksheet(sheet)?;
        let formula = ws.read().get_cell_formula(cell)?;
        Ok(formula)
    }

    /// Set, replace or (with an empty `formula`) clear the formula of
    /// `cell`. Clearing also drops the cell from the calc chain.
    pub fn set_cell_formula(
        &self,
        sheet: &str,
        cell: &str,
        formula: &str,
        opts: &FormulaOpts,
    ) -> Result<()> {
        let sheet_id = self.sheet_info(sheet)?.sheet_id;
        let ws = self.worksheet(sheet)?;
        let mut ws = ws.write();
        let target = ws.merge_cells_parser(cell)?;
        if ws.set_cell_formula(&target, formula, opts)? == FormulaUpdate::Cleared {
            drop(ws);
            self.calc_chain()?.write().delete(sheet_id, &target);
        }
        Ok(())
    }

    /// Attach a hyperlink to `cell`.
    pub fn set_cell_hyperlink(
        &self,
        sheet: &str,
        cell: &str,
        link: &str,
        kind: HyperlinkKind,
        opts: &HyperlinkOpts,
    ) -> Result<()> {
        let info = self.sheet_info(sheet)?;
        let ws = self.worksheet(sheet)?;
        let mut ws = ws.write();
        let reference = ws.merge_cells_parser(cell)?;
        let mut hyperlink = Hyperlink {
            reference,
            display: opts.display.clone(),
            tooltip: opts.tooltip.clone(),
            ..Default::default()
        };
        match kind {
            HyperlinkKind::External => {
                let mut package = self.package.write();
                let mut rels = part_rels(&package, &info.path)?;
                let rid = rels.add(REL_HYPERLINK, link, Some("External"));
                package.store(&rels_path(&info.path), rels.to_xml().into_bytes());
                hyperlink.rid = Some(rid);
            }
            HyperlinkKind::Location => hyperlink.location = Some(link.to_string()),
        }
        ws.upsert_hyperlink(hyperlink)?;
        Ok(())
    }

    /// Target of the hyperlink on `cell`: the URL of an external link or
    /// the location of an internal one.
    pub fn get_cell_hyperlink(&self, sheet: &str, cell: &str) -> Result<Option<String>> {
        let info = self.sheet_info(sheet)?;
        let ws = self.worksheet(sheet)?;
        let ws = ws.read();
        let reference = ws.merge_cells_parser(cell)?;
        let Some(link) = ws.hyperlink(&reference) else {
            return Ok(None);
        };
        if let Some(rid) = &link.rid {
            let rels = part_rels(&self.package.read(), &info.path)?;
            return Ok(rels.get(rid).map(|r| r.target.clone()));
        }
        Ok(link.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::{Duration, NaiveDate};
    use tabulon_core::{CalcChain, CalcChainEntry, RichTextFont, TOTAL_CELL_CHARS};
    use pretty_assertions::assert_eq;

    fn cell_raw(f: &File, cell: &str) -> (RawType, String) {
        let ws = f.worksheet("Sheet1").unwrap();
        let ws = ws.read();
        let c = ws.cell_by_name(cell).unwrap().unwrap();
        (c.raw_type(), c.value().to_string())
    }

    #[test]
    fn test_value_dispatch() {
        let f = File::new();
        f.set_cell_value("Sheet1", "A1", 42).unwrap();
        f.set_cell_value("Sheet1", "B1", 1.325f32).unwrap();
        f.set_cell_value("Sheet1", "C1", "text").unwrap();
        f.set_cell_value("Sheet1", "D1", true).unwrap();
        f.set_cell_value("Sheet1", "E1", None::<i32>).unwrap();

        assert_eq!(cell_raw(&f, "A1"), (RawType::Unset, "42".into()));
        assert_eq!(cell_raw(&f, "B1"), (RawType::Unset, "1.325".into()));
        assert_eq!(cell_raw(&f, "C1"), (RawType::SharedString, "0".into()));
        assert_eq!(cell_raw(&f, "D1"), (RawType::Bool, "1".into()));
        assert_eq!(cell_raw(&f, "E1"), (RawType::Str, "".into()));
        assert_eq!(f.get_cell_value("Sheet1", "C1").unwrap(), "text");
        assert_eq!(f.get_cell_type("Sheet1", "C1").unwrap(), CellType::String);
    }

    #[test]
    fn test_dates_get_default_format() {
        let f = File::new();
        let t = NaiveDate::from_ymd_opt(2011, 11, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        f.set_cell_value("Sheet1", "A1", t).unwrap();
        assert_eq!(cell_raw(&f, "A1"), (RawType::Unset, "40867.5".into()));
        let style = f.get_cell_style("Sheet1", "A1").unwrap();
        assert_ne!(style, 0);
        assert_eq!(
            f.styles().unwrap().read().number_format_code(style),
            Some("m/d/yy h:mm")
        );

        f.set_cell_value("Sheet1", "B1", Duration::hours(6)).unwrap();
        assert_eq!(cell_raw(&f, "B1"), (RawType::Unset, "0.25".into()));

        let old = NaiveDate::from_ymd_opt(1899, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        f.set_cell_value("Sheet1", "C1", old).unwrap();
        assert_eq!(
            cell_raw(&f, "C1"),
            (RawType::Str, "1899-01-01T00:00:00Z".into())
        );
        assert_eq!(f.get_cell_style("Sheet1", "C1").unwrap(), 0);
    }

    #[test]
    fn test_rich_text() {
        let f = File::new();
        let bold = RichTextFont {
            bold: true,
            color: Some("2354E8".into()),
            family: Some("Times New Roman".into()),
            ..Default::default()
        };
        let runs = vec![
            RichTextRun::new("bold").with_font(bold),
            RichTextRun::new(" and plain"),
        ];
        f.set_cell_rich_text("Sheet1", "A1", &runs).unwrap();
        f.set_cell_rich_text("Sheet1", "A2", &runs).unwrap();

        assert_eq!(f.get_cell_rich_text("Sheet1", "A1").unwrap(), runs);
        assert_eq!(f.get_cell_value("Sheet1", "A1").unwrap(), "bold and plain");
        assert_eq!(cell_raw(&f, "A2"), cell_raw(&f, "A1"));

        f.set_cell_value("Sheet1", "B1", "plain").unwrap();
        assert_eq!(
            f.get_cell_rich_text("Sheet1", "B1").unwrap(),
            vec![RichTextRun::new("plain")]
        );
        f.set_cell_value("Sheet1", "C1", 5).unwrap();
        assert!(f.get_cell_rich_text("Sheet1", "C1").unwrap().is_empty());
        assert!(f.get_cell_rich_text("Sheet1", "Z9").unwrap().is_empty());

        let long = vec![RichTextRun::new("x".repeat(TOTAL_CELL_CHARS + 1))];
        assert!(f.set_cell_rich_text("Sheet1", "D1", &long).is_err());
    }

    #[test]
    fn test_rich_text_inside_merge() {
        let f = File::new();
        f.merge_cell("Sheet1", "A1", "B2").unwrap();
        let runs = vec![RichTextRun::new("merged")];
        f.set_cell_rich_text("Sheet1", "B2", &runs).unwrap();
        assert_eq!(f.get_cell_rich_text("Sheet1", "A1").unwrap(), runs);
        assert_eq!(f.get_cell_rich_text("Sheet1", "B1").unwrap(), runs);
    }

    #[test]
    fn test_date_inside_merge_styles_anchor() {
        let f = File::new();
        f.merge_cell("Sheet1", "A1", "C3").unwrap();
        let t = NaiveDate::from_ymd_opt(2011, 11, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        f.set_cell_value("Sheet1", "B2", t).unwrap();

        assert_eq!(cell_raw(&f, "A1"), (RawType::Unset, "40867.5".into()));
        let style = f.get_cell_style("Sheet1", "A1").unwrap();
        assert_ne!(style, 0);
        assert_eq!(
            f.styles().unwrap().read().number_format_code(style),
            Some("m/d/yy h:mm")
        );
        {
            let ws = f.worksheet("Sheet1").unwrap();
            let ws = ws.read();
            let own = ws.cell_by_name("B2").unwrap().map_or(0, |c| c.style);
            assert_eq!(own, 0);
        }
        assert_eq!(f.get_cell_value("Sheet1", "A1").unwrap(), "11/20/11 12:00");
        assert_eq!(f.get_merge_cells("Sheet1").unwrap()[0].value(), "11/20/11 12:00");
    }

    #[test]
    fn test_read_rounding_and_raw() {
        let f = File::new();
        f.set_cell_default("Sheet1", "A1", "0.12345678901234567").unwrap();
        assert_eq!(f.get_cell_value("Sheet1", "A1").unwrap(), "0.123456789012346");
        let raw = Options::default().with_raw_cell_value(true);
        assert_eq!(
            f.get_cell_value_with("Sheet1", "A1", &raw).unwrap(),
            "0.12345678901234567"
        );
        assert_eq!(f.get_cell_value("Sheet1", "Z99").unwrap(), "");
    }

    #[test]
    fn test_formula_clear_drops_calc_chain_entry() {
        let f = File::new();
        f.set_cell_formula("Sheet1", "A3", "=A1+A2", &FormulaOpts::default())
            .unwrap();
        assert_eq!(f.get_cell_formula("Sheet1", "A3").unwrap(), "=A1+A2");
        *f.calc_chain().unwrap().write() = CalcChain::new(vec![CalcChainEntry {
            sheet_id: 1,
            reference: "A3".into(),
            extra_attrs: Vec::new(),
        }]);
        f.set_cell_formula("Sheet1", "A3", "", &FormulaOpts::default())
            .unwrap();
        assert_eq!(f.get_cell_formula("Sheet1", "A3").unwrap(), "");
        assert!(f.calc_chain().unwrap().read().is_empty());
    }

    #[test]
    fn test_hyperlinks() {
        let f = File::new();
        f.set_cell_hyperlink(
            "Sheet1",
            "A1",
            "https://example.com",
            HyperlinkKind::External,
            &HyperlinkOpts {
                display: Some("example".into()),
                ..Default::default()
            },
        )
        .unwrap();
        f.set_cell_hyperlink(
            "Sheet1",
            "B2",
            "Sheet1!C3",
            HyperlinkKind::Location,
            &HyperlinkOpts::default(),
        )
        .unwrap();
        assert_eq!(
            f.get_cell_hyperlink("Sheet1", "A1").unwrap().as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            f.get_cell_hyperlink("Sheet1", "B2").unwrap().as_deref(),
            Some("Sheet1!C3")
        );
        assert_eq!(f.get_cell_hyperlink("Sheet1", "C3").unwrap(), None);
        assert!("Email".parse::<HyperlinkKind>().is_err());
    }

    #[test]
    fn test_style_index_is_checked() {
        let f = File::new();
        assert!(matches!(
            f.set_cell_style("Sheet1", "A1", "B2", 99),
            Err(Error::Core(tabulon_core::Error::IndexOutOfRange { index: 99, .. }))
        ));
    }
}
