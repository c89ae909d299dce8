//! `<sheetData>` decoding
//!
//! [`RowParser`] turns the events of one `<sheetData>` into [`Row`]s and is
//! shared by the full worksheet reader and the streaming [`RowReader`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attributes, decode_excel_escapes, local, parse_bool};
use log::warn;
use tabulon_core::coordinate::{cell_name_to_coordinates, coordinates_to_cell_name};
use tabulon_core::{Cell, CellFormula, FormulaKind, RawType, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TextTarget {
    #[default]
    None,
    Value,
    Formula,
    Inline,
}

/// A `<c>` whose children are still being read
#[derive(Debug, Default)]
struct PendingCell {
    reference: String,
    style: u32,
    raw_type: RawType,
    formula: Option<CellFormula>,
    value: String,
    inline: Option<String>,
}

impl PendingCell {
    fn finish(self) -> Cell {
        let value = match self.raw_type {
            RawType::Str | RawType::InlineStr => decode_excel_escapes(&self.value).into_owned(),
            _ => self.value,
        };
        let mut cell = Cell::from_parts(self.reference, self.style, self.raw_type, value);
        cell.formula = self.formula;
        if self.raw_type == RawType::InlineStr {
            cell.inline = Some(
                self.inline
                    .map(|s| decode_excel_escapes(&s).into_owned())
                    .unwrap_or_default(),
            );
        }
        cell
    }
}

/// Event-driven builder for rows
#[derive(Debug, Default)]
pub(crate) struct RowParser {
    row: Option<Row>,
    cell: Option<PendingCell>,
    target: TextTarget,
    phonetic: bool,
}

impl RowParser {
    /// Handle a start or empty element. A self-closing `<row/>` is returned
    /// right away.
    pub(crate) fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> XlsxResult<Option<Row>> {
        match e.local_name().as_ref() {
            b"row" => {
                let row = read_row(e)?;
                if empty {
                    return Ok(Some(row));
                }
                self.row = Some(row);
            }
            b"c" => {
                let cell = read_cell(e)?;
                if empty {
                    self.push_cell(cell);
                } else {
                    self.cell = Some(cell);
                }
            }
            b"v" if !empty => self.target = TextTarget::Value,
            b"f" => {
                let formula = read_formula(e)?;
                if let Some(cell) = self.cell.as_mut() {
                    cell.formula = Some(formula);
                    if !empty {
                        self.target = TextTarget::Formula;
                    }
                }
            }
            b"is" => {
                if let Some(cell) = self.cell.as_mut() {
                    cell.inline.get_or_insert_with(String::new);
                }
            }
            b"rPh" if !empty => self.phonetic = true,
            b"t" if !empty && !self.phonetic => {
                if self.cell.as_ref().map_or(false, |c| c.inline.is_some()) {
                    self.target = TextTarget::Inline;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    pub(crate) fn text(&mut self, text: &str) {
        let Some(cell) = self.cell.as_mut() else {
            return;
        };
        match self.target {
            TextTarget::Value => cell.value.push_str(text),
            TextTarget::Formula => {
                if let Some(f) = cell.formula.as_mut() {
                    f.content.push_str(text);
                }
            }
            TextTarget::Inline => {
                if let Some(s) = cell.inline.as_mut() {
                    s.push_str(text);
                }
            }
            TextTarget::None => {}
        }
    }

    /// Handle an end element; a closed `</row>` is returned.
    pub(crate) fn close(&mut self, local_name: &[u8]) -> Option<Row> {
        match local_name {
            b"v" | b"f" | b"t" => self.target = TextTarget::None,
            b"rPh" => self.phonetic = false,
            b"c" => {
                if let Some(cell) = self.cell.take() {
                    self.push_cell(cell);
                }
            }
            b"row" => return self.row.take(),
            _ => {}
        }
        None
    }

    fn push_cell(&mut self, cell: PendingCell) {
        match self.row.as_mut() {
            Some(row) => row.cells.push(cell.finish()),
            None => warn!("dropping cell {:?} outside of a row", cell.reference),
        }
    }
}

fn read_row(e: &BytesStart<'_>) -> XlsxResult<Row> {
    let mut row = Row::default();
    for (key, value) in attributes(e)? {
        match local(&key) {
            "r" => row.number = parse_attr(&key, &value)?,
            "s" => row.style = parse_attr(&key, &value)?,
            "customFormat" => row.custom_format = parse_bool(&value),
            "ht" => row.height = value.parse().ok(),
            "customHeight" => row.custom_height = parse_bool(&value),
            "hidden" => row.hidden = parse_bool(&value),
            "outlineLevel" => row.outline_level = value.parse().unwrap_or(0),
            "collapsed" => row.collapsed = parse_bool(&value),
            // Recomputed by applications; stale after edits.
            "spans" => {}
            _ => row.extra_attrs.push((key, value)),
        }
    }
    Ok(row)
}

fn read_cell(e: &BytesStart<'_>) -> XlsxResult<PendingCell> {
    let mut cell = PendingCell::default();
    for (key, value) in attributes(e)? {
        match local(&key) {
            "r" => cell.reference = value,
            "s" => cell.style = parse_attr(&key, &value)?,
            "t" => {
                cell.raw_type = RawType::from_attr(&value).unwrap_or_else(|| {
                    warn!("unknown cell type {value:?}, reading the value untyped");
                    RawType::Unset
                })
            }
            _ => {}
        }
    }
    Ok(cell)
}

fn read_formula(e: &BytesStart<'_>) -> XlsxResult<CellFormula> {
    let mut formula = CellFormula::default();
    for (key, value) in attributes(e)? {
        match local(&key) {
            "t" => formula.kind = FormulaKind::from_attr(&value).unwrap_or_default(),
            "ref" => formula.reference = Some(value),
            "si" => formula.shared_index = value.parse().ok(),
            _ => {}
        }
    }
    Ok(formula)
}

fn parse_attr<T: std::str::FromStr>(key: &str, value: &str) -> XlsxResult<T> {
    value
        .parse()
        .map_err(|_| XlsxError::Parse(format!("invalid {key}={value:?}")))
}

/// Streaming reader over the rows of a worksheet part.
///
/// Rows come out in document order. Rows without `r` continue from the
/// previous row and cells without `r` from the previous cell, so every
/// yielded cell carries its reference.
pub struct RowReader<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    parser: RowParser,
    in_sheet_data: bool,
    last_row: u32,
    done: bool,
}

impl<'a> RowReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            reader: Reader::from_reader(bytes),
            buf: Vec::new(),
            parser: RowParser::default(),
            in_sheet_data: false,
            last_row: 0,
            done: false,
        }
    }

    fn next_row(&mut self) -> XlsxResult<Option<Row>> {
        loop {
            self.buf.clear();
            let finished = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                    self.in_sheet_data = true;
                    None
                }
                Event::End(e) if e.local_name().as_ref() == b"sheetData" => return Ok(None),
                Event::Start(e) if self.in_sheet_data => self.parser.open(&e, false)?,
                Event::Empty(e) if self.in_sheet_data => self.parser.open(&e, true)?,
                Event::End(e) if self.in_sheet_data => self.parser.close(e.local_name().as_ref()),
                Event::Text(e) if self.in_sheet_data => {
                    self.parser.text(&e.unescape()?);
                    None
                }
                Event::Eof => return Ok(None),
                _ => None,
            };
            if let Some(row) = finished {
                return self.place(row).map(Some);
            }
        }
    }

    fn place(&mut self, mut row: Row) -> XlsxResult<Row> {
        if row.number == 0 {
            row.number = self.last_row + 1;
        }
        self.last_row = row.number;
        let mut prev_col = 0;
        for cell in &mut row.cells {
            if cell.reference.is_empty() {
                prev_col += 1;
                cell.reference = coordinates_to_cell_name(prev_col, row.number)?;
            } else {
                prev_col = cell_name_to_coordinates(&cell.reference)?.0;
            }
        }
        Ok(row)
    }
}

impl Iterator for RowReader<'_> {
    type Item = XlsxResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
