//! `xl/workbook.xml`: the sheet list
//!
//! Only `<sheets>` is decoded. Everything else in the part (defined names,
//! calculation properties, views) is kept by splicing a regenerated
//! `<sheets>` element into the original text.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attributes, escape_xml, local, normalize_namespaces, push_attrs, splice_element};

/// One `<sheet>` entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    /// Relationship id of the worksheet part
    pub rid: String,
    /// Remaining attributes such as `state="hidden"`
    pub extra_attrs: Vec<(String, String)>,
}

/// Decode the sheet list in document order.
pub fn read_sheets(bytes: &[u8]) -> XlsxResult<Vec<SheetEntry>> {
    let bytes = normalize_namespaces(bytes);
    let mut reader = Reader::from_reader(bytes.as_ref());
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut entry = SheetEntry::default();
                for (key, value) in attributes(&e)? {
                    match (key.as_str(), local(&key)) {
                        ("name", _) => entry.name = value,
                        ("sheetId", _) => {
                            entry.sheet_id = value.parse().map_err(|_| {
                                XlsxError::Parse(format!("Invalid sheetId: {value}"))
                            })?
                        }
                        (k, "id") if k.contains(':') => entry.rid = value,
                        _ => entry.extra_attrs.push((key, value)),
                    }
                }
                sheets.push(entry);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Render the `<sheets>` element.
pub fn sheets_xml(sheets: &[SheetEntry]) -> String {
    let mut content = String::from("<sheets>");
    for sheet in sheets {
        content.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}""#,
            escape_xml(&sheet.name),
            sheet.sheet_id
        ));
        push_attrs(&mut content, &sheet.extra_attrs);
        content.push_str(&format!(r#" r:id="{}"/>"#, escape_xml(&sheet.rid)));
    }
    content.push_str("</sheets>");
    content
}

/// Replace the sheet list of an existing workbook part.
pub fn write_sheets(original: &str, sheets: &[SheetEntry]) -> XlsxResult<String> {
    splice_element(
        original,
        "sheets",
        &sheets_xml(sheets),
        &["<definedNames", "<calcPr", "</workbook>"],
    )
    .ok_or_else(|| XlsxError::InvalidFormat("workbook part has no <workbook> root".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView/></bookViews><sheets><sheet name="Data &amp; More" sheetId="1" r:id="rId1"/><sheet name="Hidden" sheetId="4" state="hidden" r:id="rId2"/></sheets><definedNames><definedName name="x">Data!$A$1</definedName></definedNames></workbook>"#;

    #[test]
    fn test_read_sheets() {
        let sheets = read_sheets(WORKBOOK.as_bytes()).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Data & More");
        assert_eq!(sheets[1].sheet_id, 4);
        assert_eq!(sheets[1].rid, "rId2");
        assert_eq!(
            sheets[1].extra_attrs,
            vec![("state".to_string(), "hidden".to_string())]
        );
    }

    #[test]
    fn test_write_sheets_keeps_other_content() {
        let mut sheets = read_sheets(WORKBOOK.as_bytes()).unwrap();
        sheets.push(SheetEntry {
            name: "New".into(),
            sheet_id: 5,
            rid: "rId9".into(),
            ..Default::default()
        });
        let xml = write_sheets(WORKBOOK, &sheets).unwrap();
        assert!(xml.contains("<definedNames>"));
        assert!(xml.contains("<bookViews>"));
        assert_eq!(read_sheets(xml.as_bytes()).unwrap(), sheets);
    }
}
