//! Style part (`xl/styles.xml`)
//!
//! Reads the custom number formats and the cell formats into a
//! [`StyleTable`]. Writing regenerates only `<numFmts>` and `<cellXfs>` and
//! splices them into the original part, so fonts, fills, borders and named
//! styles pass through untouched.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attributes, escape_xml, local, normalize_namespaces, splice_element};
use log::warn;
use tabulon_core::{CellFormat, StyleTable};

/// Decode the number formats and cell formats.
pub fn read_styles(bytes: &[u8]) -> XlsxResult<StyleTable> {
    let bytes = normalize_namespaces(bytes);
    let source: &[u8] = bytes.as_ref();
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut skip = Vec::new();

    let mut number_formats: Vec<(u32, String)> = Vec::new();
    let mut cell_formats: Vec<CellFormat> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"numFmt" => number_formats.extend(read_num_fmt(&e)?),
                b"xf" if in_cell_xfs => {
                    let mut xf = read_xf(&e)?;
                    reader.read_to_end_into(e.name(), &mut skip)?;
                    let end = reader.buffer_position() as usize;
                    xf.raw = Some(String::from_utf8_lossy(&source[start..end]).into_owned());
                    cell_formats.push(xf);
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" => number_formats.extend(read_num_fmt(&e)?),
                b"xf" if in_cell_xfs => {
                    let mut xf = read_xf(&e)?;
                    let end = reader.buffer_position() as usize;
                    xf.raw = Some(String::from_utf8_lossy(&source[start..end]).into_owned());
                    cell_formats.push(xf);
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
        skip.clear();
    }
    Ok(StyleTable::from_parts(cell_formats, number_formats))
}

fn read_num_fmt(e: &BytesStart<'_>) -> XlsxResult<Option<(u32, String)>> {
    let mut id = None;
    let mut code = String::new();
    for (key, value) in attributes(e)? {
        match local(&key) {
            "numFmtId" => id = value.parse::<u32>().ok(),
            "formatCode" => code = value,
            _ => {}
        }
    }
    if id.is_none() {
        warn!("skipping number format without a valid numFmtId");
    }
    Ok(id.map(|id| (id, code)))
}

fn read_xf(e: &BytesStart<'_>) -> XlsxResult<CellFormat> {
    let mut xf = CellFormat::default();
    for (key, value) in attributes(e)? {
        let slot = match local(&key) {
            "numFmtId" => &mut xf.num_fmt_id,
            "fontId" => &mut xf.font_id,
            "fillId" => &mut xf.fill_id,
            "borderId" => &mut xf.border_id,
            "xfId" => &mut xf.xf_id,
            _ => continue,
        };
        match value.parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!("ignoring invalid {key}={value:?} on a cell format"),
        }
    }
    Ok(xf)
}

fn num_fmts_xml(table: &StyleTable) -> String {
    let formats: Vec<(u32, &str)> = table.number_formats().collect();
    let mut xml = format!(r#"<numFmts count="{}">"#, formats.len());
    for (id, code) in formats {
        xml.push_str(&format!(
            r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
            id,
            escape_xml(code)
        ));
    }
    xml.push_str("</numFmts>");
    xml
}

fn cell_xfs_xml(table: &StyleTable) -> String {
    let mut xml = format!(r#"<cellXfs count="{}">"#, table.len());
    for xf in table.cell_formats() {
        match &xf.raw {
            Some(raw) => xml.push_str(raw),
            None => {
                xml.push_str(&format!(
                    r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}" xfId="{}""#,
                    xf.num_fmt_id, xf.font_id, xf.fill_id, xf.border_id, xf.xf_id
                ));
                if xf.num_fmt_id != 0 {
                    xml.push_str(r#" applyNumberFormat="1""#);
                }
                xml.push_str("/>");
            }
        }
    }
    xml.push_str("</cellXfs>");
    xml
}

/// Splice the current number formats and cell formats into `original`.
pub fn write_styles(original: &str, table: &StyleTable) -> XlsxResult<String> {
    let missing_root = || XlsxError::InvalidFormat("styles part has no <styleSheet> root".into());
    let mut xml = original.to_string();
    if table.number_formats().next().is_some() {
        xml = splice_element(
            &xml,
            "numFmts",
            &num_fmts_xml(table),
            &["<fonts", "<fills", "<borders", "<cellStyleXfs", "<cellXfs", "</styleSheet>"],
        )
        .ok_or_else(missing_root)?;
    }
    splice_element(
        &xml,
        "cellXfs",
        &cell_xfs_xml(table),
        &["<cellStyles", "<dxfs", "<tableStyles", "<colors", "<extLst", "</styleSheet>"],
    )
    .ok_or_else(missing_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.000&quot;kg&quot;"/></numFmts><fonts count="1"><font><sz val="11"/></font></fonts><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"><alignment horizontal="center"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

    #[test]
    fn test_read_styles() {
        let table = read_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.number_format_code(1), Some("0.000\"kg\""));
        assert_eq!(table.number_format_code(0), Some("General"));
        assert!(table.cell_format(1).unwrap().raw.as_deref().unwrap().contains("<alignment"));
    }

    #[test]
    fn test_write_styles_keeps_raw_formats() {
        let mut table = read_styles(STYLES.as_bytes()).unwrap();
        let date = table.add_number_format_style(22);
        let custom = table.add_custom_number_format("0.0%");
        assert_eq!(custom, 165);

        let xml = write_styles(STYLES, &table).unwrap();
        assert!(xml.contains(r#"<alignment horizontal="center"/>"#));
        assert!(xml.contains(r#"<cellStyle name="Normal""#));
        assert!(xml.contains(r#"<cellXfs count="3">"#));

        let reread = read_styles(xml.as_bytes()).unwrap();
        assert_eq!(reread.len(), 3);
        assert_eq!(reread.number_format_code(date), Some("m/d/yy h:mm"));
        assert_eq!(
            reread.number_formats().collect::<Vec<_>>(),
            vec![(164, "0.000\"kg\""), (165, "0.0%")]
        );
    }
}
