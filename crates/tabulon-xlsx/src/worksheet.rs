//! Worksheet part (`xl/worksheets/sheetN.xml`)
//!
//! Only the parts the model edits are decoded: `<sheetData>`, `<cols>`,
//! `<mergeCells>`, `<hyperlinks>` and `<sheetFormatPr>`. Every other
//! top-level element is kept as raw XML and written back at its schema
//! position.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::rows::RowParser;
use crate::xml::{
    attributes, escape_xml, local, normalize_namespaces, parse_bool, push_attrs,
    NS_RELATIONSHIPS, NS_SPREADSHEETML, XML_HEADER,
};
use log::warn;
use tabulon_core::coordinate::coordinates_to_cell_name;
use tabulon_core::{
    Area, Cell, ColumnDef, FormulaKind, Hyperlink, PreservedElement, RawType, Row, SheetFormat,
    Worksheet,
};

/// Child order of `<worksheet>` (CT_Worksheet)
const ELEMENT_ORDER: &[&str] = &[
    "sheetPr",
    "dimension",
    "sheetViews",
    "sheetFormatPr",
    "cols",
    "sheetData",
    "sheetCalcPr",
    "sheetProtection",
    "protectedRanges",
    "scenarios",
    "autoFilter",
    "sortState",
    "dataConsolidate",
    "customSheetViews",
    "mergeCells",
    "phoneticPr",
    "conditionalFormatting",
    "dataValidations",
    "hyperlinks",
    "printOptions",
    "pageMargins",
    "pageSetup",
    "headerFooter",
    "rowBreaks",
    "colBreaks",
    "customProperties",
    "cellWatches",
    "ignoredErrors",
    "smartTags",
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

/// Decode a worksheet part. The result is not densified yet.
pub fn read_worksheet(bytes: &[u8]) -> XlsxResult<Worksheet> {
    let bytes = normalize_namespaces(bytes);
    let source: &[u8] = bytes.as_ref();
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut skip = Vec::new();
    let mut ws = Worksheet::default();
    let mut rows = RowParser::default();
    let mut section: Option<Vec<u8>> = None;
    let mut depth = 0usize;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) if depth == 0 => {
                ws.root_attrs = attributes(&e)?;
                depth = 1;
            }
            Event::Empty(e) if depth == 0 => ws.root_attrs = attributes(&e)?,
            Event::Start(e) if section.is_some() => {
                depth += 1;
                open_child(&mut ws, &mut rows, &e, false)?;
            }
            Event::Empty(e) if section.is_some() => open_child(&mut ws, &mut rows, &e, empty)?,
            Event::Text(e) if section.as_deref() == Some(b"sheetData".as_slice()) => {
                rows.text(&e.unescape()?);
            }
            Event::End(e) if section.is_some() => {
                depth -= 1;
                if depth == 1 {
                    section = None;
                } else if let Some(row) = rows.close(e.local_name().as_ref()) {
                    ws.rows.push(row);
                }
            }
            Event::Start(e) | Event::Empty(e) if depth == 1 => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"sheetData" | b"cols" | b"mergeCells" | b"hyperlinks" => {
                        if !empty {
                            section = Some(name);
                            depth += 1;
                        }
                    }
                    b"sheetFormatPr" | b"dimension" => {
                        if name == b"sheetFormatPr" {
                            ws.sheet_format = Some(read_sheet_format(&e)?);
                        }
                        if !empty {
                            let qname = e.name().as_ref().to_vec();
                            reader.read_to_end_into(QName(&qname), &mut skip)?;
                        }
                    }
                    _ => {
                        if !empty {
                            let qname = e.name().as_ref().to_vec();
                            reader.read_to_end_into(QName(&qname), &mut skip)?;
                        }
                        let end = reader.buffer_position() as usize;
                        ws.preserved.push(PreservedElement {
                            name: String::from_utf8_lossy(&name).into_owned(),
                            xml: String::from_utf8_lossy(&source[start..end]).into_owned(),
                        });
                    }
                }
            }
            Event::End(_) if depth == 1 => depth = 0,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
        skip.clear();
    }
    Ok(ws)
}

/// Route a child element of one of the decoded sections.
fn open_child(
    ws: &mut Worksheet,
    rows: &mut RowParser,
    e: &BytesStart<'_>,
    empty: bool,
) -> XlsxResult<()> {
    match e.local_name().as_ref() {
        b"col" => ws.cols.push(read_col(e)?),
        b"mergeCell" => {
            for (key, value) in attributes(e)? {
                if local(&key) != "ref" {
                    continue;
                }
                match Area::parse(&value) {
                    Ok(area) => ws.merge_cells.push(area.to_string()),
                    Err(err) => warn!("dropping merged area {value:?}: {err}"),
                }
            }
        }
        b"hyperlink" => ws.hyperlinks.push(read_hyperlink(e)?),
        _ => {
            if let Some(row) = rows.open(e, empty)? {
                ws.rows.push(row);
            }
        }
    }
    Ok(())
}

fn read_col(e: &BytesStart<'_>) -> XlsxResult<ColumnDef> {
    let mut col = ColumnDef::default();
    for (key, value) in attributes(e)? {
        match local(&key) {
            "min" => col.min = value.parse().unwrap_or(0),
            "max" => col.max = value.parse().unwrap_or(0),
            "width" => col.width = value.parse().ok(),
            "style" => col.style = value.parse().unwrap_or(0),
            "hidden" => col.hidden = parse_bool(&value),
            "customWidth" => col.custom_width = parse_bool(&value),
            "bestFit" => col.best_fit = parse_bool(&value),
            "outlineLevel" => col.outline_level = value.parse().unwrap_or(0),
            "collapsed" => col.collapsed = parse_bool(&value),
            _ => {}
        }
    }
    Ok(col)
}

fn read_hyperlink(e: &BytesStart<'_>) -> XlsxResult<Hyperlink> {
    let mut link = Hyperlink::default();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "ref" => link.reference = value,
            "location" => link.location = Some(value),
            "display" => link.display = Some(value),
            "tooltip" => link.tooltip = Some(value),
            k if local(k) == "id" && k.contains(':') => link.rid = Some(value),
            _ => {}
        }
    }
    Ok(link)
}

fn read_sheet_format(e: &BytesStart<'_>) -> XlsxResult<SheetFormat> {
    let mut format = SheetFormat::default();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "defaultRowHeight" => format.default_row_height = value.parse().unwrap_or(0.0),
            "customHeight" => format.custom_height = parse_bool(&value),
            _ => format.extra_attrs.push((key, value)),
        }
    }
    Ok(format)
}

/// Serialize a worksheet.
pub fn write_worksheet(ws: &Worksheet) -> XlsxResult<String> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_HEADER);
    xml.push_str("<worksheet");
    let mut root_attrs = ws.root_attrs.clone();
    if !root_attrs.iter().any(|(k, _)| k == "xmlns") {
        root_attrs.insert(0, ("xmlns".to_string(), NS_SPREADSHEETML.to_string()));
    }
    let needs_r = ws.hyperlinks.iter().any(|h| h.rid.is_some());
    if needs_r && !root_attrs.iter().any(|(k, _)| k == "xmlns:r") {
        root_attrs.push(("xmlns:r".to_string(), NS_RELATIONSHIPS.to_string()));
    }
    push_attrs(&mut xml, &root_attrs);
    xml.push('>');

    for name in ELEMENT_ORDER {
        match *name {
            "dimension" => {
                let reference = match ws.used_extent() {
                    Some((cols, rows)) => format!("A1:{}", coordinates_to_cell_name(cols, rows)?),
                    None => "A1".to_string(),
                };
                xml.push_str(&format!(r#"<dimension ref="{reference}"/>"#));
            }
            "sheetFormatPr" => {
                if let Some(format) = &ws.sheet_format {
                    write_sheet_format(&mut xml, format);
                }
            }
            "cols" => write_cols(&mut xml, &ws.cols),
            "sheetData" => write_sheet_data(&mut xml, &ws.rows),
            "mergeCells" if !ws.merge_cells.is_empty() => {
                xml.push_str(&format!(r#"<mergeCells count="{}">"#, ws.merge_cells.len()));
                for area in &ws.merge_cells {
                    xml.push_str(&format!(r#"<mergeCell ref="{}"/>"#, escape_xml(area)));
                }
                xml.push_str("</mergeCells>");
            }
            "hyperlinks" => write_hyperlinks(&mut xml, &ws.hyperlinks),
            "extLst" => {
                // Elements outside the known order go last, ahead of extLst.
                for p in ws
                    .preserved
                    .iter()
                    .filter(|p| !ELEMENT_ORDER.contains(&p.name.as_str()))
                {
                    xml.push_str(&p.xml);
                }
            }
            _ => {}
        }
        for p in ws.preserved.iter().filter(|p| p.name == *name) {
            xml.push_str(&p.xml);
        }
    }
    xml.push_str("</worksheet>");
    Ok(xml)
}

fn write_sheet_format(xml: &mut String, format: &SheetFormat) {
    xml.push_str("<sheetFormatPr");
    push_attrs(xml, &format.extra_attrs);
    xml.push_str(&format!(
        r#" defaultRowHeight="{}""#,
        format.default_row_height
    ));
    if format.custom_height {
        xml.push_str(r#" customHeight="1""#);
    }
    xml.push_str("/>");
}

fn write_cols(xml: &mut String, cols: &[ColumnDef]) {
    if cols.is_empty() {
        return;
    }
    xml.push_str("<cols>");
    for col in cols {
        xml.push_str(&format!(r#"<col min="{}" max="{}""#, col.min, col.max));
        if let Some(width) = col.width {
            xml.push_str(&format!(r#" width="{width}""#));
        }
        if col.style != 0 {
            xml.push_str(&format!(r#" style="{}""#, col.style));
        }
        for (flag, name) in [
            (col.hidden, "hidden"),
            (col.best_fit, "bestFit"),
            (col.custom_width, "customWidth"),
            (col.collapsed, "collapsed"),
        ] {
            if flag {
                xml.push_str(&format!(r#" {name}="1""#));
            }
        }
        if col.outline_level > 0 {
            xml.push_str(&format!(r#" outlineLevel="{}""#, col.outline_level));
        }
        xml.push_str("/>");
    }
    xml.push_str("</cols>");
}

fn write_sheet_data(xml: &mut String, rows: &[Row]) {
    xml.push_str("<sheetData>");
    for row in rows.iter().filter(|r| r.has_content()) {
        write_row(xml, row);
    }
    xml.push_str("</sheetData>");
}

fn write_row(xml: &mut String, row: &Row) {
    xml.push_str(&format!(r#"<row r="{}""#, row.number));
    if row.custom_format {
        xml.push_str(&format!(r#" s="{}" customFormat="1""#, row.style));
    }
    if let Some(height) = row.height {
        xml.push_str(&format!(r#" ht="{height}""#));
    }
    if row.custom_height {
        xml.push_str(r#" customHeight="1""#);
    }
    if row.hidden {
        xml.push_str(r#" hidden="1""#);
    }
    if row.outline_level > 0 {
        xml.push_str(&format!(r#" outlineLevel="{}""#, row.outline_level));
    }
    if row.collapsed {
        xml.push_str(r#" collapsed="1""#);
    }
    push_attrs(xml, &row.extra_attrs);

    let cells: Vec<&Cell> = row.cells.iter().filter(|c| c.has_value()).collect();
    if cells.is_empty() {
        xml.push_str("/>");
        return;
    }
    xml.push('>');
    for cell in cells {
        write_cell(xml, cell);
    }
    xml.push_str("</row>");
}

fn write_cell(xml: &mut String, cell: &Cell) {
    xml.push_str(&format!(r#"<c r="{}""#, cell.reference));
    if cell.style != 0 {
        xml.push_str(&format!(r#" s="{}""#, cell.style));
    }
    if cell.raw_type() != RawType::Unset {
        xml.push_str(&format!(r#" t="{}""#, cell.raw_type().as_str()));
    }
    xml.push('>');

    if let Some(formula) = &cell.formula {
        xml.push_str("<f");
        if formula.kind != FormulaKind::Normal {
            xml.push_str(&format!(r#" t="{}""#, formula.kind.as_str()));
        }
        if let Some(reference) = &formula.reference {
            xml.push_str(&format!(r#" ref="{}""#, escape_xml(reference)));
        }
        if let Some(si) = formula.shared_index {
            xml.push_str(&format!(r#" si="{si}""#));
        }
        let content = formula
            .content
            .strip_prefix('=')
            .unwrap_or(&formula.content);
        if content.is_empty() {
            xml.push_str("/>");
        } else {
            xml.push_str(&format!(">{}</f>", escape_xml(content)));
        }
    }

    match (cell.raw_type(), &cell.inline) {
        (RawType::InlineStr, Some(text)) => {
            xml.push_str(&format!(r#"<is><t xml:space="preserve">{}</t></is>"#, escape_xml(text)));
        }
        _ if !cell.value().is_empty() => {
            xml.push_str(&format!("<v>{}</v>", escape_xml(cell.value())));
        }
        _ => {}
    }
    xml.push_str("</c>");
}

fn write_hyperlinks(xml: &mut String, links: &[Hyperlink]) {
    if links.is_empty() {
        return;
    }
    xml.push_str("<hyperlinks>");
    for link in links {
        xml.push_str(&format!(r#"<hyperlink ref="{}""#, escape_xml(&link.reference)));
        if let Some(rid) = &link.rid {
            xml.push_str(&format!(r#" r:id="{}""#, escape_xml(rid)));
        }
        for (name, value) in [
            ("location", &link.location),
            ("display", &link.display),
            ("tooltip", &link.tooltip),
        ] {
            if let Some(value) = value {
                xml.push_str(&format!(r#" {name}="{}""#, escape_xml(value)));
            }
        }
        xml.push_str("/>");
    }
    xml.push_str("</hyperlinks>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        r#"<dimension ref="A1:C2"/>"#,
        r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#,
        r#"<sheetFormatPr defaultRowHeight="15" x14ac:dyDescent="0.25"/>"#,
        r#"<cols><col min="1" max="2" width="12.5" customWidth="1"/></cols>"#,
        r#"<sheetData>"#,
        r#"<row r="1" spans="1:3"><c r="A1" t="s"><v>0</v></c><c r="C1" s="2"><f>A1&amp;"x"</f><v>1</v></c></row>"#,
        r#"<row r="3"><c r="B3"><f t="shared" ref="B3:B4" si="0">A3*2</f><v>6</v></c></row>"#,
        r#"</sheetData>"#,
        r#"<mergeCells count="1"><mergeCell ref="D2:B1"/></mergeCells>"#,
        r#"<hyperlinks><hyperlink ref="A1" r:id="rId1" display="home"/></hyperlinks>"#,
        r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
        r#"</worksheet>"#,
    );

    #[test]
    fn test_read_worksheet() {
        let ws = read_worksheet(SHEET.as_bytes()).unwrap();
        assert!(!ws.is_densified());
        assert_eq!(ws.root_attrs.len(), 2);
        assert_eq!(ws.rows.len(), 2);
        assert_eq!(ws.rows[0].cells[1].formula.as_ref().unwrap().content, "A1&\"x\"");
        let shared = ws.rows[1].cells[0].formula.as_ref().unwrap();
        assert_eq!(shared.kind, FormulaKind::Shared);
        assert_eq!(shared.reference.as_deref(), Some("B3:B4"));
        assert_eq!(shared.shared_index, Some(0));
        assert_eq!(ws.cols[0].width, Some(12.5));
        assert_eq!(ws.merge_cells, vec!["B1:D2".to_string()]);
        assert_eq!(ws.hyperlinks[0].rid.as_deref(), Some("rId1"));
        assert_eq!(ws.sheet_format.as_ref().unwrap().default_row_height, 15.0);

        let names: Vec<&str> = ws.preserved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sheetViews", "pageMargins"]);
        assert_eq!(
            ws.preserved[0].xml,
            r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#
        );
    }

    #[test]
    fn test_write_keeps_schema_order() {
        let mut ws = read_worksheet(SHEET.as_bytes()).unwrap();
        ws.densify().unwrap();
        let xml = write_worksheet(&ws).unwrap();

        let position = |needle: &str| xml.find(needle).unwrap();
        assert!(position("<dimension ref=\"A1:C3\"/>") < position("<sheetViews>"));
        assert!(position("<sheetViews>") < position("<sheetFormatPr"));
        assert!(position("<cols>") < position("<sheetData>"));
        assert!(position("</sheetData>") < position("<mergeCells"));
        assert!(position("<hyperlinks>") < position("<pageMargins"));
        assert!(xml.contains(r#"<f t="shared" ref="B3:B4" si="0">A3*2</f>"#));
        assert!(xml.contains(r#"<c r="C1" s="2"><f>A1&amp;&quot;x&quot;</f><v>1</v></c>"#));
        assert!(xml.contains(r#"x14ac:dyDescent="0.25""#));
        assert!(!xml.contains("spans"));

        let again = read_worksheet(xml.as_bytes()).unwrap();
        assert_eq!(again.rows.len(), 2);
        assert_eq!(again.preserved, ws.preserved);
    }

    #[test]
    fn test_write_new_sheet() {
        let mut ws = Worksheet::new();
        ws.prepare_cell("B2").unwrap().set_inline_str("a<b");
        ws.upsert_hyperlink(Hyperlink {
            reference: "B2".into(),
            rid: Some("rId1".into()),
            ..Default::default()
        })
        .unwrap();
        let xml = write_worksheet(&ws).unwrap();
        assert!(xml.contains(&format!(r#"xmlns="{NS_SPREADSHEETML}""#)));
        assert!(xml.contains(&format!(r#"xmlns:r="{NS_RELATIONSHIPS}""#)));
        assert!(xml.contains(
            r#"<c r="B2" t="inlineStr"><is><t xml:space="preserve">a&lt;b</t></is></c>"#
        ));
        assert!(xml.contains(r#"<dimension ref="A1:B2"/>"#));
    }

    #[test]
    fn test_empty_sheet_dimension() {
        let xml = write_worksheet(&Worksheet::new()).unwrap();
        assert!(xml.contains(r#"<dimension ref="A1"/>"#));
        assert!(xml.contains("<sheetData></sheetData>"));
    }
}
