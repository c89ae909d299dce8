//! Package and worksheet part round trips through a ZIP archive

use pretty_assertions::assert_eq;
use std::io::Cursor;
use tabulon_core::{CellType, RawType};
use tabulon_xlsx::{
    blank_package, read_sheets, read_worksheet, write_worksheet, Package, PackageStore, XlsxError,
};

const LIMIT: u64 = 1 << 30;

fn rezip(package: &Package) -> Package {
    let buf = package.write_zip(Cursor::new(Vec::new())).unwrap().into_inner();
    Package::read_zip(Cursor::new(buf), LIMIT).unwrap()
}

const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<dimension ref="A1:C2"/>
<sheetViews><sheetView workbookViewId="0" tabSelected="1"/></sheetViews>
<sheetData>
<row r="1" spans="1:3"><c r="A1"><v>1.5</v></c><c r="B1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>tab_x0009_here</t></is></c></row>
<row r="2"><c r="A2"><f>A1*2</f><v>3</v></c><c r="B2" t="b"><v>1</v></c></row>
</sheetData>
<conditionalFormatting sqref="A1:A2"><cfRule type="cellIs" priority="1" operator="greaterThan"><formula>1</formula></cfRule></conditionalFormatting>
<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
</worksheet>"#;

#[test]
fn test_blank_package_survives_zip() {
    let package = rezip(&blank_package());
    let paths: Vec<&str> = package.paths().collect();
    assert!(paths.contains(&"[Content_Types].xml"));
    assert!(paths.contains(&"xl/worksheets/sheet1.xml"));

    let sheets = read_sheets(package.load("xl/workbook.xml").unwrap()).unwrap();
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "Sheet1");
    assert_eq!(sheets[0].sheet_id, 1);

    let ws = read_worksheet(package.load("xl/worksheets/sheet1.xml").unwrap()).unwrap();
    assert!(ws.rows.is_empty());
}

#[test]
fn test_worksheet_keeps_unmodelled_elements_in_order() {
    let ws = read_worksheet(SHEET.as_bytes()).unwrap();
    let names: Vec<&str> = ws.preserved.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["sheetViews", "conditionalFormatting", "pageMargins"]);

    let xml = write_worksheet(&ws).unwrap();
    let at = |needle: &str| xml.find(needle).unwrap_or_else(|| panic!("{needle} missing"));
    assert!(at("<dimension ref=\"A1:C2\"/>") < at("<sheetViews>"));
    assert!(at("<sheetViews>") < at("<sheetData>"));
    assert!(at("</sheetData>") < at("<conditionalFormatting"));
    assert!(at("<conditionalFormatting") < at("<pageMargins"));
    assert!(xml.contains("xmlns:r="));
}

#[test]
fn test_worksheet_cells_round_trip() {
    let mut package = blank_package();
    package.store("xl/worksheets/sheet1.xml", SHEET.as_bytes().to_vec());
    let package = rezip(&package);

    let ws = read_worksheet(package.load("xl/worksheets/sheet1.xml").unwrap()).unwrap();
    let again = read_worksheet(write_worksheet(&ws).unwrap().as_bytes()).unwrap();

    for ws in [&ws, &again] {
        let row1 = &ws.rows[0];
        assert_eq!(row1.number, 1);
        let b1 = row1.find("B1").unwrap();
        assert_eq!(b1.raw_type(), RawType::SharedString);
        assert_eq!(b1.value(), "0");
        let c1 = row1.find("C1").unwrap();
        assert_eq!(c1.inline.as_deref(), Some("tab\there"));

        let a2 = ws.rows[1].find("A2").unwrap();
        assert_eq!(a2.formula.as_ref().map(|f| f.content.as_str()), Some("A1*2"));
        assert_eq!(a2.value(), "3");
        assert_eq!(ws.rows[1].find("B2").unwrap().cell_type(), CellType::Bool);
    }
}

#[test]
fn test_size_limit_is_enforced() {
    let buf = blank_package()
        .write_zip(Cursor::new(Vec::new()))
        .unwrap()
        .into_inner();
    let err = Package::read_zip(Cursor::new(buf), 64).unwrap_err();
    assert!(matches!(err, XlsxError::SizeLimit { limit: 64 }));
}

#[test]
fn test_missing_content_types_is_rejected() {
    let mut package = Package::new();
    package.store("xl/workbook.xml", b"<workbook/>".to_vec());
    let buf = package.write_zip(Cursor::new(Vec::new())).unwrap().into_inner();
    let err = Package::read_zip(Cursor::new(buf), LIMIT).unwrap_err();
    assert!(matches!(err, XlsxError::InvalidFormat(_)));
}
