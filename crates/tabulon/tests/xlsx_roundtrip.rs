//! End-to-end tests for XLSX round trips (create -> save -> open -> verify)

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Cursor;
use tabulon::prelude::*;
use tempfile::TempDir;

fn reopen(file: &File) -> File {
    let buf = file.write_to(Cursor::new(Vec::new())).unwrap().into_inner();
    File::open_reader(Cursor::new(buf), Options::default()).unwrap()
}

/// Numbers, booleans and text survive a save through the filesystem
#[test]
fn test_roundtrip_values_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("values.xlsx");

    let file = File::new();
    file.set_cell_value("Sheet1", "A1", 42).unwrap();
    file.set_cell_value("Sheet1", "B1", 3.14159).unwrap();
    file.set_cell_value("Sheet1", "C1", -100.5).unwrap();
    file.set_cell_value("Sheet1", "A2", true).unwrap();
    file.set_cell_value("Sheet1", "B2", "Hello, World!").unwrap();
    file.set_cell_value("Sheet1", "C2", "Special: <>&\"'").unwrap();
    file.save_as(&path).unwrap();

    let file = File::open(&path).unwrap();
    assert_eq!(file.get_sheet_list(), vec!["Sheet1".to_string()]);
    assert_eq!(file.get_cell_value("Sheet1", "A1").unwrap(), "42");
    assert_eq!(file.get_cell_value("Sheet1", "B1").unwrap(), "3.14159");
    assert_eq!(file.get_cell_value("Sheet1", "C1").unwrap(), "-100.5");
    assert_eq!(file.get_cell_value("Sheet1", "A2").unwrap(), "1");
    assert_eq!(file.get_cell_value("Sheet1", "B2").unwrap(), "Hello, World!");
    assert_eq!(file.get_cell_value("Sheet1", "C2").unwrap(), "Special: <>&\"'");
    assert_eq!(file.get_cell_type("Sheet1", "A2").unwrap(), CellType::Bool);
    assert_eq!(file.get_cell_type("Sheet1", "B2").unwrap(), CellType::String);
}

/// Repeated strings share one table entry across save and reopen
#[test]
fn test_roundtrip_shared_strings_append() {
    let file = File::new();
    file.set_cell_value("Sheet1", "A1", "dup").unwrap();
    file.set_cell_value("Sheet1", "A2", "dup").unwrap();

    let file = reopen(&file);
    file.set_cell_value("Sheet1", "A3", "dup").unwrap();
    file.set_cell_value("Sheet1", "A4", "new").unwrap();

    let file = reopen(&file);
    let rows = file.get_rows("Sheet1").unwrap();
    assert_eq!(
        rows,
        vec![vec!["dup"], vec!["dup"], vec!["dup"], vec!["new"]]
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    );
}

/// Formulas, shared formulas and merges come back as written
#[test]
fn test_roundtrip_formulas_and_merges() {
    let file = File::new();
    file.set_sheet_row("Sheet1", "A1", [1, 2]).unwrap();
    file.set_sheet_row("Sheet1", "A2", [3, 4]).unwrap();
    file.set_cell_formula("Sheet1", "C1", "=A1+B1", &FormulaOpts::shared("C1:C2"))
        .unwrap();
    file.merge_cell("Sheet1", "E1", "F2").unwrap();

    let file = reopen(&file);
    // the stored formula text has no leading '='
    assert_eq!(file.get_cell_formula("Sheet1", "C1").unwrap(), "A1+B1");
    assert_eq!(file.get_cell_formula("Sheet1", "C2").unwrap(), "A2+B2");
    assert_eq!(file.calc_cell_value("Sheet1", "C2").unwrap(), "7");

    let merged = file.get_merge_cells("Sheet1").unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].area().to_string(), "E1:F2");
}

/// Dates keep their serial value and the default date-time style
#[test]
fn test_roundtrip_dates() {
    let file = File::new();
    let t = NaiveDate::from_ymd_opt(2011, 11, 20)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    file.set_cell_value("Sheet1", "A1", t).unwrap();
    let style = file.get_cell_style("Sheet1", "A1").unwrap();

    let file = reopen(&file);
    let raw = Options::default().with_raw_cell_value(true);
    assert_eq!(
        file.get_cell_value_with("Sheet1", "A1", &raw).unwrap(),
        "40867.5"
    );
    assert_eq!(file.get_cell_style("Sheet1", "A1").unwrap(), style);
}

/// Sheets added after creation are written with their relationships
#[test]
fn test_roundtrip_new_sheet_and_hyperlink() {
    let file = File::new();
    assert_eq!(file.new_sheet("Data").unwrap(), 1);
    file.set_cell_value("Data", "B2", "x").unwrap();
    file.set_cell_hyperlink(
        "Data",
        "B2",
        "https://example.com",
        HyperlinkKind::External,
        &HyperlinkOpts::default(),
    )
    .unwrap();

    let file = reopen(&file);
    assert_eq!(
        file.get_sheet_list(),
        vec!["Sheet1".to_string(), "Data".to_string()]
    );
    assert_eq!(file.sheet_index("data"), Some(1));
    assert_eq!(file.get_cell_value("Data", "B2").unwrap(), "x");
    assert_eq!(
        file.get_cell_hyperlink("Data", "B2").unwrap().as_deref(),
        Some("https://example.com")
    );
}

/// Row properties are written to the row element
#[test]
fn test_roundtrip_row_properties() {
    let file = File::new();
    file.set_row_height("Sheet1", 3, 28.5).unwrap();
    file.set_row_visible("Sheet1", 4, false).unwrap();
    file.set_row_outline_level("Sheet1", 5, 2).unwrap();

    let file = reopen(&file);
    assert_eq!(file.get_row_height("Sheet1", 3).unwrap(), 28.5);
    assert_eq!(file.get_row_height("Sheet1", 1).unwrap(), 15.0);
    assert!(!file.get_row_visible("Sheet1", 4).unwrap());
    assert_eq!(file.get_row_outline_level("Sheet1", 5).unwrap(), 2);
}

/// Rich text runs keep their fonts across save, append and reopen
#[test]
fn test_roundtrip_rich_text() {
    let bold = RichTextFont {
        bold: true,
        color: Some("E83723".into()),
        size: Some(14.0),
        ..Default::default()
    };
    let runs = vec![
        RichTextRun::new("bold").with_font(bold),
        RichTextRun::new(" then plain "),
        RichTextRun::new("underlined").with_font(RichTextFont {
            underline: Some("single".into()),
            family: Some("Times New Roman".into()),
            ..Default::default()
        }),
    ];
    let file = File::new();
    file.set_cell_value("Sheet1", "A1", "plain").unwrap();
    file.set_cell_rich_text("Sheet1", "B1", &runs).unwrap();

    let file = reopen(&file);
    assert_eq!(file.get_cell_rich_text("Sheet1", "B1").unwrap(), runs);
    assert_eq!(
        file.get_cell_value("Sheet1", "B1").unwrap(),
        "bold then plain underlined"
    );
    file.set_cell_value("Sheet1", "C1", "added").unwrap();

    let file = reopen(&file);
    assert_eq!(file.get_cell_rich_text("Sheet1", "B1").unwrap(), runs);
    assert_eq!(
        file.get_cell_rich_text("Sheet1", "A1").unwrap(),
        vec![RichTextRun::new("plain")]
    );
    assert_eq!(file.get_cell_value("Sheet1", "C1").unwrap(), "added");
}
