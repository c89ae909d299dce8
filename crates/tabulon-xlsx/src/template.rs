//! Parts of a blank workbook with one empty sheet

use crate::content_types::{ContentTypes, CT_STYLES, CT_WORKBOOK, CT_WORKSHEET};
use crate::package::{Package, PackageStore, CONTENT_TYPES_PATH};
use crate::relationships::{Relationships, REL_OFFICE_DOCUMENT, REL_STYLES, REL_WORKSHEET};
use crate::xml::{NS_RELATIONSHIPS, NS_SPREADSHEETML, XML_HEADER};

pub const WORKBOOK_PATH: &str = "xl/workbook.xml";
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

const DEFAULT_STYLES: &str = concat!(
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#,
);

const EMPTY_SHEET: &str = concat!(
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<dimension ref="A1"/><sheetData/>"#,
    r#"</worksheet>"#,
);

/// Build the package of a new workbook.
pub fn blank_package() -> Package {
    let mut package = Package::new();

    let mut types = ContentTypes::default();
    types.defaults.push((
        "rels".into(),
        "application/vnd.openxmlformats-package.relationships+xml".into(),
    ));
    types.defaults.push(("xml".into(), "application/xml".into()));
    types.set_override(WORKBOOK_PATH, CT_WORKBOOK);
    types.set_override("xl/worksheets/sheet1.xml", CT_WORKSHEET);
    types.set_override("xl/styles.xml", CT_STYLES);
    package.store(CONTENT_TYPES_PATH, types.to_xml().into_bytes());

    let mut root = Relationships::new();
    root.add(REL_OFFICE_DOCUMENT, WORKBOOK_PATH, None);
    package.store("_rels/.rels", root.to_xml().into_bytes());

    let mut workbook_rels = Relationships::new();
    let sheet_rid = workbook_rels.add(REL_WORKSHEET, "worksheets/sheet1.xml", None);
    workbook_rels.add(REL_STYLES, "styles.xml", None);
    package.store("xl/_rels/workbook.xml.rels", workbook_rels.to_xml().into_bytes());

    let workbook = format!(
        concat!(
            "{header}\n",
            r#"<workbook xmlns="{main}" xmlns:r="{rel}">"#,
            r#"<bookViews><workbookView/></bookViews>"#,
            r#"<sheets><sheet name="{name}" sheetId="1" r:id="{rid}"/></sheets>"#,
            r#"<calcPr calcId="0"/>"#,
            "</workbook>"
        ),
        header = XML_HEADER,
        main = NS_SPREADSHEETML,
        rel = NS_RELATIONSHIPS,
        name = DEFAULT_SHEET_NAME,
        rid = sheet_rid,
    );
    package.store(WORKBOOK_PATH, workbook.into_bytes());
    package.store(
        "xl/styles.xml",
        format!("{XML_HEADER}\n{DEFAULT_STYLES}").into_bytes(),
    );
    package.store(
        "xl/worksheets/sheet1.xml",
        format!("{XML_HEADER}\n{EMPTY_SHEET}").into_bytes(),
    );
    package
}
