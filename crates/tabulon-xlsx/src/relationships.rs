//! Relationship parts (`_rels/*.rels`)

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{attributes, escape_xml, local, normalize_namespaces, XML_HEADER};

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const REL_CALC_CHAIN: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
pub const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// One `<Relationship>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `External` for targets outside the package
    pub target_mode: Option<String>,
}

/// The relationships of one part
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a `.rels` part.
    pub fn read(bytes: &[u8]) -> XlsxResult<Self> {
        let bytes = normalize_namespaces(bytes);
        let mut reader = Reader::from_reader(bytes.as_ref());
        let mut buf = Vec::new();
        let mut rels = Self::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let mut rel = Relationship::default();
                    for (key, value) in attributes(&e)? {
                        match local(&key) {
                            "Id" => rel.id = value,
                            "Type" => rel.rel_type = value,
                            "Target" => rel.target = value,
                            "TargetMode" => rel.target_mode = Some(value),
                            _ => {}
                        }
                    }
                    rels.items.push(rel);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(rels)
    }

    pub fn to_xml(&self) -> String {
        let mut content = format!(
            "{XML_HEADER}\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
        );
        for rel in &self.items {
            content.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape_xml(&rel.id),
                escape_xml(&rel.rel_type),
                escape_xml(&rel.target)
            ));
            if let Some(mode) = &rel.target_mode {
                content.push_str(&format!(r#" TargetMode="{}""#, escape_xml(mode)));
            }
            content.push_str("/>");
        }
        content.push_str("</Relationships>");
        content
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// First relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// Add a relationship under a fresh `rIdN` and return the id.
    pub fn add(&mut self, rel_type: &str, target: &str, target_mode: Option<&str>) -> String {
        let next = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode: target_mode.map(str::to_string),
        });
        id
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.items.iter().position(|r| r.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Whether `rel_type` names the given kind, in either namespace flavour
pub fn is_rel_type(rel_type: &str, kind: &str) -> bool {
    rel_type
        .strip_prefix(REL_BASE)
        .and_then(|rest| rest.strip_prefix('/'))
        == Some(kind)
}

/// Path of the `.rels` part describing `part`
///
/// ```
/// use tabulon_xlsx::relationships::rels_path;
///
/// assert_eq!(rels_path("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
/// ```
pub fn rels_path(part: &str) -> String {
    let part = part.trim_start_matches('/');
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part.
///
/// ```
/// use tabulon_xlsx::relationships::resolve_target;
///
/// assert_eq!(resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
/// assert_eq!(resolve_target("xl/workbook.xml", "/xl/styles.xml"), "xl/styles.xml");
/// assert_eq!(resolve_target("xl/worksheets/sheet1.xml", "../drawings/d1.xml"), "xl/drawings/d1.xml");
/// ```
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_part
        .trim_start_matches('/')
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    for segment in target.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Express `part` relative to the directory of `source_part`, the form
/// written into `Target` attributes.
///
/// ```
/// use tabulon_xlsx::relationships::relative_target;
///
/// assert_eq!(relative_target("xl/workbook.xml", "xl/worksheets/sheet2.xml"), "worksheets/sheet2.xml");
/// ```
pub fn relative_target(source_part: &str, part: &str) -> String {
    let part = part.trim_start_matches('/');
    match source_part.trim_start_matches('/').rsplit_once('/') {
        Some((dir, _)) => match part.strip_prefix(dir).and_then(|p| p.strip_prefix('/')) {
            Some(rest) => rest.to_string(),
            None => format!("/{part}"),
        },
        None => part.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    #[test]
    fn test_read_and_add() {
        let mut rels = Relationships::read(WORKBOOK_RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels.get("rId1").unwrap().target, "worksheets/sheet1.xml");
        assert_eq!(rels.find_by_type(REL_STYLES).unwrap().id, "rId2");

        let id = rels.add(REL_HYPERLINK, "https://example.com/?a=1&b=2", Some("External"));
        assert_eq!(id, "rId3");
        let reread = Relationships::read(rels.to_xml().as_bytes()).unwrap();
        assert_eq!(reread, rels);

        assert!(rels.remove("rId3").is_some());
        assert!(rels.get("rId3").is_none());
    }

    #[test]
    fn test_strict_types_are_normalized() {
        let strict = r#"<Relationships><Relationship Id="rId1" Type="http://purl.oclc.org/ooxml/officeDocument/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let rels = Relationships::read(strict.as_bytes()).unwrap();
        assert!(is_rel_type(&rels.get("rId1").unwrap().rel_type, "worksheet"));
    }

    #[test]
    fn test_paths() {
        assert_eq!(rels_path("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
        assert_eq!(rels_path("/workbook.xml"), "_rels/workbook.xml.rels");
        assert_eq!(resolve_target("xl/workbook.xml", "./sheet.xml"), "xl/sheet.xml");
        assert_eq!(relative_target("xl/workbook.xml", "docProps/app.xml"), "/docProps/app.xml");
    }
}
