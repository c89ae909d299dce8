//! `[Content_Types].xml`

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{attributes, escape_xml, local, XML_HEADER};

pub const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const CT_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
pub const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
pub const CT_CALC_CHAIN: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml";
pub const CT_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

/// Default (by extension) and override (by part) content types
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentTypes {
    pub defaults: Vec<(String, String)>,
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn read(bytes: &[u8]) -> XlsxResult<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut types = Self::default();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    let attrs = attributes(&e)?;
                    let get = |name: &str| {
                        attrs
                            .iter()
                            .find(|(k, _)| local(k) == name)
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default()
                    };
                    match e.local_name().as_ref() {
                        b"Default" => types.defaults.push((get("Extension"), get("ContentType"))),
                        b"Override" => types.overrides.push((get("PartName"), get("ContentType"))),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(types)
    }

    pub fn to_xml(&self) -> String {
        let mut content = format!(
            "{XML_HEADER}\n<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">"
        );
        for (ext, ct) in &self.defaults {
            content.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            content.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(part),
                escape_xml(ct)
            ));
        }
        content.push_str("</Types>");
        content
    }

    /// Content type override for `part`
    pub fn get_override(&self, part: &str) -> Option<&str> {
        let part = part_name(part);
        self.overrides
            .iter()
            .find(|(p, _)| *p == part)
            .map(|(_, ct)| ct.as_str())
    }

    /// Add or replace the override of `part`.
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let part = part_name(part);
        match self.overrides.iter_mut().find(|(p, _)| *p == part) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.overrides.push((part, content_type.to_string())),
        }
    }

    pub fn remove_override(&mut self, part: &str) {
        let part = part_name(part);
        self.overrides.retain(|(p, _)| *p != part);
    }
}

/// Part names in content types carry a leading slash.
fn part_name(part: &str) -> String {
    format!("/{}", part.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overrides() {
        let xml = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;
        let mut types = ContentTypes::read(xml.as_bytes()).unwrap();
        assert_eq!(types.defaults.len(), 1);
        assert_eq!(types.get_override("xl/workbook.xml"), Some(CT_WORKBOOK));

        types.set_override("xl/worksheets/sheet2.xml", CT_WORKSHEET);
        types.set_override("/xl/worksheets/sheet2.xml", CT_WORKSHEET);
        assert_eq!(types.overrides.len(), 2);
        types.remove_override("xl/workbook.xml");

        let reread = ContentTypes::read(types.to_xml().as_bytes()).unwrap();
        assert_eq!(reread, types);
    }
}
