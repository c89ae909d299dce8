//! Calculation chain part (`xl/calcChain.xml`)

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{attributes, escape_xml, normalize_namespaces, push_attrs, NS_SPREADSHEETML, XML_HEADER};
use log::warn;
use tabulon_core::{CalcChain, CalcChainEntry};

/// Decode the chain. An entry without `i` belongs to the sheet of the entry
/// before it.
pub fn read_calc_chain(bytes: &[u8]) -> XlsxResult<CalcChain> {
    let bytes = normalize_namespaces(bytes);
    let mut reader = Reader::from_reader(bytes.as_ref());
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut sheet_id = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let mut entry = CalcChainEntry::default();
                for (key, value) in attributes(&e)? {
                    match key.as_str() {
                        "r" => entry.reference = value,
                        "i" => match value.parse() {
                            Ok(id) => sheet_id = id,
                            Err(_) => warn!("ignoring invalid calc chain sheet id {value:?}"),
                        },
                        _ => entry.extra_attrs.push((key, value)),
                    }
                }
                entry.sheet_id = sheet_id;
                entries.push(entry);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(CalcChain::new(entries))
}

/// Encode the chain, writing `i` only where the sheet changes.
pub fn write_calc_chain(chain: &CalcChain) -> String {
    let mut content = format!(r#"{XML_HEADER}
<calcChain xmlns="{NS_SPREADSHEETML}">"#);
    let mut current = 0u32;
    for entry in chain.entries() {
        content.push_str(&format!(r#"<c r="{}""#, escape_xml(&entry.reference)));
        if entry.sheet_id != current {
            content.push_str(&format!(r#" i="{}""#, entry.sheet_id));
            current = entry.sheet_id;
        }
        push_attrs(&mut content, &entry.extra_attrs);
        content.push_str("/>");
    }
    content.push_str("</calcChain>");
    content
}
