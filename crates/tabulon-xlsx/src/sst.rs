//! Shared string table part (`xl/sharedStrings.xml`)

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attributes, decode_excel_escapes, escape_xml, normalize_namespaces, NS_SPREADSHEETML, XML_HEADER};
use tabulon_core::{RichTextFont, RichTextRun, SharedStringItem, SharedStringTable};

/// Decode the part. Rich text keeps its runs alongside the flattened
/// text; phonetic runs are skipped.
pub fn read_shared_strings(bytes: &[u8]) -> XlsxResult<SharedStringTable> {
    let bytes = normalize_namespaces(bytes);
    let mut reader = Reader::from_reader(bytes.as_ref());
    let mut buf = Vec::new();

    let mut items = Vec::new();
    let mut count = 0usize;
    let mut current = String::new();
    let mut runs: Vec<RichTextRun> = Vec::new();
    let mut run: Option<RichTextRun> = None;
    let mut in_si = false;
    let mut in_t = false;
    let mut in_rpr = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sst" => count = read_count(&attributes(&e)?),
                b"si" => {
                    in_si = true;
                    current.clear();
                    runs.clear();
                }
                b"rPh" => in_phonetic = true,
                b"r" if in_si && !in_phonetic => run = Some(RichTextRun::default()),
                b"rPr" if run.is_some() => in_rpr = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                name if in_rpr => read_run_property(&mut run, name, &attributes(&e)?),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"sst" => count = read_count(&attributes(&e)?),
                b"si" => items.push(SharedStringItem::default()),
                b"rPr" => {
                    if let Some(run) = run.as_mut() {
                        run.font.get_or_insert_with(RichTextFont::default);
                    }
                }
                name if in_rpr => read_run_property(&mut run, name, &attributes(&e)?),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    let text = decode_excel_escapes(&current).into_owned();
                    items.push(if runs.is_empty() {
                        SharedStringItem::plain(text)
                    } else {
                        SharedStringItem {
                            text,
                            runs: Some(std::mem::take(&mut runs)),
                        }
                    });
                    in_si = false;
                }
                b"r" if !in_phonetic => {
                    if let Some(mut done) = run.take() {
                        done.text = decode_excel_escapes(&done.text).into_owned();
                        runs.push(done);
                    }
                }
                b"rPr" => in_rpr = false,
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(e) if in_t => push_text(&mut current, &mut run, &e.unescape()?),
            Event::CData(e) if in_t => push_text(&mut current, &mut run, &String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(SharedStringTable::from_entries(items, count))
}

fn push_text(current: &mut String, run: &mut Option<RichTextRun>, text: &str) {
    current.push_str(text);
    if let Some(run) = run.as_mut() {
        run.text.push_str(text);
    }
}

/// Apply one `<rPr>` child such as `<b/>` or `<sz val="11"/>`.
fn read_run_property(run: &mut Option<RichTextRun>, name: &[u8], attrs: &[(String, String)]) {
    let Some(run) = run.as_mut() else {
        return;
    };
    let font = run.font.get_or_insert_with(RichTextFont::default);
    let val = attrs.iter().find(|(k, _)| k == "val").map(|(_, v)| v.as_str());
    let on = !matches!(val, Some("0" | "false"));
    match name {
        b"b" => font.bold = on,
        b"i" => font.italic = on,
        b"strike" => font.strike = on,
        b"u" => font.underline = Some(val.unwrap_or("single").to_string()),
        b"rFont" => font.family = val.map(str::to_string),
        b"sz" => font.size = val.and_then(|v| v.parse().ok()),
        b"color" => {
            font.color = attrs
                .iter()
                .find(|(k, _)| k == "rgb")
                .map(|(_, v)| v.strip_prefix("FF").unwrap_or(v).to_string());
        }
        _ => {}
    }
}

fn read_count(attrs: &[(String, String)]) -> usize {
    attrs
        .iter()
        .find(|(k, _)| k == "count")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0)
}

fn push_text_element(content: &mut String, text: &str) {
    let preserve = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    if preserve {
        content.push_str(r#"<t xml:space="preserve">"#);
    } else {
        content.push_str("<t>");
    }
    content.push_str(&escape_xml(text));
    content.push_str("</t>");
}

fn push_run_properties(content: &mut String, font: &RichTextFont) {
    content.push_str("<rPr>");
    if let Some(family) = &font.family {
        content.push_str(&format!(r#"<rFont val="{}"/>"#, escape_xml(family)));
    }
    if font.bold {
        content.push_str("<b/>");
    }
    if font.italic {
        content.push_str("<i/>");
    }
    if font.strike {
        content.push_str("<strike/>");
    }
    if let Some(color) = &font.color {
        let rgb = color.trim_start_matches('#').to_ascii_uppercase();
        content.push_str(&format!(r#"<color rgb="FF{}"/>"#, escape_xml(&rgb)));
    }
    if let Some(size) = font.size.filter(|s| *s > 0.0) {
        content.push_str(&format!(r#"<sz val="{size}"/>"#));
    }
    if let Some(underline) = &font.underline {
        content.push_str(&format!(r#"<u val="{}"/>"#, escape_xml(underline)));
    }
    content.push_str("</rPr>");
}

fn push_item(content: &mut String, text: &str, runs: Option<&[RichTextRun]>) {
    content.push_str("<si>");
    match runs {
        Some(runs) => {
            for run in runs {
                content.push_str("<r>");
                if let Some(font) = &run.font {
                    push_run_properties(content, font);
                }
                push_text_element(content, &run.text);
                content.push_str("</r>");
            }
        }
        None => push_text_element(content, text),
    }
    content.push_str("</si>");
}

fn root_tag(sst: &SharedStringTable) -> String {
    format!(
        r#"<sst xmlns="{NS_SPREADSHEETML}" count="{}" uniqueCount="{}">"#,
        sst.count(),
        sst.len()
    )
}

/// Encode the whole table.
pub fn write_shared_strings(sst: &SharedStringTable) -> String {
    let mut content = format!("{XML_HEADER}\n{}", root_tag(sst));
    for (text, runs) in sst.entries() {
        push_item(&mut content, text, runs);
    }
    content.push_str("</sst>");
    content
}

/// Append the entries from index `known` on to an existing part, keeping
/// the formatting of the entries already there.
pub fn append_shared_strings(
    original: &str,
    sst: &SharedStringTable,
    known: usize,
) -> XlsxResult<String> {
    let start = original
        .find("<sst")
        .ok_or_else(|| XlsxError::InvalidFormat("shared strings part has no <sst> root".into()))?;
    let tag_end = start
        + original[start..]
            .find('>')
            .ok_or_else(|| XlsxError::InvalidFormat("unterminated <sst> tag".into()))?;
    let body = if original.as_bytes()[tag_end - 1] == b'/' {
        ""
    } else {
        let end = original.rfind("</sst>").unwrap_or(original.len());
        original.get(tag_end + 1..end).unwrap_or_default()
    };

    // Keep namespace declarations of the original root.
    let mut root = root_tag(sst);
    if let Some(attrs) = original.get(start + 4..tag_end) {
        for decl in attrs.split_whitespace().filter(|a| a.starts_with("xmlns:")) {
            root.insert_str(root.len() - 1, &format!(" {}", decl.trim_end_matches('/')));
        }
    }

    let mut content = format!("{}{}{}", &original[..start], root, body);
    for (text, runs) in sst.entries().skip(known) {
        push_item(&mut content, text, runs);
    }
    content.push_str("</sst>");
    Ok(content)
}
