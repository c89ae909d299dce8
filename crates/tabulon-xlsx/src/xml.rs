//! XML helpers shared by the part codecs

use crate::error::XlsxResult;
use quick_xml::events::BytesStart;
use std::borrow::Cow;

pub const NS_SPREADSHEETML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Strict OOXML namespaces and their transitional equivalents
const STRICT_NAMESPACES: [(&str, &str); 5] = [
    (
        "http://purl.oclc.org/ooxml/spreadsheetml/main",
        NS_SPREADSHEETML,
    ),
    (
        "http://purl.oclc.org/ooxml/officeDocument/relationships",
        NS_RELATIONSHIPS,
    ),
    (
        "http://purl.oclc.org/ooxml/drawingml/main",
        "http://schemas.openxmlformats.org/drawingml/2006/main",
    ),
    (
        "http://purl.oclc.org/ooxml/drawingml/chart",
        "http://schemas.openxmlformats.org/drawingml/2006/chart",
    ),
    (
        "http://purl.oclc.org/ooxml/drawingml/spreadsheetDrawing",
        "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing",
    ),
];

/// Rewrite strict OOXML namespace URIs to the transitional ones so a single
/// set of decoders handles both. Documents without strict namespaces are
/// returned borrowed.
pub fn normalize_namespaces(xml: &[u8]) -> Cow<'_, [u8]> {
    const MARKER: &[u8] = b"purl.oclc.org/ooxml/";
    if !xml.windows(MARKER.len()).any(|w| w == MARKER) {
        return Cow::Borrowed(xml);
    }
    let Ok(text) = std::str::from_utf8(xml) else {
        return Cow::Borrowed(xml);
    };
    let mut text = text.to_string();
    for (strict, transitional) in STRICT_NAMESPACES {
        text = text.replace(strict, transitional);
    }
    Cow::Owned(text.into_bytes())
}

/// Escape text for element content or attribute values.
///
/// Control characters XML 1.0 cannot carry are written as `_xHHHH_`, and an
/// underscore that would read back as such an escape is itself escaped.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '_' if escape_at(&s[i..]).is_some() => out.push_str("_x005F_"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                out.push_str(&format!("_x{:04X}_", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// The character encoded by an `_xHHHH_` escape at the start of `s`
fn escape_at(s: &str) -> Option<char> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || &bytes[..2] != b"_x" || bytes[6] != b'_' {
        return None;
    }
    let hex = s.get(2..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Decode Excel's `_xHHHH_` escape sequences (`_x000D_` is CR, `_x005F_`
/// a literal underscore).
pub fn decode_excel_escapes(s: &str) -> Cow<'_, str> {
    if !s.contains("_x") {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('_') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match escape_at(rest) {
            Some(c) => {
                out.push(c);
                rest = &rest[7..];
            }
            None => {
                out.push('_');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// All attributes of an element as owned `(qualified name, value)` pairs
pub(crate) fn attributes(e: &BytesStart<'_>) -> XlsxResult<Vec<(String, String)>> {
    e.attributes()
        .map(|attr| {
            let attr = attr?;
            Ok((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                attr.unescape_value()?.into_owned(),
            ))
        })
        .collect()
}

/// Local part of a possibly prefixed name
pub(crate) fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// `1`/`true` as used by boolean attributes
pub(crate) fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

/// Append ` key="value"` pairs
pub(crate) fn push_attrs(out: &mut String, attrs: &[(String, String)]) {
    for (key, value) in attrs {
        out.push_str(&format!(r#" {}="{}""#, key, escape_xml(value)));
    }
}

/// Byte range of the first `<name ...>...</name>` or `<name/>` element.
pub(crate) fn find_element(xml: &str, name: &str) -> Option<(usize, usize)> {
    let open = format!("<{name}");
    let mut from = 0;
    while let Some(pos) = xml[from..].find(&open) {
        let start = from + pos;
        let after = start + open.len();
        match xml.as_bytes().get(after) {
            Some(b' ' | b'>' | b'/' | b'\t' | b'\r' | b'\n') => {}
            _ => {
                from = after;
                continue;
            }
        }
        let tag_end = start + xml[start..].find('>')?;
        if xml.as_bytes()[tag_end - 1] == b'/' {
            return Some((start, tag_end + 1));
        }
        let close = format!("</{name}>");
        let end = tag_end + xml[tag_end..].find(&close)? + close.len();
        return Some((start, end));
    }
    None
}

/// Replace the element `name` with `replacement`, or insert `replacement`
/// right before `before` when the element is missing. `None` when neither
/// is found.
pub(crate) fn splice_element(
    xml: &str,
    name: &str,
    replacement: &str,
    before: &[&str],
) -> Option<String> {
    if let Some((start, end)) = find_element(xml, name) {
        return Some(format!("{}{}{}", &xml[..start], replacement, &xml[end..]));
    }
    let at = before.iter().find_map(|anchor| {
        if anchor.starts_with("</") {
            xml.rfind(anchor)
        } else {
            find_element(xml, anchor.trim_start_matches('<')).map(|(s, _)| s)
        }
    })?;
    Some(format!("{}{}{}", &xml[..at], replacement, &xml[at..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_round_trip() {
        let text = "a<b> & \"c\" _x0041_ \u{1}";
        let escaped = escape_xml(text);
        assert_eq!(
            escaped,
            "a&lt;b&gt; &amp; &quot;c&quot; _x005F_x0041_ _x0001_"
        );
        let unescaped = quick_xml::escape::unescape(&escaped).unwrap();
        assert_eq!(decode_excel_escapes(&unescaped), text);
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_excel_escapes("line_x000D__x000A_two"), "line\r\ntwo");
        assert_eq!(decode_excel_escapes("snake_case"), "snake_case");
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
    }

    #[test]
    fn test_normalize_namespaces() {
        let strict = br#"<worksheet xmlns="http://purl.oclc.org/ooxml/spreadsheetml/main"/>"#;
        let normalized = normalize_namespaces(strict);
        assert!(std::str::from_utf8(&normalized)
            .unwrap()
            .contains(NS_SPREADSHEETML));
        let plain = b"<worksheet/>";
        assert!(matches!(normalize_namespaces(plain), Cow::Borrowed(_)));
    }

    #[test]
    fn test_find_and_splice() {
        let xml = "<a><numFmt id=\"1\"/><numFmts count=\"0\"/><b>x</b></a>";
        let (s, e) = find_element(xml, "numFmts").unwrap();
        assert_eq!(&xml[s..e], "<numFmts count=\"0\"/>");
        let (s, e) = find_element(xml, "b").unwrap();
        assert_eq!(&xml[s..e], "<b>x</b>");

        assert_eq!(
            splice_element(xml, "b", "<b>y</b>", &[]).unwrap(),
            "<a><numFmt id=\"1\"/><numFmts count=\"0\"/><b>y</b></a>"
        );
        assert_eq!(
            splice_element("<a><c/></a>", "b", "<b/>", &["<c", "</a>"]).unwrap(),
            "<a><b/><c/></a>"
        );
        assert_eq!(splice_element("<a/>", "b", "<b/>", &["</a>"]), None);
    }
}
