//! Rewriting cell references inside formula text
//!
//! Used to expand shared formulas and to keep formulas pointing at the same
//! cells when rows or columns move. The scanner leaves string literals,
//! quoted sheet names, structured references, function names and sheet
//! qualifiers alone.

use crate::coordinate::CellAddress;

/// Apply `map` to every `A1`-style reference in `formula`.
///
/// `map` receives the sheet qualifier written in front of the reference,
/// if any. A reference for which it returns `None` is replaced with
/// `#REF!`.
pub fn map_cell_refs<F>(formula: &str, mut map: F) -> String
where
    F: FnMut(Option<&str>, CellAddress) -> Option<CellAddress>,
{
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut pos = 0;
    let mut sheet: Option<String> = None;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => {
                let end = skip_quoted(bytes, pos, b'"');
                out.push_str(&formula[pos..end]);
                pos = end;
                sheet = None;
            }
            b'\'' => {
                let end = skip_quoted(bytes, pos, b'\'');
                out.push_str(&formula[pos..end]);
                sheet = (bytes.get(end) == Some(&b'!') && end >= pos + 2)
                    .then(|| formula[pos + 1..end - 1].replace("''", "'"));
                pos = end;
            }
            b'[' => {
                let end = skip_brackets(bytes, pos);
                out.push_str(&formula[pos..end]);
                pos = end;
            }
            b'!' => {
                out.push('!');
                pos += 1;
            }
            b if is_word_byte(b) => {
                let start = pos;
                while pos < bytes.len() && is_word_byte(bytes[pos]) {
                    pos += 1;
                }
                let word = &formula[start..pos];
                let qualifier = sheet.take();
                match bytes.get(pos) {
                    Some(b'!') => {
                        sheet = Some(word.to_string());
                        out.push_str(word);
                        continue;
                    }
                    Some(b'(') => {
                        out.push_str(word);
                        continue;
                    }
                    _ => {}
                }
                let address = if looks_like_cell(word) {
                    CellAddress::parse(word).ok()
                } else {
                    None
                };
                match address {
                    Some(address) => match map(qualifier.as_deref(), address) {
                        Some(moved) => out.push_str(&moved.to_string()),
                        None => out.push_str("#REF!"),
                    },
                    None => out.push_str(word),
                }
                // The second half of a range keeps the qualifier of the first.
                if bytes.get(pos) == Some(&b':') {
                    sheet = qualifier;
                }
            }
            _ => {
                let ch = formula[pos..].chars().next().unwrap_or_default();
                out.push(ch);
                pos += ch.len_utf8().max(1);
                if ch != ':' {
                    sheet = None;
                }
            }
        }
    }
    out
}

/// Move every relative reference in `formula` by the given deltas.
///
/// ```
/// use tabulon_core::formula::shift_formula;
///
/// assert_eq!(shift_formula("=A1+$B$1", 0, 2), "=A3+$B$1");
/// assert_eq!(shift_formula("=A1", 0, -1), "=#REF!");
/// ```
pub fn shift_formula(formula: &str, d_col: i64, d_row: i64) -> String {
    map_cell_refs(formula, |_, address| address.offset(d_col, d_row))
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$')
}

/// `$?[A-Za-z]{1,3}$?[0-9]+`
fn looks_like_cell(word: &str) -> bool {
    let bytes = word.strip_prefix('$').unwrap_or(word).as_bytes();
    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters == 0 || letters > 3 {
        return false;
    }
    let rest = &bytes[letters..];
    let rest = rest.strip_prefix(b"$").unwrap_or(rest);
    !rest.is_empty() && rest.iter().all(u8::is_ascii_digit)
}

/// End of a quoted run starting at `start`; a doubled quote is an escape.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        if bytes[pos] == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return pos + 1;
        }
        pos += 1;
    }
    bytes.len()
}

fn skip_brackets(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shift_relative_refs() {
        assert_eq!(shift_formula("=A1+B1", 0, 2), "=A3+B3");
        assert_eq!(shift_formula("=SUM(A1:B2)*2", 1, 1), "=SUM(B2:C3)*2");
        assert_eq!(shift_formula("=$A1+A$1", 1, 1), "=$A2+B$1");
    }

    #[test]
    fn test_leaves_non_refs_alone() {
        assert_eq!(shift_formula("=LOG10(A1)", 0, 1), "=LOG10(A2)");
        assert_eq!(shift_formula("=\"A1\"&A1", 0, 1), "=\"A1\"&A2");
        assert_eq!(shift_formula("='Q1 A1'!A1", 0, 1), "='Q1 A1'!A2");
        assert_eq!(shift_formula("=Sheet2!B2", 0, 1), "=Sheet2!B3");
        assert_eq!(shift_formula("=1.5E5+A1", 0, 1), "=1.5E5+A2");
        assert_eq!(shift_formula("=Table1[Col1]", 0, 1), "=Table1[Col1]");
        assert_eq!(shift_formula("=#REF!+1", 0, 1), "=#REF!+1");
    }

    #[test]
    fn test_out_of_grid() {
        assert_eq!(shift_formula("=A1+B2", -1, 0), "=#REF!+A2");
        assert_eq!(shift_formula("=XFD1", 1, 0), "=#REF!");
    }

    #[test]
    fn test_map_cell_refs() {
        let out = map_cell_refs("=A1+A5", |_, a| (a.row != 5).then_some(a));
        assert_eq!(out, "=A1+#REF!");
    }

    #[test]
    fn test_sheet_qualifiers() {
        let mut seen = Vec::new();
        map_cell_refs("=Data!A1:B2+'My ''Q'''!C3+D4", |sheet, a| {
            seen.push((sheet.map(str::to_string), a.col));
            Some(a)
        });
        assert_eq!(
            seen,
            vec![
                (Some("Data".to_string()), 1),
                (Some("Data".to_string()), 2),
                (Some("My 'Q'".to_string()), 3),
                (None, 4),
            ]
        );
    }
}
