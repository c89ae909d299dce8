//! Numeric text helpers and number-format rendering
//!
//! Cell values are kept as text. This module decides whether that text is a
//! number, produces the canonical text for floats, and renders a raw value
//! through a number format code for display.

use crate::date::serial_to_datetime;
use chrono::{Datelike, NaiveDateTime, Timelike};
use lazy_regex::regex_is_match;

/// Significant digits kept when reading numeric cell values
pub const NUMERIC_PRECISION: usize = 15;

/// If `s` is plain numeric text, return its count of significant digits.
///
/// ```
/// use tabulon_core::numfmt::is_numeric;
///
/// assert_eq!(is_numeric("0.30000000000000004"), Some(17));
/// assert_eq!(is_numeric("-1.5e3"), Some(2));
/// assert_eq!(is_numeric("1,000"), None);
/// ```
pub fn is_numeric(s: &str) -> Option<usize> {
    if !regex_is_match!(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$", s) {
        return None;
    }
    let mantissa = s.split(['e', 'E']).next().unwrap_or("");
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let significant = digits.trim_start_matches('0');
    Some(significant.len())
}

/// Text for a float as stored in a cell: fixed notation, `precision`
/// decimals, or the shortest text that round-trips at `bit_size` bits.
pub fn format_float(value: f64, precision: Option<usize>, bit_size: u32) -> String {
    match (precision, bit_size) {
        (Some(p), 32) => format!("{:.*}", p, value as f32),
        (Some(p), _) => format!("{:.*}", p, value),
        (None, 32) => format_fixed(f64::from(value as f32), value as f32),
        (None, _) => format_fixed(value, value),
    }
}

fn format_fixed<T: std::fmt::Display>(check: f64, value: T) -> String {
    if check.is_nan() {
        "NaN".to_string()
    } else if check.is_infinite() {
        if check > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}

/// Render a float the way C's `%g` does with shortest round-trip digits:
/// exponent form when the decimal exponent is below -4 or at least 6.
///
/// ```
/// use tabulon_core::numfmt::fmt_g;
///
/// assert_eq!(fmt_g(7.0), "7");
/// assert_eq!(fmt_g(0.5), "0.5");
/// assert_eq!(fmt_g(1e6), "1e+06");
/// assert_eq!(fmt_g(0.00001234), "1.234e-05");
/// ```
pub fn fmt_g(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{:e}", value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exp < -4 || exp >= 6 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        value.to_string()
    }
}

/// Round numeric text to `digits` significant digits, then print it in its
/// shortest form. Non-numeric text is returned unchanged.
pub fn round_precision(raw: &str, digits: usize) -> String {
    let Ok(value) = raw.parse::<f64>() else {
        return raw.to_string();
    };
    if digits == 0 || !value.is_finite() {
        return format_fixed(value, value);
    }
    let rounded: f64 = format!("{:.*e}", digits - 1, value)
        .parse()
        .unwrap_or(value);
    format_fixed(rounded, rounded)
}

/// Text of a numeric cell value before any number format is applied:
/// values with more than 15 significant digits are rounded to 15.
pub fn precise_value(raw: &str) -> String {
    match is_numeric(raw) {
        Some(p) if p > NUMERIC_PRECISION => round_precision(raw, NUMERIC_PRECISION),
        Some(_) => round_precision(raw, 0),
        None => raw.to_string(),
    }
}

/// Format code of a built-in number format id
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

/// Turns a raw cell value and a format code into display text.
pub trait NumberFormatRenderer: Send + Sync + std::fmt::Debug {
    fn render(&self, raw: &str, format_code: &str) -> String;
}

/// Renderer for the common built-in and custom codes: general, text,
/// fixed decimals, grouping, percent, scientific, dates and times.
/// Anything it cannot interpret is returned as the raw value.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRenderer;

impl NumberFormatRenderer for BuiltinRenderer {
    fn render(&self, raw: &str, format_code: &str) -> String {
        let Ok(value) = raw.parse::<f64>() else {
            return raw.to_string();
        };
        if is_numeric(raw).is_none() {
            return raw.to_string();
        }
        let code = format_code.trim();
        if code.is_empty() || code.eq_ignore_ascii_case("general") || code == "@" {
            return raw.to_string();
        }
        let sections = split_sections(code);
        let (section, value, signed) = pick_section(&sections, value);
        if section.eq_ignore_ascii_case("general") {
            return raw.to_string();
        }
        let tokens = tokenize_code(section);
        if tokens.iter().any(Token::is_date_part) {
            return render_date(&tokens, value).unwrap_or_else(|| raw.to_string());
        }
        render_number(section, value, signed)
    }
}

fn split_sections(code: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in code.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                sections.push(&code[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    sections.push(&code[start..]);
    sections
}

/// Pick the section for `value`; the returned flag says whether a minus
/// sign still has to be printed.
fn pick_section<'a>(sections: &[&'a str], value: f64) -> (&'a str, f64, bool) {
    match sections.len() {
        0 => ("General", value, true),
        1 => (sections[0], value, true),
        _ if value < 0.0 => (sections[1], value.abs(), false),
        n if value == 0.0 && n >= 3 => (sections[2], value, true),
        _ => (sections[0], value, true),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    Elapsed(char, usize),
    AmPm(bool),
    SubSecond(usize),
    Other(char),
}

impl Token {
    fn is_date_part(&self) -> bool {
        matches!(
            self,
            Token::Year(_)
                | Token::Month(_)
                | Token::Day(_)
                | Token::Hour(_)
                | Token::Minute(_)
                | Token::Second(_)
                | Token::Elapsed(..)
                | Token::AmPm(_)
        )
    }
}

fn tokenize_code(section: &str) -> Vec<Token> {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                tokens.push(Token::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    tokens.push(Token::Literal(next.to_string()));
                }
                i += 2;
            }
            '_' => {
                tokens.push(Token::Literal(" ".into()));
                i += 2;
            }
            '*' => i += 2,
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map_or(chars.len(), |p| i + p);
                let inner: String = chars[i + 1..end].iter().collect::<String>().to_lowercase();
                if let Some(first) = inner.chars().next() {
                    if matches!(first, 'h' | 'm' | 's') && inner.chars().all(|ch| ch == first) {
                        tokens.push(Token::Elapsed(first, inner.len()));
                    }
                }
                i = end + 1;
            }
            _ => {
                let lower = c.to_ascii_lowercase();
                let rest: String = chars[i..].iter().take(5).collect();
                if rest.eq_ignore_ascii_case("am/pm") {
                    tokens.push(Token::AmPm(true));
                    i += 5;
                    continue;
                }
                if rest.get(..3).map_or(false, |r| r.eq_ignore_ascii_case("a/p")) {
                    tokens.push(Token::AmPm(false));
                    i += 3;
                    continue;
                }
                if matches!(lower, 'y' | 'm' | 'd' | 'h' | 's') {
                    let run = chars[i..]
                        .iter()
                        .take_while(|ch| ch.to_ascii_lowercase() == lower)
                        .count();
                    tokens.push(match lower {
                        'y' => Token::Year(run),
                        'm' => Token::Month(run),
                        'd' => Token::Day(run),
                        'h' => Token::Hour(run),
                        _ => Token::Second(run),
                    });
                    i += run;
                    continue;
                }
                if c == '.' && matches!(tokens.last(), Some(Token::Second(_))) {
                    let run = chars[i + 1..].iter().take_while(|&&ch| ch == '0').count();
                    if run > 0 {
                        tokens.push(Token::SubSecond(run));
                        i += 1 + run;
                        continue;
                    }
                }
                tokens.push(Token::Other(c));
                i += 1;
            }
        }
    }
    resolve_minutes(&mut tokens);
    tokens
}

/// `m` means minutes right after an hour or right before a second.
fn resolve_minutes(tokens: &mut [Token]) {
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_date_part())
        .map(|(i, _)| i)
        .collect();
    for (k, &i) in positions.iter().enumerate() {
        if let Token::Month(n) = tokens[i] {
            let after_hour = k > 0
                && matches!(
                    tokens[positions[k - 1]],
                    Token::Hour(_) | Token::Elapsed('h', _)
                );
            let before_second = positions
                .get(k + 1)
                .map_or(false, |&j| matches!(tokens[j], Token::Second(_)));
            if after_hour || before_second {
                tokens[i] = Token::Minute(n);
            }
        }
    }
}

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

fn render_date(tokens: &[Token], serial: f64) -> Option<String> {
    let t: NaiveDateTime = serial_to_datetime(serial)?;
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm(_)));
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::Other(c) => out.push(*c),
            Token::Year(n) if *n <= 2 => out.push_str(&format!("{:02}", t.year() % 100)),
            Token::Year(_) => out.push_str(&format!("{:04}", t.year())),
            Token::Month(1) => out.push_str(&t.month().to_string()),
            Token::Month(2) => out.push_str(&format!("{:02}", t.month())),
            Token::Month(n) => {
                let name = MONTHS[t.month0() as usize];
                match n {
                    3 => out.push_str(&name[..3]),
                    5 => out.push_str(&name[..1]),
                    _ => out.push_str(name),
                }
            }
            Token::Day(1) => out.push_str(&t.day().to_string()),
            Token::Day(2) => out.push_str(&format!("{:02}", t.day())),
            Token::Day(n) => {
                let name = WEEKDAYS[t.weekday().num_days_from_monday() as usize];
                out.push_str(if *n == 3 { &name[..3] } else { name });
            }
            Token::Hour(n) => {
                let mut h = t.hour();
                if twelve_hour {
                    h %= 12;
                    if h == 0 {
                        h = 12;
                    }
                }
                out.push_str(&pad(h, *n));
            }
            Token::Minute(n) => out.push_str(&pad(t.minute(), *n)),
            Token::Second(n) => out.push_str(&pad(t.second(), *n)),
            Token::SubSecond(n) => {
                let frac = format!("{:03}", t.nanosecond() / 1_000_000);
                out.push('.');
                out.push_str(&frac[..(*n).min(3)]);
            }
            Token::AmPm(full) => {
                let pm = t.hour() >= 12;
                out.push_str(match (full, pm) {
                    (true, true) => "PM",
                    (true, false) => "AM",
                    (false, true) => "P",
                    (false, false) => "A",
                });
            }
            Token::Elapsed(unit, n) => {
                let total_seconds = (serial * 86_400.0).round() as i64;
                let v = match unit {
                    'h' => total_seconds / 3600,
                    'm' => total_seconds / 60,
                    _ => total_seconds,
                };
                out.push_str(&format!("{:0width$}", v, width = *n));
            }
        }
    }
    Some(out)
}

fn pad(v: u32, width: usize) -> String {
    if width >= 2 {
        format!("{:02}", v)
    } else {
        v.to_string()
    }
}

fn render_number(section: &str, value: f64, signed: bool) -> String {
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut pattern = String::new();
    let mut seen_digit = false;
    let mut percent = 0;
    let mut chars = section.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let lit: String = chars.by_ref().take_while(|&ch| ch != '"').collect();
                push_literal(&mut prefix, &mut suffix, &lit, seen_digit);
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    push_literal(&mut prefix, &mut suffix, &next.to_string(), seen_digit);
                }
            }
            '[' => {
                for ch in chars.by_ref() {
                    if ch == ']' {
                        break;
                    }
                }
            }
            '_' => {
                chars.next();
                push_literal(&mut prefix, &mut suffix, " ", seen_digit);
            }
            '*' => {
                chars.next();
            }
            '%' => {
                percent += 1;
                push_literal(&mut prefix, &mut suffix, "%", seen_digit);
            }
            '0' | '#' | '?' | '.' | ',' | 'E' | 'e' | '+' | '-'
                if seen_digit || matches!(c, '0' | '#' | '?' | '.') =>
            {
                if matches!(c, '+' | '-') && !pattern.ends_with(['E', 'e']) {
                    push_literal(&mut prefix, &mut suffix, &c.to_string(), seen_digit);
                    continue;
                }
                seen_digit = true;
                pattern.push(c);
            }
            _ => push_literal(&mut prefix, &mut suffix, &c.to_string(), seen_digit),
        }
    }

    let mut value = value;
    for _ in 0..percent {
        value *= 100.0;
    }
    let body = if let Some(e_pos) = pattern.find(['E', 'e']) {
        render_scientific(&pattern[..e_pos], &pattern[e_pos + 1..], value.abs())
    } else {
        render_fixed(&pattern, value.abs())
    };
    let negative = signed && value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0');
    format!(
        "{}{}{}{}",
        if negative { "-" } else { "" },
        prefix,
        body,
        suffix
    )
}

fn push_literal(prefix: &mut String, suffix: &mut String, lit: &str, after: bool) {
    if after {
        suffix.push_str(lit);
    } else {
        prefix.push_str(lit);
    }
}

fn render_fixed(pattern: &str, value: f64) -> String {
    let (int_part, frac_part) = pattern.split_once('.').unwrap_or((pattern, ""));
    let grouping = int_part.contains(',');
    let min_int = int_part.chars().filter(|&c| c == '0').count();
    let required = frac_part.chars().filter(|&c| c == '0').count();
    let decimals = frac_part.chars().filter(|c| matches!(c, '0' | '#' | '?')).count();

    let text = format!("{:.*}", decimals, value);
    let (int_digits, frac_digits) = text.split_once('.').unwrap_or((&text, ""));
    let mut int_digits = int_digits.trim_start_matches('0').to_string();
    while int_digits.len() < min_int {
        int_digits.insert(0, '0');
    }
    if grouping {
        int_digits = group_thousands(&int_digits);
    }
    let mut frac_digits = frac_digits.to_string();
    while frac_digits.len() > required && frac_digits.ends_with('0') {
        frac_digits.pop();
    }
    if frac_digits.is_empty() {
        if pattern.ends_with('.') && decimals == 0 {
            return format!("{int_digits}.");
        }
        int_digits
    } else {
        format!("{int_digits}.{frac_digits}")
    }
}

fn render_scientific(mantissa: &str, exponent: &str, value: f64) -> String {
    let decimals = mantissa
        .split_once('.')
        .map_or(0, |(_, f)| f.chars().filter(|c| matches!(c, '0' | '#')).count());
    let exp_digits = exponent.chars().filter(|&c| c == '0').count().max(1);
    let always_sign = exponent.starts_with('+');
    let sci = format!("{:.*e}", decimals, value);
    let (m, e) = sci.split_once('e').unwrap_or((&sci, "0"));
    let e: i32 = e.parse().unwrap_or(0);
    let sign = if e < 0 {
        "-"
    } else if always_sign {
        "+"
    } else {
        ""
    };
    format!("{m}E{sign}{:0width$}", e.abs(), width = exp_digits)
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, &b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(b as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(raw: &str, code: &str) -> String {
        BuiltinRenderer.render(raw, code)
    }

    #[test]
    fn test_fmt_g() {
        assert_eq!(fmt_g(3.0), "3");
        assert_eq!(fmt_g(-2.5), "-2.5");
        assert_eq!(fmt_g(100000.0), "100000");
        assert_eq!(fmt_g(1234567.0), "1.234567e+06");
        assert_eq!(fmt_g(0.0001), "0.0001");
        assert_eq!(fmt_g(1e-5), "1e-05");
        assert_eq!(fmt_g(1e100), "1e+100");
        assert_eq!(fmt_g(f64::INFINITY), "+Inf");
        assert_eq!(fmt_g(std::f64::consts::FRAC_PI_2), "1.5707963267948966");
    }

    #[test]
    fn test_is_numeric() {
        assert_eq!(is_numeric("123"), Some(3));
        assert_eq!(is_numeric("007"), Some(1));
        assert_eq!(is_numeric(".5"), Some(1));
        assert_eq!(is_numeric(""), None);
        assert_eq!(is_numeric("inf"), None);
        assert_eq!(is_numeric("1e"), None);
        assert_eq!(is_numeric("TRUE"), None);
    }

    #[test]
    fn test_precise_value() {
        assert_eq!(precise_value("0.30000000000000004"), "0.3");
        assert_eq!(precise_value("1.50"), "1.5");
        assert_eq!(precise_value("123456789012345678"), "123456789012346000");
        assert_eq!(precise_value("text"), "text");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0, None, 64), "2");
        assert_eq!(format_float(1e21, None, 64), "1000000000000000000000");
        assert_eq!(format_float(f64::NAN, None, 64), "NaN");
        assert_eq!(format_float(0.5, Some(3), 64), "0.500");
    }

    #[test]
    fn test_render_numbers() {
        assert_eq!(render("1234.567", "0"), "1235");
        assert_eq!(render("1234.567", "0.00"), "1234.57");
        assert_eq!(render("1234567.891", "#,##0.00"), "1,234,567.89");
        assert_eq!(render("0.256", "0%"), "26%");
        assert_eq!(render("0.256", "0.00%"), "25.60%");
        assert_eq!(render("12345", "0.00E+00"), "1.23E+04");
        assert_eq!(render("-5", "#,##0 ;(#,##0)"), "(5)");
        assert_eq!(render("-5", "0.0"), "-5.0");
        assert_eq!(render("1.5", "#.##"), "1.5");
        assert_eq!(render("42", "\"$\"0"), "$42");
        assert_eq!(render("hello", "0.00"), "hello");
        assert_eq!(render("3.5", "General"), "3.5");
    }

    #[test]
    fn test_render_dates() {
        assert_eq!(render("40867", "mm-dd-yy"), "11-20-11");
        assert_eq!(render("40867", "d-mmm-yy"), "20-Nov-11");
        assert_eq!(render("40867", "yyyy-mm-dd"), "2011-11-20");
        assert_eq!(render("40867.75", "m/d/yy h:mm"), "11/20/11 18:00");
        assert_eq!(render("0.5", "h:mm:ss"), "12:00:00");
        assert_eq!(render("0.75", "h:mm AM/PM"), "6:00 PM");
        assert_eq!(render("1.5", "[h]:mm:ss"), "36:00:00");
        assert_eq!(render("0.0006944444444444445", "mm:ss"), "01:00");
    }
}
