//! Formula tokenizer
//!
//! Splits formula text into operands, operators, function boundaries,
//! subexpressions and argument separators. Runs in two passes: the first
//! scans characters into raw tokens, the second settles what the scan could
//! not decide locally (prefix or infix minus, numbers or ranges, whitespace
//! as the intersection operator).

use std::fmt;

use tabulon_core::CellError;

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Noop,
    Operand,
    Function,
    Subexpression,
    Argument,
    OperatorPrefix,
    OperatorInfix,
    OperatorPostfix,
    Whitespace,
    Unknown,
}

/// Token subkinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSubType {
    Nothing,
    Start,
    Stop,
    Text,
    Number,
    Logical,
    Error,
    Range,
    Math,
    Concatenation,
    Intersection,
    Union,
}

/// One lexical unit of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub kind: TokenType,
    pub subtype: TokenSubType,
}

impl Token {
    pub fn new<S: Into<String>>(value: S, kind: TokenType, subtype: TokenSubType) -> Self {
        Self {
            value: value.into(),
            kind,
            subtype,
        }
    }

    pub fn is(&self, kind: TokenType, subtype: TokenSubType) -> bool {
        self.kind == kind && self.subtype == subtype
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

fn is_error_literal(text: &str) -> bool {
    CellError::ALL.iter().any(|e| e.as_str() == text)
}

/// Tokenize `formula`. A leading `=` is optional.
///
/// ```
/// use tabulon_formula::tokenizer::{tokenize, TokenSubType, TokenType};
///
/// let tokens = tokenize("=SUM(A1:B2,-3)");
/// assert_eq!(tokens[0].kind, TokenType::Function);
/// assert_eq!(tokens[1].subtype, TokenSubType::Range);
/// assert_eq!(tokens[3].kind, TokenType::OperatorPrefix);
/// ```
pub fn tokenize(formula: &str) -> Vec<Token> {
    let formula = formula.trim();
    let formula = formula.strip_prefix('=').unwrap_or(formula);
    if formula.is_empty() {
        return Vec::new();
    }
    settle(Scanner::new(formula).scan())
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    token: String,
    tokens: Vec<Token>,
    /// Open functions and subexpressions
    open: Vec<TokenType>,
    in_string: bool,
    in_path: bool,
    in_range: bool,
    in_error: bool,
}

impl Scanner {
    fn new(formula: &str) -> Self {
        Self {
            chars: formula.chars().collect(),
            pos: 0,
            token: String::new(),
            tokens: Vec::new(),
            open: Vec::new(),
            in_string: false,
            in_path: false,
            in_range: false,
            in_error: false,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn push(&mut self, value: &str, kind: TokenType, subtype: TokenSubType) {
        self.tokens.push(Token::new(value, kind, subtype));
    }

    /// Emit the pending text as a token of `kind`.
    fn flush(&mut self, kind: TokenType) {
        if !self.token.is_empty() {
            let value = std::mem::take(&mut self.token);
            self.tokens.push(Token::new(value, kind, TokenSubType::Nothing));
        }
    }

    fn open(&mut self, value: &str, kind: TokenType) {
        self.push(value, kind, TokenSubType::Start);
        self.open.push(kind);
    }

    fn close(&mut self) {
        let kind = self.open.pop().unwrap_or(TokenType::Subexpression);
        self.push("", kind, TokenSubType::Stop);
    }

    fn scan(mut self) -> Vec<Token> {
        while let Some(c) = self.peek(0) {
            if self.in_string {
                if c == '"' {
                    if self.peek(1) == Some('"') {
                        self.token.push('"');
                        self.pos += 2;
                        continue;
                    }
                    self.in_string = false;
                    let value = std::mem::take(&mut self.token);
                    self.push(&value, TokenType::Operand, TokenSubType::Text);
                } else {
                    self.token.push(c);
                }
                self.pos += 1;
                continue;
            }

            if self.in_path {
                self.token.push(c);
                if c == '\'' {
                    if self.peek(1) == Some('\'') {
                        self.token.push('\'');
                        self.pos += 1;
                    } else {
                        self.in_path = false;
                    }
                }
                self.pos += 1;
                continue;
            }

            if self.in_range {
                self.token.push(c);
                if c == ']' {
                    self.in_range = false;
                }
                self.pos += 1;
                continue;
            }

            if self.in_error {
                self.token.push(c);
                self.pos += 1;
                if is_error_literal(&self.token) {
                    self.in_error = false;
                    let value = std::mem::take(&mut self.token);
                    self.push(&value, TokenType::Operand, TokenSubType::Error);
                }
                continue;
            }

            // Sign of a scientific notation exponent
            if matches!(c, '+' | '-') && is_exponent_prefix(&self.token) {
                self.token.push(c);
                self.pos += 1;
                continue;
            }

            match c {
                '"' => {
                    self.flush(TokenType::Unknown);
                    self.in_string = true;
                }
                '\'' => {
                    self.flush(TokenType::Unknown);
                    self.in_path = true;
                    self.token.push(c);
                }
                '[' => {
                    self.in_range = true;
                    self.token.push(c);
                }
                '#' => {
                    self.flush(TokenType::Unknown);
                    self.in_error = true;
                    self.token.push(c);
                }
                '{' => {
                    self.flush(TokenType::Unknown);
                    self.open("ARRAY", TokenType::Function);
                    self.open("ARRAYROW", TokenType::Function);
                }
                ';' if self.open.len() >= 2 => {
                    self.flush(TokenType::Operand);
                    self.close();
                    self.push(",", TokenType::Argument, TokenSubType::Nothing);
                    self.open("ARRAYROW", TokenType::Function);
                }
                '}' => {
                    self.flush(TokenType::Operand);
                    self.close();
                    self.close();
                }
                ' ' | '\n' | '\r' | '\t' => {
                    self.flush(TokenType::Operand);
                    self.push(" ", TokenType::Whitespace, TokenSubType::Nothing);
                    while matches!(self.peek(1), Some(' ' | '\n' | '\r' | '\t')) {
                        self.pos += 1;
                    }
                }
                '>' | '<' if matches!((c, self.peek(1)), ('>', Some('=')) | ('<', Some('=' | '>'))) => {
                    self.flush(TokenType::Operand);
                    let op: String = [c, self.peek(1).unwrap_or_default()].iter().collect();
                    self.push(&op, TokenType::OperatorInfix, TokenSubType::Logical);
                    self.pos += 1;
                }
                '+' | '-' | '*' | '/' | '^' | '&' | '=' | '>' | '<' => {
                    self.flush(TokenType::Operand);
                    self.push(&c.to_string(), TokenType::OperatorInfix, TokenSubType::Nothing);
                }
                '%' => {
                    self.flush(TokenType::Operand);
                    self.push("%", TokenType::OperatorPostfix, TokenSubType::Nothing);
                }
                '(' => {
                    if self.token.is_empty() {
                        self.open("", TokenType::Subexpression);
                    } else {
                        let name = std::mem::take(&mut self.token);
                        self.open(&name, TokenType::Function);
                    }
                }
                ',' => {
                    self.flush(TokenType::Operand);
                    if self.open.last() == Some(&TokenType::Function) {
                        self.push(",", TokenType::Argument, TokenSubType::Nothing);
                    } else {
                        self.push(",", TokenType::OperatorInfix, TokenSubType::Union);
                    }
                }
                ')' => {
                    self.flush(TokenType::Operand);
                    self.close();
                }
                _ => self.token.push(c),
            }
            self.pos += 1;
        }
        if self.in_string {
            let value = std::mem::take(&mut self.token);
            self.push(&value, TokenType::Operand, TokenSubType::Text);
        }
        self.flush(TokenType::Operand);
        self.tokens
    }
}

/// `^[1-9](\.[0-9]+)?E$`
fn is_exponent_prefix(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.len() < 2 || !matches!(bytes[0], b'1'..=b'9') || !bytes.ends_with(b"E") {
        return false;
    }
    let middle = &bytes[1..bytes.len() - 1];
    match middle.split_first() {
        None => true,
        Some((b'.', digits)) => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        Some(_) => false,
    }
}

fn ends_operand(token: &Token) -> bool {
    matches!(
        (token.kind, token.subtype),
        (TokenType::Function, TokenSubType::Stop)
            | (TokenType::Subexpression, TokenSubType::Stop)
            | (TokenType::OperatorPostfix, _)
            | (TokenType::Operand, _)
    )
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        (token.kind, token.subtype),
        (TokenType::Function, TokenSubType::Start)
            | (TokenType::Subexpression, TokenSubType::Start)
            | (TokenType::Operand, _)
    )
}

/// Second pass: decide subtypes that depend on neighbouring tokens.
fn settle(raw: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(raw.len());
    for (i, mut token) in raw.iter().cloned().enumerate() {
        match token.kind {
            TokenType::Whitespace => {
                let between = out.last().map_or(false, ends_operand)
                    && raw.get(i + 1).map_or(false, starts_operand);
                if !between {
                    continue;
                }
                token.kind = TokenType::OperatorInfix;
                token.subtype = TokenSubType::Intersection;
            }
            TokenType::OperatorInfix if token.value == "-" || token.value == "+" => {
                if out.last().map_or(false, ends_operand) {
                    token.subtype = TokenSubType::Math;
                } else if token.value == "-" {
                    token.kind = TokenType::OperatorPrefix;
                    token.subtype = TokenSubType::Math;
                } else {
                    continue;
                }
            }
            TokenType::OperatorInfix if token.subtype == TokenSubType::Nothing => {
                token.subtype = if token.value.starts_with(['<', '>', '=']) {
                    TokenSubType::Logical
                } else if token.value == "&" {
                    TokenSubType::Concatenation
                } else {
                    TokenSubType::Math
                };
            }
            TokenType::Operand if token.subtype == TokenSubType::Nothing => {
                token.subtype = if token.value.parse::<f64>().is_ok() {
                    TokenSubType::Number
                } else if token.value.eq_ignore_ascii_case("TRUE")
                    || token.value.eq_ignore_ascii_case("FALSE")
                {
                    TokenSubType::Logical
                } else {
                    TokenSubType::Range
                };
            }
            TokenType::Function => {
                if let Some(name) = token.value.strip_prefix('@') {
                    token.value = name.to_string();
                }
            }
            TokenType::Noop => continue,
            _ => {}
        }
        out.push(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(formula: &str) -> Vec<(String, TokenType, TokenSubType)> {
        tokenize(formula)
            .into_iter()
            .map(|t| (t.value, t.kind, t.subtype))
            .collect()
    }

    #[test]
    fn test_arithmetic() {
        use TokenSubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=1+2*3"),
            vec![
                ("1".into(), Operand, Number),
                ("+".into(), OperatorInfix, Math),
                ("2".into(), Operand, Number),
                ("*".into(), OperatorInfix, Math),
                ("3".into(), Operand, Number),
            ]
        );
    }

    #[test]
    fn test_prefix_and_subexpressions() {
        use TokenSubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("-(1 - -2)"),
            vec![
                ("-".into(), OperatorPrefix, Math),
                ("".into(), Subexpression, Start),
                ("1".into(), Operand, Number),
                ("-".into(), OperatorInfix, Math),
                ("-".into(), OperatorPrefix, Math),
                ("2".into(), Operand, Number),
                ("".into(), Subexpression, Stop),
            ]
        );
        // A leading plus is dropped
        assert_eq!(kinds("=+1").len(), 1);
    }

    #[test]
    fn test_functions_and_arguments() {
        use TokenSubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("=_xlfn.CEILING.MATH(A1,\"x\"\"y\",TRUE)"),
            vec![
                ("_xlfn.CEILING.MATH".into(), Function, Start),
                ("A1".into(), Operand, Range),
                (",".into(), Argument, Nothing),
                ("x\"y".into(), Operand, Text),
                (",".into(), Argument, Nothing),
                ("TRUE".into(), Operand, Logical),
                ("".into(), Function, Stop),
            ]
        );
    }

    #[test]
    fn test_references_and_errors() {
        use TokenSubType::*;
        use TokenType::*;
        assert_eq!(
            kinds("='My Sheet'!A1:B2+#DIV/0!"),
            vec![
                ("'My Sheet'!A1:B2".into(), Operand, Range),
                ("+".into(), OperatorInfix, Math),
                ("#DIV/0!".into(), Operand, Error),
            ]
        );
    }

    #[test]
    fn test_scientific_notation() {
        let tokens = tokenize("=1.5E+3-2");
        assert_eq!(tokens[0].value, "1.5E+3");
        assert_eq!(tokens[0].subtype, TokenSubType::Number);
        assert_eq!(tokens[1].subtype, TokenSubType::Math);
    }

    #[test]
    fn test_whitespace() {
        let tokens = tokenize("= SUM( A1 )");
        assert_eq!(tokens.len(), 3);
        let tokens = tokenize("=A1:B2 B1:C3");
        assert_eq!(tokens[1].subtype, TokenSubType::Intersection);
    }

    #[test]
    fn test_comparison() {
        let tokens = tokenize("=A1<>2");
        assert_eq!(tokens[1].value, "<>");
        assert_eq!(tokens[1].subtype, TokenSubType::Logical);
        assert!(tokenize("").is_empty());
    }
}
