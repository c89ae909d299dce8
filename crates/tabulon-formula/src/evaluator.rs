//! Infix formula evaluator
//!
//! Walks the token stream once with explicit stacks instead of building a
//! tree:
//!
//! - `opd` / `opt`: operands and operators outside any function call
//! - `opf`: open function calls, innermost last
//! - each open call keeps its own operand stack, operator stack and
//!   collected arguments ([`Frame`])
//!
//! Spreadsheet errors travel as error tokens so `=1/0+1` still reduces to a
//! single `#DIV/0!`. Only when the final token is an error does evaluation
//! fail, with [`FormulaError::Cell`].

use crate::error::{FormulaError, FormulaResult};
use crate::functions;
use crate::resolver::{resolve_reference, CellSource};
use crate::tokenizer::{tokenize, Token, TokenSubType, TokenType};
use log::trace;
use tabulon_core::numfmt::fmt_g;
use tabulon_core::CellError;

/// Evaluate `formula` with unqualified references pointing at `sheet`.
///
/// Returns the text of the final value; an empty formula yields `""`.
pub fn evaluate_formula<S: CellSource + ?Sized>(
    source: &S,
    sheet: &str,
    formula: &str,
) -> FormulaResult<String> {
    let tokens = tokenize(formula);
    trace!("evaluating {formula:?} on {sheet}: {} tokens", tokens.len());
    Evaluator::new(source, sheet).run(&tokens)
}

/// Scratch state of one open function call
#[derive(Debug, Default)]
struct Frame {
    name: String,
    opfd: Vec<Token>,
    opft: Vec<Token>,
    args: Vec<Token>,
}

impl Frame {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Apply every pending operator and move the result to the argument list.
    fn flush_argument(&mut self) -> FormulaResult<()> {
        while let Some(op) = self.opft.pop() {
            calculate(&mut self.opfd, &op)?;
        }
        if let Some(value) = self.opfd.pop() {
            self.args.push(value);
        }
        self.opfd.clear();
        Ok(())
    }
}

struct Evaluator<'a, S: ?Sized> {
    source: &'a S,
    sheet: &'a str,
    opd: Vec<Token>,
    opt: Vec<Token>,
    opf: Vec<Frame>,
}

impl<'a, S: CellSource + ?Sized> Evaluator<'a, S> {
    fn new(source: &'a S, sheet: &'a str) -> Self {
        Self {
            source,
            sheet,
            opd: Vec::new(),
            opt: Vec::new(),
            opf: Vec::new(),
        }
    }

    fn run(mut self, tokens: &[Token]) -> FormulaResult<String> {
        for (i, token) in tokens.iter().enumerate() {
            if token.is(TokenType::Function, TokenSubType::Start) {
                self.opf.push(Frame::new(&token.value));
                continue;
            }
            if self.opf.is_empty() {
                parse_token(self.source, self.sheet, token, &mut self.opd, &mut self.opt)?;
            } else {
                self.function_token(token, tokens.get(i + 1))?;
            }
        }
        if let Some(frame) = self.opf.last() {
            return Err(FormulaError::InvalidFormula(format!(
                "unterminated call to {}",
                frame.name
            )));
        }
        while let Some(op) = self.opt.pop() {
            calculate(&mut self.opd, &op)?;
        }
        match self.opd.pop() {
            None => Ok(String::new()),
            Some(token) if token.subtype == TokenSubType::Error => Err(FormulaError::Cell(
                CellError::from_str(&token.value).unwrap_or(CellError::Value),
            )),
            Some(token) => Ok(token.value),
        }
    }

    /// Handle a token inside the innermost open function call.
    fn function_token(&mut self, token: &Token, next: Option<&Token>) -> FormulaResult<()> {
        let Some(frame) = self.opf.last_mut() else {
            return Ok(());
        };

        if token.is(TokenType::Operand, TokenSubType::Range) && frame.opft.is_empty() {
            let expands = next.map_or(false, |t| {
                matches!(t.kind, TokenType::Argument | TokenType::Function)
            });
            if expands {
                match resolve_reference(self.source, self.sheet, &token.value) {
                    Ok(values) if values.is_empty() => frame.args.push(error_token(CellError::Value)),
                    Ok(values) => frame.args.extend(values.into_iter().map(value_token)),
                    Err(FormulaError::Cell(e)) => frame.args.push(error_token(e)),
                    Err(e) => return Err(e),
                }
                return Ok(());
            }
        }

        match (token.kind, token.subtype) {
            (TokenType::Argument, _) => frame.flush_argument(),
            (TokenType::Operand, TokenSubType::Text) => {
                frame.args.push(token.clone());
                Ok(())
            }
            (TokenType::Function, TokenSubType::Stop) => {
                frame.flush_argument()?;
                self.finish_call()
            }
            _ => parse_token(
                self.source,
                self.sheet,
                token,
                &mut frame.opfd,
                &mut frame.opft,
            ),
        }
    }

    /// Invoke the innermost function and hand its result to the enclosing
    /// scope.
    fn finish_call(&mut self) -> FormulaResult<()> {
        let Some(frame) = self.opf.pop() else {
            return Ok(());
        };
        let result = match functions::registry().call(&frame.name, &frame.args) {
            Ok(value) => value_token(value),
            Err(FormulaError::Cell(e)) => error_token(e),
            Err(e) => return Err(e),
        };
        match self.opf.last_mut() {
            Some(outer) => outer.opfd.push(result),
            None => self.opd.push(result),
        }
        Ok(())
    }
}

/// Push an operand or operator onto the given scope, reducing as precedence
/// requires.
fn parse_token<S: CellSource + ?Sized>(
    source: &S,
    sheet: &str,
    token: &Token,
    opd: &mut Vec<Token>,
    opt: &mut Vec<Token>,
) -> FormulaResult<()> {
    match (token.kind, token.subtype) {
        (TokenType::Operand, TokenSubType::Range) => {
            let value = match resolve_reference(source, sheet, &token.value) {
                Ok(mut values) if values.len() == 1 => value_token(values.remove(0)),
                Ok(_) => error_token(CellError::Value),
                Err(FormulaError::Cell(e)) => error_token(e),
                Err(e) => return Err(e),
            };
            opd.push(value);
        }
        (TokenType::Operand, TokenSubType::Logical) => {
            let truth = token.value.eq_ignore_ascii_case("TRUE");
            opd.push(number_token(if truth { 1.0 } else { 0.0 }));
        }
        (TokenType::Operand, TokenSubType::Error) => {
            let e = CellError::from_str(&token.value).unwrap_or(CellError::Value);
            opd.push(error_token(e));
        }
        (TokenType::Operand, _) => opd.push(token.clone()),
        (TokenType::OperatorPrefix, _) => {
            priority(token)?;
            opt.push(token.clone());
        }
        (TokenType::OperatorInfix, _) => {
            let p = priority(token)?;
            while let Some(top) = opt.last() {
                if priority(top)? < p {
                    break;
                }
                let op = opt.pop().ok_or_else(underflow)?;
                calculate(opd, &op)?;
            }
            opt.push(token.clone());
        }
        (TokenType::Subexpression, TokenSubType::Start) => opt.push(token.clone()),
        (TokenType::Subexpression, TokenSubType::Stop) => loop {
            let op = opt.pop().ok_or_else(|| {
                FormulaError::InvalidFormula("unbalanced parenthesis".to_string())
            })?;
            if op.is(TokenType::Subexpression, TokenSubType::Start) {
                break;
            }
            calculate(opd, &op)?;
        },
        (TokenType::OperatorPostfix, _) => {
            return Err(unsupported_operator(token));
        }
        _ => {
            return Err(FormulaError::InvalidFormula(format!(
                "unexpected token {:?}",
                token.value
            )));
        }
    }
    Ok(())
}

/// Binding strength of an operator on the stack
fn priority(token: &Token) -> FormulaResult<u8> {
    match (token.kind, token.subtype, token.value.as_str()) {
        (TokenType::OperatorPrefix, _, "-") => Ok(3),
        (TokenType::OperatorInfix, TokenSubType::Math, "*" | "/") => Ok(2),
        (TokenType::OperatorInfix, TokenSubType::Math, "+" | "-") => Ok(1),
        (TokenType::Subexpression, TokenSubType::Start, _) => Ok(0),
        _ => Err(unsupported_operator(token)),
    }
}

/// Apply `op` to the top of `opd`.
fn calculate(opd: &mut Vec<Token>, op: &Token) -> FormulaResult<()> {
    if op.kind == TokenType::OperatorPrefix {
        let operand = opd.pop().ok_or_else(underflow)?;
        if operand.subtype == TokenSubType::Error {
            opd.push(operand);
        } else {
            opd.push(number_token(-operand_number(&operand)?));
        }
        return Ok(());
    }

    let rhs = opd.pop().ok_or_else(underflow)?;
    let lhs = opd.pop().ok_or_else(underflow)?;
    if lhs.subtype == TokenSubType::Error {
        opd.push(lhs);
        return Ok(());
    }
    if rhs.subtype == TokenSubType::Error {
        opd.push(rhs);
        return Ok(());
    }
    let (a, b) = (operand_number(&lhs)?, operand_number(&rhs)?);
    let result = match op.value.as_str() {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b == 0.0 => {
            opd.push(error_token(CellError::Div0));
            return Ok(());
        }
        "/" => a / b,
        _ => return Err(unsupported_operator(op)),
    };
    opd.push(number_token(result));
    Ok(())
}

/// Numeric value of an operand; blank counts as zero.
fn operand_number(token: &Token) -> FormulaResult<f64> {
    let text = token.value.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    text.parse::<f64>()
        .map_err(|_| FormulaError::NumberParse(token.value.clone()))
}

fn number_token(value: f64) -> Token {
    Token::new(fmt_g(value), TokenType::Operand, TokenSubType::Number)
}

fn error_token(e: CellError) -> Token {
    Token::new(e.as_str(), TokenType::Operand, TokenSubType::Error)
}

/// Token for a cell or function value; error codes keep their error type.
fn value_token(value: String) -> Token {
    if CellError::from_str(&value).is_some() {
        Token::new(value, TokenType::Operand, TokenSubType::Error)
    } else {
        Token::new(value, TokenType::Operand, TokenSubType::Number)
    }
}

fn underflow() -> FormulaError {
    FormulaError::InvalidFormula("missing operand".to_string())
}

fn unsupported_operator(token: &Token) -> FormulaError {
    FormulaError::InvalidFormula(format!("unsupported operator {:?}", token.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Sheet(HashMap<String, String>);

    impl Sheet {
        fn with(cells: &[(&str, &str)]) -> Self {
            Self(
                cells
                    .iter()
                    .map(|(c, v)| (c.to_string(), v.to_string()))
                    .collect(),
            )
        }
    }

    impl CellSource for Sheet {
        fn cell_value(&self, sheet: &str, cell: &str) -> tabulon_core::Result<String> {
            if sheet != "Sheet1" {
                return Err(tabulon_core::Error::SheetNotFound(sheet.to_string()));
            }
            Ok(self.0.get(cell).cloned().unwrap_or_default())
        }
    }

    fn eval(sheet: &Sheet, formula: &str) -> FormulaResult<String> {
        evaluate_formula(sheet, "Sheet1", formula)
    }

    #[test]
    fn test_precedence() {
        let sheet = Sheet::default();
        assert_eq!(eval(&sheet, "=1+2*3").unwrap(), "7");
        assert_eq!(eval(&sheet, "=(1+2)*3").unwrap(), "9");
        assert_eq!(eval(&sheet, "=10-4-3").unwrap(), "3");
        assert_eq!(eval(&sheet, "=8/2/2").unwrap(), "2");
        assert_eq!(eval(&sheet, "=-2*3").unwrap(), "-6");
        assert_eq!(eval(&sheet, "=2*-3").unwrap(), "-6");
        assert_eq!(eval(&sheet, "=--4").unwrap(), "4");
        assert_eq!(eval(&sheet, "=1.5").unwrap(), "1.5");
        assert_eq!(eval(&sheet, "").unwrap(), "");
    }

    #[test]
    fn test_division_by_zero() {
        let sheet = Sheet::default();
        assert_eq!(eval(&sheet, "=1/0"), Err(FormulaError::Cell(CellError::Div0)));
        assert_eq!(
            eval(&sheet, "=1/0+5"),
            Err(FormulaError::Cell(CellError::Div0))
        );
    }

    #[test]
    fn test_references() {
        let sheet = Sheet::with(&[("A1", "1"), ("B1", "2"), ("C1", "")]);
        assert_eq!(eval(&sheet, "=A1+B1*2").unwrap(), "5");
        assert_eq!(eval(&sheet, "=C1+1").unwrap(), "1");
        assert_eq!(eval(&sheet, "=A1:B1+1"), Err(FormulaError::Cell(CellError::Value)));
        assert_eq!(eval(&sheet, "=Nope!A1"), Err(FormulaError::Cell(CellError::Name)));
    }

    #[test]
    fn test_function_calls() {
        let sheet = Sheet::with(&[("A1", "1"), ("B1", "2"), ("A2", "3"), ("B2", "4")]);
        assert_eq!(eval(&sheet, "=SUM(A1,B1)").unwrap(), "3");
        assert_eq!(eval(&sheet, "=SUM(A1:B2)").unwrap(), "10");
        assert_eq!(eval(&sheet, "=SUM(A1:B2,A1)").unwrap(), "11");
        assert_eq!(eval(&sheet, "=SUM(A1+B1,10)").unwrap(), "13");
        assert_eq!(eval(&sheet, "=1+SUM(1,2)*2").unwrap(), "7");
        assert_eq!(eval(&sheet, "=SUM(1,SQRT(16),PRODUCT(2,3))").unwrap(), "11");
        assert_eq!(eval(&sheet, "=SUM(1+SQRT(4))").unwrap(), "3");
        assert_eq!(eval(&sheet, "=_xlfn.CEILING.MATH(2.1)").unwrap(), "3");
        assert_eq!(eval(&sheet, "=ARABIC(\"MCMXC\")").unwrap(), "1990");
    }

    #[test]
    fn test_function_errors() {
        let sheet = Sheet::default();
        assert_eq!(eval(&sheet, "=SQRT(-1)"), Err(FormulaError::Cell(CellError::Num)));
        assert_eq!(
            eval(&sheet, "=SUM(1,SQRT(-1))"),
            Err(FormulaError::Cell(CellError::Num))
        );
        assert_eq!(
            eval(&sheet, "=NOSUCH(1)"),
            Err(FormulaError::UnsupportedFunction("NOSUCH".to_string()))
        );
        assert!(matches!(
            eval(&sheet, "=ABS(1,2)"),
            Err(FormulaError::ArgumentCount { .. })
        ));
        assert!(matches!(
            eval(&sheet, "=GCD(-1,2)"),
            Err(FormulaError::Argument(_))
        ));
    }

    #[test]
    fn test_text_operand_is_not_a_number() {
        let sheet = Sheet::with(&[("A1", "apple")]);
        assert_eq!(
            eval(&sheet, "=A1+1"),
            Err(FormulaError::NumberParse("apple".to_string()))
        );
    }

    #[test]
    fn test_error_literals() {
        let sheet = Sheet::default();
        for e in CellError::ALL {
            assert_eq!(eval(&sheet, &format!("={e}")), Err(FormulaError::Cell(e)));
            assert_eq!(eval(&sheet, &format!("={e}+1")), Err(FormulaError::Cell(e)));
            assert_eq!(
                eval(&sheet, &format!("=SUM(1,{e})")),
                Err(FormulaError::Cell(e))
            );
        }
    }

    #[test]
    fn test_stray_operand_is_rejected() {
        let sheet = Sheet::default();
        assert!(matches!(
            eval(&sheet, "=1\"x\""),
            Err(FormulaError::InvalidFormula(_))
        ));
        assert!(matches!(
            eval(&sheet, "=SUM(1\"x\")"),
            Err(FormulaError::InvalidFormula(_))
        ));
    }

    #[test]
    fn test_unsupported_operator() {
        let sheet = Sheet::default();
        assert!(matches!(
            eval(&sheet, "=2^3"),
            Err(FormulaError::InvalidFormula(_))
        ));
    }
}
