//! Math and trigonometry functions

use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::Token;
use tabulon_core::numfmt::fmt_g;
use tabulon_core::CellError;

/// Numeric value of an argument; blank counts as zero.
fn number(token: &Token) -> FormulaResult<f64> {
    let text = token.value.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    text.parse::<f64>()
        .map_err(|_| FormulaError::NumberParse(token.value.clone()))
}

fn arg(args: &[Token], i: usize) -> FormulaResult<f64> {
    match args.get(i) {
        Some(token) => number(token),
        None => Ok(0.0),
    }
}

/// Render a result, mapping NaN and infinities to `#NUM!`.
fn finite(value: f64) -> FormulaResult<String> {
    if value.is_finite() {
        Ok(fmt_g(value))
    } else {
        Err(FormulaError::Cell(CellError::Num))
    }
}

/// Apply `f` to the single argument.
fn unary(args: &[Token], f: fn(f64) -> f64) -> FormulaResult<String> {
    finite(f(arg(args, 0)?))
}

/// Numeric values of all non-blank arguments
fn non_blank(args: &[Token]) -> FormulaResult<Vec<f64>> {
    args.iter()
        .filter(|t| !t.value.trim().is_empty())
        .map(number)
        .collect()
}

/// ABS function
pub fn fn_abs(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::abs)
}

/// ACOS function
pub fn fn_acos(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::acos)
}

/// ACOSH function
pub fn fn_acosh(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::acosh)
}

/// ACOT function
pub fn fn_acot(args: &[Token]) -> FormulaResult<String> {
    unary(args, |x| std::f64::consts::FRAC_PI_2 - x.atan())
}

/// ACOTH function
pub fn fn_acoth(args: &[Token]) -> FormulaResult<String> {
    unary(args, |x| (1.0 / x).atanh())
}

/// ARABIC function: Roman numeral text to a number.
///
/// A leading `-` negates. Malformed numerals are `#VALUE!`: an unknown
/// letter, V/L/D written twice in a row, a digit worth exactly double the
/// one before it, or any digit four times in a row.
pub fn fn_arabic(args: &[Token]) -> FormulaResult<String> {
    let text = args.first().map(|t| t.value.trim()).unwrap_or_default();
    let invalid = || FormulaError::Cell(CellError::Value);
    let (mut value, mut last, mut sign, mut run) = (0.0f64, 0.0f64, 1.0f64, 0usize);

    for ch in text.chars() {
        if ch == '-' {
            sign = -1.0;
            continue;
        }
        let digit = match ch.to_ascii_uppercase() {
            'I' => 1.0,
            'V' => 5.0,
            'X' => 10.0,
            'L' => 50.0,
            'C' => 100.0,
            'D' => 500.0,
            'M' => 1000.0,
            _ => return Err(invalid()),
        };
        run = if digit == last { run + 1 } else { 1 };
        if run > 3 {
            return Err(invalid());
        }
        if digit == last && matches!(digit as u32, 5 | 50 | 500) {
            return Err(invalid());
        }
        if 2.0 * last == digit {
            return Err(invalid());
        }
        value += digit;
        if last < digit {
            value -= 2.0 * last;
        }
        last = digit;
    }
    Ok(fmt_g(sign * value))
}

/// ASIN function
pub fn fn_asin(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::asin)
}

/// ASINH function
pub fn fn_asinh(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::asinh)
}

/// ATAN function
pub fn fn_atan(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::atan)
}

/// ATANH function
pub fn fn_atanh(args: &[Token]) -> FormulaResult<String> {
    unary(args, f64::atanh)
}

/// ATAN2(x, y): angle of the point (x, y)
pub fn fn_atan2(args: &[Token]) -> FormulaResult<String> {
    let (x, y) = (arg(args, 0)?, arg(args, 1)?);
    if x == 0.0 && y == 0.0 {
        return Err(FormulaError::Cell(CellError::Div0));
    }
    finite(y.atan2(x))
}

/// Longest padding BASE accepts
const BASE_MAX_LENGTH: usize = 255;

/// BASE(number, radix, [min_length])
pub fn fn_base(args: &[Token]) -> FormulaResult<String> {
    let value = arg(args, 0)?.trunc() as i64;
    let radix = arg(args, 1)?;
    if radix.fract() != 0.0 || !(2.0..=36.0).contains(&radix) {
        return Err(FormulaError::Argument(
            "radix must be an integer >= 2 and <= 36".to_string(),
        ));
    }
    let min_length = if args.len() > 2 {
        let min_length = arg(args, 2)?;
        if min_length > BASE_MAX_LENGTH as f64 {
            return Err(FormulaError::Argument(format!(
                "min_length must be <= {BASE_MAX_LENGTH}"
            )));
        }
        min_length.max(0.0) as usize
    } else {
        0
    };

    let digits = to_radix(value.unsigned_abs(), radix as u64);
    let padded = format!("{digits:0>min_length$}");
    Ok(if value < 0 {
        format!("-{padded}")
    } else {
        padded
    })
}

fn to_radix(mut n: u64, radix: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % radix) as usize]);
        n /= radix;
    }
    out.iter().rev().map(|&b| b as char).collect()
}

/// CEILING(number, [significance])
pub fn fn_ceiling(args: &[Token]) -> FormulaResult<String> {
    let number = arg(args, 0)?;
    if args.len() == 1 {
        return finite(number.ceil());
    }
    let significance = arg(args, 1)?;
    if significance < 0.0 && number > 0.0 {
        return Err(FormulaError::Argument(
            "negative significance is invalid for a positive number".to_string(),
        ));
    }
    if significance == 0.0 {
        return Ok("0".to_string());
    }
    let quotient = number / significance;
    let mut whole = quotient.trunc();
    if quotient.fract() > 0.0 {
        whole += 1.0;
    }
    finite(whole * significance)
}

/// CEILING.MATH(number, [significance], [mode])
///
/// Negative numbers round toward zero unless `mode` is negative.
pub fn fn_ceiling_math(args: &[Token]) -> FormulaResult<String> {
    let number = arg(args, 0)?;
    if args.len() == 1 {
        return finite(number.ceil());
    }
    let significance = arg(args, 1)?;
    let mode = if args.len() > 2 { arg(args, 2)? } else { 1.0 };
    if significance == 0.0 {
        return Ok("0".to_string());
    }
    let quotient = number / significance;
    let mut whole = quotient.trunc();
    if quotient.fract() != 0.0 {
        if number > 0.0 {
            whole += 1.0;
        } else if mode < 0.0 {
            whole -= 1.0;
        }
    }
    finite(whole * significance)
}

fn gcd(a: f64, b: f64) -> f64 {
    let (mut a, mut b) = (a.trunc(), b.trunc());
    while b != 0.0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: f64, b: f64) -> f64 {
    let (a, b) = (a.trunc(), b.trunc());
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    a * b / gcd(a, b)
}

/// Shared body of GCD and LCM: fold the non-blank, non-negative arguments.
fn fold_positive(args: &[Token], name: &str, f: fn(f64, f64) -> f64) -> FormulaResult<String> {
    let values = non_blank(args)?;
    if values.iter().any(|&v| v < 0.0) {
        return Err(FormulaError::Argument(format!(
            "{name} only accepts positive arguments"
        )));
    }
    let Some((&first, rest)) = values.split_first() else {
        return Ok("0".to_string());
    };
    finite(rest.iter().fold(first.trunc(), |acc, &v| f(acc, v)))
}

/// GCD function
pub fn fn_gcd(args: &[Token]) -> FormulaResult<String> {
    fold_positive(args, "GCD", gcd)
}

/// LCM function
pub fn fn_lcm(args: &[Token]) -> FormulaResult<String> {
    fold_positive(args, "LCM", lcm)
}

/// POWER function
pub fn fn_power(args: &[Token]) -> FormulaResult<String> {
    let (x, y) = (arg(args, 0)?, arg(args, 1)?);
    if x == 0.0 && y == 0.0 {
        return Err(FormulaError::Cell(CellError::Num));
    }
    if x == 0.0 && y < 0.0 {
        return Err(FormulaError::Cell(CellError::Div0));
    }
    finite(x.powf(y))
}

/// PRODUCT function
pub fn fn_product(args: &[Token]) -> FormulaResult<String> {
    Ok(fmt_g(non_blank(args)?.into_iter().product()))
}

/// SIGN function
pub fn fn_sign(args: &[Token]) -> FormulaResult<String> {
    let x = arg(args, 0)?;
    let sign = if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    };
    Ok(sign.to_string())
}

/// SQRT function
pub fn fn_sqrt(args: &[Token]) -> FormulaResult<String> {
    let x = arg(args, 0)?;
    if x < 0.0 {
        return Err(FormulaError::Cell(CellError::Num));
    }
    finite(x.sqrt())
}

/// SUM function
pub fn fn_sum(args: &[Token]) -> FormulaResult<String> {
    Ok(fmt_g(non_blank(args)?.into_iter().sum()))
}

/// QUOTIENT function: integer part of a division
pub fn fn_quotient(args: &[Token]) -> FormulaResult<String> {
    let (x, y) = (arg(args, 0)?, arg(args, 1)?);
    if y == 0.0 {
        return Err(FormulaError::Cell(CellError::Div0));
    }
    finite((x / y).trunc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TokenSubType, TokenType};
    use pretty_assertions::assert_eq;

    fn args(values: &[&str]) -> Vec<Token> {
        values
            .iter()
            .map(|v| Token::new(*v, TokenType::Operand, TokenSubType::Number))
            .collect()
    }

    fn cell_err(e: CellError) -> FormulaResult<String> {
        Err(FormulaError::Cell(e))
    }

    #[test]
    fn test_arabic() {
        assert_eq!(fn_arabic(&args(&["MCMXC"])).unwrap(), "1990");
        assert_eq!(fn_arabic(&args(&["mmxxvi"])).unwrap(), "2026");
        assert_eq!(fn_arabic(&args(&["IV"])).unwrap(), "4");
        assert_eq!(fn_arabic(&args(&["-XLIX"])).unwrap(), "-49");
        assert_eq!(fn_arabic(&args(&[""])).unwrap(), "0");
        assert_eq!(fn_arabic(&args(&["IIII"])), cell_err(CellError::Value));
        assert_eq!(fn_arabic(&args(&["VV"])), cell_err(CellError::Value));
        assert_eq!(fn_arabic(&args(&["VX"])), cell_err(CellError::Value));
        assert_eq!(fn_arabic(&args(&["LC"])), cell_err(CellError::Value));
        assert_eq!(fn_arabic(&args(&["ABC"])), cell_err(CellError::Value));
    }

    #[test]
    fn test_base() {
        assert_eq!(fn_base(&args(&["7", "2"])).unwrap(), "111");
        assert_eq!(fn_base(&args(&["100", "16", "4"])).unwrap(), "0064");
        assert_eq!(fn_base(&args(&["35", "36"])).unwrap(), "Z");
        assert!(matches!(
            fn_base(&args(&["7", "1"])),
            Err(FormulaError::Argument(_))
        ));
        assert!(matches!(
            fn_base(&args(&["7", "37"])),
            Err(FormulaError::Argument(_))
        ));
        assert_eq!(fn_base(&args(&["1", "2", "255"])).unwrap().len(), 255);
        assert!(matches!(
            fn_base(&args(&["1", "2", "256"])),
            Err(FormulaError::Argument(_))
        ));
        assert!(matches!(
            fn_base(&args(&["1", "2", "1E18"])),
            Err(FormulaError::Argument(_))
        ));
    }

    #[test]
    fn test_ceiling() {
        assert_eq!(fn_ceiling(&args(&["22.25", "0.1"])).unwrap(), "22.3");
        assert_eq!(fn_ceiling(&args(&["22.25", "10"])).unwrap(), "30");
        assert_eq!(fn_ceiling(&args(&["-22.25", "-5"])).unwrap(), "-25");
        assert_eq!(fn_ceiling(&args(&["2.1"])).unwrap(), "3");
        assert!(matches!(
            fn_ceiling(&args(&["1", "-1"])),
            Err(FormulaError::Argument(_))
        ));
    }

    #[test]
    fn test_ceiling_math() {
        assert_eq!(fn_ceiling_math(&args(&["15.25", "5"])).unwrap(), "20");
        assert_eq!(fn_ceiling_math(&args(&["-11", "2"])).unwrap(), "-10");
        assert_eq!(fn_ceiling_math(&args(&["-11", "2", "-1"])).unwrap(), "-12");
        assert_eq!(fn_ceiling_math(&args(&["-2.5"])).unwrap(), "-2");
    }

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(fn_gcd(&args(&["12", "18", ""])).unwrap(), "6");
        assert_eq!(fn_gcd(&args(&["7"])).unwrap(), "7");
        assert_eq!(fn_gcd(&args(&["0", "5"])).unwrap(), "5");
        assert_eq!(fn_lcm(&args(&["4", "6"])).unwrap(), "12");
        assert_eq!(fn_lcm(&args(&["0", "0"])).unwrap(), "0");
        assert_eq!(fn_gcd(&args(&[""])).unwrap(), "0");
        assert_eq!(
            fn_gcd(&args(&["-1", "2"])).unwrap_err().to_string(),
            "GCD only accepts positive arguments"
        );
        assert!(matches!(
            fn_lcm(&args(&["2", "-2"])),
            Err(FormulaError::Argument(_))
        ));
    }

    #[test]
    fn test_power_sqrt_quotient() {
        assert_eq!(fn_power(&args(&["2", "10"])).unwrap(), "1024");
        assert_eq!(fn_power(&args(&["0", "0"])), cell_err(CellError::Num));
        assert_eq!(fn_power(&args(&["0", "-1"])), cell_err(CellError::Div0));
        assert_eq!(fn_sqrt(&args(&["16"])).unwrap(), "4");
        assert_eq!(fn_sqrt(&args(&["-1"])), cell_err(CellError::Num));
        assert_eq!(fn_quotient(&args(&["-10", "3"])).unwrap(), "-3");
        assert_eq!(fn_quotient(&args(&["1", "0"])), cell_err(CellError::Div0));
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(fn_sum(&args(&["1", "", "2.5"])).unwrap(), "3.5");
        assert_eq!(fn_product(&args(&["2", "", "3"])).unwrap(), "6");
        assert_eq!(
            fn_sum(&args(&["1", "x"])),
            Err(FormulaError::NumberParse("x".to_string()))
        );
    }

    #[test]
    fn test_trig() {
        assert_eq!(fn_abs(&args(&["-3"])).unwrap(), "3");
        assert_eq!(fn_sign(&args(&["-0.5"])).unwrap(), "-1");
        assert_eq!(fn_sign(&args(&["0"])).unwrap(), "0");
        assert_eq!(fn_atan(&args(&["0"])).unwrap(), "0");
        assert_eq!(fn_acos(&args(&["1"])).unwrap(), "0");
        assert_eq!(fn_acos(&args(&["2"])), cell_err(CellError::Num));
        assert_eq!(fn_atanh(&args(&["1"])), cell_err(CellError::Num));
        assert_eq!(fn_atan2(&args(&["1", "1"])).unwrap(), fmt_g(std::f64::consts::FRAC_PI_4));
        assert_eq!(fn_atan2(&args(&["0", "0"])), cell_err(CellError::Div0));
        assert_eq!(fn_acot(&args(&["0"])).unwrap(), fmt_g(std::f64::consts::FRAC_PI_2));
    }
}
