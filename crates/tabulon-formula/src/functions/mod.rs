//! Built-in spreadsheet functions

pub mod math;

use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{Token, TokenSubType};
use ahash::AHashMap;
use std::sync::OnceLock;
use tabulon_core::CellError;

/// Function implementation signature
///
/// Arguments arrive in call order, one token per argument or per cell of an
/// expanded range. The result is the value's text.
pub type FunctionImpl = fn(&[Token]) -> FormulaResult<String>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

/// The process-wide registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FunctionRegistry::new)
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };
        registry.register_math_functions();
        registry
    }

    /// Look up a function by name. Case-insensitive; the `_xlfn.` prefix
    /// Excel writes before newer functions is ignored.
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&canonical_name(name))
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Check arity, short-circuit on an error-valued argument, then run the
    /// function.
    pub fn call(&self, name: &str, args: &[Token]) -> FormulaResult<String> {
        let def = self
            .get(name)
            .ok_or_else(|| FormulaError::UnsupportedFunction(canonical_name(name)))?;
        check_arity(def, args.len())?;
        if let Some(err) = args.iter().find(|t| t.subtype == TokenSubType::Error) {
            return Err(FormulaError::Cell(
                CellError::from_str(&err.value).unwrap_or(CellError::Value),
            ));
        }
        (def.implementation)(args)
    }

    fn register_math_functions(&mut self) {
        let table: [(&'static str, usize, Option<usize>, FunctionImpl); 22] = [
            ("ABS", 1, Some(1), math::fn_abs),
            ("ACOS", 1, Some(1), math::fn_acos),
            ("ACOSH", 1, Some(1), math::fn_acosh),
            ("ACOT", 1, Some(1), math::fn_acot),
            ("ACOTH", 1, Some(1), math::fn_acoth),
            ("ARABIC", 1, Some(1), math::fn_arabic),
            ("ASIN", 1, Some(1), math::fn_asin),
            ("ASINH", 1, Some(1), math::fn_asinh),
            ("ATAN", 1, Some(1), math::fn_atan),
            ("ATANH", 1, Some(1), math::fn_atanh),
            ("ATAN2", 2, Some(2), math::fn_atan2),
            ("BASE", 2, Some(3), math::fn_base),
            ("CEILING", 1, Some(2), math::fn_ceiling),
            ("CEILING.MATH", 1, Some(3), math::fn_ceiling_math),
            ("GCD", 1, None, math::fn_gcd),
            ("LCM", 1, None, math::fn_lcm),
            ("POWER", 2, Some(2), math::fn_power),
            ("PRODUCT", 1, None, math::fn_product),
            ("SIGN", 1, Some(1), math::fn_sign),
            ("SQRT", 1, Some(1), math::fn_sqrt),
            ("SUM", 1, None, math::fn_sum),
            ("QUOTIENT", 2, Some(2), math::fn_quotient),
        ];
        for (name, min_args, max_args, implementation) in table {
            self.register(FunctionDef {
                name,
                min_args,
                max_args,
                implementation,
            });
        }
    }
}

fn canonical_name(name: &str) -> String {
    let upper = name.trim().to_uppercase();
    match upper.strip_prefix("_XLFN.") {
        Some(stripped) => stripped.to_string(),
        None => upper,
    }
}

fn check_arity(def: &FunctionDef, count: usize) -> FormulaResult<()> {
    let expected = match def.max_args {
        Some(max) if def.min_args == max && count != max => format!("{max} numeric"),
        _ if count < def.min_args => format!("at least {}", def.min_args),
        Some(max) if count > max => format!("at most {max}"),
        _ => return Ok(()),
    };
    Err(FormulaError::ArgumentCount {
        function: def.name.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenType;
    use pretty_assertions::assert_eq;

    fn num(v: &str) -> Token {
        Token::new(v, TokenType::Operand, TokenSubType::Number)
    }

    #[test]
    fn test_lookup() {
        let reg = registry();
        assert_eq!(reg.len(), 22);
        assert!(reg.get("sum").is_some());
        assert!(reg.get("_xlfn.CEILING.MATH").is_some());
        assert!(reg.get("VLOOKUP").is_none());
    }

    #[test]
    fn test_arity_messages() {
        let reg = registry();
        assert_eq!(
            reg.call("ABS", &[]).unwrap_err().to_string(),
            "ABS requires 1 numeric arguments"
        );
        assert_eq!(
            reg.call("BASE", &[num("1")]).unwrap_err().to_string(),
            "BASE requires at least 2 arguments"
        );
        assert_eq!(
            reg.call("BASE", &[num("1"), num("2"), num("3"), num("4")])
                .unwrap_err()
                .to_string(),
            "BASE requires at most 3 arguments"
        );
    }

    #[test]
    fn test_error_argument_propagates() {
        let err = Token::new("#N/A", TokenType::Operand, TokenSubType::Error);
        assert_eq!(
            registry().call("SUM", &[num("1"), err]),
            Err(FormulaError::Cell(CellError::Na))
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            registry().call("_xlfn.nope", &[]),
            Err(FormulaError::UnsupportedFunction("NOPE".to_string()))
        );
    }
}
