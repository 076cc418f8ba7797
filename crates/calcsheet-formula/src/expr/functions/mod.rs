//! Built-in evaluator functions

pub mod lookup;
pub mod math;

use ahash::AHashMap;

use super::evaluator::Value;
use crate::error::FormulaResult;

/// Function implementation signature
pub type FunctionImpl = fn(&[Value]) -> FormulaResult<Value>;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Name as written in expressions (matched exactly)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

const fn def(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    implementation: FunctionImpl,
) -> FunctionDef {
    FunctionDef {
        name,
        min_args,
        max_args,
        implementation,
    }
}

const MATH_FUNCTIONS: &[FunctionDef] = &[
    // Aggregates
    def("sum", 0, None, math::fn_sum),
    def("mean", 1, None, math::fn_mean),
    def("min", 1, None, math::fn_min),
    def("max", 1, None, math::fn_max),
    def("count", 0, None, math::fn_count),
    // Rounding
    def("round", 1, Some(2), math::fn_round),
    def("ceil", 1, Some(2), math::fn_ceil),
    def("floor", 1, Some(2), math::fn_floor),
    def("fix", 1, Some(2), math::fn_fix),
    def("rounddown", 1, Some(2), math::fn_rounddown),
    def("roundup", 1, Some(2), math::fn_roundup),
    // Arithmetic
    def("abs", 1, Some(1), math::fn_abs),
    def("sqrt", 1, Some(1), math::fn_sqrt),
    def("exp", 1, Some(1), math::fn_exp),
    def("log", 1, Some(2), math::fn_log),
    def("log10", 1, Some(1), math::fn_log10),
    def("mod", 2, Some(2), math::fn_mod),
    def("pow", 2, Some(2), math::fn_pow),
    def("complex", 1, Some(2), math::fn_complex),
    // Trigonometry
    def("sin", 1, Some(1), math::fn_sin),
    def("cos", 1, Some(1), math::fn_cos),
    def("tan", 1, Some(1), math::fn_tan),
    def("asin", 1, Some(1), math::fn_asin),
    def("acos", 1, Some(1), math::fn_acos),
    def("atan", 1, Some(1), math::fn_atan),
    def("atan2", 2, Some(2), math::fn_atan2),
    def("sinh", 1, Some(1), math::fn_sinh),
    def("cosh", 1, Some(1), math::fn_cosh),
    def("tanh", 1, Some(1), math::fn_tanh),
    def("asinh", 1, Some(1), math::fn_asinh),
    def("acosh", 1, Some(1), math::fn_acosh),
    def("atanh", 1, Some(1), math::fn_atanh),
    def("radians", 1, Some(1), math::fn_radians),
    def("degrees", 1, Some(1), math::fn_degrees),
    def("pi", 0, Some(0), math::fn_pi),
    // RAND (volatile: a fresh value on every pass)
    def("random", 0, Some(2), math::fn_random),
    // Logical
    def("not", 1, Some(1), math::fn_not),
    def("and", 1, None, math::fn_and),
    def("or", 1, None, math::fn_or),
];

const LOOKUP_FUNCTIONS: &[FunctionDef] = &[
    def("INDEX", 2, Some(3), lookup::fn_index),
    def("MATCH", 2, Some(3), lookup::fn_match),
    def("VLOOKUP", 3, Some(4), lookup::fn_vlookup),
];

/// Function registry
///
/// Each calculator owns one; nothing is shared between instances.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_all(MATH_FUNCTIONS);
        registry.register_all(LOOKUP_FUNCTIONS);
        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by exact name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Whether a function is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_all(&mut self, defs: &[FunctionDef]) {
        for def in defs {
            self.register(*def);
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{evaluate, parse_expression};

    fn fn_answer(_args: &[Value]) -> FormulaResult<Value> {
        Ok(Value::Number(42.0))
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FunctionRegistry::new();
        for name in ["sum", "mean", "sqrt", "random", "INDEX", "MATCH", "VLOOKUP"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!registry.contains("Sum"));
        assert_eq!(registry.len(), MATH_FUNCTIONS.len() + LOOKUP_FUNCTIONS.len());
    }

    #[test]
    fn test_registries_are_independent() {
        let mut custom = FunctionRegistry::empty();
        custom.register(def("answer", 0, Some(0), fn_answer));

        let expr = parse_expression("answer()").unwrap();
        assert_eq!(evaluate(&expr, &custom).unwrap(), Value::Number(42.0));
        assert!(evaluate(&expr, &FunctionRegistry::new()).is_err());
    }
}
