//! Generic expression evaluator
//!
//! Parses and evaluates arithmetic, boolean and string expressions over
//! literals, operators, named functions and nested array literals. It knows
//! nothing about cells: the translator hands it text with every reference
//! already replaced by a literal.

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use evaluator::{evaluate, Value};
pub use functions::{FunctionDef, FunctionImpl, FunctionRegistry};
pub use parser::parse_expression;
