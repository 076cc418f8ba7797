//! # calcsheet-formula
//!
//! Formula handling for calcsheet.
//!
//! This crate provides:
//! - Reference scanning (formula text → cell and range references)
//! - Dependency graph construction, cycle search and ordering
//! - Formula translation (spreadsheet syntax → evaluator grammar)
//! - A self-contained expression evaluator with the lookup functions
//!
//! ## Example
//!
//! ```rust
//! use calcsheet_core::{Cell, Worksheet};
//! use calcsheet_formula::expr::{evaluate, parse_expression, FunctionRegistry, Value};
//! use calcsheet_formula::translate::FormulaTranslator;
//!
//! let sheet = Worksheet::from_entries([
//!     ("A1", Cell::with_value(2.0)),
//!     ("A2", Cell::with_value(3.0)),
//! ])
//! .unwrap();
//!
//! let text = FormulaTranslator::default().translate("=SUM(A1:A2)*2", &sheet).unwrap();
//! assert_eq!(text, "sum(2, 3)*2");
//!
//! let expr = parse_expression(&text).unwrap();
//! assert_eq!(evaluate(&expr, &FunctionRegistry::new()).unwrap(), Value::Number(10.0));
//! ```

pub mod dependency;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod reference;
pub mod translate;

pub use dependency::{build_dependency_graph, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use reference::{extract_dependencies, scan_references, Reference, ReferenceToken};
pub use translate::{FormulaTranslator, UnresolvedReferencePolicy};
