//! # calcsheet
//!
//! Evaluates every formula of a worksheet snapshot, in dependency order,
//! and replaces each formula by its value.
//!
//! ## Features
//!
//! - A1 references and rectangular ranges, absolute (`$A$1`) or relative
//! - Arithmetic, comparisons, `IF`, math and aggregate functions
//! - `INDEX`, `MATCH` and `VLOOKUP` over ranges
//! - Circular references marked `#REF!` or broken, per [`CyclePolicy`]
//! - Topological or fixed-point scheduling, per [`ScheduleStrategy`]
//!
//! A formula that cannot be evaluated keeps its text; the pass logs the
//! failure through the `log` facade and carries on.
//!
//! ## Example
//!
//! ```rust
//! use calcsheet::prelude::*;
//!
//! let sheet = Worksheet::from_entries([
//!     ("A1", Cell::with_value("apple")),
//!     ("B1", Cell::with_value(1.0)),
//!     ("A2", Cell::with_value("banana")),
//!     ("B2", Cell::with_value(2.0)),
//!     ("C1", Cell::with_formula("=VLOOKUP(\"banana\", A1:B2, 2) * 10")),
//! ])
//! .unwrap();
//!
//! let mut calc = Calculator::new();
//! calc.set_worksheet(sheet);
//! let sheet = calc.calculate().unwrap();
//! assert_eq!(sheet.value("C1"), Some(&CellValue::Number(20.0)));
//! ```

pub mod calculation;
pub mod calculator;
pub mod cycle;
pub mod prelude;
pub mod schedule;

pub use calculation::{CalculationOptions, CalculationStats};
pub use calculator::Calculator;
pub use cycle::{CyclePolicy, CycleReport};
pub use schedule::{ScheduleReport, ScheduleStrategy};

// Re-export core types
pub use calcsheet_core::{
    Cell, CellAddress, CellRange, CellState, CellValue, Complex64, Error, Result, Worksheet,
    ERROR_MARKER,
};

// Re-export formula types
pub use calcsheet_formula::{FormulaError, UnresolvedReferencePolicy};
