//! # calcsheet-core
//!
//! Core data structures for the calcsheet worksheet calculator.
//!
//! This crate provides the fundamental types used throughout calcsheet:
//! - [`CellValue`] - A resolved cell value (number, text, boolean, complex)
//! - [`Cell`] - A cell slot holding an optional value and an optional formula
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`Worksheet`] - The cell store
//!
//! ## Example
//!
//! ```rust
//! use calcsheet_core::{CellState, CellValue, Worksheet};
//!
//! let mut sheet = Worksheet::new();
//! sheet.set_cell_value("A1", 2.0).unwrap();
//! sheet.set_cell_formula("B1", "A1*2").unwrap();
//!
//! assert_eq!(sheet.value("a1"), Some(&CellValue::Number(2.0)));
//! assert!(matches!(sheet.state("B1"), CellState::Pending("A1*2")));
//! ```

pub mod cell;
pub mod error;
pub mod worksheet;

pub use cell::{Cell, CellAddress, CellRange, CellState, CellValue, ERROR_MARKER};
pub use error::{Error, Result};
pub use worksheet::Worksheet;

/// Re-exported so callers can build complex values without naming `num-complex`
pub use num_complex::Complex64;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
