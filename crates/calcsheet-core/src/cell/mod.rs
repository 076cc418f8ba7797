//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - A resolved value stored in a cell
//! - [`Cell`] and [`CellState`] - A cell slot and its evaluation state
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")

mod address;
mod data;
mod value;

pub use address::{CellAddress, CellRange, Cells};
pub use data::{Cell, CellState, ERROR_MARKER};
pub use value::CellValue;
