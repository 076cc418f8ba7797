//! Prelude module - common imports for calcsheet users
//!
//! ```rust
//! use calcsheet::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    Calculator,
    // Cell types
    Cell,
    CellAddress,
    CellState,
    CellValue,
    CyclePolicy,
    // Error types
    Error,
    Result,
    ScheduleStrategy,
    UnresolvedReferencePolicy,
    Worksheet,
    ERROR_MARKER,
};
