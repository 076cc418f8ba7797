//! Error types for calcsheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the cell store and the calculator facade
///
/// Formula failures never surface here: they leave the cell Pending.
#[derive(Debug, Error)]
pub enum Error {
    /// Text that is not an A1 address
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Text that is not an A1 range
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row past the last worksheet row (0-based row, 0-based limit)
    #[error("Row {0} is past the last row ({1})")]
    RowOutOfBounds(u32, u32),

    /// Column past the last worksheet column (0-based column, 0-based limit)
    #[error("Column {0} is past the last column ({1})")]
    ColumnOutOfBounds(u32, u16),

    /// A calculator operation ran before any worksheet was set
    #[error("Worksheet not initialized; call set_worksheet() first")]
    NotInitialized,
}
