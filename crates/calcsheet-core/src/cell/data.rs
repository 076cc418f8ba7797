//! Cell slot and its derived evaluation state

use super::value::CellValue;

/// Formula text written into a cell whose formula could not be evaluated
/// because it sits on, or depends on, a circular reference.
pub const ERROR_MARKER: &str = "#REF!";

/// A single cell: an optional value and an optional formula
///
/// This mirrors the shape a workbook reader produces for each occupied cell.
/// A formula cell may carry a value too: the last computed result stored in
/// the file, or a value written over it before the next calculation pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    /// Current value, if any
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub value: Option<CellValue>,
    /// Formula source text (without a leading `=`), if any
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub formula: Option<String>,
}

/// Evaluation state of a cell, derived from its fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellState<'a> {
    /// Neither a value nor a formula
    Empty,
    /// A value and no formula
    Literal(&'a CellValue),
    /// A formula awaiting evaluation
    Pending(&'a str),
    /// The formula was replaced by [`ERROR_MARKER`]
    Errored,
}

impl Cell {
    /// Create a literal cell
    pub fn with_value<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: Some(value.into()),
            formula: None,
        }
    }

    /// Create a formula cell with no cached value
    pub fn with_formula<S: Into<String>>(formula: S) -> Self {
        Self {
            value: None,
            formula: Some(formula.into()),
        }
    }

    /// Create a formula cell carrying a previously computed value
    pub fn with_cached<S: Into<String>, V: Into<CellValue>>(formula: S, value: V) -> Self {
        Self {
            value: Some(value.into()),
            formula: Some(formula.into()),
        }
    }

    /// Derive the evaluation state
    pub fn state(&self) -> CellState<'_> {
        match (&self.formula, &self.value) {
            (Some(f), None) if f == ERROR_MARKER => CellState::Errored,
            (Some(f), _) => CellState::Pending(f),
            (None, Some(v)) => CellState::Literal(v),
            (None, None) => CellState::Empty,
        }
    }

    /// Whether the cell holds a formula that still needs evaluation
    pub fn is_pending(&self) -> bool {
        matches!(self.state(), CellState::Pending(_))
    }

    /// Whether the cell was marked with [`ERROR_MARKER`]
    pub fn is_errored(&self) -> bool {
        matches!(self.state(), CellState::Errored)
    }

    /// Replace the formula by a computed value
    pub fn settle(&mut self, value: CellValue) {
        self.value = Some(value);
        self.formula = None;
    }

    /// Drop the value, keeping the formula (a Pending cell that did not settle)
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Drop the value and replace the formula by [`ERROR_MARKER`]
    pub fn mark_errored(&mut self) {
        self.value = None;
        self.formula = Some(ERROR_MARKER.to_string());
    }
}
