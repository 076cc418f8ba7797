//! Calculator facade
//!
//! Owns at most one worksheet and the function registry used to evaluate it.

use calcsheet_core::{CellAddress, CellValue, Error, Result, Worksheet};
use calcsheet_formula::expr::FunctionRegistry;

use crate::calculation::{CalculationEngine, CalculationOptions, CalculationStats};

/// Evaluates every formula of a worksheet snapshot
///
/// # Example
///
/// ```rust
/// use calcsheet::prelude::*;
///
/// let mut calc = Calculator::new();
/// calc.set_worksheet(Worksheet::new());
/// calc.set_cell_value("A1", 2.0).unwrap();
/// calc.set_cell_value("B1", 3.0).unwrap();
/// calc.set_cell_formula("C1", "=A1+B1").unwrap();
///
/// calc.calculate().unwrap();
/// assert_eq!(calc.cell_value("C1").unwrap(), Some(&CellValue::Number(5.0)));
/// assert_eq!(calc.cell_formula("C1").unwrap(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    worksheet: Option<Worksheet>,
    options: CalculationOptions,
    registry: FunctionRegistry,
}

impl Calculator {
    /// Create a calculator with default options and no worksheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator with custom options and no worksheet
    pub fn with_options(options: CalculationOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Options applied to every calculation this calculator runs
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Replace the worksheet; nothing is validated or evaluated
    pub fn set_worksheet(&mut self, worksheet: Worksheet) {
        self.worksheet = Some(worksheet);
    }

    /// The worksheet, as last written or calculated
    pub fn worksheet(&self) -> Result<&Worksheet> {
        self.worksheet.as_ref().ok_or(Error::NotInitialized)
    }

    fn worksheet_mut(&mut self) -> Result<&mut Worksheet> {
        self.worksheet.as_mut().ok_or(Error::NotInitialized)
    }

    /// Set a cell value, keeping any formula in the cell
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        self.worksheet_mut()?.set_cell_value(address, value)
    }

    /// Set several cell values; stops at the first bad address
    pub fn set_cell_values<I, S, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<CellValue>,
    {
        let sheet = self.worksheet_mut()?;
        for (address, value) in values {
            sheet.set_cell_value(address.as_ref(), value)?;
        }
        Ok(())
    }

    /// Set a cell formula; it is evaluated on the next [`calculate`](Self::calculate)
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        self.worksheet_mut()?.set_cell_formula(address, formula)
    }

    /// Value of a cell
    ///
    /// `Ok(None)` for an empty cell, a cell without a value, or an address
    /// that does not parse.
    pub fn cell_value(&self, address: &str) -> Result<Option<&CellValue>> {
        Ok(self.worksheet()?.value(address))
    }

    /// Formula of a cell; `Ok(None)` once it has been calculated
    pub fn cell_formula(&self, address: &str) -> Result<Option<&str>> {
        Ok(self.worksheet()?.formula(address))
    }

    /// Value of a cell by address
    pub fn cell_value_at(&self, addr: CellAddress) -> Result<Option<&CellValue>> {
        Ok(self.worksheet()?.value_at(addr))
    }

    /// Evaluate every Pending formula and return the updated worksheet
    pub fn calculate(&mut self) -> Result<&Worksheet> {
        self.calculate_with_stats().map(|(sheet, _)| sheet)
    }

    /// Like [`calculate`](Self::calculate), also returning pass statistics
    pub fn calculate_with_stats(&mut self) -> Result<(&Worksheet, CalculationStats)> {
        let sheet = self.worksheet.as_mut().ok_or(Error::NotInitialized)?;
        let stats = CalculationEngine::new(self.options, &self.registry).calculate_all(sheet);
        Ok((&*sheet, stats))
    }
}
