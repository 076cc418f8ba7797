//! Worksheet calculation engine
//!
//! One pass over a worksheet:
//!
//! 1. Build the dependency graph of every Pending formula cell.
//! 2. Handle circular references according to the [`CyclePolicy`].
//! 3. Schedule the remaining cells and evaluate each one: translate the
//!    formula against the current values, parse, evaluate and store.
//!
//! A cell that fails at any step keeps its formula and stays Pending with
//! no value; the failure is logged and the pass moves on.

use calcsheet_core::{CellAddress, CellValue, Worksheet};
use calcsheet_formula::expr::{evaluate, parse_expression, FunctionRegistry, Value};
use calcsheet_formula::{
    build_dependency_graph, FormulaResult, FormulaTranslator, UnresolvedReferencePolicy,
};
use log::{debug, warn};

use crate::cycle::{resolve_cycles, CyclePolicy};
use crate::schedule::{self, ScheduleStrategy};

/// Options for worksheet calculation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalculationOptions {
    /// Treatment of circular references (default: mark them `#REF!`)
    pub cycle_policy: CyclePolicy,
    /// Evaluation order (default: topological)
    pub schedule: ScheduleStrategy,
    /// Treatment of references to empty cells (default: zero)
    pub unresolved: UnresolvedReferencePolicy,
}

impl CalculationOptions {
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleStrategy) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_unresolved(mut self, unresolved: UnresolvedReferencePolicy) -> Self {
        self.unresolved = unresolved;
        self
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Formula cells Pending at the start of the pass
    pub formula_count: usize,
    /// Cells that received a value
    pub cells_calculated: usize,
    /// Distinct cells lying on a circular reference
    pub circular_references: usize,
    /// Cells set to `#REF!`
    pub cells_errored: usize,
    /// Dependencies ignored to break cycles
    pub edges_removed: usize,
    /// Formula cells left Pending
    pub errors: usize,
    /// Scheduler passes
    pub sweeps: usize,
    /// Whether the scheduler finished before its sweep cap
    pub converged: bool,
}

/// The calculation engine
pub(crate) struct CalculationEngine<'a> {
    options: CalculationOptions,
    registry: &'a FunctionRegistry,
    translator: FormulaTranslator,
}

impl<'a> CalculationEngine<'a> {
    pub(crate) fn new(options: CalculationOptions, registry: &'a FunctionRegistry) -> Self {
        Self {
            options,
            registry,
            translator: FormulaTranslator::new(options.unresolved),
        }
    }

    /// Calculate all formulas in the worksheet
    pub(crate) fn calculate_all(&self, sheet: &mut Worksheet) -> CalculationStats {
        let mut stats = CalculationStats {
            converged: true,
            ..CalculationStats::default()
        };

        // Phase 1: Collect formulas into the dependency graph
        let mut graph = build_dependency_graph(sheet);
        stats.formula_count = graph.len();
        if stats.formula_count == 0 {
            return stats;
        }
        debug!(
            "calculating {} formula cell(s), {} dependencies",
            stats.formula_count,
            graph.edge_count()
        );

        // Phase 2: Circular references
        let report = resolve_cycles(&mut graph, sheet, self.options.cycle_policy);
        stats.circular_references = report.cells_on_cycles().len();
        stats.cells_errored = report.errored.len();
        stats.edges_removed = report.removed_edges.len();

        // Phase 3: Evaluate in schedule order
        let outcome = schedule::run(self.options.schedule, &graph, |cell| {
            self.calculate_cell(sheet, cell)
        });
        // A cell that did not settle keeps its formula, not a stale value
        for &cell in &outcome.unsettled {
            sheet.clear_value(cell);
        }

        stats.cells_calculated = outcome.settled;
        stats.errors = outcome.unsettled.len();
        stats.sweeps = outcome.sweeps;
        stats.converged = outcome.converged;

        debug!(
            "calculated {} of {} formula cell(s), {} left pending",
            stats.cells_calculated, stats.formula_count, stats.errors
        );
        stats
    }

    /// Evaluate one cell and store its value; returns whether it settled
    fn calculate_cell(&self, sheet: &mut Worksheet, cell: CellAddress) -> bool {
        let Some(formula) = sheet.formula_at(cell).map(str::to_owned) else {
            return false;
        };

        match self.evaluate_formula(&formula, sheet) {
            Ok(Value::Absent) => {
                debug!("{}: `{}` found no value", cell, formula);
                false
            }
            Ok(value) => match value.into_cell_value() {
                Some(value) => {
                    sheet.settle(cell, normalize(value));
                    true
                }
                None => {
                    warn!("{}: `{}` produced an array, not a single value", cell, formula);
                    false
                }
            },
            Err(e) if e.is_lookup_miss() => {
                debug!("{}: `{}`: {}", cell, formula, e);
                false
            }
            Err(e) => {
                warn!("{}: `{}`: {}", cell, formula, e);
                false
            }
        }
    }

    fn evaluate_formula(&self, formula: &str, sheet: &Worksheet) -> FormulaResult<Value> {
        let text = self.translator.translate(formula, sheet)?;
        let expr = parse_expression(&text)?;
        evaluate(&expr, self.registry)
    }
}

/// Fold negative zero into zero
fn normalize(value: CellValue) -> CellValue {
    match value {
        CellValue::Number(n) if n == 0.0 => CellValue::Number(0.0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcsheet_core::{Cell, CellState};
    use pretty_assertions::assert_eq;

    fn calculate(sheet: &mut Worksheet, options: CalculationOptions) -> CalculationStats {
        let registry = FunctionRegistry::new();
        CalculationEngine::new(options, &registry).calculate_all(sheet)
    }

    #[test]
    fn test_simple_calculation() {
        let mut sheet = Worksheet::from_entries([
            ("A1", Cell::with_value(10.0)),
            ("A2", Cell::with_value(20.0)),
            ("A3", Cell::with_formula("=A1+A2")),
        ])
        .unwrap();

        let stats = calculate(&mut sheet, CalculationOptions::default());

        assert_eq!(sheet.value("A3"), Some(&CellValue::Number(30.0)));
        assert_eq!(sheet.formula("A3"), None);
        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
    }

    #[test]
    fn test_chain_calculation() {
        // Written in reverse so address order differs from dependency order
        let mut sheet = Worksheet::from_entries([
            ("A1", Cell::with_formula("A2*2")),
            ("A2", Cell::with_formula("A3+1")),
            ("A3", Cell::with_value(4.0)),
        ])
        .unwrap();

        calculate(&mut sheet, CalculationOptions::default());

        assert_eq!(sheet.value("A2"), Some(&CellValue::Number(5.0)));
        assert_eq!(sheet.value("A1"), Some(&CellValue::Number(10.0)));
    }

    #[test]
    fn test_circular_reference_detection() {
        let mut sheet = Worksheet::from_entries([
            ("A1", Cell::with_formula("B1")),
            ("B1", Cell::with_formula("A1")),
        ])
        .unwrap();

        let stats = calculate(&mut sheet, CalculationOptions::default());

        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.cells_errored, 2);
        assert_eq!(sheet.state("A1"), CellState::Errored);
        assert_eq!(sheet.state("B1"), CellState::Errored);
    }

    #[test]
    fn test_failures_stay_pending() {
        let mut sheet = Worksheet::from_entries([
            ("A1", Cell::with_formula("NOPE(1)")),
            ("A2", Cell::with_formula("A1+1")),
            ("A3", Cell::with_formula("1+")),
        ])
        .unwrap();

        let stats = calculate(&mut sheet, CalculationOptions::default());

        assert_eq!(stats.cells_calculated, 0);
        assert_eq!(stats.errors, 3);
        assert_eq!(sheet.state("A1"), CellState::Pending("NOPE(1)"));
        assert_eq!(sheet.state("A2"), CellState::Pending("A1+1"));
    }

    #[test]
    fn test_unsettled_cells_lose_cached_values() {
        let mut sheet = Worksheet::from_entries([
            ("A1", Cell::with_cached("NOPE(1)", 5.0)),
            ("A2", Cell::with_cached("A1+1", 6.0)),
            ("A3", Cell::with_cached("2*3", 1.0)),
        ])
        .unwrap();

        let stats = calculate(&mut sheet, CalculationOptions::default());

        assert_eq!(stats.errors, 2);
        assert_eq!(sheet.cell("A1"), Some(&Cell::with_formula("NOPE(1)")));
        assert_eq!(sheet.cell("A2"), Some(&Cell::with_formula("A1+1")));
        assert_eq!(sheet.cell("A3"), Some(&Cell::with_value(6.0)));
    }

    #[test]
    fn test_negative_zero_normalized() {
        let mut sheet = Worksheet::from_entries([("A1", Cell::with_formula("-0"))]).unwrap();
        calculate(&mut sheet, CalculationOptions::default());
        match sheet.value("A1") {
            Some(CellValue::Number(n)) => assert!(n.is_sign_positive()),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_no_formulas() {
        let mut sheet = Worksheet::from_entries([("A1", Cell::with_value(1.0))]).unwrap();
        let before = sheet.clone();
        let stats = calculate(&mut sheet, CalculationOptions::default());
        assert_eq!(stats.formula_count, 0);
        assert_eq!(sheet, before);
    }
}
