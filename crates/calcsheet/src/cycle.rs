//! Circular reference handling
//!
//! Runs once per pass, after the dependency graph is built and before any
//! cell is scheduled. The graph it leaves behind is acyclic.

use std::collections::BTreeSet;

use calcsheet_core::{CellAddress, Worksheet};
use calcsheet_formula::DependencyGraph;
use log::{debug, warn};

/// What to do with formulas that sit on a circular reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Every cell on a cycle, and every cell depending on one, gets the
    /// `#REF!` marker instead of a value
    #[default]
    MarkErrors,
    /// Remove the first edge of each cycle until none is left; the cell that
    /// lost the edge reads whatever its reference holds at the time
    BreakEdge,
}

/// What cycle handling did to the graph and the worksheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycles found, each in edge order
    pub cycles: Vec<Vec<CellAddress>>,
    /// Cells set to `#REF!`
    pub errored: BTreeSet<CellAddress>,
    /// Edges removed, as `(precedent, dependent)`
    pub removed_edges: Vec<(CellAddress, CellAddress)>,
}

impl CycleReport {
    /// Distinct cells lying on any cycle
    pub fn cells_on_cycles(&self) -> BTreeSet<CellAddress> {
        self.cycles.iter().flatten().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Apply `policy` to every cycle in `graph`
pub fn resolve_cycles(
    graph: &mut DependencyGraph,
    sheet: &mut Worksheet,
    policy: CyclePolicy,
) -> CycleReport {
    match policy {
        CyclePolicy::MarkErrors => mark_errors(graph, sheet),
        CyclePolicy::BreakEdge => break_edges(graph),
    }
}

fn describe(cycle: &[CellAddress]) -> String {
    let mut names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}

fn mark_errors(graph: &mut DependencyGraph, sheet: &mut Worksheet) -> CycleReport {
    let cycles = graph.find_cycles();
    if cycles.is_empty() {
        return CycleReport::default();
    }

    let on_cycles: BTreeSet<CellAddress> = cycles.iter().flatten().copied().collect();
    let mut errored = graph.downstream_of(on_cycles.iter().copied());
    errored.extend(on_cycles);

    for cycle in &cycles {
        warn!("circular reference: {}", describe(cycle));
    }
    for &cell in &errored {
        sheet.mark_errored(cell);
        graph.remove_node(cell);
    }
    debug!(
        "{} cycle(s) found, {} cell(s) marked {}",
        cycles.len(),
        errored.len(),
        calcsheet_core::ERROR_MARKER
    );

    CycleReport {
        cycles,
        errored,
        removed_edges: Vec::new(),
    }
}

fn break_edges(graph: &mut DependencyGraph) -> CycleReport {
    let mut report = CycleReport::default();

    while let Some(cycle) = graph.find_cycles().into_iter().next() {
        let precedent = cycle[0];
        let dependent = cycle.get(1).copied().unwrap_or(precedent);
        warn!(
            "circular reference: {}; ignoring {} in {}",
            describe(&cycle),
            precedent,
            dependent
        );
        report.cycles.push(cycle);
        if !graph.remove_dependency(precedent, dependent) {
            break;
        }
        report.removed_edges.push((precedent, dependent));
    }

    report
}
