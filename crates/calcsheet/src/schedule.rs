//! Evaluation scheduling
//!
//! Decides the order in which formula cells are handed to the evaluator. A
//! cell is ready once none of the formula cells it reads is still waiting;
//! a cell whose evaluation fails keeps waiting, and so does everything that
//! reads it.

use std::collections::BTreeSet;

use calcsheet_core::CellAddress;
use calcsheet_formula::DependencyGraph;
use log::{debug, warn};

/// Sweep cap used by [`ScheduleStrategy::fixed_point`]
pub const DEFAULT_MAX_SWEEPS: usize = 10;

/// How formula cells are ordered for evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleStrategy {
    /// One pass in dependency order
    #[default]
    Topological,
    /// Repeated sweeps in address order until nothing changes
    FixedPoint {
        /// Upper bound on sweeps
        max_sweeps: usize,
    },
}

impl ScheduleStrategy {
    /// Fixed-point sweeping with the default cap
    pub fn fixed_point() -> Self {
        ScheduleStrategy::FixedPoint {
            max_sweeps: DEFAULT_MAX_SWEEPS,
        }
    }
}

/// Outcome of a scheduling run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Passes over the cells (always 1 for topological order)
    pub sweeps: usize,
    /// Cells settled
    pub settled: usize,
    /// Cells still waiting at the end, in address order
    pub unsettled: Vec<CellAddress>,
    /// `false` when a fixed-point run stopped at its cap while still making
    /// progress
    pub converged: bool,
}

/// Hand every node of `graph` to `evaluate` in `strategy` order
///
/// `evaluate` returns whether the cell settled. The graph must be acyclic.
pub fn run<F>(strategy: ScheduleStrategy, graph: &DependencyGraph, evaluate: F) -> ScheduleReport
where
    F: FnMut(CellAddress) -> bool,
{
    match strategy {
        ScheduleStrategy::Topological => run_topological(graph, evaluate),
        ScheduleStrategy::FixedPoint { max_sweeps } => {
            run_fixed_point(graph, max_sweeps, evaluate)
        }
    }
}

fn is_ready(graph: &DependencyGraph, waiting: &BTreeSet<CellAddress>, cell: CellAddress) -> bool {
    graph.precedents(cell).all(|p| !waiting.contains(&p))
}

fn run_topological<F>(graph: &DependencyGraph, mut evaluate: F) -> ScheduleReport
where
    F: FnMut(CellAddress) -> bool,
{
    let mut waiting: BTreeSet<CellAddress> = graph.nodes().collect();
    let mut settled = 0;

    for cell in graph.topological_order() {
        if is_ready(graph, &waiting, cell) && evaluate(cell) {
            waiting.remove(&cell);
            settled += 1;
        }
    }

    ScheduleReport {
        sweeps: 1,
        settled,
        unsettled: waiting.into_iter().collect(),
        converged: true,
    }
}

fn run_fixed_point<F>(graph: &DependencyGraph, max_sweeps: usize, mut evaluate: F) -> ScheduleReport
where
    F: FnMut(CellAddress) -> bool,
{
    let mut waiting: BTreeSet<CellAddress> = graph.nodes().collect();
    let mut report = ScheduleReport {
        converged: true,
        ..ScheduleReport::default()
    };
    let mut progressed = true;

    while progressed && !waiting.is_empty() {
        if report.sweeps == max_sweeps {
            report.converged = false;
            break;
        }
        report.sweeps += 1;
        progressed = false;

        let candidates: Vec<CellAddress> = waiting.iter().copied().collect();
        for cell in candidates {
            if is_ready(graph, &waiting, cell) && evaluate(cell) {
                waiting.remove(&cell);
                report.settled += 1;
                progressed = true;
            }
        }
        debug!(
            "sweep {}: {} cell(s) still waiting",
            report.sweeps,
            waiting.len()
        );
    }

    if !report.converged {
        warn!(
            "stopped after {} sweep(s) with {} formula cell(s) unsettled",
            max_sweeps,
            waiting.len()
        );
    }

    report.unsettled = waiting.into_iter().collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    /// A1 reads B1, B1 reads C1, C1 reads nothing
    fn chain() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(addr("B1"), addr("A1"));
        graph.add_dependency(addr("C1"), addr("B1"));
        graph.add_node(addr("C1"));
        graph
    }

    fn order_of(
        strategy: ScheduleStrategy,
        graph: &DependencyGraph,
    ) -> (Vec<CellAddress>, ScheduleReport) {
        let mut seen = Vec::new();
        let report = run(strategy, graph, |cell| {
            seen.push(cell);
            true
        });
        (seen, report)
    }

    #[test]
    fn test_topological() {
        let (seen, report) = order_of(ScheduleStrategy::Topological, &chain());
        assert_eq!(seen, vec![addr("C1"), addr("B1"), addr("A1")]);
        assert_eq!(report.settled, 3);
        assert_eq!(report.sweeps, 1);
        assert!(report.unsettled.is_empty());
    }

    #[test]
    fn test_fixed_point() {
        let (seen, report) = order_of(ScheduleStrategy::fixed_point(), &chain());
        assert_eq!(seen, vec![addr("C1"), addr("B1"), addr("A1")]);
        // One sweep per link of the reversed chain
        assert_eq!(report.sweeps, 3);
        assert!(report.converged);
    }

    #[test]
    fn test_fixed_point_cap() {
        let (_, report) = order_of(ScheduleStrategy::FixedPoint { max_sweeps: 2 }, &chain());
        assert_eq!(report.settled, 2);
        assert_eq!(report.unsettled, vec![addr("A1")]);
        assert!(!report.converged);
    }

    #[test]
    fn test_failure_blocks_dependents() {
        for strategy in [ScheduleStrategy::Topological, ScheduleStrategy::fixed_point()] {
            let mut seen = Vec::new();
            let report = run(strategy, &chain(), |cell| {
                seen.push(cell);
                cell != addr("C1")
            });
            assert_eq!(report.settled, 0, "{:?}", strategy);
            assert_eq!(report.unsettled, vec![addr("A1"), addr("B1"), addr("C1")]);
            assert!(seen.iter().all(|&c| c == addr("C1")));
        }
    }
}
