//! Dependency tracking for formula calculation
//!
//! Edges run from a precedent (a cell a formula reads) to its dependent (the
//! formula cell). Only formula cells are nodes; a literal precedent appears
//! as the source of an edge and nowhere else. Ordered maps keep every
//! traversal deterministic.

use std::collections::{BTreeMap, BTreeSet};

use calcsheet_core::{CellAddress, Worksheet};

use crate::reference::{scan_references, Reference, MAX_RANGE_CELLS};

/// Dependency graph for formula cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Formula cells
    nodes: BTreeSet<CellAddress>,
    /// Cell → cells that depend on it
    dependents: BTreeMap<CellAddress, BTreeSet<CellAddress>>,
    /// Cell → cells it depends on
    precedents: BTreeMap<CellAddress, BTreeSet<CellAddress>>,
}

/// One level of an explicit depth-first stack
struct Frame {
    node: CellAddress,
    children: Vec<CellAddress>,
    next: usize,
}

impl Frame {
    fn next_child(&mut self) -> Option<CellAddress> {
        let child = self.children.get(self.next).copied();
        self.next += 1;
        child
    }
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a formula cell
    pub fn add_node(&mut self, node: CellAddress) {
        self.nodes.insert(node);
    }

    /// Add a dependency: `dependent` reads `precedent`
    ///
    /// `dependent` becomes a node if it was not one already.
    pub fn add_dependency(&mut self, precedent: CellAddress, dependent: CellAddress) {
        self.nodes.insert(dependent);
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Remove one edge; returns whether it existed
    pub fn remove_dependency(&mut self, precedent: CellAddress, dependent: CellAddress) -> bool {
        let removed = self
            .dependents
            .get_mut(&precedent)
            .map_or(false, |set| set.remove(&dependent));
        if let Some(set) = self.precedents.get_mut(&dependent) {
            set.remove(&precedent);
        }
        removed
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, node: CellAddress) {
        self.nodes.remove(&node);

        if let Some(precedents) = self.precedents.remove(&node) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&node);
                }
            }
        }

        if let Some(dependents) = self.dependents.remove(&node) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(&node);
                }
            }
        }
    }

    /// Whether `node` is a formula cell in the graph
    pub fn contains(&self, node: CellAddress) -> bool {
        self.nodes.contains(&node)
    }

    /// Number of formula cells
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Formula cells in address order
    pub fn nodes(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.nodes.iter().copied()
    }

    /// Cells that read `cell`, in address order
    pub fn dependents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Cells that `cell` reads, in address order
    pub fn precedents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// All edges as `(precedent, dependent)`, sorted
    pub fn edges(&self) -> impl Iterator<Item = (CellAddress, CellAddress)> + '_ {
        self.dependents
            .iter()
            .flat_map(|(&from, set)| set.iter().map(move |&to| (from, to)))
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }

    fn frame(&self, node: CellAddress) -> Frame {
        Frame {
            node,
            children: self.dependents(node).collect(),
            next: 0,
        }
    }

    /// Every cycle reachable by a depth-first walk from the nodes in address
    /// order, one per back edge
    ///
    /// Each cycle lists its cells in edge order: every cell is read by the
    /// next one and the last is read by the first. A self-reference is a
    /// one-cell cycle.
    pub fn find_cycles(&self) -> Vec<Vec<CellAddress>> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();

        for &root in &self.nodes {
            if !visited.insert(root) {
                continue;
            }
            let mut path = vec![root];
            let mut on_path = BTreeSet::from([root]);
            let mut stack = vec![self.frame(root)];

            while let Some(frame) = stack.last_mut() {
                match frame.next_child() {
                    Some(child) if on_path.contains(&child) => {
                        if let Some(pos) = path.iter().position(|&cell| cell == child) {
                            cycles.push(path[pos..].to_vec());
                        }
                    }
                    Some(child) => {
                        if visited.insert(child) {
                            on_path.insert(child);
                            path.push(child);
                            stack.push(self.frame(child));
                        }
                    }
                    None => {
                        stack.pop();
                        if let Some(done) = path.pop() {
                            on_path.remove(&done);
                        }
                    }
                }
            }
        }

        cycles
    }

    /// Cells transitively reading any of `seeds`
    ///
    /// A seed is only included when it is reachable from another seed or
    /// from itself.
    pub fn downstream_of<I>(&self, seeds: I) -> BTreeSet<CellAddress>
    where
        I: IntoIterator<Item = CellAddress>,
    {
        let mut reached = BTreeSet::new();
        let mut queue: Vec<CellAddress> = seeds.into_iter().collect();
        while let Some(cell) = queue.pop() {
            for dependent in self.dependents(cell) {
                if reached.insert(dependent) {
                    queue.push(dependent);
                }
            }
        }
        reached
    }

    /// Formula cells ordered so that every cell comes after the cells it
    /// reads
    ///
    /// Depth-first post-order over dependents, reversed. Independent cells
    /// come out in address order. Edges closing a cycle are ignored, so the
    /// result is only meaningful on an acyclic graph.
    pub fn topological_order(&self) -> Vec<CellAddress> {
        let mut visited = BTreeSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for &root in self.nodes.iter().rev() {
            if !visited.insert(root) {
                continue;
            }
            let mut stack = vec![self.frame(root)];
            while let Some(frame) = stack.last_mut() {
                match frame.next_child() {
                    Some(child) => {
                        if visited.insert(child) {
                            stack.push(self.frame(child));
                        }
                    }
                    None => {
                        order.push(frame.node);
                        stack.pop();
                    }
                }
            }
        }

        order.reverse();
        order.retain(|cell| self.nodes.contains(cell));
        order
    }
}

/// Build the graph of every Pending formula cell in `sheet`
///
/// A range larger than [`MAX_RANGE_CELLS`] contributes only the cells of
/// `sheet` inside it; empty cells never change the order.
///
/// ```rust
/// use calcsheet_core::{Cell, CellAddress, Worksheet};
/// use calcsheet_formula::build_dependency_graph;
///
/// let sheet = Worksheet::from_entries([
///     ("A1", Cell::with_value(1.0)),
///     ("B1", Cell::with_formula("A1*2")),
///     ("C1", Cell::with_formula("B1+A1")),
/// ])
/// .unwrap();
///
/// let graph = build_dependency_graph(&sheet);
/// let order: Vec<String> = graph.topological_order().iter().map(|a| a.to_string()).collect();
/// assert_eq!(order, vec!["B1", "C1"]);
/// assert_eq!(graph.edge_count(), 3);
/// ```
pub fn build_dependency_graph(sheet: &Worksheet) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (cell, formula) in sheet.pending_cells() {
        graph.add_node(cell);
        for token in scan_references(formula) {
            match token.reference {
                Reference::Range(range) if range.cell_count() > MAX_RANGE_CELLS => {
                    for (precedent, _) in sheet.iter().filter(|(addr, _)| range.contains(addr)) {
                        graph.add_dependency(precedent, cell);
                    }
                }
                reference => {
                    for precedent in reference.addresses() {
                        graph.add_dependency(precedent, cell);
                    }
                }
            }
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcsheet_core::Cell;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn names(cells: impl IntoIterator<Item = CellAddress>) -> Vec<String> {
        cells.into_iter().map(|a| a.to_string()).collect()
    }

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (from, to) in edges {
            g.add_dependency(addr(from), addr(to));
        }
        g
    }

    #[test]
    fn test_add_dependency() {
        let g = graph(&[("A1", "B1")]);

        assert!(g.dependents(addr("A1")).any(|c| c == addr("B1")));
        assert!(g.precedents(addr("B1")).any(|c| c == addr("A1")));
        assert!(g.contains(addr("B1")));
        // Literal precedents are not nodes
        assert!(!g.contains(addr("A1")));
    }

    #[test]
    fn test_remove_dependency_and_node() {
        let mut g = graph(&[("A1", "B1"), ("B1", "C1"), ("A1", "C1")]);
        assert_eq!(g.edge_count(), 3);

        assert!(g.remove_dependency(addr("A1"), addr("C1")));
        assert!(!g.remove_dependency(addr("A1"), addr("C1")));
        assert_eq!(g.edge_count(), 2);

        g.remove_node(addr("B1"));
        assert_eq!(g.edge_count(), 0);
        assert_eq!(names(g.nodes()), vec!["C1"]);
        assert_eq!(g.precedents(addr("C1")).count(), 0);
    }

    #[test]
    fn test_topological_order() {
        // C1 reads B1, B1 reads A1, D1 reads nothing
        let mut g = graph(&[("B1", "C1"), ("A1", "B1")]);
        g.add_node(addr("A1"));
        g.add_node(addr("D1"));
        assert_eq!(names(g.topological_order()), vec!["A1", "B1", "C1", "D1"]);

        // A later row feeding an earlier one still comes first
        let g = graph(&[("A5", "A1"), ("Z9", "A5")]);
        assert_eq!(names(g.topological_order()), vec!["A5", "A1"]);
    }

    #[test]
    fn test_find_cycles() {
        let g = graph(&[("A1", "B1"), ("B1", "A1"), ("A1", "C1")]);
        assert_eq!(g.find_cycles(), vec![vec![addr("A1"), addr("B1")]]);

        let g = graph(&[("A1", "A1")]);
        assert_eq!(g.find_cycles(), vec![vec![addr("A1")]]);

        let g = graph(&[("A1", "B1"), ("B1", "C1")]);
        assert!(g.find_cycles().is_empty());
    }

    #[test]
    fn test_find_cycles_edge_order() {
        // A1 -> C1 -> B1 -> A1
        let g = graph(&[("A1", "C1"), ("C1", "B1"), ("B1", "A1")]);
        assert_eq!(names(g.find_cycles().concat()), vec!["A1", "C1", "B1"]);
    }

    #[test]
    fn test_downstream_of() {
        let g = graph(&[("A1", "B1"), ("B1", "C1"), ("X1", "Y1")]);
        assert_eq!(names(g.downstream_of([addr("A1")])), vec!["B1", "C1"]);
        assert!(g.downstream_of([addr("C1")]).is_empty());
    }

    #[test]
    fn test_build_from_worksheet() {
        let sheet = Worksheet::from_entries([
            ("A1", Cell::with_value(1.0)),
            ("A2", Cell::with_value(2.0)),
            ("B1", Cell::with_formula("SUM(A1:A2)")),
            ("B2", Cell::with_formula("B2+1")),
            ("C1", Cell::with_formula("\"A1\"")),
        ])
        .unwrap();

        let g = build_dependency_graph(&sheet);
        assert_eq!(names(g.nodes()), vec!["B1", "C1", "B2"]);
        assert_eq!(names(g.precedents(addr("B1"))), vec!["A1", "A2"]);
        assert_eq!(g.find_cycles(), vec![vec![addr("B2")]]);
        assert_eq!(g.precedents(addr("C1")).count(), 0);

        // Building twice gives the same graph
        assert_eq!(build_dependency_graph(&sheet), g);
    }

    #[test]
    fn test_large_range_uses_occupied_cells() {
        let sheet = Worksheet::from_entries([
            ("B7", Cell::with_value(1.0)),
            ("C900", Cell::with_formula("2")),
            ("AA1", Cell::with_formula("SUM(A1:Z1048576)")),
            ("AB1", Cell::with_value(3.0)),
        ])
        .unwrap();

        let g = build_dependency_graph(&sheet);
        assert_eq!(names(g.precedents(addr("AA1"))), vec!["B7", "C900"]);
        assert_eq!(names(g.topological_order()), vec!["C900", "AA1"]);
    }
}
