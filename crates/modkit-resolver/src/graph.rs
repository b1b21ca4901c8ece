//! Install-order graph over the selected change-set.
//!
//! Nodes are package identifiers; an edge runs from a prerequisite to the
//! package that depends on it. The topological order places every package
//! after all of its prerequisites, breaking ties by identifier so output
//! is deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

#[derive(Debug, Default)]
pub struct InstallGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl InstallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or retrieve a node for the identifier.
    pub fn add_node(&mut self, identifier: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(identifier) {
            return idx;
        }
        let idx = self.graph.add_node(identifier.to_string());
        self.index.insert(identifier.to_string(), idx);
        idx
    }

    /// Record that `prerequisite` must be installed before `dependent`.
    /// Self-edges and duplicates are ignored.
    pub fn add_edge(&mut self, prerequisite: &str, dependent: &str) {
        if prerequisite == dependent {
            return;
        }
        let from = self.add_node(prerequisite);
        let to = self.add_node(dependent);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Kahn's algorithm with an ordered ready set: among all nodes whose
    /// prerequisites are placed, the smallest identifier goes first. Nodes
    /// left over by a dependency cycle are appended in identifier order.
    pub fn topo_order(&self) -> Vec<String> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for idx in self.graph.node_indices() {
            let degree = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .count();
            in_degree.insert(self.graph[idx].as_str(), degree);
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(&id) = ready.iter().next() {
            ready.remove(id);
            order.push(id.to_string());
            let idx = self.index[id];
            for succ in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                let succ_id = self.graph[succ].as_str();
                let degree = in_degree.get_mut(succ_id).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(succ_id);
                }
            }
        }

        if order.len() < self.graph.node_count() {
            // Cycle: emit the remainder deterministically.
            tracing::warn!("dependency cycle detected; falling back to identifier order");
            let placed: BTreeSet<String> = order.iter().cloned().collect();
            for (id, _) in in_degree {
                if !placed.contains(id) {
                    order.push(id.to_string());
                }
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerequisites_come_first() {
        let mut g = InstallGraph::new();
        g.add_edge("ModB", "ModA"); // A depends on B
        let order = g.topo_order();
        assert_eq!(order, vec!["ModB", "ModA"]);
    }

    #[test]
    fn ties_broken_by_identifier() {
        let mut g = InstallGraph::new();
        g.add_node("ModC");
        g.add_node("ModA");
        g.add_node("ModB");
        assert_eq!(g.topo_order(), vec!["ModA", "ModB", "ModC"]);
    }

    #[test]
    fn diamond_is_ordered() {
        let mut g = InstallGraph::new();
        // ModD is required by ModB and ModC, both required by ModA.
        g.add_edge("ModD", "ModB");
        g.add_edge("ModD", "ModC");
        g.add_edge("ModB", "ModA");
        g.add_edge("ModC", "ModA");
        assert_eq!(g.topo_order(), vec!["ModD", "ModB", "ModC", "ModA"]);
    }

    #[test]
    fn cycle_falls_back_deterministically() {
        let mut g = InstallGraph::new();
        g.add_edge("ModA", "ModB");
        g.add_edge("ModB", "ModA");
        g.add_edge("ModA", "ModC");
        let order = g.topo_order();
        assert_eq!(order.len(), 3);
        // ModC is reachable only after the cycle members are appended.
        assert_eq!(order, vec!["ModA", "ModB", "ModC"]);
    }

    #[test]
    fn duplicate_edges_ignored() {
        let mut g = InstallGraph::new();
        g.add_edge("ModB", "ModA");
        g.add_edge("ModB", "ModA");
        g.add_edge("ModA", "ModA");
        assert_eq!(g.len(), 2);
        assert_eq!(g.topo_order(), vec!["ModB", "ModA"]);
    }
}
