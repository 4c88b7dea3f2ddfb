//! Dependency graph resolution with deterministic cycle handling.
//!
//! An edge `A -> B` means "A depends on B": B is ordered before A. Resolution proceeds in
//! three steps:
//!
//! 1. Self-edges are dropped; they never block ordering.
//! 2. Each strongly connected component is examined. When its required edges alone connect
//!    every member, the component becomes a tied group sharing one rank. Otherwise a cycle
//!    made only of optional edges is located and its greatest `(from, to)` edge is removed,
//!    and the components are recomputed. A component that is neither (a cycle that mixes
//!    required and optional edges) is an error.
//! 3. The condensed graph is ordered with Kahn's algorithm, taking the ready group with the
//!    smallest name first.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("cycle mixing required and optional dependencies cannot be resolved: {}", nodes.join(", "))]
    UnresolvableCycle { nodes: Vec<String> },
    #[error("dependency order is incomplete: {ordered} of {total} nodes ordered")]
    Incomplete { ordered: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    pub is_required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    edges: BTreeMap<(String, String), EdgeData>,
}

/// The outcome of [`DependencyGraph::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Groups in dependency order (dependencies first). Singletons for ordinary nodes;
    /// tied groups list their members by name.
    pub groups: Vec<Vec<String>>,
    /// Optional edges removed to break cycles, in removal order.
    pub dropped_edges: Vec<(String, String)>,
}

impl Resolution {
    /// 1-based rank per node; members of a tied group share a rank.
    pub fn global_dependency_order(&self) -> BTreeMap<String, usize> {
        self.groups
            .iter()
            .enumerate()
            .flat_map(|(i, group)| group.iter().map(move |name| (name.clone(), i + 1)))
            .collect()
    }

    /// Every node, dependencies first.
    pub fn dependency_order(&self) -> Vec<String> {
        self.groups.iter().flatten().cloned().collect()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) {
        self.nodes.insert(name.to_string());
    }

    /// Adds `from -> to`. A repeated edge is required if any of its additions was.
    pub fn add_edge(&mut self, from: &str, to: &str, is_required: bool) {
        self.add_node(from);
        self.add_node(to);
        self.edges
            .entry((from.to_string(), to.to_string()))
            .and_modify(|e| e.is_required |= is_required)
            .or_insert(EdgeData { is_required });
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, EdgeData)> {
        self.edges
            .iter()
            .map(|((from, to), data)| (from.as_str(), to.as_str(), *data))
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.contains_key(&(from.to_string(), to.to_string()))
    }

    fn strongly_connected(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let index: BTreeMap<&str, NodeIndex> = self
            .nodes
            .iter()
            .map(|name| (name.as_str(), graph.add_node(name.as_str())))
            .collect();
        for (from, to) in self.edges.keys() {
            graph.add_edge(index[from.as_str()], index[to.as_str()], ());
        }
        tarjan_scc(&graph)
            .into_iter()
            .map(|component| {
                let mut names: Vec<String> =
                    component.into_iter().map(|ix| graph[ix].to_string()).collect();
                names.sort();
                names
            })
            .collect()
    }

    fn successors<'a>(
        &'a self,
        from: &'a str,
        within: &'a BTreeSet<String>,
        required_only: Option<bool>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .range((from.to_string(), String::new())..)
            .take_while(move |((f, _), _)| f == from)
            .filter(move |((_, to), data)| {
                within.contains(to) && required_only.map_or(true, |r| data.is_required == r)
            })
            .map(|((_, to), _)| to.as_str())
    }

    /// Whether the edges of the given kind connect every member of the component.
    fn is_strongly_connected_by(&self, component: &BTreeSet<String>, required: bool) -> bool {
        let Some(start) = component.iter().next() else {
            return true;
        };
        let reach = |forward: bool| {
            let mut seen = BTreeSet::from([start.clone()]);
            let mut stack = vec![start.clone()];
            while let Some(node) = stack.pop() {
                let next: Vec<String> = if forward {
                    self.successors(&node, component, Some(required))
                        .map(str::to_string)
                        .collect()
                } else {
                    self.edges
                        .iter()
                        .filter(|((f, t), d)| {
                            t == &node && component.contains(f) && d.is_required == required
                        })
                        .map(|((f, _), _)| f.clone())
                        .collect()
                };
                for n in next {
                    if seen.insert(n.clone()) {
                        stack.push(n);
                    }
                }
            }
            seen.len() == component.len()
        };
        reach(true) && reach(false)
    }

    /// A cycle of optional edges inside the component, found by depth-first search from the
    /// smallest member with successors visited in name order.
    fn find_optional_cycle(&self, component: &BTreeSet<String>) -> Option<Vec<(String, String)>> {
        fn visit(
            graph: &DependencyGraph,
            node: &str,
            component: &BTreeSet<String>,
            stack: &mut Vec<String>,
            done: &mut BTreeSet<String>,
        ) -> Option<Vec<(String, String)>> {
            stack.push(node.to_string());
            for next in graph.successors(node, component, Some(false)) {
                if let Some(pos) = stack.iter().position(|n| n == next) {
                    let mut cycle: Vec<(String, String)> = stack[pos..]
                        .windows(2)
                        .map(|w| (w[0].clone(), w[1].clone()))
                        .collect();
                    cycle.push((node.to_string(), next.to_string()));
                    return Some(cycle);
                }
                if done.contains(next) {
                    continue;
                }
                if let Some(cycle) = visit(graph, next, component, stack, done) {
                    return Some(cycle);
                }
            }
            stack.pop();
            done.insert(node.to_string());
            None
        }

        let mut done = BTreeSet::new();
        for start in component {
            if done.contains(start) {
                continue;
            }
            let mut stack = Vec::new();
            if let Some(cycle) = visit(self, start, component, &mut stack, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    /// Breaks optional cycles and orders the graph. See the module documentation.
    pub fn resolve(&self) -> Result<Resolution, GraphError> {
        let mut working = self.clone();
        working.edges.retain(|(from, to), _| from != to);
        let mut dropped_edges = Vec::new();

        let components = loop {
            let components = working.strongly_connected();
            let mut broke_edge = false;
            for component in components.iter().filter(|c| c.len() > 1) {
                let members: BTreeSet<String> = component.iter().cloned().collect();
                if working.is_strongly_connected_by(&members, true) {
                    continue;
                }
                let Some(cycle) = working.find_optional_cycle(&members) else {
                    return Err(GraphError::UnresolvableCycle {
                        nodes: component.clone(),
                    });
                };
                if let Some(edge) = cycle.into_iter().max() {
                    tracing::debug!(from = %edge.0, to = %edge.1, "dropping optional edge to break cycle");
                    working.edges.remove(&edge);
                    dropped_edges.push(edge);
                    broke_edge = true;
                    break;
                }
            }
            if !broke_edge {
                break components;
            }
        };

        // Condense into groups and order them, dependencies first.
        let mut group_of: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, component) in components.iter().enumerate() {
            for name in component {
                group_of.insert(name.as_str(), i);
            }
        }
        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
        let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
        for (from, to) in working.edges.keys() {
            let (f, t) = (group_of[from.as_str()], group_of[to.as_str()]);
            if f != t {
                dependencies[f].insert(t);
                dependents[t].insert(f);
            }
        }

        let mut remaining: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
        let mut ready: BinaryHeap<Reverse<(&str, usize)>> = remaining
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(i, _)| Reverse((components[i][0].as_str(), i)))
            .collect();
        let mut groups = Vec::with_capacity(components.len());
        while let Some(Reverse((_, i))) = ready.pop() {
            groups.push(components[i].clone());
            for &dependent in &dependents[i] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.push(Reverse((components[dependent][0].as_str(), dependent)));
                }
            }
        }

        if groups.len() != components.len() {
            return Err(GraphError::Incomplete {
                ordered: groups.len(),
                total: components.len(),
            });
        }
        Ok(Resolution {
            groups,
            dropped_edges,
        })
    }
}

/// Dependents-first order: every node precedes the nodes it depends on.
pub fn sort_graph(graph: &DependencyGraph) -> Result<Vec<String>, GraphError> {
    let mut order = graph.resolve()?.dependency_order();
    order.reverse();
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.add_edge("B", "C", false);
        graph.add_edge("A", "C", false);
        graph.add_edge("A", "B", false);
        graph
    }

    #[test]
    fn sorts_graph_without_cycles() {
        assert_eq!(sort_graph(&base_graph()).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn reflexive_edge_never_blocks() {
        let mut graph = base_graph();
        graph.add_edge("C", "D", false);
        graph.add_edge("D", "D", true);
        assert_eq!(sort_graph(&graph).unwrap(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn symmetric_required_cycle_is_a_tied_group() {
        let mut graph = base_graph();
        graph.add_edge("C", "D", false);
        graph.add_edge("D", "E", true);
        graph.add_edge("E", "D", true);

        assert_eq!(sort_graph(&graph).unwrap(), vec!["A", "B", "C", "E", "D"]);

        let ranks = graph.resolve().unwrap().global_dependency_order();
        assert_eq!(ranks["D"], ranks["E"]);
        assert_eq!(ranks["D"], 1);
        assert_eq!(ranks["C"], 2);
        assert_eq!(ranks["A"], 4);
    }

    /// The tied group D, E, F is listed by name, so dependents-first order ends `F, E, D`
    /// rather than in the order the cycle was discovered.
    #[test]
    fn extended_required_cycle_is_grouped_by_name() {
        let mut graph = base_graph();
        graph.add_edge("C", "D", false);
        graph.add_edge("D", "E", true);
        graph.add_edge("E", "F", true);
        graph.add_edge("F", "D", true);

        let resolution = graph.resolve().unwrap();
        assert_eq!(resolution.groups[0], vec!["D", "E", "F"]);
        assert!(resolution.dropped_edges.is_empty());
        assert_eq!(
            sort_graph(&graph).unwrap(),
            vec!["A", "B", "C", "F", "E", "D"]
        );
    }

    #[test]
    fn optional_cycles_are_broken_into_a_strict_order() {
        let mut graph = base_graph();
        graph.add_edge("C", "D", false);
        graph.add_edge("D", "D", false);
        graph.add_edge("D", "E", false);
        graph.add_edge("E", "F", false);
        graph.add_edge("F", "E", false);
        graph.add_edge("F", "G", false);
        graph.add_edge("G", "H", false);
        graph.add_edge("H", "I", false);
        graph.add_edge("I", "G", false);

        let resolution = graph.resolve().unwrap();
        assert_eq!(
            resolution.dropped_edges,
            vec![
                ("F".to_string(), "E".to_string()),
                ("I".to_string(), "G".to_string())
            ]
        );
        assert!(resolution.groups.iter().all(|g| g.len() == 1));
        assert_eq!(
            sort_graph(&graph).unwrap(),
            vec!["A", "B", "C", "D", "E", "F", "G", "H", "I"]
        );
    }

    #[test]
    fn three_node_optional_cycle_drops_exactly_one_edge() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("X", "Y", false);
        graph.add_edge("Y", "Z", false);
        graph.add_edge("Z", "X", false);

        let resolution = graph.resolve().unwrap();
        assert_eq!(resolution.dropped_edges.len(), 1);
        assert_eq!(resolution.dependency_order(), vec!["Z", "Y", "X"]);
    }

    #[test]
    fn mixed_cycle_is_surfaced_as_an_error() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("X", "Y", true);
        graph.add_edge("Y", "X", false);
        let err = graph.resolve().unwrap_err();
        assert_eq!(
            err,
            GraphError::UnresolvableCycle {
                nodes: vec!["X".to_string(), "Y".to_string()]
            }
        );
    }

    #[test]
    fn isolated_nodes_are_ordered_by_name() {
        let mut graph = DependencyGraph::new();
        graph.add_node("Beta");
        graph.add_node("Alpha");
        let resolution = graph.resolve().unwrap();
        assert_eq!(resolution.dependency_order(), vec!["Alpha", "Beta"]);
        assert_eq!(resolution.global_dependency_order()["Beta"], 2);
    }

    fn arb_edges() -> impl Strategy<Value = Vec<(u8, u8, bool)>> {
        prop::collection::vec((0u8..8, 0u8..8, any::<bool>()), 0..24)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn all_optional_graphs_always_resolve_strictly(edges in prop::collection::vec((0u8..8, 0u8..8), 0..24)) {
            let mut graph = DependencyGraph::new();
            for (from, to) in &edges {
                graph.add_edge(&format!("N{from}"), &format!("N{to}"), false);
            }
            let resolution = graph.resolve().unwrap();
            prop_assert!(resolution.groups.iter().all(|g| g.len() == 1));
            prop_assert_eq!(resolution.dependency_order().len(), graph.nodes().count());
        }

        #[test]
        fn kept_edges_are_respected_and_resolution_is_deterministic(edges in arb_edges()) {
            let mut graph = DependencyGraph::new();
            for (from, to, required) in &edges {
                graph.add_edge(&format!("N{from}"), &format!("N{to}"), *required);
            }
            let first = graph.resolve();
            prop_assert_eq!(&first, &graph.resolve());

            if let Ok(resolution) = first {
                let ranks = resolution.global_dependency_order();
                let dropped: BTreeSet<_> = resolution.dropped_edges.iter().cloned().collect();
                for (from, to, _) in graph.edges() {
                    if from == to || dropped.contains(&(from.to_string(), to.to_string())) {
                        continue;
                    }
                    prop_assert!(ranks[to] <= ranks[from], "{} -> {} violated", from, to);
                    if ranks[to] == ranks[from] {
                        let group = resolution.groups.iter().find(|g| g.iter().any(|n| n == from)).unwrap();
                        prop_assert!(group.len() > 1);
                    }
                }
            }
        }
    }
}
