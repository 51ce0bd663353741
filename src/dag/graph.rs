//! petgraph-based dependency graph for the tasks of one DAG template.
//!
//! Edges point from a dependency to its dependent, so the ancestors of a
//! task are the nodes reachable against edge direction.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

pub struct TaskGraph {
    pub graph: DiGraph<String, ()>,
    pub node_indices: HashMap<String, NodeIndex>,
    // Dependencies per node, in declaration order. petgraph yields
    // neighbors newest-first, which would make cycle paths order-dependent.
    deps: Vec<Vec<NodeIndex>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Initial,
    Visiting,
    Visited,
}

impl TaskGraph {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        for name in names {
            if node_indices.contains_key(name) {
                continue;
            }
            let idx = graph.add_node(name.to_string());
            node_indices.insert(name.to_string(), idx);
        }
        let deps = vec![Vec::new(); graph.node_count()];
        TaskGraph {
            graph,
            node_indices,
            deps,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Record that `task` depends on `dependency`. Returns false when either is unknown.
    pub fn add_dependency(&mut self, task: &str, dependency: &str) -> bool {
        let (Some(&t), Some(&d)) = (
            self.node_indices.get(task),
            self.node_indices.get(dependency),
        ) else {
            return false;
        };
        if self.deps[t.index()].contains(&d) {
            return true;
        }
        self.graph.add_edge(d, t, ());
        self.deps[t.index()].push(d);
        true
    }

    /// Find a dependency cycle by depth-first visitation in declaration order.
    ///
    /// The returned path starts and ends with the same task, e.g. `[A, C, A]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        if toposort(&self.graph, None).is_ok() {
            return None;
        }
        let mut state = vec![Visit::Initial; self.graph.node_count()];
        // (node, index of the next dependency to follow)
        let mut stack: Vec<(NodeIndex, usize)> = Vec::new();
        for root in self.graph.node_indices() {
            if state[root.index()] != Visit::Initial {
                continue;
            }
            state[root.index()] = Visit::Visiting;
            stack.push((root, 0));
            while let Some(top) = stack.last_mut() {
                let (node, next) = *top;
                let Some(&dep) = self.deps[node.index()].get(next) else {
                    state[node.index()] = Visit::Visited;
                    stack.pop();
                    continue;
                };
                top.1 += 1;
                match state[dep.index()] {
                    Visit::Visiting => {
                        let start = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..]
                            .iter()
                            .map(|&(n, _)| self.graph[n].clone())
                            .collect();
                        cycle.push(self.graph[dep].clone());
                        return Some(cycle);
                    }
                    Visit::Initial => {
                        state[dep.index()] = Visit::Visiting;
                        stack.push((dep, 0));
                    }
                    Visit::Visited => {}
                }
            }
        }
        None
    }

    /// Transitive dependencies of `task`, in declaration order.
    pub fn ancestors(&self, task: &str) -> Vec<&str> {
        let Some(&start) = self.node_indices.get(task) else {
            return vec![];
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(n) = dfs.next(reversed) {
            if n != start {
                found.push(n);
            }
        }
        found.sort_by_key(|n| n.index());
        found.into_iter().map(|n| self.graph[n].as_str()).collect()
    }
}
