//! Dependency graph over migration units and deterministic ordering

use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// A directed acyclic graph of migration dependencies.
///
/// Nodes live in an arena indexed by identity. Edges point from a dependency
/// to its dependent, so a topological walk yields dependencies first.
/// Declared dependencies that are not part of the graph are kept aside as
/// external dependencies; whether they are satisfied is up to the caller.
#[derive(Debug)]
pub struct MigrationDag {
    graph: DiGraph<MigrationId, ()>,
    node_map: HashMap<MigrationId, NodeIndex>,
    external: HashMap<MigrationId, Vec<MigrationId>>,
    order: Vec<MigrationId>,
}

impl MigrationDag {
    /// Build the DAG from `(identity, dependencies)` pairs and compute the
    /// up-order.
    pub fn build<'a, I>(units: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a MigrationId, &'a [MigrationId])>,
    {
        let units: Vec<(&MigrationId, &[MigrationId])> = units.into_iter().collect();
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for (id, _) in &units {
            if !node_map.contains_key(*id) {
                let idx = graph.add_node((*id).clone());
                node_map.insert((*id).clone(), idx);
            }
        }

        let mut external: HashMap<MigrationId, Vec<MigrationId>> = HashMap::new();
        for (id, deps) in &units {
            let to_idx = node_map[*id];
            for dep in deps.iter() {
                match node_map.get(dep) {
                    Some(&from_idx) => {
                        graph.update_edge(from_idx, to_idx, ());
                    }
                    None => external.entry((*id).clone()).or_default().push(dep.clone()),
                }
            }
        }

        let mut dag = Self {
            graph,
            node_map,
            external,
            order: Vec::new(),
        };
        dag.order = dag.compute_up_order()?;
        Ok(dag)
    }

    /// Kahn's algorithm; among ready nodes the smallest identity (timestamp,
    /// then identity) goes first.
    fn compute_up_order(&self) -> CoreResult<Vec<MigrationId>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self.graph.edges_directed(idx, Direction::Incoming).count();
                (idx, degree)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(&MigrationId, NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&idx, _)| Reverse((&self.graph[idx], idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((id, idx))) = ready.pop() {
            order.push(id.clone());
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                if let Some(degree) = in_degree.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((&self.graph[target], target)));
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(CoreError::CyclicDependency {
                cycle: self.find_cycle(),
            });
        }
        Ok(order)
    }

    /// Find one cycle for error reporting, written in "depends on" direction
    /// and closed on its first element (`a -> b -> a`).
    fn find_cycle(&self) -> Vec<String> {
        let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();
        for scc in &mut components {
            scc.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        }
        components.sort_by(|a, b| self.graph[a[0]].cmp(&self.graph[b[0]]));

        let Some(scc) = components.first() else {
            return Vec::new();
        };
        let start = scc[0];
        if self.graph.contains_edge(start, start) {
            let name = self.graph[start].to_string();
            return vec![name.clone(), name];
        }

        // BFS over "depends on" edges inside the component back to `start`.
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut closing = None;
        'search: while let Some(current) = queue.pop_front() {
            let mut deps: Vec<NodeIndex> = self
                .graph
                .edges_directed(current, Direction::Incoming)
                .map(|e| e.source())
                .filter(|n| members.contains(n))
                .collect();
            deps.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            for dep in deps {
                if dep == start {
                    closing = Some(current);
                    break 'search;
                }
                if !parent.contains_key(&dep) {
                    parent.insert(dep, current);
                    queue.push_back(dep);
                }
            }
        }

        let mut path = vec![self.graph[start].to_string()];
        if let Some(mut node) = closing {
            let mut tail = Vec::new();
            while node != start {
                tail.push(self.graph[node].to_string());
                node = parent[&node];
            }
            tail.reverse();
            path.extend(tail);
        }
        path.push(self.graph[start].to_string());
        path
    }

    /// Identities in apply order (dependencies first).
    pub fn up_order(&self) -> &[MigrationId] {
        &self.order
    }

    /// Identities in revert order: the exact reverse of [`up_order`](Self::up_order).
    pub fn down_order(&self) -> Vec<MigrationId> {
        self.order.iter().rev().cloned().collect()
    }

    /// Direct dependencies of a migration that are part of the graph.
    pub fn dependencies(&self, id: &str) -> Vec<MigrationId> {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<MigrationId> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].clone())
            .collect();
        deps.sort();
        deps
    }

    /// Declared dependencies of a migration that are not part of the graph.
    pub fn external_dependencies(&self, id: &str) -> &[MigrationId] {
        self.external.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive dependencies of a migration inside the graph, in
    /// up-order.
    pub fn ancestors(&self, id: &str) -> Vec<MigrationId> {
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for edge in self.graph.edges_directed(current, Direction::Incoming) {
                if visited.insert(edge.source()) {
                    stack.push(edge.source());
                }
            }
        }
        self.order
            .iter()
            .filter(|m| visited.contains(&self.node_map[*m]))
            .cloned()
            .collect()
    }

    /// Check if a migration exists in the DAG
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
