//! The scheduling graph: hard execution dependencies resolved in both
//! directions, with cycle detection, depth assignment, critical-path and
//! readiness queries.
//!
//! Everything here is pure and stateless per call. A graph is built from
//! one snapshot of the feature set, answers questions about that snapshot,
//! and is dropped; nothing is cached between calls and no I/O happens
//! inside this module.

mod schedule;
pub(crate) mod traversal;

pub use schedule::{
    critical_path, recommend_next, CriticalPathReport, CriticalPathStep, Recommendation,
};

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thiserror::Error;

use crate::models::{Feature, FeatureStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("feature not found: {0}")]
    FeatureNotFound(String),
}

/// A feature with its resolved hard edges and computed depth.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub feature: Feature,
    /// Hard dependency targets exactly as declared, including ids absent
    /// from the snapshot and self-references. Dropping them here would let
    /// a defective snapshot masquerade as a clean one.
    pub dependencies: Vec<String>,
    /// Ids of features declaring a hard dependency on this one, one entry
    /// per declared edge. Only existing features appear.
    pub dependents: Vec<String>,
    /// Longest hard-dependency distance from a feature with no existing
    /// dependencies. Nodes on or downstream of a cycle keep depth 0;
    /// [`FeatureGraph::detect_cycles`] is authoritative there.
    pub depth: usize,
}

/// The dependency graph for one feature-set snapshot.
///
/// Construction is best-effort: declared edges are kept verbatim even when
/// they point at missing features or at the declaring feature itself, so a
/// partially malformed snapshot still yields a usable structure for the
/// scheduling queries. Strict structural checking is the relationship
/// validator's job, not this graph's.
#[derive(Debug, Clone)]
pub struct FeatureGraph {
    nodes: BTreeMap<String, GraphNode>,
}

impl FeatureGraph {
    /// Builds the graph for one snapshot and assigns depths.
    pub fn build(features: &[Feature]) -> Self {
        let mut nodes: BTreeMap<String, GraphNode> = features
            .iter()
            .map(|feature| {
                let dependencies: Vec<String> = feature
                    .execution_dependencies
                    .iter()
                    .filter(|dep| dep.kind.is_hard())
                    .map(|dep| dep.feature_id.clone())
                    .collect();
                let node = GraphNode {
                    feature: feature.clone(),
                    dependencies,
                    dependents: Vec::new(),
                    depth: 0,
                };
                (feature.id.clone(), node)
            })
            .collect();

        // Reverse index. An edge to a missing feature has no node to land
        // on and is skipped; the forward list still records it.
        let edges: Vec<(String, String)> = nodes
            .values()
            .flat_map(|node| {
                node.dependencies
                    .iter()
                    .map(|dep_id| (dep_id.clone(), node.feature.id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (dep_id, dependent_id) in edges {
            if let Some(node) = nodes.get_mut(&dep_id) {
                node.dependents.push(dependent_id);
            }
        }

        let mut graph = Self { nodes };
        graph.assign_depths();
        graph
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &BTreeMap<String, GraphNode> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every hard-dependency cycle in the graph, each as a path that starts
    /// and ends on the same id (`[a, b, c, a]`).
    ///
    /// An empty result means the graph is a DAG and depths and longest
    /// paths are exact rather than partial.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        traversal::find_cycles(&self.hard_adjacency())
    }

    fn hard_adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.dependencies.clone()))
            .collect()
    }

    /// Kahn's algorithm over the hard edges. Depth is 0 for a node with no
    /// existing dependencies, else one more than the deepest of them.
    /// Nodes on or downstream of a cycle are skipped and keep depth 0.
    fn assign_depths(&mut self) {
        let adjacency = self.hard_adjacency();
        for (id, depth) in traversal::chain_depths(&adjacency) {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.depth = depth;
            }
        }
    }

    /// The longest chain of hard dependencies ending at `target`, as ids
    /// from the start of the chain to `target` inclusive.
    ///
    /// On an acyclic graph the returned length is exactly
    /// `depth(target) + 1`. The walk runs backward from the target, always
    /// stepping to the deepest existing dependency; ties break toward the
    /// lexicographically smallest id so repeated calls agree. On cyclic
    /// input the walk refuses to revisit a node and stops early instead of
    /// looping.
    pub fn longest_path_to(&self, target: &str) -> Result<Vec<String>, GraphError> {
        if !self.nodes.contains_key(target) {
            return Err(GraphError::FeatureNotFound(target.to_string()));
        }

        let mut path = vec![target.to_string()];
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        visited.insert(target);
        let mut current = target;

        while let Some(node) = self.nodes.get(current) {
            let next = node
                .dependencies
                .iter()
                .filter(|dep_id| !visited.contains(dep_id.as_str()))
                .filter_map(|dep_id| self.nodes.get(dep_id).map(|dep| (dep_id, dep)))
                .max_by(|(id_a, a), (id_b, b)| {
                    a.depth.cmp(&b.depth).then_with(|| id_b.cmp(id_a))
                })
                .map(|(id, _)| id.as_str());
            match next {
                Some(id) => {
                    path.push(id.to_string());
                    visited.insert(id);
                    current = id;
                }
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Features that could start now: not completed themselves, and every
    /// dependency exists and is completed (vacuously true for none).
    ///
    /// A dangling dependency keeps its feature out of the ready set; an id
    /// that is not in the snapshot cannot be verified complete.
    pub fn ready_features(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.feature.status != FeatureStatus::Completed)
            .filter(|(_, node)| {
                node.dependencies.iter().all(|dep_id| {
                    self.nodes
                        .get(dep_id)
                        .map(|dep| dep.feature.status == FeatureStatus::Completed)
                        .unwrap_or(false)
                })
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Map from feature id to the dependency ids currently holding it
    /// back, for every feature with at least one. A dependency counts as
    /// blocking when it is not completed or not in the snapshot at all.
    pub fn blocked_features(&self) -> BTreeMap<String, Vec<String>> {
        let mut blocked = BTreeMap::new();
        for (id, node) in &self.nodes {
            let blocking: Vec<String> = node
                .dependencies
                .iter()
                .filter(|dep_id| {
                    self.nodes
                        .get(dep_id.as_str())
                        .map(|dep| dep.feature.status != FeatureStatus::Completed)
                        .unwrap_or(true)
                })
                .cloned()
                .collect();
            if !blocking.is_empty() {
                blocked.insert(id.clone(), blocking);
            }
        }
        blocked
    }

    /// How many features are directly or transitively waiting on `id`.
    ///
    /// Breadth-first over the dependents index. The start feature is never
    /// counted, even when a cycle makes it its own dependent. Purely a
    /// prioritization signal.
    pub fn count_downstream_blocked(&self, id: &str) -> Result<usize, GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::FeatureNotFound(id.to_string()));
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            if let Some(node) = self.nodes.get(current) {
                for dependent_id in &node.dependents {
                    if seen.insert(dependent_id.as_str()) {
                        queue.push_back(dependent_id.as_str());
                    }
                }
            }
        }
        seen.remove(id);
        Ok(seen.len())
    }
}
