//! Cycle detection and depth assignment over an adjacency map.
//!
//! Shared by the scheduling graph (hard execution dependencies) and the
//! relationship validator (ordering-relevant semantic edges), which build
//! different adjacency maps from the same feature set.

use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path.
    Gray,
    /// Fully explored; cannot be part of an unreported cycle.
    Black,
}

/// Finds every cycle in `adjacency`, each reported as the path from the
/// re-entered node through the back edge inclusive, e.g. `[a, b, c, a]`.
/// A self-edge is reported as `[a, a]`.
///
/// Iterative depth-first search with an explicit path stack. Every
/// unvisited node becomes a fresh root (in key order) so cycles in
/// disconnected components are all found; finished nodes are never
/// re-entered, so each cycle is reported once. Edge targets that are not
/// keys of the map cannot close a cycle and are skipped.
pub fn find_cycles(adjacency: &BTreeMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut cycles = Vec::new();

    for root in adjacency.keys() {
        if marks.contains_key(root.as_str()) {
            continue;
        }
        // Frame: node plus the index of the next edge to follow.
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        let mut path: Vec<&str> = vec![root.as_str()];
        marks.insert(root.as_str(), Mark::Gray);

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let edge_index = frame.1;
            frame.1 += 1;

            let edges = adjacency
                .get(node)
                .map(|targets| targets.as_slice())
                .unwrap_or(&[]);

            if edge_index >= edges.len() {
                marks.insert(node, Mark::Black);
                path.pop();
                stack.pop();
                continue;
            }

            let target = edges[edge_index].as_str();
            if !adjacency.contains_key(target) {
                continue;
            }
            match marks.get(target) {
                Some(Mark::Gray) => {
                    // Back edge: the cycle is the path suffix from the
                    // target's first occurrence, closed by repeating it.
                    if let Some(start) = path.iter().position(|id| *id == target) {
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|id| id.to_string()).collect();
                        cycle.push(target.to_string());
                        cycles.push(cycle);
                    }
                }
                Some(Mark::Black) => {}
                None => {
                    marks.insert(target, Mark::Gray);
                    path.push(target);
                    stack.push((target, 0));
                }
            }
        }
    }

    cycles
}

/// Chain depth for every node reachable by topological processing: 0 for
/// a node whose edges all point outside the map, else one more than the
/// deepest existing target.
///
/// Kahn's algorithm over the edges. Targets outside the map are ignored.
/// If the in-degree-zero frontier empties while nodes remain (the map has
/// a cycle), the remaining nodes are simply absent from the result; this
/// never loops.
pub fn chain_depths(adjacency: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, usize> {
    let mut in_degree: BTreeMap<&str, usize> = adjacency
        .iter()
        .map(|(id, targets)| {
            let existing = targets
                .iter()
                .filter(|target| adjacency.contains_key(target.as_str()))
                .count();
            (id.as_str(), existing)
        })
        .collect();

    let mut reverse: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (id, targets) in adjacency {
        for target in targets {
            if adjacency.contains_key(target.as_str()) {
                reverse.entry(target.as_str()).or_default().push(id.as_str());
            }
        }
    }

    let mut frontier: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, remaining)| **remaining == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut depths: BTreeMap<String, usize> = BTreeMap::new();
    while let Some(id) = frontier.pop_front() {
        let depth = adjacency
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|target| depths.get(target.as_str()))
            .map(|target_depth| target_depth + 1)
            .max()
            .unwrap_or(0);
        depths.insert(id.to_string(), depth);

        if let Some(dependents) = reverse.get(id) {
            for dependent in dependents {
                if let Some(remaining) = in_degree.get_mut(dependent) {
                    *remaining -= 1;
                    if *remaining == 0 {
                        frontier.push_back(dependent);
                    }
                }
            }
        }
    }
    depths
}
