//! Derived scheduling reports built on top of [`FeatureGraph`]: critical
//! paths annotated for humans, and ranked next-feature recommendations.

use serde::{Deserialize, Serialize};

use crate::models::{Feature, FeatureStatus, Priority};

use super::{FeatureGraph, GraphError};

/// The longest prerequisite chain ending at a target feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticalPathReport {
    pub target_id: String,
    /// The chain in execution order, the target last.
    pub steps: Vec<CriticalPathStep>,
    /// Number of steps, the target included.
    pub length: usize,
    /// Ids on the path that still need work, in path order.
    pub incomplete: Vec<String>,
    /// Dependency cycles found in the snapshot. A non-empty list means the
    /// path is a best effort over a graph that cannot actually be
    /// scheduled.
    pub cycles: Vec<Vec<String>>,
}

/// One feature on a critical path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticalPathStep {
    pub feature_id: String,
    pub name: String,
    pub status: FeatureStatus,
    pub depth: usize,
}

/// A ready feature ranked for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub feature_id: String,
    pub name: String,
    pub priority: Priority,
    /// Features directly or transitively waiting on this one.
    pub downstream_blocked: usize,
    pub reasons: Vec<String>,
}

/// Computes the longest prerequisite chain ending at `target_id`.
///
/// Cycle detection runs first and its findings ride along in the report;
/// a cyclic snapshot degrades the answer instead of failing the call. An
/// unknown target is a caller error and fails.
pub fn critical_path(
    features: &[Feature],
    target_id: &str,
) -> Result<CriticalPathReport, GraphError> {
    let graph = FeatureGraph::build(features);
    let cycles = graph.detect_cycles();
    let path = graph.longest_path_to(target_id)?;

    let steps: Vec<CriticalPathStep> = path
        .iter()
        .filter_map(|id| graph.get(id))
        .map(|node| CriticalPathStep {
            feature_id: node.feature.id.clone(),
            name: node.feature.name.clone(),
            status: node.feature.status,
            depth: node.depth,
        })
        .collect();
    let incomplete: Vec<String> = steps
        .iter()
        .filter(|step| step.status != FeatureStatus::Completed)
        .map(|step| step.feature_id.clone())
        .collect();

    Ok(CriticalPathReport {
        target_id: target_id.to_string(),
        length: steps.len(),
        steps,
        incomplete,
        cycles,
    })
}

/// Ranks every ready feature for "what should I pick up next".
///
/// Order: priority descending, then downstream impact descending, then id
/// ascending so equal candidates always come back the same way.
pub fn recommend_next(features: &[Feature]) -> Vec<Recommendation> {
    let graph = FeatureGraph::build(features);
    let mut recommendations: Vec<Recommendation> = graph
        .ready_features()
        .into_iter()
        .filter_map(|id| {
            let node = graph.get(&id)?;
            let downstream = graph.count_downstream_blocked(&id).unwrap_or(0);
            let mut reasons = vec!["every dependency is completed".to_string()];
            if node.feature.priority >= Priority::High {
                reasons.push(format!("{} priority", node.feature.priority.as_str()));
            }
            if downstream > 0 {
                let plural = if downstream == 1 { "" } else { "s" };
                reasons.push(format!("unblocks {downstream} downstream feature{plural}"));
            }
            Some(Recommendation {
                feature_id: node.feature.id.clone(),
                name: node.feature.name.clone(),
                priority: node.feature.priority,
                downstream_blocked: downstream,
                reasons,
            })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.downstream_blocked.cmp(&a.downstream_blocked))
            .then_with(|| a.feature_id.cmp(&b.feature_id))
    });
    recommendations
}
