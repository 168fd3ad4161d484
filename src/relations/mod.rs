//! Structural validation of the declared relationship graph, plus overlap
//! scoring between feature pairs.
//!
//! The validator never fails on bad data. One pass accumulates every
//! defect it can find into a single [`ValidationReport`], so a caller sees
//! the whole picture at once instead of chasing defects one re-run at a
//! time. Unsound structure (dangling targets, self-edges, cycles) is an
//! error; probable mistakes that leave the graph usable are warnings;
//! things worth a human's attention are info.

mod overlap;
mod text;

pub use overlap::{
    score_overlap, similarity_search, OverlapCandidate, OverlapResult, OverlapSeverity,
    ScopeConflict, SimilarityHit, DEFAULT_SIMILARITY_THRESHOLD,
};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::traversal;
use crate::models::{Feature, Module};

/// Chain depth at which a feature is flagged as too deeply nested.
const DEEP_NESTING_THRESHOLD: usize = 5;

/// Defect severity. `Error` means the relationship graph is unsound for
/// reasoning; `Warning` is a probable mistake that does not break
/// soundness; `Info` is worth a look.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// What kind of defect an issue describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    DanglingReference,
    SelfRelationship,
    CircularDependency,
    Orphan,
    DataContract,
    ModuleBoundary,
    AsymmetricRelationship,
    DeepNesting,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DanglingReference => "dangling-reference",
            Self::SelfRelationship => "self-relationship",
            Self::CircularDependency => "circular-dependency",
            Self::Orphan => "orphan",
            Self::DataContract => "data-contract",
            Self::ModuleBoundary => "module-boundary",
            Self::AsymmetricRelationship => "asymmetric-relationship",
            Self::DeepNesting => "deep-nesting",
        }
    }
}

/// One defect found by the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    /// The features involved, the declaring feature first.
    pub feature_ids: Vec<String>,
    pub message: String,
    pub suggestion: String,
}

/// Aggregate counts for the validated snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub feature_count: usize,
    /// Declared semantic relationships across the snapshot.
    pub relationship_count: usize,
    pub orphan_count: usize,
    pub cycle_count: usize,
}

/// Everything the validator found, in one pass over one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no error-severity issue was found.
    pub valid: bool,
    /// Sorted errors first, then warnings, then infos; discovery order
    /// within each tier.
    pub issues: Vec<ValidationIssue>,
    pub stats: ValidationStats,
}

/// Runs every structural check over one snapshot of the feature and
/// module sets.
pub fn validate(features: &[Feature], modules: &[Module]) -> ValidationReport {
    let mut issues = Vec::new();

    check_edge_targets(features, &mut issues);
    let cycle_count = check_cycles(features, &mut issues);
    check_data_contracts(features, &mut issues);
    check_module_boundaries(features, modules, &mut issues);
    check_symmetry(features, &mut issues);
    let orphan_count = check_orphans(features, &mut issues);
    check_deep_nesting(features, &mut issues);

    // Stable sort: issues keep discovery order within a tier.
    issues.sort_by_key(|issue| issue.severity);

    let valid = issues
        .iter()
        .all(|issue| issue.severity != Severity::Error);
    let stats = ValidationStats {
        feature_count: features.len(),
        relationship_count: features
            .iter()
            .map(|feature| feature.semantic_relationships.len())
            .sum(),
        orphan_count,
        cycle_count,
    };
    ValidationReport {
        valid,
        issues,
        stats,
    }
}

/// Self-edges and dangling targets, over both edge lists. The scheduling
/// graph tolerates these; this is where they get reported.
fn check_edge_targets(features: &[Feature], issues: &mut Vec<ValidationIssue>) {
    let ids: BTreeSet<&str> = features.iter().map(|f| f.id.as_str()).collect();

    for feature in features {
        for relationship in &feature.semantic_relationships {
            if relationship.feature_id == feature.id {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: IssueCategory::SelfRelationship,
                    feature_ids: vec![feature.id.clone()],
                    message: format!(
                        "{} declares a {} relationship with itself",
                        feature.id,
                        relationship.kind.as_str()
                    ),
                    suggestion: "Remove the self-referencing relationship.".to_string(),
                });
            } else if !ids.contains(relationship.feature_id.as_str()) {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: IssueCategory::DanglingReference,
                    feature_ids: vec![feature.id.clone()],
                    message: format!(
                        "{} declares {} toward {}, which does not exist",
                        feature.id,
                        relationship.kind.as_str(),
                        relationship.feature_id
                    ),
                    suggestion: "Fix the target id or remove the relationship.".to_string(),
                });
            }
        }
        for dependency in &feature.execution_dependencies {
            if dependency.feature_id == feature.id {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: IssueCategory::SelfRelationship,
                    feature_ids: vec![feature.id.clone()],
                    message: format!(
                        "{} declares an execution dependency on itself",
                        feature.id
                    ),
                    suggestion: "Remove the self-referencing dependency.".to_string(),
                });
            } else if !ids.contains(dependency.feature_id.as_str()) {
                issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: IssueCategory::DanglingReference,
                    feature_ids: vec![feature.id.clone()],
                    message: format!(
                        "{} depends on {}, which does not exist",
                        feature.id, dependency.feature_id
                    ),
                    suggestion: "Fix the target id or remove the dependency.".to_string(),
                });
            }
        }
    }
}

/// Cycles over the ordering-relevant semantic kinds only; the descriptive
/// kinds cannot make the graph unschedulable.
fn check_cycles(features: &[Feature], issues: &mut Vec<ValidationIssue>) -> usize {
    let cycles = traversal::find_cycles(&ordering_adjacency(features));
    for cycle in &cycles {
        let members = if cycle.len() > 1 {
            cycle[..cycle.len() - 1].to_vec()
        } else {
            cycle.clone()
        };
        issues.push(ValidationIssue {
            severity: Severity::Error,
            category: IssueCategory::CircularDependency,
            feature_ids: members,
            message: format!("circular dependency: {}", cycle.join(" -> ")),
            suggestion:
                "Break the cycle by removing or reversing one of the depends-on/blocks edges."
                    .to_string(),
        });
    }
    cycles.len()
}

fn ordering_adjacency(features: &[Feature]) -> BTreeMap<String, Vec<String>> {
    features
        .iter()
        .map(|feature| {
            let targets: Vec<String> = feature
                .semantic_relationships
                .iter()
                .filter(|rel| rel.kind.is_ordering())
                .map(|rel| rel.feature_id.clone())
                .collect();
            (feature.id.clone(), targets)
        })
        .collect()
}

/// Declared data flows must point at real features (error) and should be
/// confirmed by the other end (warning when declared one-sided).
fn check_data_contracts(features: &[Feature], issues: &mut Vec<ValidationIssue>) {
    let by_id: BTreeMap<&str, &Feature> =
        features.iter().map(|f| (f.id.as_str(), f)).collect();

    for feature in features {
        let contract = match &feature.data_contract {
            Some(contract) => contract,
            None => continue,
        };

        for consumption in &contract.consumes {
            let source_id = match &consumption.source_feature_id {
                Some(id) => id,
                None => continue,
            };
            match by_id.get(source_id.as_str()) {
                None => issues.push(ValidationIssue {
                    severity: Severity::Error,
                    category: IssueCategory::DataContract,
                    feature_ids: vec![feature.id.clone()],
                    message: format!(
                        "{} consumes {} from {}, which does not exist",
                        feature.id, consumption.data_type, source_id
                    ),
                    suggestion:
                        "Fix the source feature id, or leave it unset for external sources."
                            .to_string(),
                }),
                Some(source) => {
                    let confirmed = source
                        .data_contract
                        .as_ref()
                        .map(|sc| {
                            sc.produces
                                .iter()
                                .any(|p| p.data_type == consumption.data_type)
                        })
                        .unwrap_or(false);
                    if !confirmed {
                        issues.push(ValidationIssue {
                            severity: Severity::Warning,
                            category: IssueCategory::DataContract,
                            feature_ids: vec![feature.id.clone(), source.id.clone()],
                            message: format!(
                                "{} consumes {} from {}, but {} does not declare producing it",
                                feature.id, consumption.data_type, source.id, source.id
                            ),
                            suggestion: format!(
                                "Add a produces entry for {} to {}, or correct the consumption.",
                                consumption.data_type, source.id
                            ),
                        });
                    }
                }
            }
        }

        for production in &contract.produces {
            for consumer_id in &production.consumer_feature_ids {
                match by_id.get(consumer_id.as_str()) {
                    None => issues.push(ValidationIssue {
                        severity: Severity::Error,
                        category: IssueCategory::DataContract,
                        feature_ids: vec![feature.id.clone()],
                        message: format!(
                            "{} produces {} for {}, which does not exist",
                            feature.id, production.data_type, consumer_id
                        ),
                        suggestion: "Fix the consumer feature id or remove it.".to_string(),
                    }),
                    Some(consumer) => {
                        let confirmed = consumer
                            .data_contract
                            .as_ref()
                            .map(|cc| {
                                cc.consumes
                                    .iter()
                                    .any(|c| c.data_type == production.data_type)
                            })
                            .unwrap_or(false);
                        if !confirmed {
                            issues.push(ValidationIssue {
                                severity: Severity::Warning,
                                category: IssueCategory::DataContract,
                                feature_ids: vec![feature.id.clone(), consumer.id.clone()],
                                message: format!(
                                    "{} produces {} for {}, but {} does not declare consuming it",
                                    feature.id, production.data_type, consumer.id, consumer.id
                                ),
                                suggestion: format!(
                                    "Add a consumes entry for {} to {}, or correct the production.",
                                    production.data_type, consumer.id
                                ),
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Cross-module feature relationships should be declared at the module
/// level (warning) and documented by an integration point (info). One
/// finding per unordered feature pair, not one per direction.
fn check_module_boundaries(
    features: &[Feature],
    modules: &[Module],
    issues: &mut Vec<ValidationIssue>,
) {
    let by_id: BTreeMap<&str, &Feature> =
        features.iter().map(|f| (f.id.as_str(), f)).collect();
    let module_by_id: BTreeMap<&str, &Module> =
        modules.iter().map(|m| (m.id.as_str(), m)).collect();
    let mut seen_pairs: BTreeSet<(String, String)> = BTreeSet::new();

    for feature in features {
        for relationship in &feature.semantic_relationships {
            let target = match by_id.get(relationship.feature_id.as_str()) {
                Some(target) => *target,
                None => continue,
            };
            if target.id == feature.id || target.module_id == feature.module_id {
                continue;
            }
            if !seen_pairs.insert(pair_key(&feature.id, &target.id)) {
                continue;
            }

            let declared = module_declares(&module_by_id, &feature.module_id, &target.module_id)
                || module_declares(&module_by_id, &target.module_id, &feature.module_id);
            if !declared {
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    category: IssueCategory::ModuleBoundary,
                    feature_ids: vec![feature.id.clone(), target.id.clone()],
                    message: format!(
                        "{} and {} relate across modules {} and {}, but neither module declares the other",
                        feature.id, target.id, feature.module_id, target.module_id
                    ),
                    suggestion: "Declare the relationship between the two modules, or move one feature.".to_string(),
                });
            }

            let documented = [feature.module_id.as_str(), target.module_id.as_str()]
                .iter()
                .any(|module_id| {
                    module_by_id
                        .get(module_id)
                        .map(|module| {
                            module.integration_points.iter().any(|point| {
                                (point.source_feature_id == feature.id
                                    && point.target_feature_id == target.id)
                                    || (point.source_feature_id == target.id
                                        && point.target_feature_id == feature.id)
                            })
                        })
                        .unwrap_or(false)
                });
            if !documented {
                issues.push(ValidationIssue {
                    severity: Severity::Info,
                    category: IssueCategory::ModuleBoundary,
                    feature_ids: vec![feature.id.clone(), target.id.clone()],
                    message: format!(
                        "no integration point documents the connection between {} and {}",
                        feature.id, target.id
                    ),
                    suggestion: "Add an integration point naming both features to one of the modules.".to_string(),
                });
            }
        }
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn module_declares(
    modules: &BTreeMap<&str, &Module>,
    from: &str,
    to: &str,
) -> bool {
    modules
        .get(from)
        .map(|module| module.relationships.iter().any(|rel| rel.module_id == to))
        .unwrap_or(false)
}

/// Symmetric kinds must appear on both sides (warning). Paired kinds
/// should use the inverse kind on the counterpart edge, but only when a
/// reverse edge exists at all; a missing reverse edge is not an issue.
fn check_symmetry(features: &[Feature], issues: &mut Vec<ValidationIssue>) {
    let by_id: BTreeMap<&str, &Feature> =
        features.iter().map(|f| (f.id.as_str(), f)).collect();

    for feature in features {
        for relationship in &feature.semantic_relationships {
            let target = match by_id.get(relationship.feature_id.as_str()) {
                Some(target) => *target,
                None => continue,
            };
            if target.id == feature.id {
                continue;
            }
            let reverse_kinds: Vec<_> = target
                .semantic_relationships
                .iter()
                .filter(|rel| rel.feature_id == feature.id)
                .map(|rel| rel.kind)
                .collect();

            if relationship.kind.is_symmetric() {
                if !reverse_kinds.contains(&relationship.kind) {
                    issues.push(ValidationIssue {
                        severity: Severity::Warning,
                        category: IssueCategory::AsymmetricRelationship,
                        feature_ids: vec![feature.id.clone(), target.id.clone()],
                        message: format!(
                            "{} declares {} with {}, but {} does not declare it back",
                            feature.id,
                            relationship.kind.as_str(),
                            target.id,
                            target.id
                        ),
                        suggestion: format!(
                            "Add the matching {} relationship to {}.",
                            relationship.kind.as_str(),
                            target.id
                        ),
                    });
                }
            } else if let Some(inverse) = relationship.kind.inverse() {
                if !reverse_kinds.is_empty() && !reverse_kinds.contains(&inverse) {
                    issues.push(ValidationIssue {
                        severity: Severity::Info,
                        category: IssueCategory::AsymmetricRelationship,
                        feature_ids: vec![feature.id.clone(), target.id.clone()],
                        message: format!(
                            "{} declares {} toward {}, but {} relates back without the inverse {}",
                            feature.id,
                            relationship.kind.as_str(),
                            target.id,
                            target.id,
                            inverse.as_str()
                        ),
                        suggestion: format!(
                            "Use {} on the counterpart edge, or drop one side.",
                            inverse.as_str()
                        ),
                    });
                }
            }
        }
    }
}

/// A feature nothing points at, that points at nothing, and that declares
/// no data flows. Valid, just worth a look.
fn check_orphans(features: &[Feature], issues: &mut Vec<ValidationIssue>) -> usize {
    let mut incoming: BTreeSet<&str> = BTreeSet::new();
    for feature in features {
        for relationship in &feature.semantic_relationships {
            if relationship.feature_id != feature.id {
                incoming.insert(relationship.feature_id.as_str());
            }
        }
    }

    let mut orphan_count = 0;
    for feature in features {
        let has_outgoing = !feature.semantic_relationships.is_empty();
        let has_incoming = incoming.contains(feature.id.as_str());
        let has_contract = feature
            .data_contract
            .as_ref()
            .map(|contract| !contract.is_empty())
            .unwrap_or(false);
        if !has_outgoing && !has_incoming && !has_contract {
            orphan_count += 1;
            issues.push(ValidationIssue {
                severity: Severity::Info,
                category: IssueCategory::Orphan,
                feature_ids: vec![feature.id.clone()],
                message: format!(
                    "{} ({}) has no relationships and no data contract",
                    feature.id, feature.name
                ),
                suggestion:
                    "Relate it to the features it touches, or confirm it is genuinely standalone."
                        .to_string(),
            });
        }
    }
    orphan_count
}

/// Long depends-on/blocks chains usually mean over-decomposition.
fn check_deep_nesting(features: &[Feature], issues: &mut Vec<ValidationIssue>) {
    let depths = traversal::chain_depths(&ordering_adjacency(features));
    for (id, depth) in &depths {
        if *depth >= DEEP_NESTING_THRESHOLD {
            issues.push(ValidationIssue {
                severity: Severity::Info,
                category: IssueCategory::DeepNesting,
                feature_ids: vec![id.clone()],
                message: format!("{} sits {} levels deep in its dependency chain", id, depth),
                suggestion: "Consider flattening the chain or grouping intermediate features."
                    .to_string(),
            });
        }
    }
}
