//! Pairwise overlap scoring: how likely is a proposed feature to duplicate
//! one that already exists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::Feature;

use super::text;

/// Thresholds on [`text::similarity`] for the problem-statement signal.
const TEXT_HIGH: f64 = 0.6;
const TEXT_MEDIUM: f64 = 0.4;
const TEXT_REPORTABLE: f64 = 0.2;

/// Score at or above which a similarity-search hit is returned by default.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// How risky a pairing looks. `Low` is worth a glance during planning;
/// `High` means stop and compare before building.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapSeverity {
    Low,
    Medium,
    High,
}

impl OverlapSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// One step up, capped at `High`.
    fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }
}

/// The description being checked for duplication. Usually a proposal that
/// has not been stored yet, so it is looser than a full [`Feature`].
///
/// When checking a stored feature against the rest of the set, convert it
/// with `From<&Feature>` and drop it from the `features` slice first, or it
/// will be reported as overlapping with itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlapCandidate {
    pub name: String,
    pub module_id: Option<String>,
    pub problem_statement: String,
    #[serde(default)]
    pub capability_tags: Vec<String>,
    #[serde(default)]
    pub target_users: Vec<String>,
    #[serde(default)]
    pub in_scope: Vec<String>,
    #[serde(default)]
    pub out_of_scope: Vec<String>,
}

impl From<&Feature> for OverlapCandidate {
    fn from(feature: &Feature) -> Self {
        Self {
            name: feature.name.clone(),
            module_id: Some(feature.module_id.clone()),
            problem_statement: feature.problem_statement.clone(),
            capability_tags: feature.capability_tags.clone(),
            target_users: feature.target_users.clone(),
            in_scope: feature.in_scope.clone(),
            out_of_scope: feature.out_of_scope.clone(),
        }
    }
}

/// The duplicate-risk assessment of one existing feature against the
/// candidate. Only produced when at least one signal fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapResult {
    pub feature_id: String,
    pub feature_name: String,
    pub severity: OverlapSeverity,
    /// Intersection of the two tag lists, sorted.
    pub shared_tags: Vec<String>,
    pub text_similarity: f64,
    /// Case-insensitive intersection of the two user lists, lowercased.
    pub shared_users: Vec<String>,
    pub scope_conflicts: Vec<ScopeConflict>,
    pub same_module: bool,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A phrase one side declares in scope that the other declares out of
/// scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConflict {
    pub candidate_phrase: String,
    pub existing_phrase: String,
}

/// A match from free-text similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub feature_id: String,
    pub feature_name: String,
    pub score: f64,
}

/// Scores every existing feature against the candidate and returns the
/// ones with at least one positive signal, strongest first.
///
/// Sort order is severity descending, then number of distinct reasons
/// descending, then feature id ascending, so identical inputs always
/// produce identical output.
pub fn score_overlap(candidate: &OverlapCandidate, features: &[Feature]) -> Vec<OverlapResult> {
    let mut results: Vec<OverlapResult> = features
        .iter()
        .filter_map(|feature| score_pair(candidate, feature))
        .collect();
    results.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.reasons.len().cmp(&a.reasons.len()))
            .then_with(|| a.feature_id.cmp(&b.feature_id))
    });
    results
}

fn score_pair(candidate: &OverlapCandidate, feature: &Feature) -> Option<OverlapResult> {
    let mut severity = OverlapSeverity::Low;
    let mut reasons: Vec<String> = Vec::new();

    // Tag overlap: exact intersection. Three or more shared tags is a
    // duplicate smell on its own.
    let candidate_tags: BTreeSet<&str> = candidate
        .capability_tags
        .iter()
        .map(String::as_str)
        .collect();
    let existing_tags: BTreeSet<&str> = feature
        .capability_tags
        .iter()
        .map(String::as_str)
        .collect();
    let shared_tags: Vec<String> = candidate_tags
        .intersection(&existing_tags)
        .map(|tag| tag.to_string())
        .collect();
    if !shared_tags.is_empty() {
        severity = match shared_tags.len() {
            1 => severity,
            2 => severity.max(OverlapSeverity::Medium),
            _ => OverlapSeverity::High,
        };
        let plural = if shared_tags.len() == 1 { "" } else { "s" };
        reasons.push(format!(
            "{} shared capability tag{}: {}",
            shared_tags.len(),
            plural,
            shared_tags.join(", ")
        ));
    }

    // Problem-statement similarity. Below the medium threshold it is
    // reported but carries no severity of its own.
    let text_similarity =
        text::similarity(&candidate.problem_statement, &feature.problem_statement);
    if text_similarity > TEXT_HIGH {
        severity = OverlapSeverity::High;
        reasons.push(format!(
            "problem statements are {:.0}% similar",
            text_similarity * 100.0
        ));
    } else if text_similarity > TEXT_MEDIUM {
        severity = severity.max(OverlapSeverity::Medium);
        reasons.push(format!(
            "problem statements are {:.0}% similar",
            text_similarity * 100.0
        ));
    } else if text_similarity > TEXT_REPORTABLE {
        reasons.push(format!(
            "problem statements are {:.0}% similar",
            text_similarity * 100.0
        ));
    }

    // Audience overlap. Alone it is a weak signal; on top of anything
    // else it raises the stakes one step.
    let candidate_users: BTreeSet<String> = candidate
        .target_users
        .iter()
        .map(|user| user.to_lowercase())
        .collect();
    let existing_users: BTreeSet<String> = feature
        .target_users
        .iter()
        .map(|user| user.to_lowercase())
        .collect();
    let shared_users: Vec<String> = candidate_users
        .intersection(&existing_users)
        .cloned()
        .collect();
    if !shared_users.is_empty() {
        if !reasons.is_empty() {
            severity = severity.escalate();
        }
        reasons.push(format!("shared target users: {}", shared_users.join(", ")));
    }

    // Scope conflict: one side builds what the other explicitly excludes.
    // Forces high regardless of everything above.
    let scope_conflicts = find_scope_conflicts(candidate, feature);
    for conflict in &scope_conflicts {
        reasons.push(format!(
            "scope conflict: \"{}\" collides with \"{}\"",
            conflict.candidate_phrase, conflict.existing_phrase
        ));
    }

    // Module proximity never signals on its own, it amplifies.
    let same_module = candidate.module_id.as_deref() == Some(feature.module_id.as_str());
    if same_module && !reasons.is_empty() {
        severity = severity.escalate();
        reasons.push(format!("both live in module {}", feature.module_id));
    }

    if !scope_conflicts.is_empty() {
        severity = OverlapSeverity::High;
    }

    if reasons.is_empty() {
        return None;
    }

    let recommendations =
        recommendations_for(severity, !scope_conflicts.is_empty(), shared_tags.len());
    Some(OverlapResult {
        feature_id: feature.id.clone(),
        feature_name: feature.name.clone(),
        severity,
        shared_tags,
        text_similarity,
        shared_users,
        scope_conflicts,
        same_module,
        reasons,
        recommendations,
    })
}

fn find_scope_conflicts(candidate: &OverlapCandidate, feature: &Feature) -> Vec<ScopeConflict> {
    let mut conflicts = Vec::new();
    for ours in &candidate.in_scope {
        for theirs in &feature.out_of_scope {
            if phrases_collide(ours, theirs) {
                conflicts.push(ScopeConflict {
                    candidate_phrase: ours.clone(),
                    existing_phrase: theirs.clone(),
                });
            }
        }
    }
    for ours in &candidate.out_of_scope {
        for theirs in &feature.in_scope {
            if phrases_collide(ours, theirs) {
                conflicts.push(ScopeConflict {
                    candidate_phrase: ours.clone(),
                    existing_phrase: theirs.clone(),
                });
            }
        }
    }
    conflicts
}

/// True when one phrase contains the other, ignoring case. Blank phrases
/// never collide.
fn phrases_collide(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Fixed advice per severity and signal mix, so equal findings always read
/// the same.
fn recommendations_for(
    severity: OverlapSeverity,
    has_scope_conflict: bool,
    shared_tag_count: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if has_scope_conflict {
        recommendations.push(
            "Review the scope boundaries: one feature builds what the other declares out of scope."
                .to_string(),
        );
        recommendations.push("Consider merging if the boundary is artificial.".to_string());
    }
    match severity {
        OverlapSeverity::High if shared_tag_count >= 3 => recommendations.push(
            "Merge these features or differentiate their capability tags.".to_string(),
        ),
        OverlapSeverity::High => recommendations.push(
            "Treat as a likely duplicate: merge, or state explicitly how they differ.".to_string(),
        ),
        OverlapSeverity::Medium => recommendations.push(
            "Document an overlaps-with relationship between the two features.".to_string(),
        ),
        OverlapSeverity::Low => recommendations
            .push("Review during planning; likely adjacent rather than duplicated.".to_string()),
    }
    recommendations
}

/// Ranks stored features by text similarity between `query` and each
/// feature's problem statement, goals, and in-scope phrases, highest
/// first; ties break by id. Independent of the tag, user, and scope
/// signals above.
pub fn similarity_search(
    query: &str,
    features: &[Feature],
    threshold: f64,
) -> Vec<SimilarityHit> {
    let mut hits: Vec<SimilarityHit> = features
        .iter()
        .filter_map(|feature| {
            let score = text::similarity(query, &searchable_text(feature));
            if score >= threshold {
                Some(SimilarityHit {
                    feature_id: feature.id.clone(),
                    feature_name: feature.name.clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.feature_id.cmp(&b.feature_id))
    });
    hits
}

fn searchable_text(feature: &Feature) -> String {
    let mut parts = vec![feature.problem_statement.clone()];
    parts.extend(feature.goals.iter().cloned());
    parts.extend(feature.in_scope.iter().cloned());
    parts.join(" ")
}
