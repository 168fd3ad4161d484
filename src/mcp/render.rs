//! Markdown rendering for analysis reports returned over MCP.
//!
//! Renderers are pure: report in, string out. The JSON shapes stay
//! available through the HTTP API for programmatic callers; these views
//! exist for tool output that a model or a human reads directly.

use crate::graph::{CriticalPathReport, Recommendation};
use crate::relations::{OverlapResult, Severity, ValidationReport};

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Renders a validation report grouped by severity, errors first.
pub fn render_validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    out.push_str("# Relationship Validation\n\n");
    out.push_str(&format!(
        "Checked {} feature{} and {} semantic relationship{}.\n\n",
        report.stats.feature_count,
        plural(report.stats.feature_count),
        report.stats.relationship_count,
        plural(report.stats.relationship_count),
    ));

    if report.issues.is_empty() {
        out.push_str("No issues found.\n");
        return out;
    }

    let errors = count_severity(report, Severity::Error);
    let warnings = count_severity(report, Severity::Warning);
    let infos = count_severity(report, Severity::Info);
    out.push_str(&format!(
        "Found {} issue{}: {} error{}, {} warning{}, {} info.\n",
        report.issues.len(),
        plural(report.issues.len()),
        errors,
        plural(errors),
        warnings,
        plural(warnings),
        infos,
    ));

    for (severity, title) in [
        (Severity::Error, "Errors"),
        (Severity::Warning, "Warnings"),
        (Severity::Info, "Info"),
    ] {
        let group: Vec<_> = report
            .issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n\n", title));
        for issue in group {
            out.push_str(&format!(
                "- **{}** [{}]: {}\n",
                issue.category.as_str(),
                issue.feature_ids.join(", "),
                issue.message
            ));
            if !issue.suggestion.is_empty() {
                out.push_str(&format!("  - Suggestion: {}\n", issue.suggestion));
            }
        }
    }
    out
}

fn count_severity(report: &ValidationReport, severity: Severity) -> usize {
    report
        .issues
        .iter()
        .filter(|issue| issue.severity == severity)
        .count()
}

/// Renders overlap results for one feature, strongest overlap first.
pub fn render_overlaps(feature_name: &str, results: &[OverlapResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Overlap Check: {}\n\n", feature_name));

    if results.is_empty() {
        out.push_str("No overlapping features found.\n");
        return out;
    }

    out.push_str(&format!(
        "Found {} potentially overlapping feature{}.\n",
        results.len(),
        plural(results.len()),
    ));

    for result in results {
        out.push_str(&format!(
            "\n## {} ({})\n\nFeature id: {}\n\n",
            result.feature_name,
            result.severity.as_str(),
            result.feature_id
        ));
        for reason in &result.reasons {
            out.push_str(&format!("- {}\n", reason));
        }
        if !result.recommendations.is_empty() {
            out.push_str("\nRecommended actions:\n\n");
            for recommendation in &result.recommendations {
                out.push_str(&format!("- {}\n", recommendation));
            }
        }
    }
    out
}

/// Renders a critical path as a numbered prerequisite chain, target last.
pub fn render_critical_path(report: &CriticalPathReport) -> String {
    let mut out = String::new();
    out.push_str("# Critical Path\n\n");
    out.push_str(&format!(
        "Longest prerequisite chain to {}: {} feature{}.\n\n",
        report.target_id,
        report.length,
        plural(report.length),
    ));

    for (position, step) in report.steps.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} [{}]\n",
            position + 1,
            step.name,
            step.status.as_str()
        ));
    }

    if report.incomplete.is_empty() {
        out.push_str("\nEvery feature on the path is completed.\n");
    } else {
        out.push_str(&format!(
            "\n{} feature{} on the path still need{} work: {}.\n",
            report.incomplete.len(),
            plural(report.incomplete.len()),
            if report.incomplete.len() == 1 { "s" } else { "" },
            report.incomplete.join(", ")
        ));
    }

    if !report.cycles.is_empty() {
        out.push_str(&format!(
            "\nHard dependencies contain {} cycle{}; chain lengths skip features inside them.\n\n",
            report.cycles.len(),
            plural(report.cycles.len()),
        ));
        for cycle in &report.cycles {
            out.push_str(&format!("- {}\n", cycle.join(" -> ")));
        }
    }
    out
}

/// Renders ranked recommendations with the reasons each feature was picked.
pub fn render_recommendations(recommendations: &[Recommendation]) -> String {
    let mut out = String::new();
    out.push_str("# Recommended Next Features\n\n");

    if recommendations.is_empty() {
        out.push_str("Nothing is ready to start. Check blocked features and dependency cycles.\n");
        return out;
    }

    for (position, recommendation) in recommendations.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "{}. **{}** ({} priority)\n",
            position + 1,
            recommendation.name,
            recommendation.priority.as_str()
        ));
        for reason in &recommendation.reasons {
            out.push_str(&format!("   - {}\n", reason));
        }
    }
    out
}
