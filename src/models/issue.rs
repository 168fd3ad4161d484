use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded problem with the plan itself.
///
/// Issues capture findings worth tracking past a single analysis run, for
/// example a validation defect the team decided to fix later. They can be
/// linked to a feature but do not have to be. No analysis reads issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub feature_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Open,
    Resolved,
    WontFix,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::WontFix => "wont-fix",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "wont-fix" => Some(Self::WontFix),
            _ => None,
        }
    }
}

/// Input for creating a new issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssueInput {
    /// Feature the issue concerns, if any.
    pub feature_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

/// Input for updating an existing issue. All fields are optional for
/// partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIssueInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
}
