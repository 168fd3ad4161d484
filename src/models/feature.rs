use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of product work and the node type of both planning graphs.
///
/// Features carry two kinds of edges. `execution_dependencies` are hard
/// scheduling constraints ("that feature must be completed before this one
/// can start") and feed the dependency graph. `semantic_relationships`
/// describe how features relate conceptually (data flow, overlap,
/// succession) and are checked for structural consistency rather than used
/// for ordering.
///
/// Analysis never mutates a feature. Every analysis call receives a
/// snapshot of the feature set and computes its answer from that snapshot
/// alone. Either edge list may reference an id that does not exist in the
/// snapshot; that is a reportable defect, not a precondition violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub module_id: String,
    pub name: String,
    pub status: FeatureStatus,
    pub priority: Priority,
    /// What problem this feature solves, in a sentence or two. Drives
    /// text-similarity comparison, so it should describe the problem rather
    /// than the implementation.
    pub problem_statement: String,
    pub capability_tags: Vec<String>,
    pub target_users: Vec<String>,
    pub goals: Vec<String>,
    pub in_scope: Vec<String>,
    pub out_of_scope: Vec<String>,
    pub execution_dependencies: Vec<ExecutionDependency>,
    pub semantic_relationships: Vec<SemanticRelationship>,
    pub data_contract: Option<DataContract>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The delivery state of a feature.
///
/// Only `Completed` counts as done for scheduling; every other value is
/// uniformly "not completed" when deciding readiness and blockage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureStatus {
    Proposed,
    Planned,
    InProgress,
    Completed,
    Deprecated,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Planned => "planned",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Deprecated => "deprecated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "proposed" => Some(Self::Proposed),
            "planned" => Some(Self::Planned),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "deprecated" => Some(Self::Deprecated),
            _ => None,
        }
    }
}

/// Planning priority. Orders recommendations only; never affects
/// correctness of the graph analyses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// How strongly an execution dependency constrains scheduling.
///
/// `Blocks` and `Requires` are hard edges: the referenced feature must be
/// completed before this one can start. `Related` is informational context
/// and never constrains ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    Blocks,
    Requires,
    Related,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Requires => "requires",
            Self::Related => "related",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blocks" => Some(Self::Blocks),
            "requires" => Some(Self::Requires),
            "related" => Some(Self::Related),
            _ => None,
        }
    }

    /// Whether this kind creates a scheduling edge.
    pub fn is_hard(&self) -> bool {
        !matches!(self, Self::Related)
    }
}

/// A scheduling constraint on another feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionDependency {
    /// The feature that must be completed first.
    pub feature_id: String,
    pub kind: DependencyKind,
    pub reason: Option<String>,
}

/// The vocabulary of semantic relationships between features.
///
/// Only `DependsOn` and `Blocks` are ordering-relevant; the validator runs
/// cycle detection over those two kinds alone. The rest are descriptive
/// structure that is checked for consistency (symmetry, inverses, dangling
/// targets) but never scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    DependsOn,
    ProvidesDataTo,
    ConsumesDataFrom,
    OverlapsWith,
    Complements,
    Supersedes,
    Blocks,
    IntegratesWith,
    Extends,
    ReplacedBy,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "depends-on",
            Self::ProvidesDataTo => "provides-data-to",
            Self::ConsumesDataFrom => "consumes-data-from",
            Self::OverlapsWith => "overlaps-with",
            Self::Complements => "complements",
            Self::Supersedes => "supersedes",
            Self::Blocks => "blocks",
            Self::IntegratesWith => "integrates-with",
            Self::Extends => "extends",
            Self::ReplacedBy => "replaced-by",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "depends-on" => Some(Self::DependsOn),
            "provides-data-to" => Some(Self::ProvidesDataTo),
            "consumes-data-from" => Some(Self::ConsumesDataFrom),
            "overlaps-with" => Some(Self::OverlapsWith),
            "complements" => Some(Self::Complements),
            "supersedes" => Some(Self::Supersedes),
            "blocks" => Some(Self::Blocks),
            "integrates-with" => Some(Self::IntegratesWith),
            "extends" => Some(Self::Extends),
            "replaced-by" => Some(Self::ReplacedBy),
            _ => None,
        }
    }

    /// Whether this kind participates in cycle detection.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::DependsOn | Self::Blocks)
    }

    /// Whether this kind is expected to appear on both features.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::IntegratesWith | Self::Complements)
    }

    /// The kind the counterpart edge should carry, for paired kinds.
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::DependsOn => Some(Self::Blocks),
            Self::Blocks => Some(Self::DependsOn),
            Self::ProvidesDataTo => Some(Self::ConsumesDataFrom),
            Self::ConsumesDataFrom => Some(Self::ProvidesDataTo),
            _ => None,
        }
    }
}

/// A declared conceptual relationship to another feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticRelationship {
    pub feature_id: String,
    pub kind: RelationKind,
    pub description: String,
}

/// What a feature consumes from and produces for other features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataContract {
    #[serde(default)]
    pub consumes: Vec<DataConsumption>,
    #[serde(default)]
    pub produces: Vec<DataProduction>,
}

impl DataContract {
    pub fn is_empty(&self) -> bool {
        self.consumes.is_empty() && self.produces.is_empty()
    }
}

/// A data need declared by a consuming feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConsumption {
    /// The feature expected to produce the data. `None` means the source is
    /// external to the feature set.
    pub source_feature_id: Option<String>,
    pub data_type: String,
    /// Whether the feature cannot function without this data.
    #[serde(default)]
    pub required: bool,
}

/// A data output declared by a producing feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProduction {
    pub data_type: String,
    #[serde(default)]
    pub consumer_feature_ids: Vec<String>,
}

/// Input for creating a new feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub module_id: String,
    pub name: String,
    pub problem_statement: String,
    /// Initial status. Defaults to `Proposed` if not specified.
    pub status: Option<FeatureStatus>,
    /// Planning priority. Defaults to `Medium` if not specified.
    pub priority: Option<Priority>,
    #[serde(default)]
    pub capability_tags: Vec<String>,
    #[serde(default)]
    pub target_users: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub in_scope: Vec<String>,
    #[serde(default)]
    pub out_of_scope: Vec<String>,
    #[serde(default)]
    pub execution_dependencies: Vec<ExecutionDependency>,
    #[serde(default)]
    pub semantic_relationships: Vec<SemanticRelationship>,
    pub data_contract: Option<DataContract>,
}

/// Input for updating an existing feature. All fields are optional for
/// partial updates; list fields replace the stored list wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFeatureInput {
    /// Move the feature into a different module.
    pub module_id: Option<String>,
    pub name: Option<String>,
    pub problem_statement: Option<String>,
    pub status: Option<FeatureStatus>,
    pub priority: Option<Priority>,
    pub capability_tags: Option<Vec<String>>,
    pub target_users: Option<Vec<String>>,
    pub goals: Option<Vec<String>>,
    pub in_scope: Option<Vec<String>>,
    pub out_of_scope: Option<Vec<String>>,
    pub execution_dependencies: Option<Vec<ExecutionDependency>>,
    pub semantic_relationships: Option<Vec<SemanticRelationship>>,
    pub data_contract: Option<DataContract>,
}
