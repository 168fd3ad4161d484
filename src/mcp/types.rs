//! Request and response types for MCP tools.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateModuleRequest {
    #[schemars(description = "Short name of the module, e.g. 'billing' or 'ingestion'")]
    pub name: String,
    #[schemars(description = "What this area of the product covers")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateModuleRequest {
    #[schemars(description = "The id of the module to update")]
    pub module_id: String,
    #[schemars(description = "New module name")]
    pub name: Option<String>,
    #[schemars(description = "New module description")]
    pub description: Option<String>,
    #[schemars(
        description = "Declared connections to other modules. Replaces the stored list wholesale."
    )]
    pub relationships: Option<Vec<ModuleRelationshipEdge>>,
    #[schemars(
        description = "Feature pairs that realize module connections. Replaces the stored list wholesale."
    )]
    pub integration_points: Option<Vec<IntegrationPointEdge>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFeatureRequest {
    #[schemars(description = "The id of the module that owns this feature")]
    pub module_id: String,
    #[schemars(description = "Short capability name, e.g. 'CSV Export' or 'Rate Limiting'")]
    pub name: String,
    #[schemars(
        description = "What problem this feature solves, in a sentence or two. Describe the problem, not the implementation - this text drives overlap detection."
    )]
    pub problem_statement: String,
    #[schemars(
        description = "Initial status: proposed, planned, in-progress, completed, or deprecated. Defaults to proposed."
    )]
    pub status: Option<String>,
    #[schemars(
        description = "Planning priority: low, medium, high, or critical. Defaults to medium."
    )]
    pub priority: Option<String>,
    #[schemars(description = "Capability tags for overlap detection, e.g. ['export', 'csv']")]
    #[serde(default)]
    pub capability_tags: Vec<String>,
    #[schemars(description = "Who consumes this capability, e.g. ['analysts', 'api-consumers']")]
    #[serde(default)]
    pub target_users: Vec<String>,
    #[schemars(description = "What this feature should achieve")]
    #[serde(default)]
    pub goals: Vec<String>,
    #[schemars(description = "Phrases describing what is in scope")]
    #[serde(default)]
    pub in_scope: Vec<String>,
    #[schemars(description = "Phrases describing what is explicitly out of scope")]
    #[serde(default)]
    pub out_of_scope: Vec<String>,
    #[schemars(
        description = "Hard scheduling constraints on other features. Kind 'blocks' or 'requires' means the referenced feature must be completed first; 'related' is informational."
    )]
    #[serde(default)]
    pub execution_dependencies: Vec<DependencyEdge>,
    #[schemars(
        description = "Conceptual relationships to other features (data flow, overlap, succession)"
    )]
    #[serde(default)]
    pub semantic_relationships: Vec<RelationshipEdge>,
    #[schemars(description = "What data this feature consumes and produces")]
    pub data_contract: Option<DataContractSpec>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFeatureRequest {
    #[schemars(description = "The id of the feature to fetch")]
    pub feature_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateFeatureRequest {
    #[schemars(description = "The id of the feature to update")]
    pub feature_id: String,
    #[schemars(description = "Move the feature into a different module")]
    pub module_id: Option<String>,
    #[schemars(description = "New feature name")]
    pub name: Option<String>,
    #[schemars(description = "New problem statement")]
    pub problem_statement: Option<String>,
    #[schemars(
        description = "New status: proposed, planned, in-progress, completed, or deprecated"
    )]
    pub status: Option<String>,
    #[schemars(description = "New priority: low, medium, high, or critical")]
    pub priority: Option<String>,
    #[schemars(description = "Replaces the stored tag list wholesale")]
    pub capability_tags: Option<Vec<String>>,
    #[schemars(description = "Replaces the stored user list wholesale")]
    pub target_users: Option<Vec<String>>,
    #[schemars(description = "Replaces the stored goal list wholesale")]
    pub goals: Option<Vec<String>>,
    #[schemars(description = "Replaces the stored in-scope list wholesale")]
    pub in_scope: Option<Vec<String>>,
    #[schemars(description = "Replaces the stored out-of-scope list wholesale")]
    pub out_of_scope: Option<Vec<String>>,
    #[schemars(description = "Replaces the stored dependency list wholesale")]
    pub execution_dependencies: Option<Vec<DependencyEdge>>,
    #[schemars(description = "Replaces the stored relationship list wholesale")]
    pub semantic_relationships: Option<Vec<RelationshipEdge>>,
    #[schemars(description = "Replaces the stored data contract")]
    pub data_contract: Option<DataContractSpec>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteFeatureRequest {
    #[schemars(description = "The id of the feature to delete")]
    pub feature_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFeaturesRequest {
    #[schemars(description = "Only list features owned by this module")]
    pub module_id: Option<String>,
    #[schemars(
        description = "Only list features with this status: proposed, planned, in-progress, completed, or deprecated"
    )]
    pub status: Option<String>,
    #[schemars(description = "Maximum number of features to return")]
    pub limit: Option<u32>,
    #[schemars(description = "Number of features to skip, for paging")]
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateIssueRequest {
    #[schemars(description = "Short title describing the problem")]
    pub title: String,
    #[schemars(description = "Details of the problem")]
    pub description: Option<String>,
    #[schemars(description = "The id of the feature this issue is about, if any")]
    pub feature_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateIssueRequest {
    #[schemars(description = "The id of the issue to update")]
    pub issue_id: String,
    #[schemars(description = "New issue title")]
    pub title: Option<String>,
    #[schemars(description = "New issue description")]
    pub description: Option<String>,
    #[schemars(description = "New status: open, resolved, or wont-fix")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListIssuesRequest {
    #[schemars(description = "Only list issues linked to this feature")]
    pub feature_id: Option<String>,
    #[schemars(description = "Only list issues with this status: open, resolved, or wont-fix")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFeatureDependenciesRequest {
    #[schemars(description = "The id of the feature to inspect")]
    pub feature_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetCriticalPathRequest {
    #[schemars(description = "The id of the feature to compute the critical path for")]
    pub feature_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckFeatureOverlapRequest {
    #[schemars(description = "The id of the feature to compare against every other feature")]
    pub feature_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindSimilarFeaturesRequest {
    #[schemars(
        description = "Free-text description of a capability, e.g. a proposed feature's problem statement"
    )]
    pub query: String,
    #[schemars(
        description = "Minimum similarity score between 0.0 and 1.0. Defaults to 0.3. Lower values return more, looser matches."
    )]
    pub threshold: Option<f64>,
    #[schemars(description = "Maximum number of matches to return")]
    pub limit: Option<u32>,
}

// ============================================================
// Shared wire shapes
// ============================================================

/// A hard scheduling edge as it crosses the tool boundary. Kinds travel as
/// strings and are parsed on the way in.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DependencyEdge {
    #[schemars(description = "The id of the feature that must be completed first")]
    pub feature_id: String,
    #[schemars(description = "One of: blocks, requires, related")]
    pub kind: String,
    #[schemars(description = "Why this dependency exists")]
    #[serde(default)]
    pub reason: Option<String>,
}

/// A semantic edge as it crosses the tool boundary.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipEdge {
    #[schemars(description = "The id of the related feature")]
    pub feature_id: String,
    #[schemars(
        description = "One of: depends-on, provides-data-to, consumes-data-from, overlaps-with, complements, supersedes, blocks, integrates-with, extends, replaced-by"
    )]
    pub kind: String,
    #[schemars(description = "How the two features relate")]
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DataContractSpec {
    #[schemars(description = "Data this feature needs from other features")]
    #[serde(default)]
    pub consumes: Vec<DataConsumptionSpec>,
    #[schemars(description = "Data this feature makes available to other features")]
    #[serde(default)]
    pub produces: Vec<DataProductionSpec>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DataConsumptionSpec {
    #[schemars(
        description = "The id of the feature expected to produce this data. Omit when the source is external."
    )]
    #[serde(default)]
    pub source_feature_id: Option<String>,
    #[schemars(description = "A name for the data, e.g. 'order-events'")]
    pub data_type: String,
    #[schemars(description = "Whether the feature cannot function without this data")]
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DataProductionSpec {
    #[schemars(description = "A name for the data, e.g. 'order-events'")]
    pub data_type: String,
    #[schemars(description = "Ids of features expected to consume this data")]
    #[serde(default)]
    pub consumer_feature_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ModuleRelationshipEdge {
    #[schemars(description = "The id of the module this module talks to")]
    pub module_id: String,
    #[schemars(description = "What the connection is for")]
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IntegrationPointEdge {
    #[schemars(description = "The id of the feature on the declaring side")]
    pub source_feature_id: String,
    #[schemars(description = "The id of the feature on the other side")]
    pub target_feature_id: String,
    #[schemars(description = "What this integration point carries")]
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================
// Response Types
// ============================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub feature_count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ModuleListResponse {
    pub modules: Vec<ModuleInfo>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FeatureSummary {
    pub id: String,
    pub module_id: String,
    pub name: String,
    pub status: String,
    pub priority: String,
    pub dependency_count: usize,
    pub relationship_count: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FeatureListResponse {
    pub features: Vec<FeatureSummary>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FeatureDetail {
    pub id: String,
    pub module_id: String,
    pub name: String,
    pub status: String,
    pub priority: String,
    pub problem_statement: String,
    pub capability_tags: Vec<String>,
    pub target_users: Vec<String>,
    pub goals: Vec<String>,
    pub in_scope: Vec<String>,
    pub out_of_scope: Vec<String>,
    pub execution_dependencies: Vec<DependencyEdge>,
    pub semantic_relationships: Vec<RelationshipEdge>,
    pub data_contract: Option<DataContractSpec>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IssueInfo {
    pub id: String,
    pub feature_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IssueListResponse {
    pub issues: Vec<IssueInfo>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DependencyGraphResponse {
    pub nodes: Vec<GraphNodeInfo>,
    /// Hard-dependency cycles, each listed with its starting feature
    /// repeated at the end.
    pub cycles: Vec<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GraphNodeInfo {
    pub feature_id: String,
    pub name: String,
    pub status: String,
    /// Longest hard-dependency chain below this feature. Zero for features
    /// with no dependencies and for members of cycles.
    pub depth: usize,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FeatureDependenciesResponse {
    pub feature_id: String,
    pub name: String,
    pub depth: usize,
    /// Features directly or transitively waiting on this one.
    pub downstream_blocked: usize,
    pub dependencies: Vec<DependencyStatusInfo>,
    pub dependents: Vec<DependentInfo>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DependencyStatusInfo {
    pub feature_id: String,
    /// Resolved name, absent when the dependency points at an unknown id.
    pub name: Option<String>,
    pub status: Option<String>,
    pub kind: String,
    pub reason: Option<String>,
    /// True when the referenced feature exists and is completed.
    pub satisfied: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DependentInfo {
    pub feature_id: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BlockedFeaturesResponse {
    pub blocked: Vec<BlockedFeatureInfo>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BlockedFeatureInfo {
    pub feature_id: String,
    pub name: String,
    pub status: String,
    pub blockers: Vec<BlockerInfo>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BlockerInfo {
    pub feature_id: String,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CycleListResponse {
    pub cycle_count: usize,
    pub cycles: Vec<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimilarFeaturesResponse {
    pub query: String,
    pub matches: Vec<SimilarFeatureInfo>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimilarFeatureInfo {
    pub feature_id: String,
    pub name: String,
    pub score: f64,
}
