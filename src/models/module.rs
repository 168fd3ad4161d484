use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded area of the product that owns features.
///
/// Modules declare which other modules they are expected to talk to
/// (`relationships`) and which concrete feature pairs realize those
/// connections (`integration_points`). The relationship validator uses both
/// lists: a cross-module feature relationship without a matching module
/// declaration is flagged as an undeclared boundary crossing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub relationships: Vec<ModuleRelationship>,
    pub integration_points: Vec<IntegrationPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A declared connection to another module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRelationship {
    pub module_id: String,
    pub description: Option<String>,
}

/// A concrete feature-to-feature connection across a module boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationPoint {
    pub source_feature_id: String,
    pub target_feature_id: String,
    pub description: Option<String>,
}

/// Input for creating a new module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModuleInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub relationships: Vec<ModuleRelationship>,
    #[serde(default)]
    pub integration_points: Vec<IntegrationPoint>,
}

/// Input for updating an existing module. All fields are optional for
/// partial updates; list fields replace the stored list wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateModuleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub relationships: Option<Vec<ModuleRelationship>>,
    pub integration_points: Option<Vec<IntegrationPoint>>,
}
