//! MCP server for AI-assisted feature planning.

pub mod render;
mod types;

pub use types::*;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;

use crate::db::Database;
use crate::graph::{self, FeatureGraph};
use crate::models::*;
use crate::relations;

#[derive(Clone)]
pub struct McpServer {
    db: Database,
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            tool_router: Self::tool_router(),
        }
    }

    fn db_err(e: anyhow::Error) -> McpError {
        McpError::internal_error(e.to_string(), None)
    }

    fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    fn parse_status(s: &str) -> Result<FeatureStatus, McpError> {
        FeatureStatus::from_str(s).ok_or_else(|| {
            McpError::invalid_params(
                format!(
                    "Invalid status '{}'. Must be: proposed, planned, in-progress, completed, or deprecated",
                    s
                ),
                None,
            )
        })
    }

    fn parse_priority(s: &str) -> Result<Priority, McpError> {
        Priority::from_str(s).ok_or_else(|| {
            McpError::invalid_params(
                format!("Invalid priority '{}'. Must be: low, medium, high, or critical", s),
                None,
            )
        })
    }

    fn parse_issue_status(s: &str) -> Result<IssueStatus, McpError> {
        IssueStatus::from_str(s).ok_or_else(|| {
            McpError::invalid_params(
                format!("Invalid status '{}'. Must be: open, resolved, or wont-fix", s),
                None,
            )
        })
    }

    fn parse_dependencies(
        edges: Vec<DependencyEdge>,
    ) -> Result<Vec<ExecutionDependency>, McpError> {
        edges
            .into_iter()
            .map(|edge| {
                let kind = DependencyKind::from_str(&edge.kind).ok_or_else(|| {
                    McpError::invalid_params(
                        format!(
                            "Invalid dependency kind '{}'. Must be: blocks, requires, or related",
                            edge.kind
                        ),
                        None,
                    )
                })?;
                Ok(ExecutionDependency {
                    feature_id: edge.feature_id,
                    kind,
                    reason: edge.reason,
                })
            })
            .collect()
    }

    fn parse_relationships(
        edges: Vec<RelationshipEdge>,
    ) -> Result<Vec<SemanticRelationship>, McpError> {
        edges
            .into_iter()
            .map(|edge| {
                let kind = RelationKind::from_str(&edge.kind).ok_or_else(|| {
                    McpError::invalid_params(
                        format!("Invalid relationship kind '{}'", edge.kind),
                        None,
                    )
                })?;
                Ok(SemanticRelationship {
                    feature_id: edge.feature_id,
                    kind,
                    description: edge.description,
                })
            })
            .collect()
    }

    fn contract_from_spec(spec: DataContractSpec) -> DataContract {
        DataContract {
            consumes: spec
                .consumes
                .into_iter()
                .map(|c| DataConsumption {
                    source_feature_id: c.source_feature_id,
                    data_type: c.data_type,
                    required: c.required,
                })
                .collect(),
            produces: spec
                .produces
                .into_iter()
                .map(|p| DataProduction {
                    data_type: p.data_type,
                    consumer_feature_ids: p.consumer_feature_ids,
                })
                .collect(),
        }
    }

    fn contract_spec(contract: &DataContract) -> DataContractSpec {
        DataContractSpec {
            consumes: contract
                .consumes
                .iter()
                .map(|c| DataConsumptionSpec {
                    source_feature_id: c.source_feature_id.clone(),
                    data_type: c.data_type.clone(),
                    required: c.required,
                })
                .collect(),
            produces: contract
                .produces
                .iter()
                .map(|p| DataProductionSpec {
                    data_type: p.data_type.clone(),
                    consumer_feature_ids: p.consumer_feature_ids.clone(),
                })
                .collect(),
        }
    }

    fn feature_summary(feature: &Feature) -> FeatureSummary {
        FeatureSummary {
            id: feature.id.clone(),
            module_id: feature.module_id.clone(),
            name: feature.name.clone(),
            status: feature.status.as_str().to_string(),
            priority: feature.priority.as_str().to_string(),
            dependency_count: feature.execution_dependencies.len(),
            relationship_count: feature.semantic_relationships.len(),
        }
    }

    fn feature_detail(feature: Feature) -> FeatureDetail {
        FeatureDetail {
            execution_dependencies: feature
                .execution_dependencies
                .iter()
                .map(|dep| DependencyEdge {
                    feature_id: dep.feature_id.clone(),
                    kind: dep.kind.as_str().to_string(),
                    reason: dep.reason.clone(),
                })
                .collect(),
            semantic_relationships: feature
                .semantic_relationships
                .iter()
                .map(|rel| RelationshipEdge {
                    feature_id: rel.feature_id.clone(),
                    kind: rel.kind.as_str().to_string(),
                    description: rel.description.clone(),
                })
                .collect(),
            data_contract: feature.data_contract.as_ref().map(Self::contract_spec),
            id: feature.id,
            module_id: feature.module_id,
            name: feature.name,
            status: feature.status.as_str().to_string(),
            priority: feature.priority.as_str().to_string(),
            problem_statement: feature.problem_statement,
            capability_tags: feature.capability_tags,
            target_users: feature.target_users,
            goals: feature.goals,
            in_scope: feature.in_scope,
            out_of_scope: feature.out_of_scope,
        }
    }

    fn issue_info(issue: Issue) -> IssueInfo {
        IssueInfo {
            id: issue.id,
            feature_id: issue.feature_id,
            title: issue.title,
            description: issue.description,
            status: issue.status.as_str().to_string(),
        }
    }

    // ============================================================
    // Test helpers - expose tool logic for testing
    // ============================================================

    pub fn test_create_module(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<ModuleInfo, McpError> {
        let module = self
            .db
            .create_module(CreateModuleInput {
                name: name.to_string(),
                description: description.map(|s| s.to_string()),
                relationships: vec![],
                integration_points: vec![],
            })
            .map_err(Self::db_err)?;

        Ok(ModuleInfo {
            id: module.id,
            name: module.name,
            description: module.description,
            feature_count: 0,
        })
    }

    pub fn test_update_module(&self, req: UpdateModuleRequest) -> Result<ModuleInfo, McpError> {
        let relationships = req.relationships.map(|edges| {
            edges
                .into_iter()
                .map(|edge| ModuleRelationship {
                    module_id: edge.module_id,
                    description: edge.description,
                })
                .collect()
        });
        let integration_points = req.integration_points.map(|edges| {
            edges
                .into_iter()
                .map(|edge| IntegrationPoint {
                    source_feature_id: edge.source_feature_id,
                    target_feature_id: edge.target_feature_id,
                    description: edge.description,
                })
                .collect()
        });

        let module = self
            .db
            .update_module(
                &req.module_id,
                UpdateModuleInput {
                    name: req.name,
                    description: req.description,
                    relationships,
                    integration_points,
                },
            )
            .map_err(Self::db_err)?
            .ok_or_else(|| McpError::invalid_params("Module not found", None))?;

        let feature_count = self
            .db
            .get_features_by_module(&module.id)
            .map_err(Self::db_err)?
            .len();

        Ok(ModuleInfo {
            id: module.id,
            name: module.name,
            description: module.description,
            feature_count,
        })
    }

    pub fn test_list_modules(&self) -> Result<ModuleListResponse, McpError> {
        let modules = self.db.get_all_modules().map_err(Self::db_err)?;

        let mut infos = Vec::with_capacity(modules.len());
        for module in modules {
            let feature_count = self
                .db
                .get_features_by_module(&module.id)
                .map_err(Self::db_err)?
                .len();
            infos.push(ModuleInfo {
                id: module.id,
                name: module.name,
                description: module.description,
                feature_count,
            });
        }

        Ok(ModuleListResponse { modules: infos })
    }

    pub fn test_create_feature(&self, req: CreateFeatureRequest) -> Result<FeatureDetail, McpError> {
        self.db
            .get_module(&req.module_id)
            .map_err(Self::db_err)?
            .ok_or_else(|| McpError::invalid_params("Module not found", None))?;

        let status = req.status.as_deref().map(Self::parse_status).transpose()?;
        let priority = req
            .priority
            .as_deref()
            .map(Self::parse_priority)
            .transpose()?;
        let execution_dependencies = Self::parse_dependencies(req.execution_dependencies)?;
        let semantic_relationships = Self::parse_relationships(req.semantic_relationships)?;

        let feature = self
            .db
            .create_feature(CreateFeatureInput {
                module_id: req.module_id,
                name: req.name,
                problem_statement: req.problem_statement,
                status,
                priority,
                capability_tags: req.capability_tags,
                target_users: req.target_users,
                goals: req.goals,
                in_scope: req.in_scope,
                out_of_scope: req.out_of_scope,
                execution_dependencies,
                semantic_relationships,
                data_contract: req.data_contract.map(Self::contract_from_spec),
            })
            .map_err(Self::db_err)?;

        Ok(Self::feature_detail(feature))
    }

    pub fn test_get_feature(&self, feature_id: &str) -> Result<FeatureDetail, McpError> {
        let feature = self
            .db
            .get_feature(feature_id)
            .map_err(Self::db_err)?
            .ok_or_else(|| McpError::invalid_params("Feature not found", None))?;

        Ok(Self::feature_detail(feature))
    }

    pub fn test_update_feature(&self, req: UpdateFeatureRequest) -> Result<FeatureDetail, McpError> {
        if let Some(module_id) = &req.module_id {
            self.db
                .get_module(module_id)
                .map_err(Self::db_err)?
                .ok_or_else(|| McpError::invalid_params("Module not found", None))?;
        }

        let status = req.status.as_deref().map(Self::parse_status).transpose()?;
        let priority = req
            .priority
            .as_deref()
            .map(Self::parse_priority)
            .transpose()?;
        let execution_dependencies = req
            .execution_dependencies
            .map(Self::parse_dependencies)
            .transpose()?;
        let semantic_relationships = req
            .semantic_relationships
            .map(Self::parse_relationships)
            .transpose()?;

        let feature = self
            .db
            .update_feature(
                &req.feature_id,
                UpdateFeatureInput {
                    module_id: req.module_id,
                    name: req.name,
                    problem_statement: req.problem_statement,
                    status,
                    priority,
                    capability_tags: req.capability_tags,
                    target_users: req.target_users,
                    goals: req.goals,
                    in_scope: req.in_scope,
                    out_of_scope: req.out_of_scope,
                    execution_dependencies,
                    semantic_relationships,
                    data_contract: req.data_contract.map(Self::contract_from_spec),
                },
            )
            .map_err(Self::db_err)?
            .ok_or_else(|| McpError::invalid_params("Feature not found", None))?;

        Ok(Self::feature_detail(feature))
    }

    pub fn test_delete_feature(&self, feature_id: &str) -> Result<(), McpError> {
        let deleted = self.db.delete_feature(feature_id).map_err(Self::db_err)?;
        if !deleted {
            return Err(McpError::invalid_params("Feature not found", None));
        }
        Ok(())
    }

    pub fn test_list_features(
        &self,
        module_id: Option<&str>,
        status: Option<&str>,
    ) -> Result<FeatureListResponse, McpError> {
        self.test_list_features_paged(module_id, status, None, None)
    }

    pub fn test_list_features_paged(
        &self,
        module_id: Option<&str>,
        status: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<FeatureListResponse, McpError> {
        let features = match module_id {
            Some(module_id) => self
                .db
                .get_features_by_module(module_id)
                .map_err(Self::db_err)?,
            None => self.db.get_all_features().map_err(Self::db_err)?,
        };

        let features: Vec<_> = match status {
            Some(status) => {
                let target = Self::parse_status(status)?;
                features
                    .into_iter()
                    .filter(|f| f.status == target)
                    .collect()
            }
            None => features,
        };

        let offset = offset.unwrap_or(0) as usize;
        let features: Vec<_> = features.into_iter().skip(offset).collect();
        let features: Vec<_> = match limit {
            Some(limit) => features.into_iter().take(limit as usize).collect(),
            None => features,
        };

        Ok(FeatureListResponse {
            features: features.iter().map(Self::feature_summary).collect(),
        })
    }

    pub fn test_create_issue(
        &self,
        title: &str,
        description: Option<&str>,
        feature_id: Option<&str>,
    ) -> Result<IssueInfo, McpError> {
        if let Some(feature_id) = feature_id {
            self.db
                .get_feature(feature_id)
                .map_err(Self::db_err)?
                .ok_or_else(|| McpError::invalid_params("Feature not found", None))?;
        }

        let issue = self
            .db
            .create_issue(CreateIssueInput {
                feature_id: feature_id.map(|s| s.to_string()),
                title: title.to_string(),
                description: description.map(|s| s.to_string()),
            })
            .map_err(Self::db_err)?;

        Ok(Self::issue_info(issue))
    }

    pub fn test_update_issue(&self, req: UpdateIssueRequest) -> Result<IssueInfo, McpError> {
        let status = req
            .status
            .as_deref()
            .map(Self::parse_issue_status)
            .transpose()?;

        let issue = self
            .db
            .update_issue(
                &req.issue_id,
                UpdateIssueInput {
                    title: req.title,
                    description: req.description,
                    status,
                },
            )
            .map_err(Self::db_err)?
            .ok_or_else(|| McpError::invalid_params("Issue not found", None))?;

        Ok(Self::issue_info(issue))
    }

    pub fn test_list_issues(
        &self,
        feature_id: Option<&str>,
        status: Option<&str>,
    ) -> Result<IssueListResponse, McpError> {
        let issues = match feature_id {
            Some(feature_id) => self
                .db
                .get_issues_by_feature(feature_id)
                .map_err(Self::db_err)?,
            None => self.db.get_all_issues().map_err(Self::db_err)?,
        };

        let issues: Vec<_> = match status {
            Some(status) => {
                let target = Self::parse_issue_status(status)?;
                issues.into_iter().filter(|i| i.status == target).collect()
            }
            None => issues,
        };

        Ok(IssueListResponse {
            issues: issues.into_iter().map(Self::issue_info).collect(),
        })
    }

    pub fn test_get_dependency_graph(&self) -> Result<DependencyGraphResponse, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let graph = FeatureGraph::build(&features);
        let cycles = graph.detect_cycles();

        let nodes = graph
            .nodes()
            .values()
            .map(|node| GraphNodeInfo {
                feature_id: node.feature.id.clone(),
                name: node.feature.name.clone(),
                status: node.feature.status.as_str().to_string(),
                depth: node.depth,
                dependencies: node.dependencies.clone(),
                dependents: node.dependents.clone(),
            })
            .collect();

        Ok(DependencyGraphResponse { nodes, cycles })
    }

    pub fn test_get_feature_dependencies(
        &self,
        feature_id: &str,
    ) -> Result<FeatureDependenciesResponse, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let graph = FeatureGraph::build(&features);
        let node = graph
            .get(feature_id)
            .ok_or_else(|| McpError::invalid_params("Feature not found", None))?;

        let dependencies = node
            .feature
            .execution_dependencies
            .iter()
            .map(|dep| {
                let resolved = graph.get(&dep.feature_id);
                DependencyStatusInfo {
                    feature_id: dep.feature_id.clone(),
                    name: resolved.map(|n| n.feature.name.clone()),
                    status: resolved.map(|n| n.feature.status.as_str().to_string()),
                    kind: dep.kind.as_str().to_string(),
                    reason: dep.reason.clone(),
                    satisfied: resolved
                        .map(|n| n.feature.status == FeatureStatus::Completed)
                        .unwrap_or(false),
                }
            })
            .collect();

        let dependents = node
            .dependents
            .iter()
            .filter_map(|id| graph.get(id))
            .map(|n| DependentInfo {
                feature_id: n.feature.id.clone(),
                name: n.feature.name.clone(),
                status: n.feature.status.as_str().to_string(),
            })
            .collect();

        Ok(FeatureDependenciesResponse {
            feature_id: node.feature.id.clone(),
            name: node.feature.name.clone(),
            depth: node.depth,
            downstream_blocked: graph.count_downstream_blocked(feature_id).unwrap_or(0),
            dependencies,
            dependents,
        })
    }

    pub fn test_get_critical_path(&self, feature_id: &str) -> Result<String, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let report = graph::critical_path(&features, feature_id)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        Ok(render::render_critical_path(&report))
    }

    pub fn test_list_ready_features(&self) -> Result<FeatureListResponse, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let graph = FeatureGraph::build(&features);

        let ready: Vec<FeatureSummary> = graph
            .ready_features()
            .iter()
            .filter_map(|id| graph.get(id))
            .map(|node| Self::feature_summary(&node.feature))
            .collect();

        Ok(FeatureListResponse { features: ready })
    }

    pub fn test_list_blocked_features(&self) -> Result<BlockedFeaturesResponse, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let graph = FeatureGraph::build(&features);

        let blocked = graph
            .blocked_features()
            .into_iter()
            .filter_map(|(id, blocker_ids)| {
                let node = graph.get(&id)?;
                let blockers = blocker_ids
                    .iter()
                    .map(|blocker_id| {
                        let resolved = graph.get(blocker_id);
                        BlockerInfo {
                            feature_id: blocker_id.clone(),
                            name: resolved.map(|n| n.feature.name.clone()),
                            status: resolved.map(|n| n.feature.status.as_str().to_string()),
                        }
                    })
                    .collect();
                Some(BlockedFeatureInfo {
                    feature_id: node.feature.id.clone(),
                    name: node.feature.name.clone(),
                    status: node.feature.status.as_str().to_string(),
                    blockers,
                })
            })
            .collect();

        Ok(BlockedFeaturesResponse { blocked })
    }

    pub fn test_detect_cycles(&self) -> Result<CycleListResponse, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let cycles = FeatureGraph::build(&features).detect_cycles();

        Ok(CycleListResponse {
            cycle_count: cycles.len(),
            cycles,
        })
    }

    pub fn test_recommend_next_feature(&self) -> Result<String, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let recommendations = graph::recommend_next(&features);
        Ok(render::render_recommendations(&recommendations))
    }

    pub fn test_validate_relationships(&self) -> Result<String, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let modules = self.db.get_all_modules().map_err(Self::db_err)?;
        let report = relations::validate(&features, &modules);
        Ok(render::render_validation(&report))
    }

    pub fn test_check_feature_overlap(&self, feature_id: &str) -> Result<String, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let target = features
            .iter()
            .find(|f| f.id == feature_id)
            .ok_or_else(|| McpError::invalid_params("Feature not found", None))?;

        let candidate = relations::OverlapCandidate::from(target);
        let others: Vec<Feature> = features
            .iter()
            .filter(|f| f.id != feature_id)
            .cloned()
            .collect();
        let results = relations::score_overlap(&candidate, &others);

        Ok(render::render_overlaps(&target.name, &results))
    }

    pub fn test_find_similar_features(
        &self,
        query: &str,
        threshold: Option<f64>,
        limit: Option<u32>,
    ) -> Result<SimilarFeaturesResponse, McpError> {
        let features = self.db.get_all_features().map_err(Self::db_err)?;
        let threshold = threshold.unwrap_or(relations::DEFAULT_SIMILARITY_THRESHOLD);

        let mut hits = relations::similarity_search(query, &features, threshold);
        if let Some(limit) = limit {
            hits.truncate(limit as usize);
        }

        Ok(SimilarFeaturesResponse {
            query: query.to_string(),
            matches: hits
                .into_iter()
                .map(|hit| SimilarFeatureInfo {
                    feature_id: hit.feature_id,
                    name: hit.feature_name,
                    score: hit.score,
                })
                .collect(),
        })
    }
}

#[tool_router]
impl McpServer {
    // ============================================================
    // Record Tools - Create and maintain modules, features, issues
    // ============================================================

    #[tool(
        description = "Create a module, a bounded area of the product that owns features. Create modules before features - every feature must belong to one. Keep modules coarse (e.g. 'billing', 'ingestion', 'reporting'); use features for the actual capabilities."
    )]
    async fn create_module(
        &self,
        params: Parameters<CreateModuleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let info = self.test_create_module(&req.name, req.description.as_deref())?;
        Self::json_result(&info)
    }

    #[tool(
        description = "Update a module's name, description, declared relationships to other modules, or integration points. Declare a module relationship whenever features in two modules are expected to talk to each other - the validator flags undeclared boundary crossings."
    )]
    async fn update_module(
        &self,
        params: Parameters<UpdateModuleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let info = self.test_update_module(params.0)?;
        Self::json_result(&info)
    }

    #[tool(
        description = "List every module with its feature count. Use this to find where a new feature belongs before calling create_feature."
    )]
    async fn list_modules(&self) -> Result<CallToolResult, McpError> {
        let response = self.test_list_modules()?;
        Self::json_result(&response)
    }

    #[tool(
        description = "Create a feature inside a module. Name by capability ('CSV Export', not 'implement export'). Fill capability_tags, target_users, and scope phrases honestly - overlap detection compares them across features. Declare execution_dependencies for hard ordering ('requires'/'blocks') and semantic_relationships for conceptual structure. Before creating, consider find_similar_features to avoid duplicating an existing feature."
    )]
    async fn create_feature(
        &self,
        params: Parameters<CreateFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let detail = self.test_create_feature(params.0)?;
        Self::json_result(&detail)
    }

    #[tool(
        description = "Fetch one feature with everything stored on it: scope, tags, dependencies, relationships, and data contract."
    )]
    async fn get_feature(
        &self,
        params: Parameters<GetFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let detail = self.test_get_feature(&params.0.feature_id)?;
        Self::json_result(&detail)
    }

    #[tool(
        description = "Update a feature. Only the fields you pass change; list fields replace the stored list wholesale, so send the full new list. Set status to 'completed' when a feature ships - readiness and blocking analyses key off that status."
    )]
    async fn update_feature(
        &self,
        params: Parameters<UpdateFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let detail = self.test_update_feature(params.0)?;
        Self::json_result(&detail)
    }

    #[tool(
        description = "Delete a feature. Issues linked to it are kept but unlinked. Other features' edges pointing at it become dangling - run validate_relationships afterwards to find them."
    )]
    async fn delete_feature(
        &self,
        params: Parameters<DeleteFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.test_delete_feature(&params.0.feature_id)?;
        Ok(CallToolResult::success(vec![Content::text(
            "Feature deleted",
        )]))
    }

    #[tool(
        description = "List features as summaries (id, module, status, priority, edge counts). Filter by module_id and/or status. Use get_feature for full detail on one feature."
    )]
    async fn list_features(
        &self,
        params: Parameters<ListFeaturesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.test_list_features_paged(
            req.module_id.as_deref(),
            req.status.as_deref(),
            req.limit,
            req.offset,
        )?;
        Self::json_result(&response)
    }

    #[tool(
        description = "Record an issue - a question, defect, or decision that needs attention. Link it to a feature when it is about one. Issues start 'open'."
    )]
    async fn create_issue(
        &self,
        params: Parameters<CreateIssueRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let info = self.test_create_issue(
            &req.title,
            req.description.as_deref(),
            req.feature_id.as_deref(),
        )?;
        Self::json_result(&info)
    }

    #[tool(
        description = "Update an issue's title, description, or status. Set status to 'resolved' when addressed, or 'wont-fix' when deliberately declined."
    )]
    async fn update_issue(
        &self,
        params: Parameters<UpdateIssueRequest>,
    ) -> Result<CallToolResult, McpError> {
        let info = self.test_update_issue(params.0)?;
        Self::json_result(&info)
    }

    #[tool(
        description = "List issues, newest first. Filter by feature_id and/or status ('open', 'resolved', 'wont-fix')."
    )]
    async fn list_issues(
        &self,
        params: Parameters<ListIssuesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.test_list_issues(req.feature_id.as_deref(), req.status.as_deref())?;
        Self::json_result(&response)
    }

    // ============================================================
    // Analysis Tools - Scheduling and quality questions
    // ============================================================

    #[tool(
        description = "Return the full hard-dependency graph: every feature with its dependencies, dependents, chain depth, and any cycles. Depth 0 means no prerequisites. Use this for an overview before planning an implementation order."
    )]
    async fn get_dependency_graph(&self) -> Result<CallToolResult, McpError> {
        let response = self.test_get_dependency_graph()?;
        Self::json_result(&response)
    }

    #[tool(
        description = "Inspect one feature's position in the dependency graph: each declared dependency with its kind, current status, and whether it is satisfied (completed), plus the features depending on this one."
    )]
    async fn get_feature_dependencies(
        &self,
        params: Parameters<GetFeatureDependenciesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let response = self.test_get_feature_dependencies(&params.0.feature_id)?;
        Self::json_result(&response)
    }

    #[tool(
        description = "Compute the longest prerequisite chain that must complete before a feature can ship, rendered as a numbered markdown list with each step's status. Cycles, if any, are reported alongside."
    )]
    async fn get_critical_path(
        &self,
        params: Parameters<GetCriticalPathRequest>,
    ) -> Result<CallToolResult, McpError> {
        let rendered = self.test_get_critical_path(&params.0.feature_id)?;
        Ok(CallToolResult::success(vec![Content::text(rendered)]))
    }

    #[tool(
        description = "List features that could start right now: not completed themselves, with every hard dependency completed. Features with no dependencies count as ready."
    )]
    async fn list_ready_features(&self) -> Result<CallToolResult, McpError> {
        let response = self.test_list_ready_features()?;
        Self::json_result(&response)
    }

    #[tool(
        description = "List features that cannot start yet, each with the specific dependencies holding it back. A dependency blocks when it is not completed or does not exist."
    )]
    async fn list_blocked_features(&self) -> Result<CallToolResult, McpError> {
        let response = self.test_list_blocked_features()?;
        Self::json_result(&response)
    }

    #[tool(
        description = "Find circular hard dependencies. Each cycle is returned as a path of feature ids starting and ending on the same id. Any cycle must be broken before the features in it can be scheduled."
    )]
    async fn detect_dependency_cycles(&self) -> Result<CallToolResult, McpError> {
        let response = self.test_detect_cycles()?;
        Self::json_result(&response)
    }

    #[tool(
        description = "Rank the ready features by priority and downstream impact and explain each pick. Use this to answer 'what should we build next?'."
    )]
    async fn recommend_next_feature(&self) -> Result<CallToolResult, McpError> {
        let rendered = self.test_recommend_next_feature()?;
        Ok(CallToolResult::success(vec![Content::text(rendered)]))
    }

    #[tool(
        description = "Check the whole relationship graph for structural defects: references to unknown features, self-references, circular dependencies, one-sided relationships, data contracts that do not line up, undeclared module boundary crossings, orphaned features, and over-deep dependency chains. Returns a markdown report grouped by severity."
    )]
    async fn validate_relationships(&self) -> Result<CallToolResult, McpError> {
        let rendered = self.test_validate_relationships()?;
        Ok(CallToolResult::success(vec![Content::text(rendered)]))
    }

    #[tool(
        description = "Compare one feature against every other feature for overlap: shared capability tags, similar problem statements, shared target users, and scope phrases that collide. Returns a markdown report with a low/medium/high severity per overlapping feature and recommended actions. Run this before splitting or merging features."
    )]
    async fn check_feature_overlap(
        &self,
        params: Parameters<CheckFeatureOverlapRequest>,
    ) -> Result<CallToolResult, McpError> {
        let rendered = self.test_check_feature_overlap(&params.0.feature_id)?;
        Ok(CallToolResult::success(vec![Content::text(rendered)]))
    }

    #[tool(
        description = "Search stored features by free-text similarity against their problem statements, goals, and scope. Use this before create_feature to catch duplicates early. Returns matches scored 0.0 to 1.0, highest first."
    )]
    async fn find_similar_features(
        &self,
        params: Parameters<FindSimilarFeaturesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let response = self.test_find_similar_features(&req.query, req.threshold, req.limit)?;
        Self::json_result(&response)
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "trellis".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"Trellis keeps a product's feature graph and answers planning questions about it.

DATA MODEL:
- Module: a bounded area of the product (e.g. 'billing'). Owns features. Declares
  which other modules it talks to and which feature pairs realize those connections.
- Feature: a capability inside a module. Carries two kinds of edges:
  - execution_dependencies: hard ordering ('requires'/'blocks' mean the referenced
    feature must be COMPLETED first; 'related' is context only).
  - semantic_relationships: conceptual structure (depends-on, provides-data-to,
    consumes-data-from, overlaps-with, complements, supersedes, blocks,
    integrates-with, extends, replaced-by). Never affects scheduling directly;
    only depends-on and blocks participate in cycle checking.
- Issue: a question or defect, optionally linked to a feature.

FEATURE DISCIPLINE:
- Name by capability: 'CSV Export', 'Rate Limiting' - not 'implement exporting'.
- problem_statement describes the PROBLEM, not the implementation. Overlap
  detection compares these texts; two features describing the same problem in
  different words should score as similar.
- capability_tags, target_users, in_scope, and out_of_scope feed overlap severity.
  Fill them honestly; empty lists silently weaken duplicate detection.
- Statuses: proposed -> planned -> in-progress -> completed (or deprecated).
  Scheduling treats ONLY 'completed' as done.

SETUP (new product map):
1. create_module for each product area
2. create_feature for each capability, with dependencies as you know them
3. update_module to declare module relationships once features start crossing
   boundaries

PLANNING WORKFLOW (what to build next):
1. validate_relationships - fix errors first; analyses degrade on a broken graph
2. detect_dependency_cycles - break any cycle by removing or downgrading an edge
3. recommend_next_feature - ranked ready features with reasons
4. get_critical_path on a target feature to see the chain it is waiting on
5. update_feature to mark work completed; readiness recomputes from status

QUALITY WORKFLOW (keeping the map healthy):
1. find_similar_features BEFORE creating a feature - catch duplicates early
2. check_feature_overlap on a suspect feature - shared tags, similar text,
   colliding scope phrases, with a severity and recommended actions
3. validate_relationships periodically - dangling references appear whenever a
   feature is deleted; orphans appear when features never declare relationships
4. create_issue to track anything a human must decide

READING ANALYSIS OUTPUT:
- 'ready' means every hard dependency is completed, not merely declared.
- A dependency on a feature id that does not exist blocks its feature and shows
  up in validation as a dangling-reference error. Fix the id or remove the edge.
- Critical path lengths are exact on an acyclic graph and best-effort when
  cycles exist; the report says which.

IMPORTANT:
- Keep edges current: stale 'requires' edges block features that could ship.
- Prefer few, honest dependencies over many speculative ones.
- Re-run validate_relationships after bulk edits."#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(db: Database) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(db);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
