use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::graph::{self, CriticalPathReport, FeatureGraph, Recommendation};
use crate::models::*;
use crate::relations::{
    self, OverlapCandidate, OverlapResult, SimilarityHit, ValidationReport,
};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
///
/// Parent-lookup failures raised by the storage layer ("Module not found",
/// "Feature not found") are client mistakes and come back as-is with a
/// BAD_REQUEST status.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Modules
// ============================================================

pub async fn list_modules(
    State(db): State<Database>,
) -> Result<Json<Vec<Module>>, (StatusCode, String)> {
    db.get_all_modules().map(Json).map_err(internal_error)
}

pub async fn get_module(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<Module>, (StatusCode, String)> {
    db.get_module(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(not_found("Module"))
}

pub async fn create_module(
    State(db): State<Database>,
    Json(input): Json<CreateModuleInput>,
) -> Result<(StatusCode, Json<Module>), (StatusCode, String)> {
    db.create_module(input)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(internal_error)
}

pub async fn update_module(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(input): Json<UpdateModuleInput>,
) -> Result<Json<Module>, (StatusCode, String)> {
    db.update_module(&id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(not_found("Module"))
}

pub async fn delete_module(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_module(&id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Module"))
    }
}

pub async fn list_module_features(
    State(db): State<Database>,
    Path(module_id): Path<String>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    db.get_features_by_module(&module_id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Features
// ============================================================

/// Query parameters for listing features.
#[derive(Debug, Deserialize)]
pub struct ListFeaturesQuery {
    /// Only return features with this status.
    pub status: Option<String>,
    /// Maximum number of results to return.
    pub limit: Option<u32>,
    /// Number of results to skip, for paging.
    pub offset: Option<u32>,
}

pub async fn list_features(
    State(db): State<Database>,
    Query(query): Query<ListFeaturesQuery>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;

    let features: Vec<_> = match &query.status {
        Some(status) => {
            let target = FeatureStatus::from_str(status).ok_or((
                StatusCode::BAD_REQUEST,
                format!("Invalid status '{}'", status),
            ))?;
            features.into_iter().filter(|f| f.status == target).collect()
        }
        None => features,
    };

    let offset = query.offset.unwrap_or(0) as usize;
    let features: Vec<_> = features.into_iter().skip(offset).collect();
    let features: Vec<_> = match query.limit {
        Some(limit) => features.into_iter().take(limit as usize).collect(),
        None => features,
    };

    Ok(Json(features))
}

pub async fn get_feature(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.get_feature(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(not_found("Feature"))
}

pub async fn create_feature(
    State(db): State<Database>,
    Json(input): Json<CreateFeatureInput>,
) -> Result<(StatusCode, Json<Feature>), (StatusCode, String)> {
    db.create_feature(input)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(internal_error)
}

pub async fn update_feature(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(input): Json<UpdateFeatureInput>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.update_feature(&id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(not_found("Feature"))
}

pub async fn delete_feature(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_feature(&id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Feature"))
    }
}

/// Query parameters for free-text feature search.
#[derive(Debug, Deserialize)]
pub struct SearchFeaturesQuery {
    /// Text to match against problem statements, goals, and scope.
    pub q: String,
    /// Minimum similarity score. Defaults to 0.3.
    pub threshold: Option<f64>,
    /// Maximum number of results to return.
    pub limit: Option<u32>,
}

/// Search features by text similarity, highest score first.
pub async fn search_features(
    State(db): State<Database>,
    Query(query): Query<SearchFeaturesQuery>,
) -> Result<Json<Vec<SimilarityHit>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    let threshold = query
        .threshold
        .unwrap_or(relations::DEFAULT_SIMILARITY_THRESHOLD);

    let mut hits = relations::similarity_search(&query.q, &features, threshold);
    if let Some(limit) = query.limit {
        hits.truncate(limit as usize);
    }

    Ok(Json(hits))
}

// ============================================================
// Dependency Analysis
// ============================================================

/// A feature's place in the dependency graph.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureDependenciesView {
    pub feature: Feature,
    pub depth: usize,
    pub downstream_blocked: usize,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

pub async fn get_feature_dependencies(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<FeatureDependenciesView>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    let graph = FeatureGraph::build(&features);
    let node = graph.get(&id).ok_or(not_found("Feature"))?;

    Ok(Json(FeatureDependenciesView {
        feature: node.feature.clone(),
        depth: node.depth,
        downstream_blocked: graph.count_downstream_blocked(&id).unwrap_or(0),
        dependencies: node.dependencies.clone(),
        dependents: node.dependents.clone(),
    }))
}

pub async fn get_critical_path(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<CriticalPathReport>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    graph::critical_path(&features, &id)
        .map(Json)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

pub async fn analysis_ready(
    State(db): State<Database>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    let graph = FeatureGraph::build(&features);

    let ready: Vec<Feature> = graph
        .ready_features()
        .iter()
        .filter_map(|id| graph.get(id))
        .map(|node| node.feature.clone())
        .collect();

    Ok(Json(ready))
}

/// Blocked feature ids mapped to the dependency ids holding them back.
pub async fn analysis_blocked(
    State(db): State<Database>,
) -> Result<Json<BTreeMap<String, Vec<String>>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(FeatureGraph::build(&features).blocked_features()))
}

pub async fn analysis_cycles(
    State(db): State<Database>,
) -> Result<Json<Vec<Vec<String>>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(FeatureGraph::build(&features).detect_cycles()))
}

pub async fn analysis_recommendations(
    State(db): State<Database>,
) -> Result<Json<Vec<Recommendation>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(graph::recommend_next(&features)))
}

// ============================================================
// Relationship Quality
// ============================================================

pub async fn analysis_validation(
    State(db): State<Database>,
) -> Result<Json<ValidationReport>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    let modules = db.get_all_modules().map_err(internal_error)?;
    Ok(Json(relations::validate(&features, &modules)))
}

/// Scores a proposed feature against every stored feature. The body is a
/// candidate description, not a stored feature; to check a stored feature,
/// fetch it and post its fields.
pub async fn analysis_overlap(
    State(db): State<Database>,
    Json(candidate): Json<OverlapCandidate>,
) -> Result<Json<Vec<OverlapResult>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(relations::score_overlap(&candidate, &features)))
}

// ============================================================
// Issues
// ============================================================

/// Query parameters for listing issues.
#[derive(Debug, Deserialize)]
pub struct ListIssuesQuery {
    /// Only return issues linked to this feature.
    pub feature_id: Option<String>,
    /// Only return issues with this status.
    pub status: Option<String>,
}

pub async fn list_issues(
    State(db): State<Database>,
    Query(query): Query<ListIssuesQuery>,
) -> Result<Json<Vec<Issue>>, (StatusCode, String)> {
    let issues = match &query.feature_id {
        Some(feature_id) => db.get_issues_by_feature(feature_id).map_err(internal_error)?,
        None => db.get_all_issues().map_err(internal_error)?,
    };

    let issues: Vec<_> = match &query.status {
        Some(status) => {
            let target = IssueStatus::from_str(status).ok_or((
                StatusCode::BAD_REQUEST,
                format!("Invalid status '{}'", status),
            ))?;
            issues.into_iter().filter(|i| i.status == target).collect()
        }
        None => issues,
    };

    Ok(Json(issues))
}

pub async fn get_issue(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<Issue>, (StatusCode, String)> {
    db.get_issue(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(not_found("Issue"))
}

pub async fn create_issue(
    State(db): State<Database>,
    Json(input): Json<CreateIssueInput>,
) -> Result<(StatusCode, Json<Issue>), (StatusCode, String)> {
    db.create_issue(input)
        .map(|i| (StatusCode::CREATED, Json(i)))
        .map_err(internal_error)
}

pub async fn update_issue(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(input): Json<UpdateIssueInput>,
) -> Result<Json<Issue>, (StatusCode, String)> {
    db.update_issue(&id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or(not_found("Issue"))
}

pub async fn delete_issue(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_issue(&id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Issue"))
    }
}
