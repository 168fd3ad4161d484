mod handlers;

pub use handlers::FeatureDependenciesView;

use axum::{
    routing::{get, post, put, delete},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;

pub fn create_router(db: Database) -> Router {
    let api = Router::new()
        // Modules
        .route("/modules", get(handlers::list_modules))
        .route("/modules", post(handlers::create_module))
        .route("/modules/{id}", get(handlers::get_module))
        .route("/modules/{id}", put(handlers::update_module))
        .route("/modules/{id}", delete(handlers::delete_module))
        .route("/modules/{id}/features", get(handlers::list_module_features))
        // Features
        .route("/features", get(handlers::list_features))
        .route("/features", post(handlers::create_feature))
        .route("/features/search", get(handlers::search_features))
        .route("/features/{id}", get(handlers::get_feature))
        .route("/features/{id}", put(handlers::update_feature))
        .route("/features/{id}", delete(handlers::delete_feature))
        .route("/features/{id}/dependencies", get(handlers::get_feature_dependencies))
        .route("/features/{id}/critical-path", get(handlers::get_critical_path))
        // Issues
        .route("/issues", get(handlers::list_issues))
        .route("/issues", post(handlers::create_issue))
        .route("/issues/{id}", get(handlers::get_issue))
        .route("/issues/{id}", put(handlers::update_issue))
        .route("/issues/{id}", delete(handlers::delete_issue))
        // Analysis
        .route("/analysis/ready", get(handlers::analysis_ready))
        .route("/analysis/blocked", get(handlers::analysis_blocked))
        .route("/analysis/cycles", get(handlers::analysis_cycles))
        .route("/analysis/validation", get(handlers::analysis_validation))
        .route("/analysis/recommendations", get(handlers::analysis_recommendations))
        .route("/analysis/overlap", post(handlers::analysis_overlap))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}
