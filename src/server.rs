use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{ModelRegistry, PredictRequest, PredictionResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ModelRegistry>,
}

#[derive(Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    endpoints: [&'static str; 4],
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

#[derive(Serialize)]
struct ModelInfoResponse {
    model_type: String,
    model_version: String,
    accuracy: f64,
    feature_count: usize,
    feature_names: Vec<String>,
    graph_path: String,
}

pub fn build_router(config: Arc<AppConfig>, registry: Arc<ModelRegistry>) -> Router {
    let state = AppState { config, registry };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/model-info", get(model_info))
        .route("/predict", post(predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "diabetes-risk-api",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ["/", "/health", "/model-info", "/predict"],
    })
}

async fn health() -> Json<HealthResponse> {
    // The registry is loaded before the router is built, so reaching this
    // handler implies the model is available.
    Json(HealthResponse {
        status: "healthy",
        model_loaded: true,
    })
}

async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let metadata = state.registry.metadata();
    Json(ModelInfoResponse {
        model_type: metadata.model_type.clone(),
        model_version: metadata.xgboost_version.clone(),
        accuracy: metadata.accuracy,
        feature_count: metadata.feature_count(),
        feature_names: metadata.feature_names.clone(),
        graph_path: state.config.graph_path.display().to_string(),
    })
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    let response = state.registry.predict(&request.features)?;
    Ok(Json(response))
}
