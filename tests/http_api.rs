//! End-to-end tests: convert a small model, serve it, and exercise the HTTP
//! surface with the real client.

use std::{fs, net::SocketAddr, sync::Arc};

use axum::{body::Body, http::Request};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use diabetes_risk_service::smoke::{SmokeClient, sample_payload};
use diabetes_risk_service::{AppConfig, ModelRegistry, adapter, build_router, run_conversion};

const FEATURE_NAMES: [&str; 21] = [
    "HighBP",
    "HighChol",
    "CholCheck",
    "BMI",
    "Smoker",
    "Stroke",
    "HeartDiseaseorAttack",
    "PhysActivity",
    "Fruits",
    "Veggies",
    "HvyAlcoholConsump",
    "AnyHealthcare",
    "NoDocbcCost",
    "GenHlth",
    "MentHlth",
    "PhysHlth",
    "DiffWalk",
    "Sex",
    "Age",
    "Education",
    "Income",
];

// One split on BMI (index 3) at 25.0; the sample payload's 28.5 lands on the
// positive leaf.
const MODEL_JSON: &str = r#"{
    "base_score": 0.0,
    "trees": [{
        "feature": [3, -1, -1],
        "threshold": [25.0, 0.0, 0.0],
        "left": [1, 0, 0],
        "right": [2, 0, 0],
        "value": [0.0, -0.9, 1.1]
    }]
}"#;

fn metadata_json() -> String {
    let names: Vec<String> = FEATURE_NAMES.iter().map(|n| format!("\"{n}\"")).collect();
    format!(
        r#"{{"model_type":"XGBClassifier","xgboost_version":"2.0.3","accuracy":0.8634,"feature_names":[{}]}}"#,
        names.join(",")
    )
}

fn converted_config(dir: &TempDir) -> Arc<AppConfig> {
    let model_path = dir.path().join("diabetes_model.json");
    let metadata_path = dir.path().join("model_metadata.json");
    let graph_path = dir.path().join("assets/models/diabetes_model.graph.json");
    fs::write(&model_path, MODEL_JSON).unwrap();
    fs::write(&metadata_path, metadata_json()).unwrap();
    run_conversion(&model_path, &metadata_path, &graph_path).unwrap();

    Arc::new(AppConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        model_path,
        metadata_path,
        graph_path,
        smoke_base_url: String::new(),
    })
}

fn app_router(config: &Arc<AppConfig>) -> axum::Router {
    let registry = Arc::new(ModelRegistry::initialize(config.as_ref()).unwrap());
    build_router(config.clone(), registry)
}

async fn spawn_app(config: &Arc<AppConfig>) -> SocketAddr {
    let router = app_router(config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn health_reports_model_loaded() {
    let dir = TempDir::new().unwrap();
    let config = converted_config(&dir);
    let addr = spawn_app(&config).await;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn model_info_matches_metadata() {
    let dir = TempDir::new().unwrap();
    let config = converted_config(&dir);
    let addr = spawn_app(&config).await;

    let body: Value = reqwest::get(format!("http://{addr}/model-info"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["model_type"], "XGBClassifier");
    assert_eq!(body["feature_count"], 21);
    assert_eq!(body["feature_names"].as_array().unwrap().len(), 21);
    assert!(
        body["graph_path"]
            .as_str()
            .unwrap()
            .ends_with("diabetes_model.graph.json")
    );
}

#[tokio::test]
async fn predict_returns_contract_fields() {
    let dir = TempDir::new().unwrap();
    let config = converted_config(&dir);
    let addr = spawn_app(&config).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/predict"))
        .json(&sample_payload())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    // Sample BMI of 28.5 crosses the tree's 25.0 split.
    assert_eq!(body["prediction"], 1);
    let risk = body["risk_percentage"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&risk));
    let category = body["risk_category"].as_str().unwrap();
    assert!(["Low Risk", "Moderate Risk", "High Risk"].contains(&category));
    assert!(body["confidence"].as_f64().unwrap() >= 0.5);
}

#[tokio::test]
async fn predict_rejects_missing_feature() {
    let dir = TempDir::new().unwrap();
    let config = converted_config(&dir);
    let addr = spawn_app(&config).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/predict"))
        .json(&json!({"features": {"BMI": 28.5}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("missing feature"));
}

#[tokio::test]
async fn smoke_checks_pass_against_live_server() {
    let dir = TempDir::new().unwrap();
    let config = converted_config(&dir);
    let addr = spawn_app(&config).await;

    let outcomes = SmokeClient::new(&format!("http://{addr}")).run_all().await;
    assert_eq!(outcomes.len(), 4);
    for outcome in &outcomes {
        assert!(outcome.result.is_ok(), "{} failed", outcome.name);
    }
}

#[tokio::test]
async fn adapter_returns_the_routers_response_unchanged() {
    let dir = TempDir::new().unwrap();
    let config = converted_config(&dir);

    let request = || {
        Request::builder()
            .uri("/model-info")
            .body(Body::empty())
            .unwrap()
    };

    let direct = app_router(&config)
        .oneshot(request())
        .await
        .unwrap();
    let adapted = adapter::forward(app_router(&config), request()).await;

    assert_eq!(direct.status(), adapted.status());
    let direct_body = axum::body::to_bytes(direct.into_body(), usize::MAX)
        .await
        .unwrap();
    let adapted_body = axum::body::to_bytes(adapted.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(direct_body, adapted_body);
}
