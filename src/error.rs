use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("model artifact error: {0}")]
    Artifact(String),
    #[error("metadata error: {0}")]
    Metadata(String),
    #[error("graph error: {0}")]
    Graph(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("quantization error: {0}")]
    Quantization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Artifact(_)
            | ServiceError::Metadata(_)
            | ServiceError::Graph(_)
            | ServiceError::Inference(_)
            | ServiceError::Quantization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
