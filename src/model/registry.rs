use std::collections::HashMap;

use crate::{
    config::AppConfig,
    error::ServiceError,
    graph::InferenceSession,
    model::{ModelMetadata, PredictionResponse},
};

/// Loaded serving state: metadata plus an open session on the converted
/// graph. Immutable after initialization.
pub struct ModelRegistry {
    metadata: ModelMetadata,
    session: InferenceSession,
}

impl ModelRegistry {
    pub fn initialize(config: &AppConfig) -> Result<Self, ServiceError> {
        let metadata = ModelMetadata::load(&config.metadata_path)?;
        let session = InferenceSession::open(&config.graph_path)?;

        if session.input_width() != metadata.feature_count() {
            return Err(ServiceError::Graph(format!(
                "graph expects {} features but metadata declares {}",
                session.input_width(),
                metadata.feature_count()
            )));
        }

        Ok(Self { metadata, session })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn predict(
        &self,
        features: &HashMap<String, f64>,
    ) -> Result<PredictionResponse, ServiceError> {
        let vector = self.metadata.vector_from(features)?;
        let probability = self.session.predict_proba(&vector)?;
        Ok(PredictionResponse::from_probability(probability))
    }
}
