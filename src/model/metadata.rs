use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Training-time metadata shipped next to the model artifact.
///
/// `feature_names` is authoritative for input ordering: every feature vector
/// handed to the graph is assembled in this order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub xgboost_version: String,
    pub accuracy: f64,
    pub feature_names: Vec<String>,
}

impl ModelMetadata {
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ServiceError::Metadata(format!("cannot read {}: {e}", path.display()))
        })?;
        let metadata: ModelMetadata = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Metadata(format!("invalid metadata document: {e}")))?;
        if metadata.feature_names.is_empty() {
            return Err(ServiceError::Metadata(
                "metadata declares no feature names".into(),
            ));
        }
        Ok(metadata)
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Assemble a model input vector from named features, in declared order.
    /// A name missing from the map is an error rather than a silent default.
    pub fn vector_from(&self, features: &HashMap<String, f64>) -> Result<Vec<f32>, ServiceError> {
        let mut vector = Vec::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            let value = features.get(name).ok_or_else(|| {
                ServiceError::BadRequest(format!("missing feature '{name}'"))
            })?;
            vector.push(*value as f32);
        }
        Ok(vector)
    }
}
