use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::ServiceError;

/// Marks a leaf in the per-tree parallel arrays.
pub const LEAF_FEATURE: i32 = -1;

/// One boosted tree as parallel node arrays. `feature[i] == -1` marks node
/// `i` as a leaf, in which case `value[i]` is its margin contribution and the
/// child slots are ignored; otherwise `threshold[i]` splits on
/// `x[feature[i]] < threshold[i]` with `left` taken on true.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeModel {
    pub feature: Vec<i32>,
    pub threshold: Vec<f32>,
    pub left: Vec<i32>,
    pub right: Vec<i32>,
    pub value: Vec<f32>,
}

impl TreeModel {
    pub fn validate(&self, n_features: usize) -> Result<(), ServiceError> {
        let n = self.feature.len();
        if self.threshold.len() != n
            || self.left.len() != n
            || self.right.len() != n
            || self.value.len() != n
        {
            return Err(ServiceError::Artifact(
                "tree node arrays have mismatched lengths".into(),
            ));
        }
        if n == 0 {
            return Err(ServiceError::Artifact("tree has no nodes".into()));
        }
        for (i, &f) in self.feature.iter().enumerate() {
            if f == LEAF_FEATURE {
                continue;
            }
            if f < 0 || f as usize >= n_features {
                return Err(ServiceError::Artifact(format!(
                    "node {i} splits on feature {f}, outside declared width {n_features}"
                )));
            }
            let (l, r) = (self.left[i], self.right[i]);
            if l < 0 || r < 0 || l as usize >= n || r as usize >= n {
                return Err(ServiceError::Artifact(format!(
                    "node {i} has out-of-range children ({l}, {r})"
                )));
            }
        }
        Ok(())
    }
}

fn default_base_score() -> f32 {
    0.0
}

/// A standalone gradient-boosted-tree ensemble.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsembleModel {
    #[serde(default = "default_base_score")]
    pub base_score: f32,
    pub trees: Vec<TreeModel>,
}

/// Standard-scaler preprocessing step: `(x - mean) / scale` per feature.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerStep {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSteps {
    pub scaler: ScalerStep,
    pub classifier: TreeEnsembleModel,
}

#[derive(Debug, Deserialize)]
struct PipelineWrapper {
    named_steps: PipelineSteps,
}

/// The serialized trained model, in either of its two shipped shapes.
#[derive(Debug)]
pub enum ModelArtifact {
    /// Preprocessing pipeline bundling a scaler with the classifier.
    Pipeline(PipelineSteps),
    /// Raw boosted-tree ensemble with no preprocessing.
    Ensemble(TreeEnsembleModel),
}

impl ModelArtifact {
    /// Load the artifact, telling the two shapes apart by the presence of a
    /// `named_steps` member. This is a capability check, not a type tag: a
    /// raw ensemble document has no such key.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ServiceError::Artifact(format!("cannot read {}: {e}", path.display()))
        })?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Artifact(format!("invalid model document: {e}")))?;

        if value.get("named_steps").is_some() {
            let wrapper: PipelineWrapper = serde_json::from_value(value)
                .map_err(|e| ServiceError::Artifact(format!("invalid pipeline: {e}")))?;
            Ok(ModelArtifact::Pipeline(wrapper.named_steps))
        } else {
            let ensemble: TreeEnsembleModel = serde_json::from_value(value)
                .map_err(|e| ServiceError::Artifact(format!("invalid ensemble: {e}")))?;
            Ok(ModelArtifact::Ensemble(ensemble))
        }
    }

    pub fn ensemble(&self) -> &TreeEnsembleModel {
        match self {
            ModelArtifact::Pipeline(steps) => &steps.classifier,
            ModelArtifact::Ensemble(ensemble) => ensemble,
        }
    }

    pub fn scaler(&self) -> Option<&ScalerStep> {
        match self {
            ModelArtifact::Pipeline(steps) => Some(&steps.scaler),
            ModelArtifact::Ensemble(_) => None,
        }
    }
}
