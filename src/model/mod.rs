mod artifact;
mod metadata;
mod registry;
mod types;

pub use artifact::{
    LEAF_FEATURE, ModelArtifact, PipelineSteps, ScalerStep, TreeEnsembleModel, TreeModel,
};
pub use metadata::ModelMetadata;
pub use registry::ModelRegistry;
pub use types::{PredictRequest, PredictionResponse};
