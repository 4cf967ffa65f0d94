pub mod adapter;
pub mod config;
pub mod convert;
pub mod error;
pub mod graph;
pub mod model;
#[cfg(feature = "quantize")]
pub mod quantization;
pub mod server;
pub mod smoke;

pub use config::AppConfig;
pub use convert::{ConversionReport, run_conversion};
pub use error::ServiceError;
pub use model::{ModelMetadata, ModelRegistry, PredictRequest, PredictionResponse};
pub use server::build_router;
