//! Reduced-precision derivatives of a converted graph.
//!
//! Two weight encodings are produced: half-precision floats and symmetric
//! 8-bit integers. Only the ensemble value tensor is re-encoded; topology,
//! scaler, and declared input are carried over unchanged.

use std::{
    fs,
    path::{Path, PathBuf},
};

use half::f16;
use serde::Serialize;

use crate::{
    error::ServiceError,
    graph::{Graph, WeightTensor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightEncoding {
    Float16,
    Int8,
}

impl WeightEncoding {
    pub fn suffix(self) -> &'static str {
        match self {
            WeightEncoding::Float16 => "fp16",
            WeightEncoding::Int8 => "int8",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantizationSummary {
    pub baseline_size_bytes: u64,
    pub quantized_size_bytes: u64,
    pub size_reduction_percent: f64,
}

impl QuantizationSummary {
    pub fn from_paths(baseline: &Path, quantized: &Path) -> Result<Self, ServiceError> {
        let baseline_size_bytes = fs::metadata(baseline)?.len();
        let quantized_size_bytes = fs::metadata(quantized)?.len();
        let size_reduction_percent = if baseline_size_bytes == 0 {
            0.0
        } else {
            let diff = baseline_size_bytes.saturating_sub(quantized_size_bytes) as f64;
            diff / baseline_size_bytes as f64 * 100.0
        };
        Ok(Self {
            baseline_size_bytes,
            quantized_size_bytes,
            size_reduction_percent,
        })
    }
}

/// `diabetes_model.graph.json` becomes `diabetes_model_fp16.graph.json` and
/// so on, next to the baseline file.
pub fn derivative_path(graph_path: &Path, encoding: WeightEncoding) -> PathBuf {
    let name = graph_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("model.graph.json");
    let new_name = match name.strip_suffix(".graph.json") {
        Some(base) => format!("{base}_{}.graph.json", encoding.suffix()),
        None => format!("{name}.{}", encoding.suffix()),
    };
    graph_path.with_file_name(new_name)
}

pub fn quantize_weights(
    values: &WeightTensor,
    encoding: WeightEncoding,
) -> Result<WeightTensor, ServiceError> {
    let floats: Vec<f32> = (0..values.len()).map(|i| values.get(i)).collect();
    if floats.iter().any(|v| !v.is_finite()) {
        return Err(ServiceError::Quantization(
            "weight tensor contains non-finite values".into(),
        ));
    }

    match encoding {
        WeightEncoding::Float16 => Ok(WeightTensor::Float16 {
            data: floats.iter().map(|v| f16::from_f32(*v).to_bits()).collect(),
        }),
        WeightEncoding::Int8 => {
            let max_abs = floats.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
            let scale = if max_abs == 0.0 { 1.0 } else { max_abs / 127.0 };
            let data = floats
                .iter()
                .map(|v| (v / scale).round().clamp(-127.0, 127.0) as i8)
                .collect();
            Ok(WeightTensor::Int8 { scale, data })
        }
    }
}

pub fn quantize_graph(graph: &Graph, encoding: WeightEncoding) -> Result<Graph, ServiceError> {
    let mut quantized = graph.clone();
    quantized.ensemble.values = quantize_weights(&graph.ensemble.values, encoding)?;
    Ok(quantized)
}

/// Derive and write both quantized graphs next to the baseline, returning
/// each path with its size summary.
pub fn create_optimized_graphs(
    graph_path: &Path,
) -> Result<Vec<(PathBuf, QuantizationSummary)>, ServiceError> {
    let graph = Graph::load(graph_path)?;
    let mut written = Vec::with_capacity(2);
    for encoding in [WeightEncoding::Float16, WeightEncoding::Int8] {
        let derived = quantize_graph(&graph, encoding)?;
        let out_path = derivative_path(graph_path, encoding);
        derived.save(&out_path)?;
        let summary = QuantizationSummary::from_paths(graph_path, &out_path)?;
        written.push((out_path, summary));
    }
    Ok(written)
}
