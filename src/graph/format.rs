use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Graph format version every conversion targets. Readers refuse anything
/// newer than this.
pub const TARGET_GRAPH_VERSION: u32 = 15;

/// Tensor name the converter declares for the single graph input.
pub const INPUT_TENSOR_NAME: &str = "float_input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Float32,
}

/// Declared input tensor: `batch` of `None` means a dynamic batch dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    pub batch: Option<usize>,
    pub features: usize,
    pub dtype: ElementType,
}

impl InputSpec {
    pub fn dynamic_batch(features: usize) -> Self {
        InputSpec {
            name: INPUT_TENSOR_NAME.to_string(),
            batch: None,
            features,
            dtype: ElementType::Float32,
        }
    }
}

/// Weight storage for the ensemble value tensor. The quantized encodings are
/// only produced (and only decodable) when the `quantize` feature is on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum WeightTensor {
    Float32 {
        data: Vec<f32>,
    },
    /// IEEE half-precision bit patterns.
    #[cfg(feature = "quantize")]
    Float16 {
        data: Vec<u16>,
    },
    /// Symmetric 8-bit: `value = data[i] * scale`.
    #[cfg(feature = "quantize")]
    Int8 {
        scale: f32,
        data: Vec<i8>,
    },
}

impl WeightTensor {
    pub fn len(&self) -> usize {
        match self {
            WeightTensor::Float32 { data } => data.len(),
            #[cfg(feature = "quantize")]
            WeightTensor::Float16 { data } => data.len(),
            #[cfg(feature = "quantize")]
            WeightTensor::Int8 { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> f32 {
        match self {
            WeightTensor::Float32 { data } => data[index],
            #[cfg(feature = "quantize")]
            WeightTensor::Float16 { data } => half::f16::from_bits(data[index]).to_f32(),
            #[cfg(feature = "quantize")]
            WeightTensor::Int8 { scale, data } => f32::from(data[index]) * scale,
        }
    }

    pub fn encoding_name(&self) -> &'static str {
        match self {
            WeightTensor::Float32 { .. } => "float32",
            #[cfg(feature = "quantize")]
            WeightTensor::Float16 { .. } => "float16",
            #[cfg(feature = "quantize")]
            WeightTensor::Int8 { .. } => "int8",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostTransform {
    Logistic,
    None,
}

/// Optional standard-scaler node applied ahead of the ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerNode {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

/// The boosted-tree ensemble, flattened into parallel node arrays spanning
/// all trees. `feature_ids[i] == -1` marks a leaf; `values` holds the split
/// threshold for interior nodes and the margin for leaves. Child indices are
/// global. True children are taken when `x[feature] < threshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsembleNode {
    pub tree_roots: Vec<u32>,
    pub feature_ids: Vec<i32>,
    pub true_children: Vec<u32>,
    pub false_children: Vec<u32>,
    pub values: WeightTensor,
    pub base_score: f32,
    pub post_transform: PostTransform,
}

/// The converted graph artifact: one declared input, an optional scaler, the
/// ensemble, and a flag collapsing classifier output to a single probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub version: u32,
    pub input: InputSpec,
    pub scaler: Option<ScalerNode>,
    pub ensemble: TreeEnsembleNode,
    pub flatten_output: bool,
}

impl Graph {
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ServiceError::Graph(format!("cannot read {}: {e}", path.display())))?;
        let graph: Graph = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Graph(format!("invalid graph document: {e}")))?;
        if graph.version > TARGET_GRAPH_VERSION {
            return Err(ServiceError::Graph(format!(
                "graph version {} is newer than supported version {TARGET_GRAPH_VERSION}",
                graph.version
            )));
        }
        graph.check()?;
        Ok(graph)
    }

    pub fn save(&self, path: &Path) -> Result<(), ServiceError> {
        let serialized = serde_json::to_vec(self)
            .map_err(|e| ServiceError::Graph(format!("cannot serialize graph: {e}")))?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Structural consistency: parallel arrays aligned, children in range,
    /// scaler width matching the declared input.
    pub fn check(&self) -> Result<(), ServiceError> {
        let n = self.ensemble.feature_ids.len();
        if self.ensemble.true_children.len() != n
            || self.ensemble.false_children.len() != n
            || self.ensemble.values.len() != n
        {
            return Err(ServiceError::Graph(
                "ensemble node arrays have mismatched lengths".into(),
            ));
        }
        for &root in &self.ensemble.tree_roots {
            if root as usize >= n {
                return Err(ServiceError::Graph(format!("tree root {root} out of range")));
            }
        }
        for i in 0..n {
            let feature = self.ensemble.feature_ids[i];
            if feature == -1 {
                continue;
            }
            if feature < 0 || feature as usize >= self.input.features {
                return Err(ServiceError::Graph(format!(
                    "node {i} splits on feature {feature}, outside declared width {}",
                    self.input.features
                )));
            }
            let (t, f) = (
                self.ensemble.true_children[i] as usize,
                self.ensemble.false_children[i] as usize,
            );
            if t >= n || f >= n {
                return Err(ServiceError::Graph(format!(
                    "node {i} has out-of-range children"
                )));
            }
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != self.input.features || scaler.scale.len() != self.input.features
            {
                return Err(ServiceError::Graph(
                    "scaler width does not match declared input".into(),
                ));
            }
        }
        Ok(())
    }
}
