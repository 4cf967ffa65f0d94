mod format;
mod session;

pub use format::{
    ElementType, Graph, InputSpec, PostTransform, ScalerNode, TreeEnsembleNode, WeightTensor,
    INPUT_TENSOR_NAME, TARGET_GRAPH_VERSION,
};
pub use session::InferenceSession;
