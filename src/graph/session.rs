use std::path::Path;

use crate::error::ServiceError;
use crate::graph::format::{Graph, PostTransform};

/// An open inference session over a converted graph artifact.
pub struct InferenceSession {
    graph: Graph,
}

impl InferenceSession {
    pub fn open(path: &Path) -> Result<Self, ServiceError> {
        let graph = Graph::load(path)?;
        Ok(Self { graph })
    }

    pub fn from_graph(graph: Graph) -> Result<Self, ServiceError> {
        graph.check()?;
        Ok(Self { graph })
    }

    pub fn input_width(&self) -> usize {
        self.graph.input.features
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Run one feature vector through the graph. With `flatten_output` the
    /// result is the single positive-class probability; otherwise both class
    /// probabilities in `[negative, positive]` order.
    pub fn run(&self, features: &[f32]) -> Result<Vec<f32>, ServiceError> {
        if features.len() != self.graph.input.features {
            return Err(ServiceError::Inference(format!(
                "expected {} features, got {}",
                self.graph.input.features,
                features.len()
            )));
        }

        let scaled;
        let input: &[f32] = match &self.graph.scaler {
            Some(scaler) => {
                scaled = features
                    .iter()
                    .zip(scaler.mean.iter().zip(&scaler.scale))
                    .map(|(&x, (&mean, &scale))| {
                        if scale == 0.0 { 0.0 } else { (x - mean) / scale }
                    })
                    .collect::<Vec<f32>>();
                &scaled
            }
            None => features,
        };

        let mut margin = self.graph.ensemble.base_score;
        for &root in &self.graph.ensemble.tree_roots {
            margin += self.walk_tree(root as usize, input)?;
        }

        let positive = match self.graph.ensemble.post_transform {
            PostTransform::Logistic => sigmoid(margin),
            PostTransform::None => margin,
        };

        if self.graph.flatten_output {
            Ok(vec![positive])
        } else {
            Ok(vec![1.0 - positive, positive])
        }
    }

    /// Positive-class probability for one input vector.
    pub fn predict_proba(&self, features: &[f32]) -> Result<f32, ServiceError> {
        let outputs = self.run(features)?;
        outputs
            .last()
            .copied()
            .ok_or_else(|| ServiceError::Inference("graph produced no output".into()))
    }

    fn walk_tree(&self, root: usize, input: &[f32]) -> Result<f32, ServiceError> {
        let ensemble = &self.graph.ensemble;
        let mut node = root;
        // Node count bounds the walk; a longer path means a cycle.
        for _ in 0..=ensemble.feature_ids.len() {
            let feature = ensemble.feature_ids[node];
            if feature == -1 {
                return Ok(ensemble.values.get(node));
            }
            let threshold = ensemble.values.get(node);
            node = if input[feature as usize] < threshold {
                ensemble.true_children[node] as usize
            } else {
                ensemble.false_children[node] as usize
            };
        }
        Err(ServiceError::Inference(format!(
            "tree walk from root {root} did not reach a leaf"
        )))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::format::{
        Graph, InputSpec, PostTransform, ScalerNode, TreeEnsembleNode, WeightTensor,
        TARGET_GRAPH_VERSION,
    };

    fn single_split_graph(flatten: bool) -> Graph {
        Graph {
            version: TARGET_GRAPH_VERSION,
            input: InputSpec::dynamic_batch(2),
            scaler: None,
            ensemble: TreeEnsembleNode {
                tree_roots: vec![0],
                feature_ids: vec![0, -1, -1],
                true_children: vec![1, 0, 0],
                false_children: vec![2, 0, 0],
                values: WeightTensor::Float32 {
                    data: vec![0.5, -1.0, 1.0],
                },
                base_score: 0.0,
                post_transform: PostTransform::Logistic,
            },
            flatten_output: flatten,
        }
    }

    #[test]
    fn flattened_output_is_a_single_probability() {
        let session = InferenceSession::from_graph(single_split_graph(true)).unwrap();
        let outputs = session.run(&[0.0, 0.0]).unwrap();
        assert_eq!(outputs.len(), 1);
        // x0 < 0.5 takes the -1.0 leaf: sigmoid(-1) ~= 0.2689
        assert!((outputs[0] - 0.268_941_4).abs() < 1e-5);
    }

    #[test]
    fn unflattened_output_has_both_classes() {
        let session = InferenceSession::from_graph(single_split_graph(false)).unwrap();
        let outputs = session.run(&[1.0, 0.0]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert!((outputs[0] + outputs[1] - 1.0).abs() < 1e-6);
        // x0 >= 0.5 takes the +1.0 leaf, so the positive class dominates.
        assert!(outputs[1] > 0.5);
    }

    #[test]
    fn scaler_is_applied_before_the_ensemble() {
        let mut graph = single_split_graph(true);
        graph.scaler = Some(ScalerNode {
            mean: vec![10.0, 0.0],
            scale: vec![10.0, 1.0],
        });
        let session = InferenceSession::from_graph(graph).unwrap();
        // Raw 20.0 scales to (20-10)/10 = 1.0, crossing the 0.5 threshold.
        let outputs = session.run(&[20.0, 0.0]).unwrap();
        assert!(outputs[0] > 0.5);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let session = InferenceSession::from_graph(single_split_graph(true)).unwrap();
        assert!(matches!(
            session.run(&[1.0]),
            Err(ServiceError::Inference(_))
        ));
    }

    #[test]
    fn out_of_range_feature_id_is_rejected_at_open() {
        // Hand-edited graph: parses, but splits on a feature the declared
        // input does not have. Opening must fail instead of letting a later
        // walk index past the input slice.
        let mut graph = single_split_graph(true);
        graph.ensemble.feature_ids = vec![100, -1, -1];
        let file = tempfile::NamedTempFile::new().unwrap();
        graph.save(file.path()).unwrap();
        assert!(matches!(
            InferenceSession::open(file.path()),
            Err(ServiceError::Graph(_))
        ));
    }

    #[test]
    fn cyclic_graph_does_not_hang() {
        let mut graph = single_split_graph(true);
        graph.ensemble.true_children = vec![0, 0, 0];
        graph.ensemble.false_children = vec![0, 0, 0];
        let session = InferenceSession { graph };
        assert!(session.run(&[0.0, 0.0]).is_err());
    }
}
