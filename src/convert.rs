//! One-shot model conversion: load the trained artifact and its metadata,
//! pick the matching conversion path, write the graph, run the fixed
//! validation example, then best-effort derive the quantized variants.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;

use crate::{
    error::ServiceError,
    graph::{Graph, InferenceSession, InputSpec, PostTransform, ScalerNode, TreeEnsembleNode,
        WeightTensor, TARGET_GRAPH_VERSION},
    model::{ModelArtifact, ModelMetadata, PipelineSteps, ScalerStep, TreeEnsembleModel,
        LEAF_FEATURE},
};

/// Fixed example run through every freshly converted graph. Keyed by feature
/// name and reordered against the metadata's `feature_names`, so a drift
/// between this table and the metadata fails loudly instead of silently
/// permuting the input vector.
pub static VALIDATION_EXAMPLE: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    [
        ("HighBP", 1.0),
        ("HighChol", 1.0),
        ("CholCheck", 1.0),
        ("BMI", 28.5),
        ("Smoker", 0.0),
        ("Stroke", 0.0),
        ("HeartDiseaseorAttack", 0.0),
        ("PhysActivity", 1.0),
        ("Fruits", 1.0),
        ("Veggies", 1.0),
        ("HvyAlcoholConsump", 0.0),
        ("AnyHealthcare", 1.0),
        ("NoDocbcCost", 0.0),
        ("GenHlth", 2.0),
        ("MentHlth", 5.0),
        ("PhysHlth", 3.0),
        ("DiffWalk", 0.0),
        ("Sex", 1.0),
        ("Age", 7.0),
        ("Education", 4.0),
        ("Income", 5.0),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
});

#[derive(Debug)]
pub struct ConversionReport {
    pub graph_path: PathBuf,
    pub input_width: usize,
    pub validation_output: Vec<f32>,
    pub derivatives: Vec<PathBuf>,
}

/// Run the full conversion pipeline. Load and conversion failures are fatal;
/// only the trailing quantization step is allowed to fail without aborting.
pub fn run_conversion(
    model_path: &Path,
    metadata_path: &Path,
    output_path: &Path,
) -> Result<ConversionReport, ServiceError> {
    println!("Converting model to graph format...");
    println!("Loading model from: {}", model_path.display());

    let metadata = ModelMetadata::load(metadata_path)?;
    println!(
        "Model loaded: {} v{}",
        metadata.model_type, metadata.xgboost_version
    );
    println!("Accuracy: {:.2}%", metadata.accuracy * 100.0);
    println!("Features: {}", metadata.feature_count());

    let artifact = ModelArtifact::load(model_path)?;
    let input = InputSpec::dynamic_batch(metadata.feature_count());
    let graph = match &artifact {
        ModelArtifact::Pipeline(steps) => {
            println!("Detected preprocessing pipeline");
            convert_pipeline(steps, input)?
        }
        ModelArtifact::Ensemble(ensemble) => {
            println!("Detected raw boosted-tree ensemble");
            convert_ensemble(ensemble, None, input)?
        }
    };

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    graph.save(output_path)?;
    let size_bytes = fs::metadata(output_path)?.len();
    println!("Graph saved: {} ({size_bytes} bytes)", output_path.display());

    println!("Validating graph...");
    let validation_output = validate_graph(output_path, &metadata)?;

    let derivatives = optimized_derivatives(output_path);

    println!("Conversion complete");
    Ok(ConversionReport {
        graph_path: output_path.to_path_buf(),
        input_width: metadata.feature_count(),
        validation_output,
        derivatives,
    })
}

/// Pipeline path: the scaler step becomes a scaler node ahead of the
/// ensemble. Same declared input and target version as the raw path.
pub fn convert_pipeline(steps: &PipelineSteps, input: InputSpec) -> Result<Graph, ServiceError> {
    convert_ensemble(&steps.classifier, Some(&steps.scaler), input)
}

/// Raw path: flatten the ensemble alone into a graph with the declared
/// input, the fixed target version, and flattened classifier output.
pub fn convert_ensemble(
    ensemble: &TreeEnsembleModel,
    scaler: Option<&ScalerStep>,
    input: InputSpec,
) -> Result<Graph, ServiceError> {
    let node = flatten_ensemble(ensemble, input.features)?;
    let scaler = scaler.map(|s| ScalerNode {
        mean: s.mean.clone(),
        scale: s.scale.clone(),
    });
    let graph = Graph {
        version: TARGET_GRAPH_VERSION,
        input,
        scaler,
        ensemble: node,
        flatten_output: true,
    };
    graph.check()?;
    Ok(graph)
}

/// Flatten per-tree node arrays into the graph's global arrays, rebasing
/// child indices as trees are appended.
fn flatten_ensemble(
    ensemble: &TreeEnsembleModel,
    n_features: usize,
) -> Result<TreeEnsembleNode, ServiceError> {
    if ensemble.trees.is_empty() {
        return Err(ServiceError::Artifact("ensemble has no trees".into()));
    }

    let total: usize = ensemble.trees.iter().map(|t| t.feature.len()).sum();
    let mut tree_roots = Vec::with_capacity(ensemble.trees.len());
    let mut feature_ids = Vec::with_capacity(total);
    let mut true_children = Vec::with_capacity(total);
    let mut false_children = Vec::with_capacity(total);
    let mut values = Vec::with_capacity(total);

    for tree in &ensemble.trees {
        tree.validate(n_features)?;
        let base = feature_ids.len() as u32;
        tree_roots.push(base);
        for i in 0..tree.feature.len() {
            let is_leaf = tree.feature[i] == LEAF_FEATURE;
            feature_ids.push(tree.feature[i]);
            values.push(if is_leaf { tree.value[i] } else { tree.threshold[i] });
            if is_leaf {
                true_children.push(base);
                false_children.push(base);
            } else {
                true_children.push(base + tree.left[i] as u32);
                false_children.push(base + tree.right[i] as u32);
            }
        }
    }

    Ok(TreeEnsembleNode {
        tree_roots,
        feature_ids,
        true_children,
        false_children,
        values: WeightTensor::Float32 { data: values },
        base_score: ensemble.base_score,
        post_transform: PostTransform::Logistic,
    })
}

/// Smoke-check the just-written file: open a session on it and push the
/// fixed example through. No pass/fail beyond "did not error".
fn validate_graph(
    graph_path: &Path,
    metadata: &ModelMetadata,
) -> Result<Vec<f32>, ServiceError> {
    let session = InferenceSession::open(graph_path)?;
    let vector = metadata.vector_from(&VALIDATION_EXAMPLE)?;
    let outputs = session.run(&vector)?;

    let positive = outputs
        .last()
        .copied()
        .ok_or_else(|| ServiceError::Inference("graph produced no output".into()))?;
    println!("Validation passed");
    println!("  input width: {}", vector.len());
    println!("  output: {outputs:?}");
    println!(
        "  prediction: {}",
        if positive > 0.5 { "Diabetes Risk" } else { "Low Risk" }
    );
    Ok(outputs)
}

#[cfg(feature = "quantize")]
fn optimized_derivatives(graph_path: &Path) -> Vec<PathBuf> {
    println!("Creating optimized versions...");
    match crate::quantization::create_optimized_graphs(graph_path) {
        Ok(written) => written
            .into_iter()
            .map(|(path, summary)| {
                println!(
                    "Optimized graph: {} ({} bytes, {:.1}% smaller)",
                    path.display(),
                    summary.quantized_size_bytes,
                    summary.size_reduction_percent
                );
                path
            })
            .collect(),
        Err(err) => {
            tracing::warn!(%err, "quantization failed, optimized graphs skipped");
            println!("Warning: quantization failed: {err}");
            Vec::new()
        }
    }
}

#[cfg(not(feature = "quantize"))]
fn optimized_derivatives(_graph_path: &Path) -> Vec<PathBuf> {
    println!("Warning: built without quantization support, skipping optimized graphs");
    Vec::new()
}
