use std::path::Path;
use std::sync::Arc;

use tract_onnx::prelude::*;

use super::preprocess::ImageTensor;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model from {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("Model execution failed: {0}")]
    Execution(String),
    #[error("Model produced no scores")]
    EmptyOutput,
}

/// A loaded image classifier. Returns one score per class.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

/// Deserializes model files. Called at most once per crop category.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path, input_size: u32) -> Result<Arc<dyn Classifier>, InferenceError>;
}

pub struct OnnxModel {
    plan: SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>,
}

impl OnnxModel {
    pub fn load(path: &Path, input_size: u32) -> Result<Self, InferenceError> {
        let to_load_error = |e: TractError| InferenceError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let side = input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, side, side, 3]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(to_load_error)?;
        Ok(Self { plan })
    }
}

impl Classifier for OnnxModel {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let data = input.to_vec();
        let tensor = Tensor::from_shape::<f32>(input.shape(), &data)
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(tensor.into_tvalue()))
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        let scores: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Execution(e.to_string()))?
            .iter()
            .copied()
            .collect();
        if scores.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        Ok(scores)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    fn load(&self, path: &Path, input_size: u32) -> Result<Arc<dyn Classifier>, InferenceError> {
        Ok(Arc::new(OnnxModel::load(path, input_size)?))
    }
}

/// Wraps a model whose last layer emits logits.
pub struct Softmax(pub Arc<dyn Classifier>);

impl Classifier for Softmax {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        self.0.predict(input).map(|logits| softmax(&logits))
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_is_a_distribution() {
        let probs = softmax(&[2.0, 1.0, 0.1, -3.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(probs.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_onnx_file_is_a_load_error() {
        let err = OnnxLoader
            .load(Path::new("models/not_there.onnx"), 224)
            .err()
            .expect("load must fail");
        assert!(matches!(err, InferenceError::Load { .. }));
    }
}
