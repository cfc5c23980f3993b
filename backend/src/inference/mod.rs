pub mod labels;
pub mod model;
pub mod preprocess;
pub mod ranker;
pub mod registry;
#[cfg(feature = "torch")]
pub mod torch;

use std::path::Path;
use std::sync::Arc;

use model::{Classifier, InferenceError, ModelLoader, OnnxLoader};

/// Picks the runtime from the file extension. TorchScript (`.pt`, `.ts`) needs
/// the `torch` feature; everything else goes through ONNX.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileModelLoader;

impl ModelLoader for FileModelLoader {
    fn load(&self, path: &Path, input_size: u32) -> Result<Arc<dyn Classifier>, InferenceError> {
        if let Some(result) = load_torchscript(path, input_size) {
            return result;
        }
        OnnxLoader.load(path, input_size)
    }
}

#[cfg(feature = "torch")]
fn load_torchscript(
    path: &Path,
    input_size: u32,
) -> Option<Result<Arc<dyn Classifier>, InferenceError>> {
    matches!(path.extension().and_then(|e| e.to_str()), Some("pt" | "ts"))
        .then(|| torch::TorchLoader.load(path, input_size))
}

#[cfg(not(feature = "torch"))]
fn load_torchscript(
    _path: &Path,
    _input_size: u32,
) -> Option<Result<Arc<dyn Classifier>, InferenceError>> {
    None
}
