//! TorchScript models through libtorch. Needs `LIBTORCH` at build time.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tch::{CModule, Device, Kind, Tensor, nn::ModuleT};

use super::model::{Classifier, InferenceError, ModelLoader};
use super::preprocess::ImageTensor;

pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModel {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(path, device).map_err(|e| InferenceError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

impl Classifier for TorchModel {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = input.shape().iter().map(|d| *d as i64).collect();
        // TorchScript exports expect NCHW.
        let tensor = Tensor::from_slice(&input.to_vec())
            .view(shape.as_slice())
            .permute([0, 3, 1, 2])
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| InferenceError::Execution("model lock poisoned".to_string()))?;
        let output = module
            .forward_t(&tensor, false)
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);

        let num_elements = output.size()[0] as usize;
        if num_elements == 0 {
            return Err(InferenceError::EmptyOutput);
        }
        let mut scores = vec![0.0f32; num_elements];
        output.copy_data(&mut scores, num_elements);
        Ok(scores)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TorchLoader;

impl ModelLoader for TorchLoader {
    fn load(&self, path: &Path, _input_size: u32) -> Result<Arc<dyn Classifier>, InferenceError> {
        Ok(Arc::new(TorchModel::load(path)?))
    }
}
