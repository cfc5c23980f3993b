use shared::{CropCategory, CropInfo};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::config::{CropCatalogue, CropModelConfig, OutputKind};

use super::labels::LabelSet;
use super::model::{Classifier, ModelLoader, Softmax};
use super::preprocess::DEFAULT_INPUT_SIZE;

/// What the registry knows about one crop after its single load attempt.
pub struct CropEntry {
    pub model: Option<Arc<dyn Classifier>>,
    pub labels: LabelSet,
    pub input_size: u32,
}

struct CropSlot {
    config: Option<CropModelConfig>,
    entry: OnceLock<CropEntry>,
}

/// One model per crop, loaded once and shared for the life of the process.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    slots: HashMap<CropCategory, CropSlot>,
    top_k: usize,
}

impl ModelRegistry {
    pub fn new(catalogue: CropCatalogue, loader: Arc<dyn ModelLoader>) -> Self {
        let mut configs = catalogue.crops;
        let slots = CropCategory::ALL
            .into_iter()
            .map(|crop| {
                let slot = CropSlot {
                    config: configs.remove(&crop),
                    entry: OnceLock::new(),
                };
                (crop, slot)
            })
            .collect();

        Self {
            loader,
            slots,
            top_k: catalogue.top_k,
        }
    }

    /// Resolves every crop up front so the first request does not pay for it.
    pub fn preload(&self) {
        for crop in CropCategory::ALL {
            let entry = self.entry(crop);
            if entry.model.is_some() {
                log::info!("{} model ready ({} labels)", crop, entry.labels.len());
            }
        }
    }

    pub fn entry(&self, crop: CropCategory) -> &CropEntry {
        let slot = &self.slots[&crop];
        slot.entry
            .get_or_init(|| load_entry(crop, slot.config.as_ref(), self.loader.as_ref()))
    }

    pub fn get_model(&self, crop: CropCategory) -> Option<Arc<dyn Classifier>> {
        self.entry(crop).model.clone()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn crops(&self) -> Vec<CropInfo> {
        CropCategory::ALL
            .into_iter()
            .map(|crop| {
                let entry = self.entry(crop);
                CropInfo {
                    crop,
                    model_loaded: entry.model.is_some(),
                    labels: entry.labels.len(),
                }
            })
            .collect()
    }
}

fn load_entry(
    crop: CropCategory,
    config: Option<&CropModelConfig>,
    loader: &dyn ModelLoader,
) -> CropEntry {
    let Some(config) = config else {
        log::warn!("No model configured for {}", crop);
        return CropEntry {
            model: None,
            labels: LabelSet::default(),
            input_size: DEFAULT_INPUT_SIZE,
        };
    };

    let labels = LabelSet::load(&config.labels).unwrap_or_else(|e| {
        log::error!(
            "Failed to read labels for {} from {}: {}",
            crop,
            config.labels.display(),
            e
        );
        LabelSet::default()
    });

    let model = if !config.model.exists() {
        log::warn!(
            "{} model file {} not found, scans for this crop are disabled",
            crop,
            config.model.display()
        );
        None
    } else {
        log::info!("Loading {} model from {}", crop, config.model.display());
        match loader.load(&config.model, config.input_size) {
            Ok(model) => Some(match config.output {
                OutputKind::Probabilities => model,
                OutputKind::Logits => Arc::new(Softmax(model)) as Arc<dyn Classifier>,
            }),
            Err(e) => {
                log::error!("Failed to load {} model: {}", crop, e);
                None
            }
        }
    };

    CropEntry {
        model,
        labels,
        input_size: config.input_size,
    }
}
