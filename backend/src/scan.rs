use shared::{ClassificationResult, CropCategory};

use crate::diagnosis::{diagnose, display_color};
use crate::inference::model::InferenceError;
use crate::inference::preprocess::{PreprocessError, preprocess};
use crate::inference::ranker;
use crate::inference::registry::ModelRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("{0} model not loaded")]
    ModelUnavailable(CropCategory),
    #[error(transparent)]
    Decode(#[from] PreprocessError),
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Image bytes in, diagnosis out. Blocking; call it off the async executor.
pub fn scan(
    registry: &ModelRegistry,
    crop: CropCategory,
    image_bytes: &[u8],
) -> Result<ClassificationResult, ScanError> {
    let model = registry
        .get_model(crop)
        .ok_or(ScanError::ModelUnavailable(crop))?;
    let entry = registry.entry(crop);

    let input = preprocess(image_bytes, entry.input_size)?;
    let ranked = ranker::classify(model.as_ref(), &input, &entry.labels, registry.top_k())?;
    let top = ranked.first().ok_or(InferenceError::EmptyOutput)?;

    let diagnosis = diagnose(&top.label, crop);
    log::debug!(
        "{} scan: {} ({:.2}%) -> {:?}",
        crop,
        top.label,
        top.confidence,
        diagnosis.status
    );

    Ok(ClassificationResult {
        crop,
        top_label: top.label.clone(),
        confidence: top.confidence,
        color: display_color(diagnosis.status).to_string(),
        plant: diagnosis.plant,
        disease: diagnosis.disease,
        status: diagnosis.status,
        ranked,
    })
}
