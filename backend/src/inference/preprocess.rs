use image::imageops::{self, FilterType};
use ndarray::Array4;

pub const DEFAULT_INPUT_SIZE: u32 = 224;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Could not read the uploaded file as an image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Uploaded image is empty")]
    Empty,
}

/// Batched NHWC float tensor, shape `(1, size, size, 3)`, values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ImageTensor(Array4<f32>);

impl ImageTensor {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.as_array().iter().copied().collect()
    }
}

/// Decodes an uploaded image and normalizes it for the classifier.
///
/// Any decodable format is accepted. Palette images are expanded, 16-bit
/// channels are scaled down to 8 bits and the alpha channel is dropped without
/// compositing. Aspect ratio is not preserved.
pub fn preprocess(image_bytes: &[u8], size: u32) -> Result<ImageTensor, PreprocessError> {
    if image_bytes.is_empty() {
        return Err(PreprocessError::Empty);
    }

    let decoded = image::load_from_memory(image_bytes)?;
    log::debug!(
        "Decoded {}x{} image ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    let rgb = decoded.to_rgb8();
    let resized = imageops::resize(&rgb, size, size, FilterType::CatmullRom);

    let side = size as usize;
    let tensor = Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    });

    Ok(ImageTensor(tensor))
}
