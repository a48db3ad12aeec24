use image::{RgbaImage, imageops::FilterType};
use tracing::info;

use crate::{error::Result, settings::ResizeBounds, traits::ImagePreprocessor};

/// Scales images larger than the bounds down, keeping the aspect ratio
#[derive(Debug, Clone, Copy)]
pub struct ResizePreprocessor {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ResizePreprocessor {
    fn default() -> Self {
        ResizeBounds::default().into()
    }
}

impl From<ResizeBounds> for ResizePreprocessor {
    fn from(bounds: ResizeBounds) -> Self {
        Self {
            max_width: bounds.max_width,
            max_height: bounds.max_height,
        }
    }
}

impl ResizePreprocessor {
    /// Target size for a `width`×`height` image, clamping width first.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (mut w, mut h) = (width as f64, height as f64);
        if w > self.max_width as f64 {
            h = h / w * self.max_width as f64;
            w = self.max_width as f64;
        }
        if h > self.max_height as f64 {
            w = w / h * self.max_height as f64;
            h = self.max_height as f64;
        }
        ((w as u32).max(1), (h as u32).max(1))
    }
}

impl ImagePreprocessor for ResizePreprocessor {
    fn preprocess(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let (target_width, target_height) = self.target_size(width, height);
        if (target_width, target_height) == (width, height) {
            return Ok(image.clone());
        }
        info!(width, height, target_width, target_height, "resizing image");
        Ok(image::imageops::resize(image, target_width, target_height, FilterType::Triangle))
    }
}
