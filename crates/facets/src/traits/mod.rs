use image::RgbaImage;
use crate::{error::Result, pipeline::Stage, progress::Progress, types::FacetResult};

/// Trait for image preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync {
    /// Transform the source image before color reduction (e.g. resize)
    fn preprocess(&self, image: &RgbaImage) -> Result<RgbaImage>;
}

/// Trait for the geometry stages that run on a finished facet partition
pub trait FacetProcessor: Send + Sync {
    /// Pipeline stage reported while this processor runs
    fn stage(&self) -> Stage;

    /// Update the facets in place
    fn process(&self, result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()>;
}
