pub mod builder;

use std::time::Instant;

use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::{debug, info};

use crate::{
    algorithms::{ColorReducer, FacetBuilder, FacetReducer},
    error::Result,
    progress::{CancellationToken, Progress},
    settings::Settings,
    traits::{FacetProcessor, ImagePreprocessor},
    types::{FacetResult, ProcessResult},
};

/// Pipeline stages in execution order, as reported to progress callbacks
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr,
    PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    KMeansClustering,
    FacetBuilding,
    FacetReduction,
    BorderTracing,
    BorderSegmentation,
    LabelPlacement,
}

/// Color reduction followed by facet extraction and the geometry stages
pub struct Pipeline {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    settings: Settings,
    processors: Vec<Box<dyn FacetProcessor>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        settings: Settings,
        processors: Vec<Box<dyn FacetProcessor>>,
    ) -> Self {
        Self {
            preprocessors,
            settings,
            processors,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Process an image to completion without progress reporting
    pub fn process(&self, image: &RgbaImage) -> Result<ProcessResult> {
        self.process_with(image, &CancellationToken::new(), &mut |_, _| {})
    }

    /// Process an image, reporting per-stage progress in `[0, 1]` and
    /// aborting with `Cancelled` once `token` is cancelled
    pub fn process_with(
        &self,
        image: &RgbaImage,
        token: &CancellationToken,
        on_progress: &mut dyn FnMut(Stage, f64),
    ) -> Result<ProcessResult> {
        self.settings.validate()?;

        let mut image = image.clone();
        for preprocessor in &self.preprocessors {
            image = preprocessor.preprocess(&image)?;
        }
        token_checked(token)?;

        let clustered = run_stage(Stage::KMeansClustering, token, on_progress, |progress| {
            ColorReducer::apply_kmeans_clustering(&image, &self.settings, progress)
        })?;
        let mut color_map = ColorReducer::create_color_map(&clustered)?;
        info!(colors = color_map.colors_by_index.len(), "color map created");

        let reducer = FacetReducer {
            min_facet_size: self.settings.min_facet_size,
            removal_order: self.settings.facet_removal_order,
            max_facet_count: self.settings.max_facet_count,
        };
        let runs = self.settings.narrow_strip_cleanup_runs;
        let mut facet_result = FacetResult::new(color_map.width, color_map.height);
        for run in 0..runs.max(1) {
            if runs > 0 {
                let replaced = ColorReducer::process_narrow_pixel_strip_cleanup(&mut color_map);
                debug!(run, replaced, "narrow strip cleanup");
            }
            facet_result = run_stage(Stage::FacetBuilding, token, on_progress, |progress| {
                FacetBuilder::build(&color_map.color_indices, progress)
            })?;
            run_stage(Stage::FacetReduction, token, on_progress, |progress| {
                reducer.reduce(
                    &color_map.colors_by_index,
                    &mut facet_result,
                    &mut color_map.color_indices,
                    progress,
                )
            })?;
        }

        for processor in &self.processors {
            run_stage(processor.stage(), token, on_progress, |progress| {
                processor.process(&mut facet_result, progress)
            })?;
        }

        info!(facets = facet_result.live_count(), "pipeline finished");
        Ok(ProcessResult {
            facet_result,
            colors_by_index: color_map.colors_by_index,
            clustered_image: clustered,
        })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} preprocessors, {} clusters, {} geometry stages",
            self.preprocessors.len(),
            self.settings.cluster_count,
            self.processors.len()
        )
    }
}

fn token_checked(token: &CancellationToken) -> Result<()> {
    Progress::new(Some(token), None).check_cancelled()
}

fn run_stage<T>(
    stage: Stage,
    token: &CancellationToken,
    on_progress: &mut dyn FnMut(Stage, f64),
    work: impl FnOnce(&mut Progress<'_>) -> Result<T>,
) -> Result<T> {
    let started = Instant::now();
    let mut report = |fraction: f64| on_progress(stage, fraction);
    let mut progress = Progress::new(Some(token), Some(&mut report));
    let output = work(&mut progress)?;
    info!(
        stage = %stage,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stage complete"
    );
    Ok(output)
}
