use std::sync::Arc;

use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use tracing::info;

use crate::{
    error::{PaintError, Result},
    pipeline::{Pipeline, Stage, builder::PipelineBuilder},
    progress::CancellationToken,
    settings::Settings,
    types::ProcessResult,
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessCommand {
    /// Run the configured pipeline
    #[serde(rename = "process")]
    Process,

    /// Run the configured pipeline with a different palette size
    #[serde(rename = "process_with_cluster_count")]
    ProcessWithClusterCount {
        #[schemars(range(min = 1, max = 256))]
        cluster_count: usize,
    },

    /// Run a pipeline built from the given settings
    #[serde(rename = "process_with_settings")]
    ProcessWithSettings { settings: Settings },
}

impl ProcessCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ProcessCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Process => "Vectorize the loaded image with the configured settings",
            Self::ProcessWithClusterCount { .. } => "Vectorize the loaded image with a different number of colors",
            Self::ProcessWithSettings { .. } => "Vectorize the loaded image with a full settings document",
        }
    }
}

/// Owns the source image and the cancellation token of the latest run
pub struct ProcessManager {
    image: Option<RgbaImage>,
    pipeline: Arc<Pipeline>,
    current: Option<CancellationToken>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::with_pipeline(PipelineBuilder::from_settings(&Settings::default()).build())
    }

    /// Create a new manager with a custom pipeline
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            image: None,
            pipeline: Arc::new(pipeline),
            current: None,
        }
    }

    /// Load the source image from file
    pub fn load_image(&mut self, path: &str) -> Result<()> {
        let img = image::open(path)?;
        self.image = Some(img.to_rgba8());
        Ok(())
    }

    /// Load the source image from memory
    pub fn load_image_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let img = image::load_from_memory(bytes)?;
        self.image = Some(img.to_rgba8());
        Ok(())
    }

    /// Set the source image directly
    pub fn set_image(&mut self, image: RgbaImage) {
        self.image = Some(image);
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Cancels the previous run, if any, and installs a fresh token for the next one.
    pub fn start_run(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Token of the latest run
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.current.clone()
    }

    pub fn cancel(&self) {
        if let Some(token) = &self.current {
            token.cancel();
        }
    }

    pub fn execute(&mut self, command: ProcessCommand) -> Result<ProcessResult> {
        self.execute_with(command, &mut |_, _| {})
    }

    pub fn execute_with(
        &mut self,
        command: ProcessCommand,
        on_progress: &mut dyn FnMut(Stage, f64),
    ) -> Result<ProcessResult> {
        let image = self.image.as_ref().ok_or(PaintError::NoImageLoaded)?;
        let token = CancellationToken::new();
        if let Some(previous) = self.current.replace(token.clone()) {
            previous.cancel();
        }
        info!(command = %command, "processing image");

        match command {
            ProcessCommand::Process => self.pipeline.process_with(image, &token, on_progress),
            ProcessCommand::ProcessWithClusterCount { cluster_count } => {
                let settings = Settings {
                    cluster_count,
                    ..self.pipeline.settings().clone()
                };
                PipelineBuilder::from_settings(&settings)
                    .build()
                    .process_with(image, &token, on_progress)
            }
            ProcessCommand::ProcessWithSettings { settings } => PipelineBuilder::from_settings(&settings)
                .build()
                .process_with(image, &token, on_progress),
        }
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn manager() -> ProcessManager {
        let settings = Settings {
            cluster_count: 2,
            random_seed: Some(3),
            ..Settings::default()
        };
        ProcessManager::with_pipeline(PipelineBuilder::from_settings(&settings).build())
    }

    #[test]
    fn test_requires_image() {
        let mut manager = manager();
        assert!(matches!(
            manager.execute(ProcessCommand::Process),
            Err(PaintError::NoImageLoaded)
        ));
    }

    #[test]
    fn test_missing_image_leaves_current_run_alone() {
        let mut manager = manager();
        let running = manager.start_run();
        assert!(manager.execute(ProcessCommand::Process).is_err());
        assert!(!running.is_cancelled());
    }

    #[test]
    fn test_new_run_cancels_previous() {
        let mut manager = manager();
        let first = manager.start_run();
        let second = manager.start_run();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        manager.cancel();
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_execute_commands() {
        let mut manager = manager();
        manager.set_image(RgbaImage::from_pixel(6, 6, Rgba([9, 9, 9, 255])));

        let result = manager.execute(ProcessCommand::Process).unwrap();
        assert_eq!(result.facet_result.live_count(), 1);

        let result = manager
            .execute(ProcessCommand::ProcessWithClusterCount { cluster_count: 3 })
            .unwrap();
        assert_eq!(result.facet_result.live_count(), 1);
        assert!(!manager.cancellation_token().unwrap().is_cancelled());
    }

    #[test]
    fn test_load_png_from_bytes() {
        let source = RgbaImage::from_pixel(4, 3, Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let mut manager = manager();
        manager.load_image_from_bytes(&bytes).unwrap();
        let result = manager.execute(ProcessCommand::Process).unwrap();
        assert_eq!((result.facet_result.width, result.facet_result.height), (4, 3));
        assert!(manager.load_image_from_bytes(b"not an image").is_err());
    }

    #[test]
    fn test_command_serialization() {
        let command: ProcessCommand = serde_json::from_str(
            r#"{"type":"process_with_cluster_count","params":{"cluster_count":8}}"#,
        )
        .unwrap();
        assert_eq!(command, ProcessCommand::ProcessWithClusterCount { cluster_count: 8 });
        assert_eq!(ProcessCommand::command_names().len(), 3);
        assert_eq!(ProcessCommand::Process.to_string(), "process");
    }
}
