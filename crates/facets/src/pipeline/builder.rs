use crate::{
    algorithms::{BorderSegmenter, BorderTracer, LabelPlacer, ResizePreprocessor},
    pipeline::Pipeline,
    settings::Settings,
    traits::{FacetProcessor, ImagePreprocessor},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    settings: Settings,
    processors: Option<Vec<Box<dyn FacetProcessor>>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            settings: Settings::default(),
            processors: None,
        }
    }

    /// Builder configured from `settings`, including the resize step when bounds are set
    pub fn from_settings(settings: &Settings) -> Self {
        let builder = Self::new().with_settings(settings.clone());
        match settings.resize {
            Some(bounds) => builder.add_preprocessor(ResizePreprocessor::from(bounds)),
            None => builder,
        }
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Replace the clustering and reduction settings
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Add a geometry stage. Once one is added the default stages are no longer used
    pub fn add_processor<P>(mut self, processor: P) -> Self
    where
        P: FacetProcessor + 'static,
    {
        self.processors
            .get_or_insert_with(Vec::new)
            .push(Box::new(processor));
        self
    }

    /// Build the pipeline, tracing, segmenting and labelling facets unless
    /// other geometry stages were added
    pub fn build(self) -> Pipeline {
        let halving_rounds = self.settings.segment_halving_rounds;
        let processors = self.processors.unwrap_or_else(|| {
            let defaults: Vec<Box<dyn FacetProcessor>> = vec![
                Box::new(BorderTracer),
                Box::new(BorderSegmenter::new(halving_rounds)),
                Box::new(LabelPlacer),
            ];
            defaults
        });
        Pipeline::new(self.preprocessors, self.settings, processors)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
