pub mod border_segmenter;
pub mod border_tracer;
pub mod clustering;
pub mod color_reduction;
pub mod facet_builder;
pub mod facet_reducer;
pub mod fill;
pub mod label_placer;
pub mod polylabel;
pub mod preprocessing;

pub use border_segmenter::BorderSegmenter;
pub use border_tracer::{BorderTracer, WallState};
pub use clustering::{KMeans, Vector};
pub use color_reduction::ColorReducer;
pub use facet_builder::FacetBuilder;
pub use facet_reducer::FacetReducer;
pub use label_placer::LabelPlacer;
pub use polylabel::{Polylabel, polylabel};
pub use preprocessing::ResizePreprocessor;
