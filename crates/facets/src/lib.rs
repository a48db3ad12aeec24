//! # Paint-by-numbers facet library
//!
//! Turns a raster image into a paint-by-numbers template: a reduced palette,
//! a partition of the image into same-color regions ("facets"), a shared
//! polygonal border for every facet and a label position inside it.
//!
//! ## Stages
//!
//! 1. **K-means clustering** of the quantized image colors
//! 2. **Facet building** by flood filling the palette index grid
//! 3. **Facet reduction** of regions below a size threshold
//! 4. **Border tracing** of every facet along pixel sides
//! 5. **Border segmentation** into simplified segments shared by neighbours
//! 6. **Label placement** at each facet's pole of inaccessibility
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use facets::{Pipeline, Settings};
//!
//! let settings = Settings {
//!     cluster_count: 12,
//!     random_seed: Some(42),
//!     ..Settings::default()
//! };
//! let pipeline = Pipeline::builder().with_settings(settings).build();
//!
//! let image = image::open("photo.png")?.to_rgba8();
//! let result = pipeline.process(&image)?;
//! result.save_geojson("photo.geojson")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod algorithms;
pub mod collections;
pub mod color;
pub mod error;
pub mod grid;
pub mod io;
pub mod manager;
pub mod pipeline;
pub mod progress;
pub mod random;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::{PaintError, Result};
pub use grid::{BoolGrid, ColorIndexGrid, FacetMap, Grid};
pub use manager::{ProcessCommand, ProcessManager};
pub use pipeline::{Pipeline, Stage, builder::PipelineBuilder};
pub use progress::{CancellationToken, Progress};
pub use settings::{ClusteringColorSpace, ColorRestriction, FacetRemovalOrder, ResizeBounds, Settings};
pub use traits::*;
pub use types::*;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        algorithms::FacetBuilder,
        grid::ColorIndexGrid,
        progress::Progress,
        types::FacetResult,
    };

    /// Palette index grid from rows of letters, `a` being index 0.
    pub fn grid_from_rows(rows: &[&str]) -> ColorIndexGrid {
        let width = rows.first().map_or(0, |row| row.len());
        let cells = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| b - b'a'))
            .collect();
        ColorIndexGrid::from_vec(width, rows.len(), cells).expect("rows must have equal length")
    }

    pub fn build_facets(grid: &ColorIndexGrid) -> FacetResult {
        FacetBuilder::build(grid, &mut Progress::silent()).expect("facet building can't be cancelled")
    }
}
