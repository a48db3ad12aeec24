use geo_types::{Coord, LineString, Polygon, Rect};

use crate::{
    algorithms::polylabel::{Polylabel, polylabel, signed_distance},
    error::Result,
    pipeline::Stage,
    progress::Progress,
    traits::FacetProcessor,
    types::FacetResult,
};

const LABEL_PRECISION: f64 = 1.0;

/// Places each facet's label at its pole of inaccessibility, treating
/// neighbours enclosed by the facet as holes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelPlacer;

impl LabelPlacer {
    pub fn build_label_bounds(result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()> {
        let ids: Vec<usize> = result.live_facets().map(|f| f.id).collect();
        for (done, &id) in ids.iter().enumerate() {
            let label = Self::place(result, id);
            let padding = 2.0 * (2.0 * label.distance.max(0.0)).sqrt();
            if let Some(facet) = result.facet_mut(id) {
                facet.label_point = Some(label.point);
                facet.label_bounds = Some(Rect::new(
                    Coord {
                        x: label.point.x - padding,
                        y: label.point.y - padding,
                    },
                    Coord {
                        x: label.point.x + padding,
                        y: label.point.y + padding,
                    },
                ));
            }
            progress.checkpoint(done, ids.len())?;
        }
        progress.complete()
    }

    pub fn place(result: &mut FacetResult, id: usize) -> Polylabel {
        let outer = result.full_path(id);
        let Some(bbox) = result.facet(id).map(|f| f.bbox) else {
            return Polylabel {
                point: Coord { x: 0.0, y: 0.0 },
                distance: 0.0,
            };
        };
        if outer.is_empty() {
            return Polylabel {
                point: Coord {
                    x: (bbox.min_x + bbox.max_x) as f64 / 2.0,
                    y: (bbox.min_y + bbox.max_y) as f64 / 2.0,
                },
                distance: 0.0,
            };
        }

        let outer_only = Polygon::new(LineString::from(outer.clone()), Vec::new());
        let holes = result
            .neighbours(id)
            .into_iter()
            .map(|neighbour| result.full_path(neighbour))
            .filter(|path| {
                !path.is_empty()
                    && path.iter().all(|&point| {
                        bbox.contains_coord(point) && signed_distance(point, &outer_only) >= 0.0
                    })
            })
            .map(LineString::from)
            .collect();

        polylabel(&Polygon::new(LineString::from(outer), holes), LABEL_PRECISION)
    }
}

impl FacetProcessor for LabelPlacer {
    fn stage(&self) -> Stage {
        Stage::LabelPlacement
    }

    fn process(&self, result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()> {
        Self::build_label_bounds(result, progress)
    }
}
