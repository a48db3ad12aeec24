use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    algorithms::fill::{FillTarget, flood_fill},
    error::Result,
    grid::{BoolGrid, ColorIndexGrid, FacetMap},
    progress::{CHECKPOINT_INTERVAL, Progress},
    types::{Facet, FacetResult, Point},
};

/// Splits a color index grid into 4-connected same-color facets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetBuilder;

impl FacetBuilder {
    pub fn build(color_indices: &ColorIndexGrid, progress: &mut Progress<'_>) -> Result<FacetResult> {
        let (width, height) = (color_indices.width(), color_indices.height());
        let mut result = FacetResult::new(width, height);
        let mut visited = BoolGrid::new(width, height);
        let total = width * height;

        for y in 0..height {
            for x in 0..width {
                if visited.get(x, y) {
                    continue;
                }
                let id = result.facets.len();
                let facet = Self::build_facet(
                    id,
                    color_indices.get(x, y),
                    x,
                    y,
                    &mut visited,
                    color_indices,
                    &mut result.facet_map,
                );
                result.facets.push(Some(facet));
                if id % CHECKPOINT_INTERVAL == 0 {
                    progress.report((y * width + x) as f64 / total as f64)?;
                }
            }
        }

        for id in 0..result.facets.len() {
            result.refresh_neighbours(id);
        }
        debug!(facets = result.facets.len(), "facets built");
        progress.complete()?;
        Ok(result)
    }

    /// Flood fills facet `id` from `(x, y)`, stamping it into `facet_map`.
    ///
    /// Pixels already marked in `visited` are skipped, so a seed that was
    /// claimed by an earlier fill produces a facet with no points.
    pub fn build_facet(
        id: usize,
        color: u8,
        x: usize,
        y: usize,
        visited: &mut BoolGrid,
        color_indices: &ColorIndexGrid,
        facet_map: &mut FacetMap,
    ) -> Facet {
        let mut fill = FacetFill {
            facet: Facet::new(id, color),
            visited,
            color_indices,
            facet_map,
        };
        flood_fill(&mut fill, x, y);
        fill.facet
    }

    /// Distinct facet ids 4-adjacent to the facet's border points, ascending.
    pub fn neighbours_of(facet: &Facet, facet_map: &FacetMap) -> Vec<usize> {
        let mut neighbours = BTreeSet::new();
        for point in &facet.border_points {
            let (x, y) = (point.x as i64, point.y as i64);
            for (nx, ny) in [(x - 1, y), (x, y - 1), (x + 1, y), (x, y + 1)] {
                if let Some(id) = facet_map.get_checked(nx, ny) {
                    if id != facet.id {
                        neighbours.insert(id);
                    }
                }
            }
        }
        neighbours.into_iter().collect()
    }
}

struct FacetFill<'a> {
    facet: Facet,
    visited: &'a mut BoolGrid,
    color_indices: &'a ColorIndexGrid,
    facet_map: &'a mut FacetMap,
}

impl FillTarget for FacetFill<'_> {
    fn width(&self) -> usize {
        self.color_indices.width()
    }

    fn height(&self) -> usize {
        self.color_indices.height()
    }

    fn is_fillable(&self, x: usize, y: usize) -> bool {
        !self.visited.get(x, y) && self.color_indices.get(x, y) == self.facet.color
    }

    fn fill(&mut self, x: usize, y: usize) {
        self.visited.set(x, y, true);
        self.facet_map.set(x, y, self.facet.id);
        self.facet.point_count += 1;
        if !self.color_indices.match_all_around(x, y, self.facet.color) {
            self.facet.border_points.push(Point::new(x, y));
        }
        self.facet.bbox.include(x, y);
    }
}

impl FacetResult {
    /// Recomputes the neighbour list of a live facet if it is marked dirty.
    pub fn refresh_neighbours(&mut self, id: usize) {
        let Some(facet) = self.facet(id) else {
            return;
        };
        if !facet.neighbours_dirty {
            return;
        }
        let neighbours = FacetBuilder::neighbours_of(facet, &self.facet_map);
        if let Some(facet) = self.facet_mut(id) {
            facet.neighbours = neighbours;
            facet.neighbours_dirty = false;
        }
    }

    /// Up to date neighbour ids of a live facet.
    pub fn neighbours(&mut self, id: usize) -> Vec<usize> {
        self.refresh_neighbours(id);
        self.facet(id)
            .map(|facet| facet.neighbours.clone())
            .unwrap_or_default()
    }

    pub fn mark_neighbours_dirty(&mut self, id: usize) {
        if let Some(facet) = self.facet_mut(id) {
            facet.neighbours_dirty = true;
        }
    }
}
