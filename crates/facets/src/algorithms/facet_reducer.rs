use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::{
    algorithms::{color_reduction::ColorReducer, facet_builder::FacetBuilder},
    color::Rgb,
    error::Result,
    grid::{BoolGrid, ColorIndexGrid},
    progress::Progress,
    settings::FacetRemovalOrder,
    types::{BoundingBox, FacetResult},
};

/// Merges small facets into their neighbours.
#[derive(Debug, Clone)]
pub struct FacetReducer {
    pub min_facet_size: usize,
    pub removal_order: FacetRemovalOrder,
    pub max_facet_count: Option<usize>,
}

/// Scratch state shared by the deletions of one reduction pass.
struct Reduction<'a> {
    result: &'a mut FacetResult,
    color_indices: &'a mut ColorIndexGrid,
    color_distances: Vec<Vec<f64>>,
    visited: BoolGrid,
}

impl FacetReducer {
    pub fn reduce(
        &self,
        colors_by_index: &[Rgb],
        result: &mut FacetResult,
        color_indices: &mut ColorIndexGrid,
        progress: &mut Progress<'_>,
    ) -> Result<()> {
        let start_count = result.live_count();
        let mut reduction = Reduction {
            visited: BoolGrid::new(result.width, result.height),
            color_distances: ColorReducer::build_color_distance_matrix(colors_by_index),
            result,
            color_indices,
        };

        let mut order = reduction.result.ids_by_size_descending();
        if self.removal_order == FacetRemovalOrder::SmallToLarge {
            order.reverse();
        }
        for (done, &id) in order.iter().enumerate() {
            let too_small = reduction
                .result
                .facet(id)
                .is_some_and(|facet| facet.point_count < self.min_facet_size);
            if too_small {
                reduction.delete_facet(id);
                if progress.slice_elapsed() {
                    progress.report(0.5 * done as f64 / order.len() as f64)?;
                }
            }
        }

        if let Some(max_count) = self.max_facet_count {
            let mut count = reduction.result.live_count();
            if count > max_count {
                info!(count, max_count, "removing the smallest facets to reach the maximum");
            }
            let excess = count.saturating_sub(max_count).max(1) as f64;
            while count > max_count {
                let Some(&smallest) = reduction.result.ids_by_size_descending().last() else {
                    break;
                };
                reduction.delete_facet(smallest);
                let remaining = reduction.result.live_count();
                if remaining >= count {
                    warn!(facet = smallest, "unable to remove facet, keeping {remaining} facets");
                    break;
                }
                count = remaining;
                if progress.slice_elapsed() {
                    progress.report(1.0 - 0.5 * (count - max_count) as f64 / excess)?;
                }
            }
        }

        info!(
            before = start_count,
            after = reduction.result.live_count(),
            "facet reduction finished"
        );
        progress.complete()
    }
}

impl Reduction<'_> {
    /// Repaints a facet's pixels with the colors of its closest neighbours and
    /// rebuilds the affected neighbours. A facet without neighbours is kept.
    fn delete_facet(&mut self, id: usize) {
        let neighbours = self.result.neighbours(id);
        let Some(facet) = self.result.facet(id) else {
            return;
        };
        if neighbours.is_empty() {
            warn!(facet = id, "facet has no neighbours and is kept");
            return;
        }

        let (color, bbox) = (facet.color, facet.bbox);
        for (x, y) in bbox.pixels() {
            if self.result.facet_map.get(x, y) != id {
                continue;
            }
            match self.closest_neighbour(color, &neighbours, x, y) {
                Some(neighbour_color) => self.color_indices.set(x, y, neighbour_color),
                None => warn!(x, y, facet = id, "no closest neighbour found"),
            }
        }

        self.rebuild_changed_neighbours(&neighbours);
        self.repair_orphans(id, bbox, &neighbours);
        self.result.facets[id] = None;
    }

    /// Color of the neighbour with a border point nearest to `(x, y)`; equal
    /// distances prefer the neighbour whose color is closer to `color`.
    fn closest_neighbour(&self, color: u8, neighbours: &[usize], x: usize, y: usize) -> Option<u8> {
        let color_row = &self.color_distances[color as usize];
        let mut best: Option<(usize, f64, u8)> = None;
        for neighbour in neighbours.iter().filter_map(|&n| self.result.facet(n)) {
            let Some(distance) = neighbour
                .border_points
                .iter()
                .map(|point| point.distance_to(x, y))
                .min()
            else {
                continue;
            };
            let color_distance = color_row[neighbour.color as usize];
            let better = best.is_none_or(|(best_distance, best_color_distance, _)| {
                distance < best_distance
                    || (distance == best_distance && color_distance < best_color_distance)
            });
            if better {
                best = Some((distance, color_distance, neighbour.color));
            }
        }
        best.map(|(_, _, color)| color)
    }

    /// Pixels still owned by the removed facet take the color of an adjacent
    /// live facet, preferring left, top, right, bottom.
    fn repair_orphans(&mut self, id: usize, bbox: BoundingBox, neighbours: &[usize]) {
        loop {
            let mut orphans = 0;
            let mut repaired = 0;
            for (x, y) in bbox.pixels() {
                if self.result.facet_map.get(x, y) != id {
                    continue;
                }
                orphans += 1;
                let (xi, yi) = (x as i64, y as i64);
                let adopted = [(xi - 1, yi), (xi, yi - 1), (xi + 1, yi), (xi, yi + 1)]
                    .into_iter()
                    .filter_map(|(nx, ny)| self.result.facet_map.get_checked(nx, ny))
                    .filter(|&owner| owner != id)
                    .find_map(|owner| self.result.facet(owner).map(|facet| facet.color));
                if let Some(color) = adopted {
                    self.color_indices.set(x, y, color);
                    repaired += 1;
                }
            }

            if orphans == 0 {
                return;
            }
            debug!(facet = id, orphans, repaired, "reallocating orphaned pixels");
            if repaired == 0 {
                warn!(facet = id, orphans, "unable to reallocate orphaned pixels");
                return;
            }
            self.rebuild_changed_neighbours(neighbours);
        }
    }

    /// Regrows every neighbour in place from one of its border points.
    ///
    /// Neighbours swallowed by an earlier regrown facet end up empty and are
    /// removed. Rebuilt facets and their previous neighbours are marked dirty.
    fn rebuild_changed_neighbours(&mut self, neighbours: &[usize]) {
        let mut changed = BTreeSet::new();
        for &id in neighbours {
            let Some(seed) = self
                .result
                .facet(id)
                .and_then(|facet| facet.border_points.first().map(|p| (facet.color, *p)))
            else {
                continue;
            };
            changed.insert(id);
            changed.extend(self.result.neighbours(id));

            let (color, point) = seed;
            let facet = FacetBuilder::build_facet(
                id,
                color,
                point.x,
                point.y,
                &mut self.visited,
                self.color_indices,
                &mut self.result.facet_map,
            );
            self.result.facets[id] = (facet.point_count > 0).then_some(facet);
        }

        for &id in neighbours {
            if let Some(facet) = self.result.facet(id) {
                for (x, y) in facet.bbox.pixels() {
                    if self.result.facet_map.get(x, y) == id {
                        self.visited.set(x, y, false);
                    }
                }
            }
        }

        for id in changed {
            self.result.mark_neighbours_dirty(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_facets, grid_from_rows};

    const PALETTE: [Rgb; 3] = [[0, 0, 0], [255, 255, 255], [250, 0, 0]];

    fn reducer(min_facet_size: usize, max_facet_count: Option<usize>) -> FacetReducer {
        FacetReducer {
            min_facet_size,
            removal_order: FacetRemovalOrder::LargeToSmall,
            max_facet_count,
        }
    }

    fn total_points(result: &FacetResult) -> usize {
        result.live_facets().map(|f| f.point_count).sum()
    }

    fn assert_map_is_consistent(result: &FacetResult) {
        for y in 0..result.height {
            for x in 0..result.width {
                assert!(result.is_live(result.facet_map.get(x, y)), "pixel {x},{y}");
            }
        }
        for facet in result.live_facets() {
            let owned = result.facet_map.iter().filter(|&&id| id == facet.id).count();
            assert_eq!(owned, facet.point_count, "facet {}", facet.id);
        }
    }

    #[test]
    fn test_single_pixel_facet_takes_neighbour_color() {
        let mut grid = grid_from_rows(&["aaa", "aba", "aaa"]);
        let mut result = build_facets(&grid);
        assert_eq!(result.live_count(), 2);

        reducer(2, None)
            .reduce(&PALETTE, &mut result, &mut grid, &mut Progress::silent())
            .unwrap();

        assert_eq!(grid.get(1, 1), 0);
        assert_eq!(result.live_count(), 1);
        assert_eq!(total_points(&result), 9);
        assert_map_is_consistent(&result);
    }

    #[test]
    fn test_narrow_columns_merge_into_middle() {
        let mut grid = grid_from_rows(&["aba", "aba", "aba"]);
        let mut result = build_facets(&grid);
        assert_eq!(result.live_count(), 3);

        reducer(4, None)
            .reduce(&PALETTE, &mut result, &mut grid, &mut Progress::silent())
            .unwrap();

        assert_eq!(result.live_count(), 1);
        assert_eq!(total_points(&result), 9);
        assert!(grid.iter().all(|&color| color == 1));
        assert_map_is_consistent(&result);
    }

    #[test]
    fn test_ties_prefer_closer_color() {
        // the `b` pixel touches `a` on the left and `c` on the right
        let mut grid = grid_from_rows(&["aabcc", "aabcc"]);
        let mut result = build_facets(&grid);

        reducer(3, None)
            .reduce(&PALETTE, &mut result, &mut grid, &mut Progress::silent())
            .unwrap();

        // white is closer to red than to black
        assert_eq!(grid.get(2, 0), 2);
        assert_eq!(grid.get(2, 1), 2);
        assert_eq!(result.live_count(), 2);
        assert_map_is_consistent(&result);
    }

    #[test]
    fn test_max_facet_count_removes_smallest() {
        let mut grid = grid_from_rows(&["aaaab", "aaaab", "aaaac", "aaaac"]);
        let mut result = build_facets(&grid);
        assert_eq!(result.live_count(), 3);

        reducer(0, Some(2))
            .reduce(&PALETTE, &mut result, &mut grid, &mut Progress::silent())
            .unwrap();

        assert_eq!(result.live_count(), 2);
        assert_eq!(total_points(&result), 20);
        assert_map_is_consistent(&result);
    }

    #[test]
    fn test_lone_facet_is_kept() {
        let mut grid = grid_from_rows(&["aa", "aa"]);
        let mut result = build_facets(&grid);

        reducer(10, Some(0))
            .reduce(&PALETTE, &mut result, &mut grid, &mut Progress::silent())
            .unwrap();

        assert_eq!(result.live_count(), 1);
        assert_eq!(total_points(&result), 4);
    }
}
