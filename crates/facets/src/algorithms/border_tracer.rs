//! Traces the outer boundary of every facet as a loop of pixel sides.

use tracing::warn;

use crate::{
    error::Result,
    grid::{BoolGrid, FacetMap, Grid},
    pipeline::Stage,
    progress::Progress,
    traits::FacetProcessor,
    types::{Facet, FacetResult, Orientation, PathPoint},
};

const LEFT_SIDE: u8 = 1;
const RIGHT_SIDE: u8 = 2;
const TOP_SIDE: u8 = 4;
const BOTTOM_SIDE: u8 = 8;

/// Edge occupancy shared by all facet traces of one tracer run.
///
/// Vertical walls are indexed `(x, y)` for the wall left of pixel `x`,
/// horizontal walls `(x, y)` for the wall above pixel `y`. Every wall
/// remembers which of its two pixel sides has been claimed.
pub struct WallState {
    border_mask: BoolGrid,
    vertical: Grid<u8>,
    horizontal: Grid<u8>,
}

impl WallState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            border_mask: BoolGrid::new(width, height),
            vertical: Grid::new(width + 1, height),
            horizontal: Grid::new(width, height + 1),
        }
    }

    fn slot(&mut self, point: &PathPoint) -> (&mut Grid<u8>, usize, usize, u8) {
        let (x, y) = (point.x, point.y);
        match point.orientation {
            Orientation::Left => (&mut self.vertical, x, y, LEFT_SIDE),
            Orientation::Right => (&mut self.vertical, x + 1, y, RIGHT_SIDE),
            Orientation::Top => (&mut self.horizontal, x, y, TOP_SIDE),
            Orientation::Bottom => (&mut self.horizontal, x, y + 1, BOTTOM_SIDE),
        }
    }

    pub fn is_claimed(&mut self, point: &PathPoint) -> bool {
        let (grid, x, y, side) = self.slot(point);
        grid.get(x, y) & side != 0
    }

    fn claim(&mut self, point: &PathPoint) {
        let (grid, x, y, side) = self.slot(point);
        let bits = grid.get(x, y);
        grid.set(x, y, bits | side);
    }

    fn is_border(&self, x: i64, y: i64) -> bool {
        self.border_mask.get_checked(x, y).unwrap_or(false)
    }
}

/// Facet under trace.
struct Walk<'a> {
    id: usize,
    facet_map: &'a FacetMap,
}

impl Walk<'_> {
    fn owns(&self, x: i64, y: i64) -> bool {
        self.facet_map.get_checked(x, y) == Some(self.id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BorderTracer;

impl BorderTracer {
    /// Traces every live facet, largest first.
    pub fn build_border_paths(result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()> {
        let order = result.ids_by_size_descending();
        let mut walls = WallState::new(result.width, result.height);

        for (done, &id) in order.iter().enumerate() {
            let Some(facet) = result.facet(id) else {
                continue;
            };
            for point in &facet.border_points {
                walls.border_mask.set(point.x, point.y, true);
            }
            let path = Self::trace(facet, &result.facet_map, &mut walls);
            if path.is_empty() {
                warn!(facet = id, "no free border edge to start tracing from");
            }
            if let Some(facet) = result.facet_mut(id) {
                facet.border_path = path;
            }
            progress.checkpoint(done, order.len())?;
        }

        progress.complete()
    }

    /// Walks the outer boundary of `facet`, claiming each placed edge in `walls`.
    pub fn trace(facet: &Facet, facet_map: &FacetMap, walls: &mut WallState) -> Vec<PathPoint> {
        let walk = Walk {
            id: facet.id,
            facet_map,
        };
        let Some(start) = Self::start_point(facet, &walk, walls) else {
            return Vec::new();
        };

        walls.claim(&start);
        let mut path = vec![start];
        let mut current = start;
        while let Some(next) = Self::next_point(&current, &walk, walls) {
            walls.claim(&next);
            path.push(next);
            current = next;
        }
        path
    }

    fn start_point(facet: &Facet, walk: &Walk<'_>, walls: &mut WallState) -> Option<PathPoint> {
        let start = facet
            .border_points
            .iter()
            .find(|p| facet.bbox.on_edge(p.x, p.y))?;
        Orientation::ALL
            .into_iter()
            .map(|orientation| PathPoint::new(start.x, start.y, orientation))
            .find(|candidate| {
                let (ex, ey) = candidate.exterior();
                !walk.owns(ex, ey) && !walls.is_claimed(candidate)
            })
    }

    /// First legal continuation from `current`.
    ///
    /// With `n` the outward normal and `t` each tangent in turn (up then down
    /// for vertical sides, left then right for horizontal ones) the candidates
    /// are, in order: the side facing `t` on the same pixel when the pixel
    /// beyond is foreign; the same side on the pixel at `t` when it continues
    /// the straight wall; the side facing `-t` on the pixel at `t + n` when the
    /// wall turns around an inner corner.
    fn next_point(current: &PathPoint, walk: &Walk<'_>, walls: &mut WallState) -> Option<PathPoint> {
        let (x, y) = (current.x as i64, current.y as i64);
        let (nx, ny) = current.orientation.normal();
        let tangents: [(i64, i64); 2] = if current.orientation.is_vertical() {
            [(0, -1), (0, 1)]
        } else {
            [(-1, 0), (1, 0)]
        };

        for (tx, ty) in tangents {
            if !walk.owns(x + tx, y + ty) {
                let candidate = PathPoint::new(current.x, current.y, Orientation::facing((tx, ty)));
                if !walls.is_claimed(&candidate) {
                    return Some(candidate);
                }
            }
        }

        for (tx, ty) in tangents {
            let (qx, qy) = (x + tx, y + ty);
            if walk.owns(qx, qy) && !walk.owns(qx + nx, qy + ny) && walls.is_border(qx, qy) {
                let candidate = PathPoint::new(qx as usize, qy as usize, current.orientation);
                if !walls.is_claimed(&candidate) {
                    return Some(candidate);
                }
            }
        }

        for (tx, ty) in tangents {
            let (qx, qy) = (x + tx + nx, y + ty + ny);
            if walk.owns(qx, qy) && walls.is_border(qx, qy) {
                let candidate = PathPoint::new(qx as usize, qy as usize, Orientation::facing((-tx, -ty)));
                let corner = PathPoint::new(current.x, current.y, Orientation::facing((tx, ty)));
                if !walls.is_claimed(&candidate) && !walls.is_claimed(&corner) {
                    return Some(candidate);
                }
            }
        }

        None
    }
}

impl FacetProcessor for BorderTracer {
    fn stage(&self) -> Stage {
        Stage::BorderTracing
    }

    fn process(&self, result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()> {
        Self::build_border_paths(result, progress)
    }
}
