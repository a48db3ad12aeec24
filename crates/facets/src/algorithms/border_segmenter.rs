//! Splits traced borders into segments shared between neighbouring facets.

use geo_types::Coord;

use crate::{
    error::Result,
    grid::FacetMap,
    pipeline::Stage,
    progress::Progress,
    traits::FacetProcessor,
    types::{Facet, FacetBoundarySegment, FacetResult, Orientation, PathPoint, PathSegment},
};

/// Largest Manhattan distance between matching segment endpoints.
const MAX_ENDPOINT_DISTANCE: f64 = 4.0;
/// Segments this short are never simplified further.
const MIN_HALVING_LENGTH: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct BorderSegmenter {
    pub halving_rounds: usize,
}

impl Default for BorderSegmenter {
    fn default() -> Self {
        Self { halving_rounds: 2 }
    }
}

impl BorderSegmenter {
    pub fn new(halving_rounds: usize) -> Self {
        Self { halving_rounds }
    }

    pub fn build_segments(&self, result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()> {
        let mut prepared: Vec<Vec<Option<PathSegment>>> = result
            .facets
            .iter()
            .map(|slot| match slot {
                Some(facet) => split_border_path(facet, &result.facet_map)
                    .into_iter()
                    .map(|mut segment| {
                        for _ in 0..self.halving_rounds {
                            segment.points = halve(&segment.points, result.width, result.height);
                        }
                        Some(segment)
                    })
                    .collect(),
                None => Vec::new(),
            })
            .collect();

        let mut boundaries: Vec<Vec<Option<FacetBoundarySegment>>> =
            prepared.iter().map(|segments| vec![None; segments.len()]).collect();
        result.segments.clear();

        for id in 0..prepared.len() {
            for s in 0..prepared[id].len() {
                let Some(segment) = prepared[id][s].take() else {
                    continue;
                };
                let index = result.segments.len();
                boundaries[id][s] = Some(FacetBoundarySegment {
                    segment: index,
                    neighbour: segment.neighbour,
                    reversed: false,
                });

                if let Some(neighbour) = segment.neighbour {
                    let candidates = prepared.get(neighbour).map(Vec::as_slice).unwrap_or(&[]);
                    if let Some((ns, reversed)) = find_match(&segment, id, candidates) {
                        prepared[neighbour][ns] = None;
                        boundaries[neighbour][ns] = Some(FacetBoundarySegment {
                            segment: index,
                            neighbour: Some(id),
                            reversed,
                        });
                    }
                }
                result.segments.push(segment);
            }
            progress.checkpoint(id, prepared.len())?;
        }

        for (id, slots) in boundaries.into_iter().enumerate() {
            if let Some(facet) = result.facet_mut(id) {
                facet.border_segments = slots.into_iter().flatten().collect();
            }
        }

        progress.complete()
    }
}

impl FacetProcessor for BorderSegmenter {
    fn stage(&self) -> Stage {
        Stage::BorderSegmentation
    }

    fn process(&self, result: &mut FacetResult, progress: &mut Progress<'_>) -> Result<()> {
        self.build_segments(result, progress)
    }
}

/// Cuts a facet's border path wherever the facet on the other side changes.
///
/// The transition point closes the running segment and opens the next one.
/// A trailing run with the same neighbour as the first segment is glued in
/// front of it since the path is a loop.
pub fn split_border_path(facet: &Facet, facet_map: &FacetMap) -> Vec<PathSegment> {
    let path = &facet.border_path;
    let mut segments: Vec<PathSegment> = Vec::new();
    if path.len() <= 1 {
        return segments;
    }

    let mut current = vec![path[0].wall()];
    for pair in path.windows(2) {
        let (previous, point) = (&pair[0], &pair[1]);
        let old_neighbour = previous.neighbour(facet_map);
        current.push(point.wall());
        if is_transition(previous, point, old_neighbour, facet_map) {
            segments.push(PathSegment {
                points: std::mem::replace(&mut current, vec![point.wall()]),
                neighbour: old_neighbour,
            });
        }
    }

    if current.len() > 1 {
        let neighbour = path[path.len() - 1].neighbour(facet_map);
        match segments.first_mut() {
            Some(first) if first.neighbour == neighbour => {
                current.append(&mut first.points);
                first.points = current;
            }
            _ => segments.push(PathSegment {
                points: current,
                neighbour,
            }),
        }
    }
    segments
}

fn is_transition(
    previous: &PathPoint,
    point: &PathPoint,
    old_neighbour: Option<usize>,
    facet_map: &FacetMap,
) -> bool {
    if point.neighbour(facet_map) != old_neighbour {
        return true;
    }
    let Some(neighbour) = old_neighbour else {
        return false;
    };
    if previous.x != point.x || previous.y != point.y {
        return false;
    }

    use Orientation::*;
    let diagonal = match (previous.orientation, point.orientation) {
        (Top, Left) | (Left, Top) => (-1, -1),
        (Top, Right) | (Right, Top) => (1, -1),
        (Bottom, Left) | (Left, Bottom) => (-1, 1),
        (Bottom, Right) | (Right, Bottom) => (1, 1),
        _ => return false,
    };
    let (x, y) = (point.x as i64 + diagonal.0, point.y as i64 + diagonal.1);
    facet_map.get_checked(x, y) != Some(neighbour)
}

/// One simplification round: keeps both ends and merges interior point
/// pairs into their midpoint unless the pair touches the image border.
///
/// The border test looks at both points of a pair and only at walls on the
/// outer image edge. Inner walls of edge pixels are still merged.
pub fn halve(points: &[Coord<f64>], width: usize, height: usize) -> Vec<Coord<f64>> {
    if points.len() <= MIN_HALVING_LENGTH {
        return points.to_vec();
    }
    let mut reduced = Vec::with_capacity(points.len() / 2 + 2);
    reduced.push(points[0]);
    let mut i = 1;
    while i < points.len() - 2 {
        let (a, b) = (points[i], points[i + 1]);
        if on_outer_border(a, width, height) || on_outer_border(b, width, height) {
            reduced.push(a);
            reduced.push(b);
        } else {
            reduced.push(Coord {
                x: (a.x + b.x) / 2.0,
                y: (a.y + b.y) / 2.0,
            });
        }
        i += 2;
    }
    reduced.push(points[points.len() - 1]);
    reduced
}

fn on_outer_border(point: Coord<f64>, width: usize, height: usize) -> bool {
    point.x == -0.5
        || point.y == -0.5
        || point.x == width as f64 - 0.5
        || point.y == height as f64 - 0.5
}

fn manhattan(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Finds the neighbour segment running along `segment`, returning its slot
/// and whether it runs in the opposite direction.
fn find_match(
    segment: &PathSegment,
    facet_id: usize,
    candidates: &[Option<PathSegment>],
) -> Option<(usize, bool)> {
    let (start, end) = (segment.points.first()?, segment.points.last()?);
    candidates.iter().enumerate().find_map(|(ns, candidate)| {
        let candidate = candidate.as_ref()?;
        if candidate.neighbour != Some(facet_id) {
            return None;
        }
        let (other_start, other_end) = (candidate.points.first()?, candidate.points.last()?);
        let straight = (manhattan(*start, *other_start), manhattan(*end, *other_end));
        let reverse = (manhattan(*start, *other_end), manhattan(*end, *other_start));
        let fits = |(a, b): (f64, f64)| a <= MAX_ENDPOINT_DISTANCE && b <= MAX_ENDPOINT_DISTANCE;

        match (fits(straight), fits(reverse)) {
            (true, true) => Some((ns, straight.0 + straight.1 >= reverse.0 + reverse.1)),
            (true, false) => Some((ns, false)),
            (false, true) => Some((ns, true)),
            (false, false) => None,
        }
    })
}
