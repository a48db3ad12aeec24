use geo_types::{Coord, Rect};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{
    color::Rgb,
    grid::{ColorIndexGrid, FacetMap},
};

/// A pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `(x, y)`.
    pub fn distance_to(&self, x: usize, y: usize) -> usize {
        self.x.abs_diff(x) + self.y.abs_diff(y)
    }
}

/// Inclusive pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl BoundingBox {
    /// A box that becomes valid after the first [`BoundingBox::include`].
    pub fn empty() -> Self {
        Self {
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        }
    }

    pub fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Zero for an empty box.
    pub fn width(&self) -> usize {
        (self.max_x + 1).saturating_sub(self.min_x)
    }

    pub fn height(&self) -> usize {
        (self.max_y + 1).saturating_sub(self.min_y)
    }

    pub fn on_edge(&self, x: usize, y: usize) -> bool {
        x == self.min_x || x == self.max_x || y == self.min_y || y == self.max_y
    }

    pub fn contains_coord(&self, coord: Coord<f64>) -> bool {
        coord.x >= self.min_x as f64
            && coord.x <= self.max_x as f64
            && coord.y >= self.min_y as f64
            && coord.y <= self.max_y as f64
    }

    /// Pixel coordinates covered by the box, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y).flat_map(move |y| (min_x..=max_x).map(move |x| (x, y)))
    }
}

/// Side of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Left,
    Top,
    Right,
    Bottom,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Left,
        Orientation::Top,
        Orientation::Right,
        Orientation::Bottom,
    ];

    /// Unit step from the pixel towards the outside of this side.
    pub fn normal(self) -> (i64, i64) {
        match self {
            Orientation::Left => (-1, 0),
            Orientation::Top => (0, -1),
            Orientation::Right => (1, 0),
            Orientation::Bottom => (0, 1),
        }
    }

    /// The side facing `direction`, which must be a unit step.
    pub fn facing(direction: (i64, i64)) -> Self {
        match direction {
            (-1, 0) => Orientation::Left,
            (0, -1) => Orientation::Top,
            (1, 0) => Orientation::Right,
            _ => Orientation::Bottom,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Orientation::Left | Orientation::Right)
    }
}

/// An oriented boundary edge: one side of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: usize,
    pub y: usize,
    pub orientation: Orientation,
}

impl PathPoint {
    pub fn new(x: usize, y: usize, orientation: Orientation) -> Self {
        Self { x, y, orientation }
    }

    pub fn wall_x(&self) -> f64 {
        match self.orientation {
            Orientation::Left => self.x as f64 - 0.5,
            Orientation::Right => self.x as f64 + 0.5,
            _ => self.x as f64,
        }
    }

    pub fn wall_y(&self) -> f64 {
        match self.orientation {
            Orientation::Top => self.y as f64 - 0.5,
            Orientation::Bottom => self.y as f64 + 0.5,
            _ => self.y as f64,
        }
    }

    /// Midpoint of the pixel side.
    pub fn wall(&self) -> Coord<f64> {
        Coord {
            x: self.wall_x(),
            y: self.wall_y(),
        }
    }

    /// The pixel on the other side of this edge, if it is on the grid.
    pub fn exterior(&self) -> (i64, i64) {
        let (dx, dy) = self.orientation.normal();
        (self.x as i64 + dx, self.y as i64 + dy)
    }

    /// Facet across this edge, `None` along the image border.
    pub fn neighbour(&self, facet_map: &FacetMap) -> Option<usize> {
        let (x, y) = self.exterior();
        facet_map.get_checked(x, y)
    }
}

/// A run of border wall positions shared with at most one neighbouring facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub points: Vec<Coord<f64>>,
    pub neighbour: Option<usize>,
}

/// A facet's reference to a segment of [`FacetResult::segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBoundarySegment {
    pub segment: usize,
    pub neighbour: Option<usize>,
    pub reversed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facet {
    pub id: usize,
    /// Index into the palette
    pub color: u8,
    pub point_count: usize,
    pub border_points: Vec<Point>,
    pub bbox: BoundingBox,
    /// Adjacent facet ids in ascending order, stale while `neighbours_dirty` is set
    pub neighbours: Vec<usize>,
    pub neighbours_dirty: bool,
    pub border_path: Vec<PathPoint>,
    pub border_segments: Vec<FacetBoundarySegment>,
    pub label_point: Option<Coord<f64>>,
    pub label_bounds: Option<Rect<f64>>,
}

impl Facet {
    pub fn new(id: usize, color: u8) -> Self {
        Self {
            id,
            color,
            point_count: 0,
            border_points: Vec::new(),
            bbox: BoundingBox::empty(),
            neighbours: Vec::new(),
            neighbours_dirty: true,
            border_path: Vec::new(),
            border_segments: Vec::new(),
            label_point: None,
            label_bounds: None,
        }
    }
}

/// Facet partition of an image. Removed facets leave a `None` slot so ids stay stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetResult {
    pub width: usize,
    pub height: usize,
    pub facet_map: FacetMap,
    pub facets: Vec<Option<Facet>>,
    /// Border segments referenced by [`Facet::border_segments`]
    pub segments: Vec<PathSegment>,
}

impl FacetResult {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            facet_map: FacetMap::new(width, height),
            facets: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn facet(&self, id: usize) -> Option<&Facet> {
        self.facets.get(id).and_then(Option::as_ref)
    }

    pub fn facet_mut(&mut self, id: usize) -> Option<&mut Facet> {
        self.facets.get_mut(id).and_then(Option::as_mut)
    }

    pub fn live_facets(&self) -> impl Iterator<Item = &Facet> {
        self.facets.iter().flatten()
    }

    pub fn live_count(&self) -> usize {
        self.live_facets().count()
    }

    pub fn is_live(&self, id: usize) -> bool {
        self.facet(id).is_some()
    }

    /// Live facet ids sorted by descending pixel count, ties by ascending id.
    pub fn ids_by_size_descending(&self) -> Vec<usize> {
        let mut ids: Vec<(usize, usize)> = self
            .live_facets()
            .map(|f| (f.id, f.point_count))
            .collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ids.into_iter().map(|(id, _)| id).collect()
    }

    /// Closed outline of a facet assembled from its border segments.
    ///
    /// Before every segment but the first, the previous segment's end point is
    /// repeated so consecutive segments join even after simplification.
    pub fn full_path(&self, id: usize) -> Vec<Coord<f64>> {
        let Some(facet) = self.facet(id) else {
            return Vec::new();
        };
        let mut path = Vec::new();
        let mut previous: Option<&FacetBoundarySegment> = None;
        for boundary in &facet.border_segments {
            if let Some(last) = previous {
                let points = &self.segments[last.segment].points;
                let end = if last.reversed {
                    points.first()
                } else {
                    points.last()
                };
                path.extend(end.copied());
            }
            let points = &self.segments[boundary.segment].points;
            if boundary.reversed {
                path.extend(points.iter().rev().copied());
            } else {
                path.extend(points.iter().copied());
            }
            previous = Some(boundary);
        }
        path
    }
}

/// Palette indices of the clustered image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorMapResult {
    pub color_indices: ColorIndexGrid,
    pub colors_by_index: Vec<Rgb>,
    pub width: usize,
    pub height: usize,
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub facet_result: FacetResult,
    pub colors_by_index: Vec<Rgb>,
    /// The image after k-means color reduction
    pub clustered_image: RgbaImage,
}

impl ProcessResult {
    pub fn facet_color(&self, facet: &Facet) -> Rgb {
        self.colors_by_index[facet.color as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bounding_box_has_no_extent() {
        let bounds = BoundingBox::empty();
        assert_eq!((bounds.width(), bounds.height()), (0, 0));
        assert_eq!(bounds.pixels().count(), 0);
    }

    #[test]
    fn test_bounding_box_grows_with_points() {
        let mut bounds = BoundingBox::empty();
        bounds.include(2, 3);
        assert_eq!((bounds.width(), bounds.height()), (1, 1));
        bounds.include(5, 1);
        assert_eq!((bounds.width(), bounds.height()), (4, 3));
    }
}
