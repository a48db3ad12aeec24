//! Pole of inaccessibility: the interior point farthest from a polygon's
//! boundary, found by a best-first quadtree search over square cells.

use std::cmp::Ordering;

use geo::{Area, BoundingRect, Centroid, Contains, EuclideanDistance};
use geo_types::{Coord, Point, Polygon};

use crate::collections::{PriorityItem, PriorityQueue};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polylabel {
    pub point: Coord<f64>,
    /// Distance to the closest ring, negative outside the polygon
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    key: usize,
    center: Coord<f64>,
    half: f64,
    distance: f64,
    /// Best distance any point inside the cell could reach
    max: f64,
}

impl Cell {
    fn new(key: usize, center: Coord<f64>, half: f64, polygon: &Polygon<f64>) -> Self {
        let distance = signed_distance(center, polygon);
        Self {
            key,
            center,
            half,
            distance,
            max: distance + half * std::f64::consts::SQRT_2,
        }
    }
}

impl PriorityItem for Cell {
    type Key = usize;

    fn key(&self) -> usize {
        self.key
    }

    fn compare(&self, other: &Self) -> Ordering {
        other.max.total_cmp(&self.max)
    }
}

/// Distance from `point` to the nearest ring of `polygon`, positive inside.
pub fn signed_distance(point: Coord<f64>, polygon: &Polygon<f64>) -> f64 {
    let point = Point::from(point);
    let distance = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| point.euclidean_distance(ring))
        .fold(f64::INFINITY, f64::min);
    if polygon.contains(&point) {
        distance
    } else {
        -distance
    }
}

/// Searches the exterior's bounding box until no cell can improve the best
/// distance by more than `precision`.
pub fn polylabel(polygon: &Polygon<f64>, precision: f64) -> Polylabel {
    let Some(bounds) = polygon.exterior().bounding_rect() else {
        return Polylabel {
            point: Coord { x: 0.0, y: 0.0 },
            distance: 0.0,
        };
    };
    let (min, max) = (bounds.min(), bounds.max());
    let cell_size = bounds.width().min(bounds.height());
    if cell_size == 0.0 {
        return Polylabel {
            point: min,
            distance: 0.0,
        };
    }

    let mut next_key = 0usize;
    let mut cell = |center: Coord<f64>, half: f64| {
        next_key += 1;
        Cell::new(next_key, center, half, polygon)
    };

    let mut queue = PriorityQueue::new();
    let half = cell_size / 2.0;
    let mut x = min.x;
    while x < max.x {
        let mut y = min.y;
        while y < max.y {
            queue.enqueue(cell(Coord { x: x + half, y: y + half }, half));
            y += cell_size;
        }
        x += cell_size;
    }

    let mut best = cell(centroid(polygon), 0.0);
    let bbox_cell = cell(bounds.center(), 0.0);
    if bbox_cell.distance > best.distance {
        best = bbox_cell;
    }

    while let Some(current) = queue.dequeue() {
        if current.distance > best.distance {
            best = current;
        }
        if current.max - best.distance <= precision {
            continue;
        }
        let half = current.half / 2.0;
        let Coord { x, y } = current.center;
        for (dx, dy) in [(-half, -half), (half, -half), (-half, half), (half, half)] {
            queue.enqueue(cell(Coord { x: x + dx, y: y + dy }, half));
        }
    }

    Polylabel {
        point: best.center,
        distance: best.distance,
    }
}

/// Area centroid of the exterior ring, or its first vertex when the ring has no area.
fn centroid(polygon: &Polygon<f64>) -> Coord<f64> {
    let exterior = Polygon::new(polygon.exterior().clone(), Vec::new());
    let first = polygon.exterior().0.first().copied().unwrap_or(Coord { x: 0.0, y: 0.0 });
    if exterior.signed_area() == 0.0 {
        return first;
    }
    exterior.centroid().map(Coord::from).unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use geo_types::LineString;

    use super::*;

    fn square(min: f64, max: f64) -> LineString<f64> {
        LineString::from(vec![(min, min), (max, min), (max, max), (min, max)])
    }

    #[test]
    fn test_square_center() {
        let label = polylabel(&Polygon::new(square(0.0, 10.0), vec![]), 1.0);
        assert!((label.point.x - 5.0).abs() < 1e-9);
        assert!((label.point.y - 5.0).abs() < 1e-9);
        assert!((label.distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_avoids_hole() {
        let polygon = Polygon::new(square(0.0, 20.0), vec![square(5.0, 15.0)]);
        let label = polylabel(&polygon, 1.0);
        assert!(label.distance > 1.5 && label.distance <= 2.5 + 1e-9);
        assert!(signed_distance(label.point, &polygon) > 0.0);
        let in_hole = (5.0..=15.0).contains(&label.point.x) && (5.0..=15.0).contains(&label.point.y);
        assert!(!in_hole);
    }

    #[test]
    fn test_flat_polygon_yields_corner() {
        let flat = LineString::from(vec![(2.0, 3.0), (8.0, 3.0), (5.0, 3.0)]);
        let label = polylabel(&Polygon::new(flat, vec![]), 1.0);
        assert_eq!(label.point, Coord { x: 2.0, y: 3.0 });
        assert_eq!(label.distance, 0.0);
    }

    #[test]
    fn test_signed_distance_sign() {
        let polygon = Polygon::new(square(0.0, 4.0), vec![]);
        assert_eq!(signed_distance(Coord { x: 1.0, y: 2.0 }, &polygon), 1.0);
        assert_eq!(signed_distance(Coord { x: -3.0, y: 2.0 }, &polygon), -3.0);
    }
}
