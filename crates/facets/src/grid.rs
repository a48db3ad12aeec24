//! Fixed-size row-major 2D grids used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// A width×height grid of `Copy` cells stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

/// Palette index per pixel.
pub type ColorIndexGrid = Grid<u8>;
/// Facet id per pixel.
pub type FacetMap = Grid<usize>;
pub type BoolGrid = Grid<bool>;

impl<T: Copy + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T: Copy> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    /// Builds a grid from row-major cells. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.cells[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.cells[y * self.width + x] = value;
    }

    /// Signed lookup that yields `None` outside the grid.
    #[inline]
    pub fn get_checked(&self, x: i64, y: i64) -> Option<T> {
        if self.contains(x, y) {
            Some(self.get(x as usize, y as usize))
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

impl<T: Copy + PartialEq> Grid<T> {
    /// True when all four 4-neighbours exist and hold `value`.
    pub fn match_all_around(&self, x: usize, y: usize, value: T) -> bool {
        x > 0
            && y > 0
            && x + 1 < self.width
            && y + 1 < self.height
            && self.get(x - 1, y) == value
            && self.get(x, y - 1) == value
            && self.get(x + 1, y) == value
            && self.get(x, y + 1) == value
    }
}
