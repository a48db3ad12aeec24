//! Iterative scanline flood fill.

/// Grid being flooded. `is_fillable` must turn false once `fill` has been called on a cell.
pub trait FillTarget {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn is_fillable(&self, x: usize, y: usize) -> bool;
    fn fill(&mut self, x: usize, y: usize);
}

/// Fills the 4-connected region of fillable cells containing `(x, y)`.
///
/// Each seed is widened into a horizontal span, then one seed per fillable run
/// on the rows above and below the span is queued.
pub fn flood_fill<T: FillTarget>(target: &mut T, x: usize, y: usize) {
    let (width, height) = (target.width(), target.height());
    let mut seeds = vec![(x, y)];

    while let Some((sx, sy)) = seeds.pop() {
        if !target.is_fillable(sx, sy) {
            continue;
        }

        let mut left = sx;
        while left > 0 && target.is_fillable(left - 1, sy) {
            left -= 1;
        }
        let mut right = sx;
        while right + 1 < width && target.is_fillable(right + 1, sy) {
            right += 1;
        }
        for fx in left..=right {
            target.fill(fx, sy);
        }

        let rows = [sy.checked_sub(1), (sy + 1 < height).then_some(sy + 1)];
        for row in rows.into_iter().flatten() {
            let mut in_run = false;
            for fx in left..=right {
                let fillable = target.is_fillable(fx, row);
                if fillable && !in_run {
                    seeds.push((fx, row));
                }
                in_run = fillable;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    struct Canvas {
        cells: Grid<u8>,
        filled: usize,
    }

    impl FillTarget for Canvas {
        fn width(&self) -> usize {
            self.cells.width()
        }

        fn height(&self) -> usize {
            self.cells.height()
        }

        fn is_fillable(&self, x: usize, y: usize) -> bool {
            self.cells.get(x, y) == 0
        }

        fn fill(&mut self, x: usize, y: usize) {
            self.cells.set(x, y, 2);
            self.filled += 1;
        }
    }

    fn canvas(rows: &[&str]) -> Canvas {
        let width = rows[0].len();
        let cells = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| if b == b'#' { 1 } else { 0 }))
            .collect();
        Canvas {
            cells: Grid::from_vec(width, rows.len(), cells).unwrap(),
            filled: 0,
        }
    }

    #[test]
    fn test_fills_around_obstacles() {
        let mut c = canvas(&[
            "....#",
            ".##.#",
            ".#..#",
            "...##",
            "##...",
        ]);
        flood_fill(&mut c, 0, 0);
        // everything reachable from the corner, including the bottom-right pocket
        assert_eq!(c.filled, 15);
        assert_eq!(c.cells.get(4, 4), 2);
        assert_eq!(c.cells.get(4, 0), 1);
    }

    #[test]
    fn test_does_not_leak_diagonally() {
        let mut c = canvas(&[
            ".#",
            "#.",
        ]);
        flood_fill(&mut c, 0, 0);
        assert_eq!(c.filled, 1);
        assert_eq!(c.cells.get(1, 1), 0);
    }

    #[test]
    fn test_unfillable_seed_is_noop() {
        let mut c = canvas(&["#."]);
        flood_fill(&mut c, 0, 0);
        assert_eq!(c.filled, 0);
    }
}
