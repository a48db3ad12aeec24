use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use crate::{
    algorithms::clustering::{KMeans, Vector},
    color::{Rgb, hsl_to_rgb, lab_distance, lab_to_rgb, rgb_distance, rgb_to_hsl, rgb_to_lab},
    error::{PaintError, Result},
    grid::ColorIndexGrid,
    progress::Progress,
    random::Random,
    settings::{ClusteringColorSpace, Settings},
    types::ColorMapResult,
};

/// Low bits dropped from every channel before grouping pixels.
const QUANTIZATION_BITS: u8 = 2;

/// Pixels sharing one quantized color.
struct ColorGroup {
    rgb: Rgb,
    pixels: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorReducer;

impl ColorReducer {
    /// Assigns palette indices to the distinct colors of `image` in scan order.
    pub fn create_color_map(image: &RgbaImage) -> Result<ColorMapResult> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let mut indices: HashMap<Rgb, u8> = HashMap::new();
        let mut colors_by_index: Vec<Rgb> = Vec::new();
        let mut cells = Vec::with_capacity(width * height);

        for pixel in image.pixels() {
            let rgb = [pixel[0], pixel[1], pixel[2]];
            let index = match indices.get(&rgb) {
                Some(&index) => index,
                None => {
                    let index = u8::try_from(colors_by_index.len()).map_err(|_| {
                        PaintError::TooManyColors(colors_by_index.len() + 1)
                    })?;
                    indices.insert(rgb, index);
                    colors_by_index.push(rgb);
                    index
                }
            };
            cells.push(index);
        }

        let color_indices = ColorIndexGrid::from_vec(width, height, cells)
            .ok_or_else(|| PaintError::InvalidSettings("image buffer size mismatch".to_string()))?;

        Ok(ColorMapResult {
            color_indices,
            colors_by_index,
            width,
            height,
        })
    }

    /// Clusters the image colors with k-means and returns the recolored image.
    pub fn apply_kmeans_clustering(
        image: &RgbaImage,
        settings: &Settings,
        progress: &mut Progress<'_>,
    ) -> Result<RgbaImage> {
        let groups = Self::group_quantized_pixels(image);
        let total = (image.width() as usize * image.height() as usize).max(1) as f64;
        let vectors: Vec<Vector<usize>> = groups
            .iter()
            .enumerate()
            .map(|(idx, group)| {
                let values = to_clustering_space(group.rgb, settings.color_space);
                Vector::new(values, group.pixels.len() as f64 / total, idx)
            })
            .collect();

        let mut random = settings
            .random_seed
            .map(Random::new)
            .unwrap_or_else(Random::from_time);
        let mut kmeans = KMeans::new(vectors, settings.cluster_count, &mut random);

        kmeans.step();
        while kmeans.delta() > settings.convergence_threshold {
            kmeans.step();
            if progress.slice_elapsed() {
                debug!(iteration = kmeans.iteration(), delta = kmeans.delta(), "k-means step");
                progress.report((100.0 - kmeans.delta().min(100.0)) / 100.0)?;
            }
        }
        info!(
            iterations = kmeans.iteration(),
            groups = groups.len(),
            "k-means converged"
        );

        let restrictions = settings.restricted_colors()?;
        let mut output = RgbaImage::from_pixel(image.width(), image.height(), Rgba([255, 255, 255, 255]));
        let width = image.width() as usize;
        for (centroid, members) in kmeans.centroids().iter().zip(kmeans.clusters()) {
            let rgb = snap_to_restrictions(
                from_clustering_space(&centroid.values, settings.color_space),
                &restrictions,
            );
            for &member in members {
                let group = &groups[kmeans.points()[member].tag];
                for &pixel in &group.pixels {
                    let (x, y) = ((pixel % width) as u32, (pixel / width) as u32);
                    output.put_pixel(x, y, Rgba([rgb[0], rgb[1], rgb[2], 255]));
                }
            }
        }

        progress.complete()?;
        Ok(output)
    }

    /// Symmetric matrix of Euclidean RGB distances between palette entries.
    pub fn build_color_distance_matrix(colors_by_index: &[Rgb]) -> Vec<Vec<f64>> {
        colors_by_index
            .iter()
            .map(|&a| colors_by_index.iter().map(|&b| rgb_distance(a, b)).collect())
            .collect()
    }

    /// Replaces interior pixels sandwiched between two differing pixels on one axis.
    ///
    /// Isolated pixels that differ from all four neighbours are left alone.
    /// Returns the number of replaced pixels.
    pub fn process_narrow_pixel_strip_cleanup(color_map: &mut ColorMapResult) -> usize {
        let distances = Self::build_color_distance_matrix(&color_map.colors_by_index);
        let grid = &mut color_map.color_indices;
        let mut replaced = 0;

        for y in 1..color_map.height.saturating_sub(1) {
            for x in 1..color_map.width.saturating_sub(1) {
                let cur = grid.get(x, y);
                let top = grid.get(x, y - 1);
                let bottom = grid.get(x, y + 1);
                let left = grid.get(x - 1, y);
                let right = grid.get(x + 1, y);
                let closer = |a: u8, b: u8| {
                    let row = &distances[cur as usize];
                    if row[a as usize] < row[b as usize] { a } else { b }
                };

                if cur != top && cur != bottom && cur != left && cur != right {
                    continue;
                } else if cur != top && cur != bottom {
                    grid.set(x, y, closer(top, bottom));
                    replaced += 1;
                } else if cur != left && cur != right {
                    grid.set(x, y, closer(left, right));
                    replaced += 1;
                }
            }
        }

        info!(replaced, "narrow pixel strips cleaned up");
        replaced
    }

    fn group_quantized_pixels(image: &RgbaImage) -> Vec<ColorGroup> {
        let mut lookup: HashMap<Rgb, usize> = HashMap::new();
        let mut groups: Vec<ColorGroup> = Vec::new();
        for (idx, pixel) in image.pixels().enumerate() {
            let rgb = [
                quantize(pixel[0]),
                quantize(pixel[1]),
                quantize(pixel[2]),
            ];
            let group = *lookup.entry(rgb).or_insert_with(|| {
                groups.push(ColorGroup {
                    rgb,
                    pixels: Vec::new(),
                });
                groups.len() - 1
            });
            groups[group].pixels.push(idx);
        }
        groups
    }
}

fn quantize(channel: u8) -> u8 {
    (channel >> QUANTIZATION_BITS) << QUANTIZATION_BITS
}

fn to_clustering_space(rgb: Rgb, space: ClusteringColorSpace) -> Vec<f64> {
    let [r, g, b] = rgb.map(f64::from);
    match space {
        ClusteringColorSpace::Rgb => vec![r, g, b],
        ClusteringColorSpace::Hsl => rgb_to_hsl(r, g, b).to_vec(),
        ClusteringColorSpace::Lab => rgb_to_lab([r, g, b]).to_vec(),
    }
}

fn from_clustering_space(values: &[f64], space: ClusteringColorSpace) -> Rgb {
    let rgb = match space {
        ClusteringColorSpace::Rgb => [values[0], values[1], values[2]],
        ClusteringColorSpace::Hsl => hsl_to_rgb(values[0], values[1], values[2]),
        ClusteringColorSpace::Lab => lab_to_rgb([values[0], values[1], values[2]]),
    };
    rgb.map(|c| c.floor().clamp(0.0, 255.0) as u8)
}

/// Closest restricted color by Lab distance, `rgb` itself when unrestricted.
fn snap_to_restrictions(rgb: Rgb, restrictions: &[Rgb]) -> Rgb {
    let lab = rgb_to_lab(rgb.map(f64::from));
    let mut best: Option<(Rgb, f64)> = None;
    for &candidate in restrictions {
        let distance = lab_distance(lab, rgb_to_lab(candidate.map(f64::from)));
        if best.is_none_or(|(_, min)| distance < min) {
            best = Some((candidate, distance));
        }
    }
    best.map_or(rgb, |(color, _)| color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::grid_from_rows;

    fn two_tone_image() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                Rgba([200, 16, 16, 255])
            } else {
                Rgba([16, 16, 200, 255])
            }
        })
    }

    #[test]
    fn test_color_map_in_scan_order() {
        let image = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([9, 9, 9, 255]),
            1 => Rgba([1, 2, 3, 255]),
            _ => Rgba([9, 9, 9, 0]),
        });
        let map = ColorReducer::create_color_map(&image).unwrap();
        assert_eq!(map.colors_by_index, vec![[9, 9, 9], [1, 2, 3]]);
        assert_eq!(map.color_indices.as_slice(), &[0, 1, 0]);
    }

    #[test]
    fn test_color_map_rejects_more_than_256_colors() {
        let image = RgbaImage::from_fn(257, 1, |x, _| Rgba([(x % 256) as u8, (x / 256) as u8, 0, 255]));
        assert!(matches!(
            ColorReducer::create_color_map(&image),
            Err(PaintError::TooManyColors(257))
        ));
    }

    #[test]
    fn test_kmeans_keeps_distinct_colors() {
        let mut settings = Settings::default();
        settings.cluster_count = 2;
        settings.random_seed = Some(5);
        let output =
            ColorReducer::apply_kmeans_clustering(&two_tone_image(), &settings, &mut Progress::silent())
                .unwrap();
        let map = ColorReducer::create_color_map(&output).unwrap();
        assert_eq!(map.colors_by_index.len(), 2);
        assert_eq!(map.color_indices.get(0, 0), map.color_indices.get(3, 3));
        assert_ne!(map.color_indices.get(0, 0), map.color_indices.get(4, 0));
    }

    #[test]
    fn test_kmeans_snaps_to_restrictions() {
        let mut settings = Settings::default();
        settings.cluster_count = 2;
        settings.random_seed = Some(5);
        settings.color_space = ClusteringColorSpace::Lab;
        settings.color_aliases.insert("red".to_string(), [255, 0, 0]);
        settings.color_restrictions = vec![
            crate::settings::ColorRestriction::Alias("red".to_string()),
            crate::settings::ColorRestriction::Rgb([0, 0, 255]),
        ];
        let output =
            ColorReducer::apply_kmeans_clustering(&two_tone_image(), &settings, &mut Progress::silent())
                .unwrap();
        assert_eq!(output.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(output.get_pixel(7, 3), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_distance_matrix_is_symmetric() {
        let matrix = ColorReducer::build_color_distance_matrix(&[[0, 0, 0], [3, 4, 0], [0, 0, 10]]);
        assert_eq!(matrix[0][1], 5.0);
        assert_eq!(matrix[1][0], 5.0);
        assert_eq!(matrix[2][2], 0.0);
    }

    #[test]
    fn test_narrow_strip_is_absorbed() {
        // a one pixel wide vertical strip of `b` between `a` columns
        let mut map = ColorMapResult {
            color_indices: grid_from_rows(&["aabaa", "aabaa", "aabaa"]),
            colors_by_index: vec![[0, 0, 0], [255, 255, 255]],
            width: 5,
            height: 3,
        };
        let replaced = ColorReducer::process_narrow_pixel_strip_cleanup(&mut map);
        assert_eq!(replaced, 1);
        assert_eq!(map.color_indices.get(2, 1), 0);
        assert_eq!(map.color_indices.get(2, 0), 1);
    }

    #[test]
    fn test_isolated_pixel_is_kept() {
        let mut map = ColorMapResult {
            color_indices: grid_from_rows(&["aaa", "aba", "aaa"]),
            colors_by_index: vec![[0, 0, 0], [255, 255, 255]],
            width: 3,
            height: 3,
        };
        assert_eq!(ColorReducer::process_narrow_pixel_strip_cleanup(&mut map), 0);
        assert_eq!(map.color_indices.get(1, 1), 1);
    }
}
