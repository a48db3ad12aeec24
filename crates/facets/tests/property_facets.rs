use std::collections::{HashMap, HashSet};

use facets::{
    ColorIndexGrid, FacetRemovalOrder, FacetResult, Progress,
    algorithms::{BorderSegmenter, BorderTracer, ColorReducer, FacetBuilder, FacetReducer},
};
use proptest::prelude::*;

const PALETTE: [[u8; 3]; 4] = [[250, 250, 250], [200, 20, 20], [20, 200, 20], [20, 20, 200]];

fn grid_strategy() -> impl Strategy<Value = ColorIndexGrid> {
    (1usize..10, 1usize..10).prop_flat_map(|(width, height)| {
        proptest::collection::vec(0u8..4, width * height).prop_map(move |cells| {
            ColorIndexGrid::from_vec(width, height, cells).expect("sized by construction")
        })
    })
}

fn assert_partition(result: &FacetResult) {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &id in result.facet_map.iter() {
        assert!(result.is_live(id), "pixel maps to removed facet {id}");
        *counts.entry(id).or_default() += 1;
    }
    for facet in result.live_facets() {
        assert_eq!(counts.get(&facet.id).copied().unwrap_or(0), facet.point_count);
    }
    let total: usize = result.live_facets().map(|f| f.point_count).sum();
    assert_eq!(total, result.width * result.height);
}

fn assert_interior_pixels_agree(result: &FacetResult) {
    let map = &result.facet_map;
    for facet in result.live_facets() {
        let border: HashSet<(usize, usize)> = facet.border_points.iter().map(|p| (p.x, p.y)).collect();
        for (x, y) in facet.bbox.pixels() {
            if map.get(x, y) != facet.id || border.contains(&(x, y)) {
                continue;
            }
            let (x, y) = (x as i64, y as i64);
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                assert_eq!(map.get_checked(x + dx, y + dy), Some(facet.id));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn facet_building_partitions_the_grid(grid in grid_strategy()) {
        let result = FacetBuilder::build(&grid, &mut Progress::silent()).unwrap();
        assert_partition(&result);
        assert_interior_pixels_agree(&result);
        for facet in result.live_facets() {
            for (x, y) in facet.bbox.pixels().filter(|&(x, y)| result.facet_map.get(x, y) == facet.id) {
                prop_assert_eq!(grid.get(x, y), facet.color);
            }
        }
    }

    #[test]
    fn reduction_conserves_pixels(
        mut grid in grid_strategy(),
        min_facet_size in 1usize..12,
        small_first in any::<bool>(),
        max_facet_count in proptest::option::of(1usize..6),
    ) {
        let mut result = FacetBuilder::build(&grid, &mut Progress::silent()).unwrap();
        let reducer = FacetReducer {
            min_facet_size,
            removal_order: if small_first {
                FacetRemovalOrder::SmallToLarge
            } else {
                FacetRemovalOrder::LargeToSmall
            },
            max_facet_count,
        };
        reducer.reduce(&PALETTE, &mut result, &mut grid, &mut Progress::silent()).unwrap();

        assert_partition(&result);
        for facet in result.live_facets() {
            for (x, y) in facet.bbox.pixels().filter(|&(x, y)| result.facet_map.get(x, y) == facet.id) {
                prop_assert_eq!(grid.get(x, y), facet.color);
            }
        }
    }

    #[test]
    fn traced_edges_are_unique_and_outward(grid in grid_strategy()) {
        let mut result = FacetBuilder::build(&grid, &mut Progress::silent()).unwrap();
        BorderTracer::build_border_paths(&mut result, &mut Progress::silent()).unwrap();

        let mut claimed = HashSet::new();
        for facet in result.live_facets() {
            prop_assert!(!facet.border_path.is_empty());
            for point in &facet.border_path {
                prop_assert!(claimed.insert(*point), "{:?} claimed twice", point);
                let (x, y) = point.exterior();
                prop_assert_ne!(result.facet_map.get_checked(x, y), Some(facet.id));
                prop_assert_eq!(result.facet_map.get(point.x, point.y), facet.id);
            }
        }
    }

    #[test]
    fn segments_are_shared_by_at_most_two_facets(grid in grid_strategy(), rounds in 0usize..3) {
        let mut result = FacetBuilder::build(&grid, &mut Progress::silent()).unwrap();
        BorderTracer::build_border_paths(&mut result, &mut Progress::silent()).unwrap();
        BorderSegmenter::new(rounds).build_segments(&mut result, &mut Progress::silent()).unwrap();

        let mut users: HashMap<usize, usize> = HashMap::new();
        for facet in result.live_facets() {
            for boundary in &facet.border_segments {
                prop_assert!(boundary.segment < result.segments.len());
                *users.entry(boundary.segment).or_default() += 1;
            }
        }
        prop_assert!(users.values().all(|&count| count <= 2));
        prop_assert_eq!(users.len(), result.segments.len());
    }

    #[test]
    fn strip_cleanup_keeps_palette(grid in grid_strategy()) {
        let mut color_map = facets::ColorMapResult {
            width: grid.width(),
            height: grid.height(),
            color_indices: grid.clone(),
            colors_by_index: PALETTE.to_vec(),
        };
        let replaced = ColorReducer::process_narrow_pixel_strip_cleanup(&mut color_map);
        let changed = grid
            .iter()
            .zip(color_map.color_indices.iter())
            .filter(|(a, b)| a != b)
            .count();
        prop_assert_eq!(replaced, changed);
    }
}
