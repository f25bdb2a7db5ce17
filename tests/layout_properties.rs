//! Randomized checks of the particle-state layout.

use std::collections::HashSet;

use flowtrail::{ConfigurationError, TextureLayout};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CASES: usize = 500;

#[test]
fn test_capacity_fits_without_a_spare_row() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..CASES {
        let count = rng.gen_range(1..5_000_000u32);
        let max_row_width = rng.gen_range(1..16_384u32);
        let layout = TextureLayout::new(count, max_row_width);

        assert_eq!(layout.row_width, max_row_width);
        assert!(layout.capacity() >= count as u64);
        // One row fewer would not fit
        assert!((layout.row_count as u64 - 1) * (layout.row_width as u64) < count as u64);
    }
}

#[test]
fn test_texels_are_distinct_and_in_bounds() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
        let count = rng.gen_range(1..20_000u32);
        let max_row_width = rng.gen_range(1..2_048u32);
        let layout = TextureLayout::new(count, max_row_width);

        let texels: HashSet<_> = layout.texels().collect();
        assert_eq!(texels.len(), count as usize);
        assert!(texels
            .iter()
            .all(|&(x, y)| x < layout.row_width && y < layout.row_count));
        assert!(texels.contains(&layout.texel_of(count - 1)));
    }
}

#[test]
fn test_texel_mapping_inverts() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..CASES {
        let layout = TextureLayout::new(rng.gen_range(1..1_000_000), rng.gen_range(1..4_096));
        let index = rng.gen_range(0..layout.particle_count);
        let (x, y) = layout.texel_of(index);
        assert_eq!(y * layout.row_width + x, index);
    }
}

#[test]
fn test_validation_matches_limit() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..CASES {
        let max_dimension = rng.gen_range(256..16_384u32);
        let layout = TextureLayout::new(rng.gen_range(1..50_000_000), rng.gen_range(1..20_000));
        let fits = layout.row_width <= max_dimension && layout.row_count <= max_dimension;

        match layout.validate(max_dimension) {
            Ok(()) => assert!(fits),
            Err(ConfigurationError::ExtentTooLarge { max, .. }) => {
                assert!(!fits);
                assert_eq!(max, max_dimension);
            }
            Err(e) => panic!("unexpected error {:?}", e),
        }
    }
}
