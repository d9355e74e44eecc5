//! Block-size estimation.
//!
//! Derives, from the L1 data-cache geometry, the edge length of the square tiles used by the
//! blocked transpose. The estimate starts optimistic (a tile edge of `sqrt(l1d / 8)`, aligned on
//! cache lines) and is only tightened when a capacity constraint would be violated:
//! 1. the source and destination tiles together must fit in the cache lines available;
//! 2. a tile must not map to more lines than the set structure can hold without conflicts.
//!
//! The result is finally clamped to `[8, 64]`, a historically reasonable range for this workload.
//!
//! Both corrections are empirical heuristics rather than an exact cache model.

use crate::{cache::CacheGeometry, consts};

use num::integer::Roots;
use tracing::debug;

/// Predicts the block size minimizing cache misses when transposing a `rows` x `cols` matrix.
///
/// Always returns a value in `[MIN_BLOCK_SIZE, MAX_BLOCK_SIZE]`, whatever the geometry.
pub fn estimate(geometry: &CacheGeometry, rows: usize, cols: usize) -> i64 {
    let l1d_size = positive_or(geometry.l1d_size, consts::ESTIMATOR_L1D_SIZE);
    let line_size = positive_or(geometry.line_size, consts::ESTIMATOR_LINE_SIZE);
    let associativity = positive_or(geometry.associativity, consts::ESTIMATOR_ASSOCIATIVITY);

    if !geometry.is_valid() {
        debug!(
            l1d_size,
            line_size, associativity, "using estimator defaults for missing cache geometry"
        );
    }

    let elem_size = consts::ELEMENT_SIZE;
    // Lines narrower than one element cannot be aligned on
    let elems_per_line = (line_size / elem_size).max(1);
    let align = |edge: i64| (edge / elems_per_line) * elems_per_line;

    let mut block_size = align((l1d_size / consts::WORKING_SET_DIVISOR).sqrt());
    block_size = block_size.min(to_i64(rows)).min(to_i64(cols));

    // Source and destination tiles must both fit in the cache
    let lines_per_block = block_size * block_size * elem_size / line_size;
    let total_lines = 2 * lines_per_block;
    let max_lines = l1d_size / line_size;
    if total_lines > max_lines {
        block_size = align(((l1d_size / 2) / elem_size).sqrt());
        debug!(block_size, "tiles exceed cache capacity, shrinking");
    }

    // A tile must not overflow the set structure
    let sets = max_lines / associativity;
    if lines_per_block > associativity.saturating_mul(sets) {
        block_size = align((associativity.saturating_mul(line_size) / elem_size).sqrt());
        debug!(block_size, "tile conflicts with associativity, shrinking");
    }

    block_size.clamp(consts::MIN_BLOCK_SIZE, consts::MAX_BLOCK_SIZE)
}

fn positive_or(value: i64, default: i64) -> i64 {
    if value > 0 {
        value
    } else {
        default
    }
}

fn to_i64(dim: usize) -> i64 {
    i64::try_from(dim).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn common_l1d_predicts_aligned_block() {
        let geometry = CacheGeometry::new(32768, 64, 8);
        let block_size = estimate(&geometry, 1000, 1000);
        assert!((8..=64).contains(&block_size));
        assert!(block_size == 64 || block_size % 16 == 0);
        assert_eq!(block_size, 64);
    }

    #[test]
    fn larger_l1d_still_clamped() {
        assert_eq!(estimate(&CacheGeometry::new(49152, 64, 12), 4096, 4096), 64);
        assert_eq!(estimate(&CacheGeometry::new(1 << 20, 64, 16), 4096, 4096), 64);
    }

    #[test]
    fn small_matrix_clamped_to_minimum() {
        // The matrix dimension bounds the tile, then the clamp raises it back
        assert_eq!(estimate(&CacheGeometry::new(32768, 64, 8), 3, 1000), 8);
        assert_eq!(estimate(&CacheGeometry::new(32768, 64, 8), 1, 1), 8);
    }

    #[test]
    fn matrix_dimension_bounds_tile() {
        // sqrt(4096) = 64 bounded by 40 columns, not line-aligned again
        assert_eq!(estimate(&CacheGeometry::new(32768, 64, 8), 1000, 40), 40);
    }

    #[test]
    fn tiny_cache_shrinks_block() {
        // 4 KiB cache: sqrt(512) = 22 -> 16; 16x16 ints = 16 lines, 32 <= 64 lines available
        assert_eq!(estimate(&CacheGeometry::new(4096, 64, 4), 1000, 1000), 16);
    }

    #[test]
    fn direct_mapped_cache_keeps_capacity_estimate() {
        // 2 KiB, 32-byte lines: 16x16 tiles use 32 lines each, 64 lines available
        assert_eq!(estimate(&CacheGeometry::new(2048, 32, 1), 1000, 1000), 16);
    }

    #[test]
    fn associativity_above_line_count_triggers_conflict_correction() {
        // 64 lines for 128 ways leaves no complete set: sqrt(128 * 64 / 4) = 45 -> 32
        assert_eq!(estimate(&CacheGeometry::new(4096, 64, 128), 1000, 1000), 32);
    }

    #[test]
    fn invalid_geometry_uses_defaults() {
        // 48 KiB default: sqrt(6144) = 78 -> 64 once aligned on 16 elements
        assert_eq!(estimate(&CacheGeometry::UNKNOWN, 1000, 1000), 64);
    }

    #[test]
    fn pathological_geometry_stays_in_range() {
        let block_size = estimate(&CacheGeometry::new(1, 1, 1), 1000, 1000);
        assert_eq!(block_size, 8);
    }

    proptest! {
        #[test]
        fn estimate_always_in_range(
            l1d_size in any::<i64>(),
            line_size in any::<i64>(),
            associativity in any::<i64>(),
            rows in 1usize..=usize::MAX,
            cols in 1usize..=usize::MAX,
        ) {
            let geometry = CacheGeometry::new(l1d_size, line_size, associativity);
            let block_size = estimate(&geometry, rows, cols);
            prop_assert!((8..=64).contains(&block_size));
        }

        #[test]
        fn estimate_is_line_aligned_or_clamped(
            l1d_size in 1i64..(1 << 22),
            line_size in prop::sample::select(vec![4i64, 8, 16, 32, 64, 128, 256]),
            associativity in 1i64..32,
            dim in 64usize..4096,
        ) {
            let geometry = CacheGeometry::new(l1d_size, line_size, associativity);
            let block_size = estimate(&geometry, dim, dim);
            let elems_per_line = line_size / consts::ELEMENT_SIZE;
            prop_assert!(
                block_size % elems_per_line == 0
                    || block_size == consts::MIN_BLOCK_SIZE
                    || block_size == consts::MAX_BLOCK_SIZE
            );
        }
    }
}
