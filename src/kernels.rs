//! Kernel implementations.
//!
//! This module contains the two matrix transposition kernels: a naive row/column swap, which sets
//! the baseline, and a cache-blocked variant operating tile by tile.
//!
//! Both take row-major slices: `src` is `rows` x `cols` and `dst` is `cols` x `rows`. They never
//! read the previous contents of `dst`.

use std::fmt;

/// Available transposition kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransposeKernel {
    Naive,
    /// Blocked kernel with the given tile edge.
    Blocked(usize),
}

impl TransposeKernel {
    /// Runs the kernel on `src` (`rows` x `cols`), writing the result into `dst`.
    pub fn run<T: Copy>(self, src: &[T], dst: &mut [T], rows: usize, cols: usize) {
        match self {
            Self::Naive => naive(src, dst, rows, cols),
            Self::Blocked(block_size) => blocked(src, dst, rows, cols, block_size),
        }
    }
}

impl fmt::Display for TransposeKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive => write!(f, "Naive"),
            Self::Blocked(block_size) => write!(f, "Blocked ({block_size})"),
        }
    }
}

fn check_lengths<T>(src: &[T], dst: &[T], rows: usize, cols: usize) {
    assert_eq!(src.len(), rows * cols, "src: expected {rows}x{cols} elements");
    assert_eq!(dst.len(), rows * cols, "dst: expected {cols}x{rows} elements");
}

// Naive implementation: one element at a time, following the source's rows.
pub fn naive<T: Copy>(src: &[T], dst: &mut [T], rows: usize, cols: usize) {
    check_lengths(src, dst, rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            dst[j * rows + i] = src[i * cols + j];
        }
    }
}

// Blocked implementation: the naive swap restricted to `block_size` x `block_size` tiles, so each
// pass only touches one source tile and one destination tile.
pub fn blocked<T: Copy>(src: &[T], dst: &mut [T], rows: usize, cols: usize, block_size: usize) {
    check_lengths(src, dst, rows, cols);
    let block_size = block_size.max(1);
    for i in (0..rows).step_by(block_size) {
        let i_max = (i + block_size).min(rows);
        for j in (0..cols).step_by(block_size) {
            let j_max = (j + block_size).min(cols);
            for ii in i..i_max {
                for jj in j..j_max {
                    dst[jj * rows + ii] = src[ii * cols + jj];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Vec<i32> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..rows * cols).map(|_| rng.gen()).collect()
    }

    #[test]
    fn four_by_four_with_block_of_two() {
        let src: Vec<i32> = (0..16).collect();
        let mut naive_dst = vec![0; 16];
        let mut blocked_dst = vec![0; 16];

        naive(&src, &mut naive_dst, 4, 4);
        blocked(&src, &mut blocked_dst, 4, 4, 2);

        let expected = vec![0, 4, 8, 12, 1, 5, 9, 13, 2, 6, 10, 14, 3, 7, 11, 15];
        assert_eq!(naive_dst, expected);
        assert_eq!(blocked_dst, expected);
    }

    #[test]
    fn rectangular_blocked_matches_naive() {
        let (rows, cols) = (37, 91);
        let src = random_matrix(rows, cols, 42);
        let mut expected = vec![0; rows * cols];
        naive(&src, &mut expected, rows, cols);

        for block_size in [1, 2, 8, 16, 36, 37, 64, 91, 500] {
            let mut dst = vec![0; rows * cols];
            blocked(&src, &mut dst, rows, cols, block_size);
            assert_eq!(dst, expected, "block size {block_size}");
        }
    }

    #[test]
    fn zero_block_size_behaves_as_one() {
        let src: Vec<i32> = (0..6).collect();
        let mut dst = vec![0; 6];
        blocked(&src, &mut dst, 2, 3, 0);
        assert_eq!(dst, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn destination_contents_are_ignored() {
        let src: Vec<i32> = (0..6).collect();
        let mut dst = vec![-1; 6];
        TransposeKernel::Blocked(4).run(&src, &mut dst, 3, 2);
        assert_eq!(dst, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    #[should_panic(expected = "dst: expected")]
    fn mismatched_destination_panics() {
        let src = vec![0; 6];
        let mut dst = vec![0; 5];
        naive(&src, &mut dst, 2, 3);
    }

    proptest! {
        #[test]
        fn double_transpose_is_identity(
            rows in 1usize..80,
            cols in 1usize..80,
            seed in any::<u64>(),
        ) {
            let src = random_matrix(rows, cols, seed);
            let mut kernels = vec![TransposeKernel::Naive];
            kernels.extend([1, 7, 8, 33, 64, 256, rows, cols].map(TransposeKernel::Blocked));

            for kernel in kernels {
                let mut once = vec![0; rows * cols];
                let mut twice = vec![0; rows * cols];
                kernel.run(&src, &mut once, rows, cols);
                kernel.run(&once, &mut twice, cols, rows);
                prop_assert_eq!(&twice, &src, "{}", kernel);
            }
        }

        #[test]
        fn blocked_agrees_with_naive(
            rows in 1usize..100,
            cols in 1usize..100,
            block_size in 1usize..128,
        ) {
            let src: Vec<u32> = (0..(rows * cols) as u32).collect();
            let mut expected = vec![0; rows * cols];
            let mut dst = vec![0; rows * cols];
            naive(&src, &mut expected, rows, cols);
            blocked(&src, &mut dst, rows, cols, block_size);
            prop_assert_eq!(dst, expected);
        }
    }
}
