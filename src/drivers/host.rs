//! Host kernel drivers.
//!
//! This module implements the driver function responsible for timing one transposition kernel on
//! the host (CPU).

use crate::{
    kernels::TransposeKernel,
    matrix::Matrix,
    perf_report::{TimingEntry, TimingLabel},
    utils::{timed, MatrixElem},
};

use tracing::trace;

/// Host driver for the transpose kernels.
///
/// Runs `kernel` from `src` into `dst` `meta_reps` times and records each elapsed time. `dst` is
/// reset to zero before every repetition so that no run benefits from data left by the previous
/// one.
pub fn transpose<T: MatrixElem>(
    src: &Matrix<T>,
    dst: &mut Matrix<T>,
    meta_reps: u16,
    kernel: TransposeKernel,
) -> TimingEntry {
    let label = match kernel {
        TransposeKernel::Naive => TimingLabel::Naive,
        TransposeKernel::Blocked(block_size) => TimingLabel::Block(block_size),
    };

    // Measure execution time of kernel
    let meta_reps = meta_reps.max(1);
    let mut durations = Vec::with_capacity(meta_reps.into());
    for _ in 0..meta_reps {
        dst.fill_zero();
        let stopwatch = timed(|| src.transpose_into(dst, kernel));
        std::hint::black_box(dst.as_slice());
        trace!(%kernel, elapsed_us = stopwatch.elapsed_us(), "repetition done");
        durations.push(stopwatch.elapsed_us());
    }

    TimingEntry::new(label, durations)
}
