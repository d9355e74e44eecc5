//! Benchmark drivers.
//!
//! This module provides the API for running one full comparison: probing the cache, predicting the
//! block size, initializing the data, timing the kernels and post-processing the results.
//!
//! # High-level approach
//! ## 1. Cache probing and prediction
//! The L1 data-cache geometry is obtained from a [`CacheProbe`] (the host's one unless overridden
//! from the command-line, see [`crate::cli`]) and turned into a predicted block size by
//! [`crate::estimator::estimate`].
//!
//! ## 2. Data initialization
//! The source matrix is filled deterministically (element `(i, j)` holds `i * cols + j`) and is
//! immutably shared by every timed run. The destination matrix is allocated once and reused.
//!
//! ## 3. Performance evaluation
//! The blocked kernel is timed for every block size of [`crate::consts::BLOCK_SIZE_MENU`], then for
//! the predicted one, and the naive kernel is timed last. The destination is reset to zero before
//! every timed run: back-to-back measurements are only comparable if no run starts from the
//! previous run's data. Each run may be repeated in a "meta repetitions loop" (see
//! [`crate::cli`]) to assess the precision of the results.
//!
//! ## 4. Post-processing
//! The recorded times, together with the geometry and the prediction, are rendered by
//! [`crate::perf_report`] to `stdout`, or a file if specified.

mod host;

use crate::{
    affinity,
    cache::{self, CacheGeometry, CacheProbe, OverrideProbe},
    cli::CliArgs,
    consts, estimator,
    kernels::TransposeKernel,
    matrix::{Element, Matrix},
    perf_report::{PerfReport, TimingLabel, TimingResult},
};

use anyhow::Context;
use tracing::{debug, error, info};

use std::{
    fs::OpenOptions,
    io::{stdout, Write},
};

/// Parameters of one comparison run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Number of rows of the source matrix. Must be positive.
    pub rows: usize,
    /// Number of columns of the source matrix. Must be positive.
    pub cols: usize,
    /// Number of timed repetitions of each kernel.
    pub meta_repetitions: u16,
    /// Whether to check every blocked result against the naive one.
    pub verify: bool,
}

impl BenchmarkConfig {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            meta_repetitions: consts::META_REPETITIONS,
            verify: false,
        }
    }
}

/// Result of one comparison run.
#[derive(Clone, Debug)]
pub struct BenchmarkOutcome {
    pub geometry: CacheGeometry,
    pub predicted_block_size: i64,
    /// One entry per candidate block size, in execution order, then the naive entry.
    pub timings: TimingResult,
    /// Candidates whose output differed from the naive transpose (only filled when verifying).
    pub mismatches: Vec<TimingLabel>,
}

impl BenchmarkOutcome {
    pub fn report(&self) -> PerfReport<'_> {
        PerfReport {
            geometry: &self.geometry,
            predicted_block_size: self.predicted_block_size,
            timings: &self.timings,
        }
    }
}

/// Returns the block sizes to benchmark: the fixed menu followed by the predicted size.
///
/// Duplicates are kept, each candidate is timed independently.
pub fn candidate_block_sizes(predicted_block_size: i64) -> Vec<usize> {
    let predicted = usize::try_from(predicted_block_size)
        .unwrap_or(consts::MIN_BLOCK_SIZE as usize)
        .max(1);
    consts::BLOCK_SIZE_MENU
        .iter()
        .copied()
        .chain(std::iter::once(predicted))
        .collect()
}

/// Runs one full comparison on a `config.rows` x `config.cols` matrix.
pub fn run(probe: &dyn CacheProbe, config: &BenchmarkConfig) -> BenchmarkOutcome {
    let geometry = probe.probe();
    info!(probe = probe.name(), %geometry, "probed L1 data cache");

    let (rows, cols) = (config.rows, config.cols);
    let src = Matrix::<Element>::sequential(rows, cols);
    let mut dst = Matrix::zeros(cols, rows);

    let predicted_block_size = estimator::estimate(&geometry, rows, cols);
    info!(predicted_block_size, rows, cols, "predicted block size");

    // Computed outside of any timed section
    let reference = config
        .verify
        .then(|| src.transposed(TransposeKernel::Naive));

    let mut timings = TimingResult::new();
    let mut mismatches = Vec::new();

    let kernels = candidate_block_sizes(predicted_block_size)
        .into_iter()
        .map(TransposeKernel::Blocked)
        .chain(std::iter::once(TransposeKernel::Naive));

    for kernel in kernels {
        debug!(%kernel, "timing kernel");
        let entry = host::transpose(&src, &mut dst, config.meta_repetitions, kernel);

        if let Some(ref expected) = reference {
            if dst != *expected {
                error!(%kernel, "transposed matrix differs from the naive result");
                mismatches.push(entry.label());
            }
        }
        timings.push(entry);
    }

    BenchmarkOutcome {
        geometry,
        predicted_block_size,
        timings,
        mismatches,
    }
}

/// Driver function responsible for setting up the run from the command-line arguments, running
/// the comparison and writing the report.
pub fn transpose(args: CliArgs) -> anyhow::Result<()> {
    affinity::pin_current_thread(args.pin_core);

    let (rows, cols) = args.dimensions();
    let config = BenchmarkConfig {
        rows,
        cols,
        meta_repetitions: args.meta_repetitions,
        verify: args.verify,
    };

    let probe: Box<dyn CacheProbe> = if args.overrides_geometry() {
        Box::new(OverrideProbe::new(
            cache::host_probe(),
            args.l1d_size,
            args.line_size,
            args.associativity,
        ))
    } else {
        cache::host_probe()
    };

    let outcome = run(probe.as_ref(), &config);

    let mut output: Box<dyn Write> = match args.output_file {
        Some(ref name) => Box::new(
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(name)
                .with_context(|| format!("failed to open output file {}", name.display()))?,
        ),
        None => Box::new(stdout()),
    };

    outcome
        .report()
        .write(args.format, &mut output)
        .context("failed to write report")?;
    output.flush().context("failed to write report")?;

    anyhow::ensure!(
        outcome.mismatches.is_empty(),
        "{} blocked run(s) produced a wrong transpose",
        outcome.mismatches.len()
    );
    Ok(())
}
