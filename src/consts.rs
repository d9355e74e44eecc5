//! Crate-level constants.
//!
//! Both safety nets (the probe's normalization and the estimator's local defaults) read their
//! fallback values from here so they cannot drift apart.

use crate::matrix::Element;

use std::mem::size_of;

/// Default number of rows of the source matrix.
pub const DEFAULT_ROWS: u32 = 1000;

/// Default number of columns of the source matrix.
pub const DEFAULT_COLS: u32 = 1000;

/// Default number of meta repetitions performed when timing a kernel.
pub const META_REPETITIONS: u16 = 1;

/// Size in bytes of one matrix element.
pub const ELEMENT_SIZE: i64 = size_of::<Element>() as i64;

/// Fixed menu of block sizes benchmarked on every run, before the predicted one.
pub const BLOCK_SIZE_MENU: [usize; 6] = [8, 16, 32, 64, 128, 256];

// Probe normalization fallbacks.

/// L1D size substituted when the platform reports nothing usable (32 KiB).
pub const FALLBACK_L1D_SIZE: i64 = 32 * 1024;

/// Cache line size substituted when the platform reports nothing usable.
pub const FALLBACK_LINE_SIZE: i64 = 64;

/// Associativity substituted when the platform reports nothing usable.
pub const FALLBACK_ASSOCIATIVITY: i64 = 8;

/// Associativity used when the platform explicitly flags it as unknown.
pub const UNKNOWN_ASSOCIATIVITY: i64 = 8;

/// Sentinel values meaning "unknown associativity" in logical-processor cache descriptors.
pub const ASSOCIATIVITY_UNKNOWN_SENTINELS: [i64; 2] = [0, 0xFF];

/// Candidate associativities tried, in order, when guessing from the total line count.
// NOTE: empirical heuristic, not derived from the cache's real set structure.
pub const ASSOCIATIVITY_GUESSES: [i64; 3] = [12, 8, 4];

// Estimator defaults.

/// L1D size assumed by the estimator when the geometry carries none (48 KiB).
pub const ESTIMATOR_L1D_SIZE: i64 = 48 * 1024;

/// Line size assumed by the estimator when the geometry carries none.
pub const ESTIMATOR_LINE_SIZE: i64 = 64;

/// Associativity assumed by the estimator when the geometry carries none.
pub const ESTIMATOR_ASSOCIATIVITY: i64 = 8;

/// Share of the L1D given to one tile edge: `sqrt(l1d / WORKING_SET_DIVISOR)`.
///
/// Source and destination tiles plus some headroom must coexist in L1 during a blocked transpose.
pub const WORKING_SET_DIVISOR: i64 = 8;

/// Smallest block size ever predicted.
pub const MIN_BLOCK_SIZE: i64 = 8;

/// Largest block size ever predicted.
pub const MAX_BLOCK_SIZE: i64 = 64;
