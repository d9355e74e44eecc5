//! blockprobe - cache-aware block-size prediction for matrix transposition
//!
//! # About
//! blockprobe predicts the tile ("block") size minimizing cache misses when transposing a matrix
//! with a cache-blocked kernel, given the geometry of the host's L1 data cache, and checks the
//! prediction empirically by timing the blocked kernel over a menu of block sizes against a naive
//! transpose.
//!
//! The geometry is discovered through the platform's own interface (logical-processor information
//! on Windows, `sysconf` and `/proc/cpuinfo` on Linux, `sysctlbyname` on macOS), with heuristic
//! recovery and fallback values whenever the platform does not expose exact values.
//!
//! # Quickstart
//! ## Build
//! As any Rust-based project, blockprobe is built and run with `cargo`:
//! ```sh
//! cargo build --release
//! ```
//!
//! ## Help
//! To see the help usage:
//! ```sh
//! cargo run -- --help
//! ```
//!
//! ## Example run
//! To compare block sizes on a 4096x2048 matrix, pinned to the first core, with 11 repetitions of
//! each kernel:
//! ```sh
//! cargo run --release -- --rows 4096 --cols 2048 --pin-core 0 -m 11
//! ```
//!
//! ## Library usage
//! ```
//! use blockprobe::{cache::{CacheGeometry, FixedProbe}, drivers, estimator};
//!
//! let geometry = CacheGeometry::new(32768, 64, 8);
//! assert_eq!(estimator::estimate(&geometry, 1000, 1000), 64);
//!
//! let outcome = drivers::run(&FixedProbe(geometry), &drivers::BenchmarkConfig::new(64, 64));
//! assert_eq!(outcome.timings.len(), 8);
//! ```
//!
//! ## Logging
//! Diagnostics are written to `stderr`; set `RUST_LOG` (e.g. `RUST_LOG=debug`) to adjust them.

pub mod affinity;
pub mod cache;
pub mod cli;
pub mod consts;
pub mod drivers;
pub mod estimator;
pub mod kernels;
pub mod logging;
pub mod matrix;
pub mod perf_report;
pub mod utils;
