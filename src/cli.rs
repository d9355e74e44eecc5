//! Command-Line Interface related code.
//!
//! This module handles the parsing of CLI arguments using the [`clap`][1] crate.
//! It defines the available runtime options.
//!
//! [1]: https://crates.io/crates/clap

use crate::{consts, perf_report::ReportFormat};

use clap::Parser;
use tracing::warn;

use std::path::PathBuf;

/// Cache-aware block-size prediction for matrix transposition.
///
/// Probes the L1 data cache of the host, predicts the block size minimizing cache misses when
/// transposing a matrix, and compares the blocked transpose over several block sizes (including
/// the predicted one) against a naive transpose.
#[derive(Clone, Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    /// Number of rows of the source matrix.
    #[arg(
        short,
        long,
        alias = "row",
        value_name = "ROWS",
        value_parser = clap::value_parser!(u32).range(1..),
    )]
    pub rows: Option<u32>,

    /// Number of columns of the source matrix.
    #[arg(
        short,
        long,
        alias = "col",
        value_name = "COLS",
        value_parser = clap::value_parser!(u32).range(1..),
    )]
    pub cols: Option<u32>,

    /// Number of meta-repetitions of each timed kernel.
    #[arg(
        short,
        long,
        value_name = "META_REPS",
        default_value_t = consts::META_REPETITIONS,
        value_parser = clap::value_parser!(u16).range(1..),
    )]
    pub meta_repetitions: u16,

    /// Logical CPU to pin the benchmarking thread to.
    #[arg(short, long, value_name = "CORE")]
    pub pin_core: Option<usize>,

    /// Override the probed L1 data-cache size, in bytes.
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(i64).range(1..))]
    pub l1d_size: Option<i64>,

    /// Override the probed cache line size, in bytes.
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(i64).range(1..))]
    pub line_size: Option<i64>,

    /// Override the probed L1 data-cache associativity, in ways.
    #[arg(long, value_name = "WAYS", value_parser = clap::value_parser!(i64).range(1..))]
    pub associativity: Option<i64>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Output file, defaults to `stdout` if unspecified.
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,

    /// Check every blocked result against the naive transpose.
    #[arg(long)]
    pub verify: bool,

    /// Log debug information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns the matrix dimensions as `(rows, cols)`.
    ///
    /// Unless both are given, both fall back to their defaults.
    pub fn dimensions(&self) -> (usize, usize) {
        match (self.rows, self.cols) {
            (Some(rows), Some(cols)) => (rows as usize, cols as usize),
            _ => {
                warn!(
                    rows = consts::DEFAULT_ROWS,
                    cols = consts::DEFAULT_COLS,
                    "--rows and --cols not both provided, using default dimensions"
                );
                (consts::DEFAULT_ROWS as usize, consts::DEFAULT_COLS as usize)
            }
        }
    }

    /// Returns `true` if any cache geometry field is overridden.
    pub fn overrides_geometry(&self) -> bool {
        self.l1d_size.is_some() || self.line_size.is_some() || self.associativity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["blockprobe"]);
        assert_eq!(args.dimensions(), (1000, 1000));
        assert_eq!(args.meta_repetitions, 1);
        assert_eq!(args.format, ReportFormat::Text);
        assert!(args.pin_core.is_none());
        assert!(!args.overrides_geometry());
    }

    #[test]
    fn both_dimensions_required_to_override_defaults() {
        let args = CliArgs::parse_from(["blockprobe", "--rows", "300"]);
        assert_eq!(args.dimensions(), (1000, 1000));

        let args = CliArgs::parse_from(["blockprobe", "--rows", "300", "--cols", "20"]);
        assert_eq!(args.dimensions(), (300, 20));
    }

    #[test]
    fn singular_dimension_flags_are_accepted() {
        let args = CliArgs::parse_from(["blockprobe", "--row", "300", "--col", "20"]);
        assert_eq!(args.dimensions(), (300, 20));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(CliArgs::try_parse_from(["blockprobe", "--rows", "0", "--cols", "4"]).is_err());
        assert!(CliArgs::try_parse_from(["blockprobe", "-m", "0"]).is_err());
    }

    #[test]
    fn geometry_overrides_and_format() {
        let args = CliArgs::parse_from([
            "blockprobe",
            "--l1d-size",
            "49152",
            "--associativity",
            "12",
            "-f",
            "csv",
            "-p",
            "0",
        ]);
        assert!(args.overrides_geometry());
        assert_eq!(args.l1d_size, Some(49152));
        assert_eq!(args.line_size, None);
        assert_eq!(args.format, ReportFormat::Csv);
        assert_eq!(args.pin_core, Some(0));
    }
}
