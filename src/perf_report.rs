//! Performance report related structures and functions.
//!
//! This module defines the data structures holding the recorded execution times of the benchmarked
//! kernels and the functions rendering them, together with the probed cache geometry, either as a
//! human-readable table or as CSV.

use crate::cache::CacheGeometry;

use statistical::{mean, standard_deviation};

use std::{fmt, io::Write};

/// Output format of the report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Aligned, human-readable tables.
    #[default]
    Text,
    /// Comma-separated values.
    Csv,
}

/// Label of a timing entry: either the block size of a blocked run or the naive run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingLabel {
    Block(usize),
    Naive,
}

impl fmt::Display for TimingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(block_size) => write!(f, "{block_size}"),
            Self::Naive => write!(f, "Naive"),
        }
    }
}

/// Statistics over the samples of one timing entry, in microseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingStats {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// Recorded execution times of one kernel run.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingEntry {
    label: TimingLabel,
    /// One sample per meta repetition, in microseconds, in execution order.
    samples_us: Vec<u64>,
}

impl TimingEntry {
    /// Creates an entry from at least one sample.
    ///
    /// # Panics
    ///
    /// Panics if `samples_us` is empty.
    pub fn new(label: TimingLabel, samples_us: Vec<u64>) -> Self {
        assert!(!samples_us.is_empty(), "a timing entry needs a sample");
        Self { label, samples_us }
    }

    pub fn label(&self) -> TimingLabel {
        self.label
    }

    pub fn samples_us(&self) -> &[u64] {
        &self.samples_us
    }

    /// Headline elapsed time in microseconds: the median sample.
    pub fn elapsed_us(&self) -> u64 {
        let mut sorted = self.samples_us.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    pub fn stats(&self) -> TimingStats {
        // Sort durations to avoid having to do two passes to get both min and max elements
        let mut durations: Vec<f64> = self.samples_us.iter().map(|&us| us as f64).collect();
        durations.sort_by(f64::total_cmp);

        let min = durations[0];
        let median = durations[durations.len() / 2];
        let max = durations[durations.len() - 1];
        let avg = mean(&durations);
        // NOTE: the standard deviation needs at least two samples.
        let stddev = if durations.len() > 1 {
            standard_deviation(&durations, Some(avg))
        } else {
            0.0
        };

        TimingStats {
            min,
            median,
            max,
            mean: avg,
            stddev,
        }
    }
}

/// Ordered, append-only sequence of timing entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingResult {
    entries: Vec<TimingEntry>,
}

impl TimingResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TimingEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if any entry holds more than one sample.
    pub fn has_repetitions(&self) -> bool {
        self.entries.iter().any(|e| e.samples_us.len() > 1)
    }
}

/// Everything a report shows about one run.
#[derive(Clone, Copy, Debug)]
pub struct PerfReport<'a> {
    pub geometry: &'a CacheGeometry,
    pub predicted_block_size: i64,
    pub timings: &'a TimingResult,
}

impl PerfReport<'_> {
    /// Writes the report in the given format.
    pub fn write(&self, format: ReportFormat, output: &mut dyn Write) -> std::io::Result<()> {
        match format {
            ReportFormat::Text => self.write_text(output),
            ReportFormat::Csv => self.write_csv(output),
        }
    }

    pub fn write_text(&self, output: &mut dyn Write) -> std::io::Result<()> {
        let geometry = self.geometry;
        writeln!(output, "=== Cache Information ===")?;
        writeln!(output, "{:<20} {} bytes", "L1D Cache Size:", geometry.l1d_size)?;
        writeln!(output, "{:<20} {} bytes", "Cache Line Size:", geometry.line_size)?;
        writeln!(output, "{:<20} {} ways", "Associativity:", geometry.associativity)?;
        writeln!(
            output,
            "{:<20} {}",
            "Predicted Block Size:", self.predicted_block_size
        )?;
        writeln!(output, "=========================")?;
        writeln!(output)?;

        let detailed = self.timings.has_repetitions();
        let rule = if detailed { "-".repeat(95) } else { "-".repeat(30) };

        writeln!(output, "=== Performance Comparison ===")?;
        if detailed {
            writeln!(
                output,
                "{:<15} {:<15} {:<15} {:<15} {:<15} {:<15}",
                "Block Size", "Time (us)", "Min", "Max", "Mean", "Stddev"
            )?;
        } else {
            writeln!(output, "{:<15} {:<15}", "Block Size", "Time (us)")?;
        }
        writeln!(output, "{rule}")?;

        for entry in self.timings.entries() {
            if entry.label() == TimingLabel::Naive {
                writeln!(output, "{rule}")?;
            }
            let label = entry.label().to_string();
            if detailed {
                let stats = entry.stats();
                writeln!(
                    output,
                    "{:<15} {:<15} {:<15} {:<15} {:<15.1} {:<15.1}",
                    label,
                    entry.elapsed_us(),
                    stats.min,
                    stats.max,
                    stats.mean,
                    stats.stddev
                )?;
            } else {
                writeln!(output, "{:<15} {:<15}", label, entry.elapsed_us())?;
            }
        }
        writeln!(output, "{}", "=".repeat(rule.len()))
    }

    pub fn print_csv_header(output: &mut dyn Write) -> std::io::Result<()> {
        writeln!(output, "label,median_us,min_us,max_us,mean_us,stddev_us,samples")
    }

    pub fn write_csv(&self, output: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            output,
            "l1d_size_bytes,line_size_bytes,associativity,predicted_block_size"
        )?;
        writeln!(
            output,
            "{},{},{},{}",
            self.geometry.l1d_size,
            self.geometry.line_size,
            self.geometry.associativity,
            self.predicted_block_size
        )?;
        writeln!(output)?;

        Self::print_csv_header(output)?;
        for entry in self.timings.entries() {
            let stats = entry.stats();
            writeln!(
                output,
                "{},{},{},{},{},{},{}",
                entry.label(),
                entry.elapsed_us(),
                stats.min,
                stats.max,
                stats.mean,
                stats.stddev,
                entry.samples_us().len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_timings(samples: &[u64]) -> TimingResult {
        let mut timings = TimingResult::new();
        timings.push(TimingEntry::new(TimingLabel::Block(8), samples.to_vec()));
        timings.push(TimingEntry::new(TimingLabel::Block(64), vec![10]));
        timings.push(TimingEntry::new(TimingLabel::Naive, vec![99]));
        timings
    }

    #[test]
    fn stats_of_several_samples() {
        let entry = TimingEntry::new(TimingLabel::Block(16), vec![30, 10, 20]);
        let stats = entry.stats();
        assert_eq!(entry.elapsed_us(), 20);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.max, 30.0);
        assert_eq!(stats.mean, 20.0);
        assert!((stats.stddev - 10.0).abs() < 1e-9);
    }

    #[test]
    fn stats_of_single_sample() {
        let stats = TimingEntry::new(TimingLabel::Naive, vec![42]).stats();
        assert_eq!(stats.median, 42.0);
        assert_eq!(stats.stddev, 0.0);
    }

    #[test]
    #[should_panic(expected = "needs a sample")]
    fn entry_without_samples_panics() {
        TimingEntry::new(TimingLabel::Naive, Vec::new());
    }

    #[test]
    fn text_report_layout() {
        let geometry = CacheGeometry::new(32768, 64, 8);
        let timings = sample_timings(&[5]);
        let report = PerfReport {
            geometry: &geometry,
            predicted_block_size: 64,
            timings: &timings,
        };

        let mut out = Vec::new();
        report.write(ReportFormat::Text, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "L1D Cache Size:      32768 bytes");
        assert_eq!(lines[4], "Predicted Block Size: 64");
        assert!(text.contains("Block Size      Time (us)"));
        assert!(lines.contains(&format!("{:<15} {:<15}", "8", 5).as_str()));
        assert!(lines.contains(&format!("{:<15} {:<15}", "Naive", 99).as_str()));
        assert_eq!(lines.last(), Some(&"=".repeat(30).as_str()));
    }

    #[test]
    fn text_report_with_repetitions_shows_stats() {
        let geometry = CacheGeometry::FALLBACK;
        let timings = sample_timings(&[5, 7, 9]);
        let report = PerfReport {
            geometry: &geometry,
            predicted_block_size: 8,
            timings: &timings,
        };

        let mut out = Vec::new();
        report.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Stddev"));
        assert!(text.contains("2.0"));
    }

    #[test]
    fn csv_report_layout() {
        let geometry = CacheGeometry::new(49152, 64, 12);
        let timings = sample_timings(&[5, 7]);
        let report = PerfReport {
            geometry: &geometry,
            predicted_block_size: 64,
            timings: &timings,
        };

        let mut out = Vec::new();
        report.write(ReportFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "49152,64,12,64");
        assert_eq!(lines[2], "");
        assert_eq!(
            lines[3],
            "label,median_us,min_us,max_us,mean_us,stddev_us,samples"
        );
        assert_eq!(lines.len(), 7);
        assert!(lines[6].starts_with("Naive,99,"));
    }
}
