//! Utility functions and traits.

use std::time::{Duration, Instant};

/// Utility trait that generalizes the integer types a matrix may hold and implements the common
/// functionalities needed by the kernel and driver functions.
pub trait MatrixElem: num::PrimInt + Default + Send + Sync + std::fmt::Debug {
    /// Produces the value stored at linear index `i` of a freshly initialized matrix.
    ///
    /// Wraps around when `i` does not fit in the type.
    fn from_index(i: usize) -> Self;
}

impl MatrixElem for i32 {
    fn from_index(i: usize) -> Self {
        i as i32
    }
}

impl MatrixElem for i64 {
    fn from_index(i: usize) -> Self {
        i as i64
    }
}

impl MatrixElem for u32 {
    fn from_index(i: usize) -> Self {
        i as u32
    }
}

/// Monotonic stopwatch.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stopwatch {
    start: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the measurement.
    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Stops the measurement. Does nothing if the stopwatch was not started.
    pub fn stop(&mut self) {
        if let Some(start) = self.start.take() {
            self.elapsed = start.elapsed();
        }
    }

    /// Time measured between the last `start` and `stop` calls.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Time measured between the last `start` and `stop` calls, in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        u64::try_from(self.elapsed.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Times a single call of `f`.
pub fn timed<F: FnOnce()>(f: F) -> Stopwatch {
    let mut stopwatch = Stopwatch::new();
    stopwatch.start();
    f();
    stopwatch.stop();
    stopwatch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_index_wraps() {
        assert_eq!(i32::from_index(7), 7);
        assert_eq!(u32::from_index(u32::MAX as usize + 2), 1);
    }

    #[test]
    fn stopwatch_measures_elapsed_time() {
        let stopwatch = timed(|| std::thread::sleep(Duration::from_millis(2)));
        assert!(stopwatch.elapsed() >= Duration::from_millis(2));
        assert!(stopwatch.elapsed_us() >= 2000);
    }

    #[test]
    fn stop_without_start_is_noop() {
        let mut stopwatch = Stopwatch::new();
        stopwatch.stop();
        assert_eq!(stopwatch.elapsed_us(), 0);
    }
}
