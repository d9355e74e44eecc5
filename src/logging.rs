//! Logging setup.
//!
//! Diagnostics go through [`tracing`][1] and are written to `stderr`, leaving `stdout` to the
//! report. The level is `info` by default (`debug` when verbose) and can be overridden with the
//! `RUST_LOG` environment variable, e.g. `RUST_LOG=blockprobe=debug`.
//!
//! [1]: https://crates.io/crates/tracing

use tracing_subscriber::EnvFilter;

/// Default filter directive.
pub const DEFAULT_FILTER: &str = "info";

/// Filter directive used in verbose mode.
pub const VERBOSE_FILTER: &str = "debug";

/// Installs the global subscriber. Does nothing if one is already installed.
pub fn init(verbose: bool) {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
        tracing::info!("still logging");
    }
}
