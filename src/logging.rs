//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so stdout only carries the run summary. `RUST_LOG`
//! wins unless `-v` or `-q` was given.
//!
//! - `error`: the run stopped
//! - `warn`: fallbacks taken, skipped moves, directories left behind
//! - `info`: run start and summary counts
//! - `debug`: one line per move
//! - `trace`: manifest saves

use std::error::Error;
use std::io;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor a verbosity flag is set
pub const DEFAULT_FILTER: &str = "warn,kfm=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Number of `-v` flags
    pub verbose: u8,
    pub quiet: bool,
}

impl LogConfig {
    fn flags_given(self) -> bool {
        self.verbose > 0 || self.quiet
    }

    /// Directive string for the configured verbosity
    pub fn filter_directives(self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => DEFAULT_FILTER,
            (false, 1) => "warn,kfm=debug",
            (false, _) => "info,kfm=trace",
        }
    }

    fn env_filter(self) -> EnvFilter {
        if self.flags_given() {
            return EnvFilter::new(self.filter_directives());
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
}
