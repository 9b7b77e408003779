//! Diagnostics for the library and the `fsops` binary.
//!
//! Everything is written to stderr: `fsops export` streams CSV on stdout and
//! must not interleave log lines with data rows. Import progress is logged
//! at INFO, so `-q` silences it while keeping errors.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log targets owned by this workspace. Other crates stay at their defaults.
const TARGETS: [&str; 2] = ["flightschool", "fsops"];

/// How much `fsops` reports while it works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Import progress, invoice issue and summaries.
    #[default]
    Normal,
    /// Per-row skips, duplicate decisions and SQL-level steps (`-v`).
    Verbose,
    /// Everything, including field parsing (`-vv` and up).
    Trace,
}

impl Verbosity {
    /// Map the `-v` count and `-q` flag. `-q` wins over any `-v`.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Most detailed level that gets through.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directives applied when `RUST_LOG` is unset.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        let level = self.to_level_filter();
        TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` replaces the directives derived from `verbosity`. A second
/// call is a no-op.
///
/// ```no_run
/// use flightschool::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity != Verbosity::Normal)
            .without_time(),
    );

    let _ = subscriber.try_init();
}

/// Route warnings to the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flightschool=warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(2, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(7, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
    }

    #[test]
    fn test_quiet_hides_import_progress() {
        // LogProgress reports at INFO
        assert!(Verbosity::Quiet.to_level_filter() < Level::INFO);
        assert!(Verbosity::Normal.to_level_filter() >= Level::INFO);
    }

    #[test]
    fn test_filter_directives_cover_library_and_binary() {
        assert_eq!(
            Verbosity::Verbose.filter_directives(),
            "flightschool=DEBUG,fsops=DEBUG"
        );
        assert_eq!(
            Verbosity::default().filter_directives(),
            "flightschool=INFO,fsops=INFO"
        );
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Trace,
        ] {
            assert!(EnvFilter::try_new(verbosity.filter_directives()).is_ok());
        }
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
