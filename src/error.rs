//! Errors raised around the benchmark core.
//!
//! Measuring and reporting never fail; these cover configuration, benchmark
//! selection and exporting results.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("at least 2 iterations are needed for a standard deviation, got {iterations}")]
    InvalidIterations { iterations: usize },

    #[error("no benchmark matches '{filter}' (available: {available})")]
    UnknownBenchmark { filter: String, available: String },

    #[error("clock '{0}' is not available in this build")]
    ClockUnavailable(&'static str),

    #[error("failed to write results to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
