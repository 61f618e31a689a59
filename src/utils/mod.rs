//! Utility modules for measuring and presenting benchmarks.

pub mod cpu_affinity;
pub mod export;
pub mod hint;
pub mod tui;

#[cfg(feature = "cpu_cycles")]
pub mod cycles;

// Re-export commonly used items
pub use cpu_affinity::CpuPinGuard;
pub use export::{CsvReporter, CsvRow};
pub use hint::{clobber_memory, dont_optimize};
pub use tui::{TabReporter, TableReporter};

#[cfg(feature = "cpu_cycles")]
pub use cycles::{read_cycles, Cycles};
