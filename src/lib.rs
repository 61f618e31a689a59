//! # Micro-EMB
//!
//! Embedded-friendly micro-benchmarks: time repeated executions of a routine
//! and report a running mean and sample standard deviation, generic over the
//! timing source and the numeric type the times are accumulated in.
//!
//! ```
//! use micro_emb::prelude::*;
//!
//! fn benchmark_loop(state: &mut State<MonotonicClock>) {
//!     for _iteration in state {
//!         for i in 0..1_000 {
//!             dont_optimize(i);
//!         }
//!     }
//! }
//!
//! let mut benchmarker: Benchmarker<MonotonicClock> = Benchmarker::new(100);
//! benchmarker.register("benchmark_loop", benchmark_loop);
//! benchmarker.run_all(&mut |name: &str, iterations: usize, mean: Nanos, sd: Nanos| {
//!     println!("{}\t{}\t{}\t{}", name, iterations, mean, sd);
//! });
//! ```

pub mod clock;
pub mod error;
pub mod numeric;
pub mod registry;
pub mod report;
pub mod state;
pub mod utils;

pub use error::{Error, Result};
pub use utils::hint::{clobber_memory, dont_optimize};

/// Re-export commonly used items
pub mod prelude {
    #[cfg(unix)]
    pub use crate::clock::CpuClock;
    #[cfg(feature = "cpu_cycles")]
    pub use crate::clock::CycleClock;
    pub use crate::clock::{Clock, DefaultClock, MonotonicClock, SimulatedClock};
    pub use crate::numeric::{Accumulator, Count, FromElapsed, Micros, Nanos};
    pub use crate::registry::{BenchConfig, Benchmarker, PinStrategy};
    pub use crate::report::{BenchmarkReport, Collector, Reporter};
    pub use crate::state::State;
    pub use crate::utils::hint::{clobber_memory, dont_optimize};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::register_benchmark;

    fn each_iteration_takes_two(state: &mut State<SimulatedClock>) {
        for _iteration in state {
            SimulatedClock::advance(2.0);
        }
    }

    fn alternating_one_three(state: &mut State<SimulatedClock>) {
        for (i, _iteration) in state.into_iter().enumerate() {
            SimulatedClock::advance(if i % 2 == 0 { 1.0 } else { 3.0 });
        }
    }

    #[test]
    fn test_constant_benchmark_scenario() {
        SimulatedClock::reset();
        let mut benchmarker: Benchmarker<SimulatedClock> = Benchmarker::new(1000);
        benchmarker.register_with_iterations("B1", each_iteration_takes_two, 5);

        let mut collector = Collector::new();
        benchmarker.run_all(&mut collector);

        let report = &collector.reports()[0];
        assert_eq!(report.name, "B1");
        assert_eq!(report.iterations, 5);
        assert!((report.mean - 2.0).abs() < 1e-12);
        assert!(report.std_dev.abs() < 1e-12);
    }

    #[test]
    fn test_two_sample_scenario() {
        SimulatedClock::reset();
        let mut benchmarker: Benchmarker<SimulatedClock> = Benchmarker::new(2);
        register_benchmark!(benchmarker, alternating_one_three);

        let mut collector = Collector::new();
        benchmarker.run_all(&mut collector);

        let report = &collector.reports()[0];
        assert_eq!(report.name, "alternating_one_three");
        assert_eq!(report.iterations, 2);
        assert!((report.mean - 2.0).abs() < 1e-12);
        assert!((report.std_dev - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_registration_order_scenario() {
        SimulatedClock::reset();
        let mut benchmarker: Benchmarker<SimulatedClock> = Benchmarker::new(10);
        benchmarker.register_with_iterations("B1", each_iteration_takes_two, 3);
        benchmarker.register_with_iterations("B2", alternating_one_three, 4);

        let mut calls = Vec::new();
        benchmarker.run_all(&mut |name: &str, iterations: usize, _: f64, _: f64| {
            calls.push((name.to_string(), iterations));
        });
        assert_eq!(calls, [("B1".to_string(), 3), ("B2".to_string(), 4)]);
    }

    #[test]
    fn test_count_accumulator_through_benchmarker() {
        SimulatedClock::reset();
        let mut benchmarker: Benchmarker<SimulatedClock, Nanos> = Benchmarker::new(4);
        benchmarker.register("alternating", |state: &mut State<SimulatedClock, Nanos>| {
            for (i, _iteration) in state.into_iter().enumerate() {
                SimulatedClock::advance(if i % 2 == 0 { 1.0 } else { 3.0 });
            }
        });

        let mut collector: Collector<Nanos> = Collector::new();
        benchmarker.run_all(&mut collector);

        let report = &collector.reports()[0];
        assert!((report.mean.count() - 2.0).abs() < 1e-12);
        // [1, 3, 1, 3]: sum of squares 4 over 3
        assert!((report.std_dev.count() - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_real_clock_produces_finite_statistics() {
        let mut benchmarker: Benchmarker<MonotonicClock> = Benchmarker::new(50);
        benchmarker.register("sum", |state: &mut State<MonotonicClock>| {
            for _iteration in state {
                let mut sum = 0u64;
                for i in 0..1_000u64 {
                    sum = dont_optimize(sum.wrapping_add(i));
                }
            }
        });

        let mut collector = Collector::new();
        benchmarker.run_all(&mut collector);

        let report = &collector.reports()[0];
        assert_eq!(report.iterations, 50);
        assert!(report.mean.count() > 0.0);
        assert!(report.std_dev.count().is_finite());
        assert!(report.std_dev.count() >= 0.0);
    }
}
