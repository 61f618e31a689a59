//! Benchmark registry.
//!
//! Benchmarks are registered with a name, a routine and an iteration count,
//! then run one after another in registration order. Each run gets a fresh
//! [`State`] whose statistics go to the reporter once the routine returns.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::numeric::{Accumulator, FromElapsed};
use crate::report::Reporter;
use crate::state::State;
use crate::utils::cpu_affinity::CpuPinGuard;
use tracing::{debug, warn};

/// Iterations used when neither the benchmarker nor the registration names a
/// count.
pub const DEFAULT_ITERATIONS: usize = 1000;

/// A benchmark routine. It must drive the state's iteration protocol.
pub type Routine<C, A> = Box<dyn FnMut(&mut State<C, A>)>;

/// CPU pinning strategy while benchmarks run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PinStrategy {
    /// Let the scheduler migrate the thread freely
    #[default]
    None,
    /// Pin to the current core for the whole run
    Run,
}

/// Configuration of a [`Benchmarker`]
#[derive(Clone, Debug)]
pub struct BenchConfig {
    /// Iterations for benchmarks registered without a count (default: 1000)
    pub default_iterations: usize,
    /// CPU pinning strategy (default: None)
    pub pin_strategy: PinStrategy,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            default_iterations: DEFAULT_ITERATIONS,
            pin_strategy: PinStrategy::default(),
        }
    }
}

impl BenchConfig {
    /// Reject defaults that cannot produce a standard deviation.
    pub fn validate(&self) -> Result<()> {
        if self.default_iterations < 2 {
            return Err(Error::InvalidIterations {
                iterations: self.default_iterations,
            });
        }
        Ok(())
    }
}

/// A registered benchmark.
pub struct BenchmarkEntry<C: Clock, A> {
    name: String,
    routine: Routine<C, A>,
    iterations: usize,
}

impl<C: Clock, A> BenchmarkEntry<C, A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Runs registered benchmarks against clock `C`, accumulating in `A`.
///
/// ```
/// use micro_emb::prelude::*;
///
/// fn empty(state: &mut State<SimulatedClock>) {
///     for _iteration in state {}
/// }
///
/// let mut benchmarker: Benchmarker<SimulatedClock> = Benchmarker::new(100);
/// benchmarker.register("empty", empty);
/// benchmarker.register_with_iterations("empty_short", empty, 10);
///
/// let mut reports = Collector::new();
/// benchmarker.run_all(&mut reports);
/// assert_eq!(reports.reports()[1].iterations, 10);
/// ```
pub struct Benchmarker<C: Clock, A = <C as Clock>::Accumulator> {
    config: BenchConfig,
    entries: Vec<BenchmarkEntry<C, A>>,
}

impl<C, A> Benchmarker<C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    /// Create a benchmarker whose unnamed counts default to `default_iterations`.
    pub fn new(default_iterations: usize) -> Self {
        Self::with_config(BenchConfig {
            default_iterations,
            ..BenchConfig::default()
        })
    }

    pub fn with_config(config: BenchConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Register a benchmark using the default number of iterations.
    pub fn register<F>(&mut self, name: impl Into<String>, routine: F)
    where
        F: FnMut(&mut State<C, A>) + 'static,
    {
        let iterations = self.config.default_iterations;
        self.register_with_iterations(name, routine, iterations);
    }

    /// Register a benchmark with its own number of iterations.
    ///
    /// Counts below 2 are accepted; their standard deviation comes out
    /// non-finite.
    pub fn register_with_iterations<F>(
        &mut self,
        name: impl Into<String>,
        routine: F,
        iterations: usize,
    ) where
        F: FnMut(&mut State<C, A>) + 'static,
    {
        let name = name.into();
        if iterations < 2 {
            warn!(benchmark = %name, iterations, "fewer than 2 iterations: standard deviation is undefined");
        }
        self.entries.push(BenchmarkEntry {
            name,
            routine: Box::new(routine),
            iterations,
        });
    }

    /// Get all registered benchmarks
    pub fn entries(&self) -> &[BenchmarkEntry<C, A>] {
        &self.entries
    }

    /// List benchmark names
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every benchmark in registration order.
    ///
    /// A panicking routine propagates out of this call; benchmarks after it do
    /// not run and its partial statistics are discarded.
    pub fn run_all<R: Reporter<A>>(&mut self, reporter: &mut R) {
        self.run_where(reporter, |_| true);
    }

    /// Run the benchmarks whose name contains `filter`, in registration order.
    ///
    /// Returns an error when nothing matches.
    pub fn run_matching<R: Reporter<A>>(&mut self, filter: &str, reporter: &mut R) -> Result<usize> {
        let ran = self.run_where(reporter, |entry| entry.name.contains(filter));
        if ran == 0 {
            return Err(Error::UnknownBenchmark {
                filter: filter.to_string(),
                available: self.names().join(", "),
            });
        }
        Ok(ran)
    }

    fn run_where<R, P>(&mut self, reporter: &mut R, mut select: P) -> usize
    where
        R: Reporter<A>,
        P: FnMut(&BenchmarkEntry<C, A>) -> bool,
    {
        let _pin = (self.config.pin_strategy == PinStrategy::Run).then(CpuPinGuard::new);

        let mut ran = 0;
        for entry in self.entries.iter_mut().filter(|e| select(e)) {
            debug!(benchmark = %entry.name, iterations = entry.iterations, "running benchmark");
            let mut state = State::new(entry.iterations);
            (entry.routine)(&mut state);
            state.report(&entry.name, reporter);
            ran += 1;
        }
        ran
    }
}

impl<C, A> Default for Benchmarker<C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    fn default() -> Self {
        Self::with_config(BenchConfig::default())
    }
}

/// Register a benchmark named after its function.
///
/// ```
/// use micro_emb::prelude::*;
/// use micro_emb::register_benchmark;
///
/// fn noop(state: &mut State<SimulatedClock>) {
///     state.run(|| {});
/// }
///
/// let mut b: Benchmarker<SimulatedClock> = Benchmarker::new(5);
/// register_benchmark!(b, noop);
/// register_benchmark!(b, noop, 50);
/// assert_eq!(b.names(), ["noop", "noop"]);
/// assert_eq!(b.entries()[1].iterations(), 50);
/// ```
#[macro_export]
macro_rules! register_benchmark {
    ($benchmarker:expr, $function:path) => {
        $benchmarker.register(stringify!($function), $function)
    };
    ($benchmarker:expr, $function:path, $iterations:expr) => {
        $benchmarker.register_with_iterations(stringify!($function), $function, $iterations)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;
    use crate::report::Collector;
    use std::cell::RefCell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    type Bench = Benchmarker<SimulatedClock>;

    fn constant(duration: f64) -> impl FnMut(&mut State<SimulatedClock>) {
        move |state: &mut State<SimulatedClock>| {
            for _iteration in state {
                SimulatedClock::advance(duration);
            }
        }
    }

    #[test]
    fn test_default_and_override_iterations() {
        let mut b = Bench::new(25);
        b.register("default", constant(1.0));
        b.register_with_iterations("override", constant(1.0), 4);
        b.register("default_again", constant(1.0));

        let counts: Vec<_> = b.entries().iter().map(|e| e.iterations()).collect();
        assert_eq!(counts, [25, 4, 25]);
    }

    #[test]
    fn test_default_config() {
        let b = Bench::default();
        assert_eq!(b.config().default_iterations, DEFAULT_ITERATIONS);
        assert_eq!(b.config().pin_strategy, PinStrategy::None);
        assert!(b.is_empty());
    }

    #[test]
    fn test_registration_does_not_run() {
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let mut b = Bench::new(3);
        b.register("counted", move |state: &mut State<SimulatedClock>| {
            *counter.borrow_mut() += 1;
            state.run(|| {});
        });
        assert_eq!(*calls.borrow(), 0);

        b.run_all(&mut Collector::new());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_reports_once_per_benchmark_in_order() {
        SimulatedClock::reset();
        let mut b = Bench::new(10);
        b.register_with_iterations("B1", constant(1.0), 3);
        b.register_with_iterations("B2", constant(2.0), 4);

        let mut collector = Collector::new();
        b.run_all(&mut collector);

        let reports = collector.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!((reports[0].name.as_str(), reports[0].iterations), ("B1", 3));
        assert_eq!((reports[1].name.as_str(), reports[1].iterations), ("B2", 4));
        assert!((reports[1].mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_benchmarks_run_sequentially() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut b = Bench::new(2);
        for name in ["first", "second"] {
            let log = Rc::clone(&log);
            b.register(name, move |state: &mut State<SimulatedClock>| {
                log.borrow_mut().push(format!("run {}", name));
                state.run(|| {});
            });
        }

        let report_log = Rc::clone(&log);
        let mut reporter = move |name: &str, _: usize, _: f64, _: f64| {
            report_log.borrow_mut().push(format!("report {}", name));
        };
        b.run_all(&mut reporter);

        assert_eq!(
            *log.borrow(),
            ["run first", "report first", "run second", "report second"]
        );
    }

    #[test]
    fn test_run_matching_filters_by_name() {
        let mut b = Bench::new(2);
        b.register("sort_small", constant(1.0));
        b.register("hash", constant(1.0));
        b.register("sort_large", constant(1.0));

        let mut collector = Collector::new();
        let ran = b.run_matching("sort", &mut collector).unwrap();
        assert_eq!(ran, 2);
        let names: Vec<_> = collector.reports().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, ["sort_small", "sort_large"]);
    }

    #[test]
    fn test_run_matching_without_match_is_an_error() {
        let mut b = Bench::new(2);
        b.register("hash", constant(1.0));
        let err = b.run_matching("sort", &mut Collector::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownBenchmark { .. }));
        assert!(err.to_string().contains("hash"));
    }

    #[test]
    fn test_panicking_routine_stops_the_run() {
        let mut b = Bench::new(2);
        b.register("ok", constant(1.0));
        b.register("boom", |state: &mut State<SimulatedClock>| {
            for (i, _iteration) in state.into_iter().enumerate() {
                if i == 1 {
                    panic!("routine failed");
                }
            }
        });
        b.register("never", constant(1.0));

        let mut collector = Collector::new();
        let result = catch_unwind(AssertUnwindSafe(|| b.run_all(&mut collector)));
        assert!(result.is_err());

        let names: Vec<_> = collector.reports().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, ["ok"]);
    }

    #[test]
    fn test_validate_config() {
        assert!(BenchConfig::default().validate().is_ok());
        let config = BenchConfig {
            default_iterations: 1,
            ..BenchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidIterations { iterations: 1 })
        ));
    }

    #[test]
    fn test_pinned_run_still_reports() {
        let mut b = Bench::with_config(BenchConfig {
            default_iterations: 3,
            pin_strategy: PinStrategy::Run,
        });
        b.register("pinned", constant(1.0));
        let mut collector = Collector::new();
        b.run_all(&mut collector);
        assert_eq!(collector.reports().len(), 1);
    }

    fn generic_routine<C: Clock>(state: &mut State<C, f64>)
    where
        f64: FromElapsed<C::Elapsed>,
    {
        state.run(|| {});
    }

    #[test]
    fn test_register_macro() {
        let mut b = Bench::new(5);
        crate::register_benchmark!(b, generic_routine);
        crate::register_benchmark!(b, generic_routine, 7);
        assert_eq!(b.names(), ["generic_routine", "generic_routine"]);
        assert_eq!(b.entries()[1].iterations(), 7);
    }
}
