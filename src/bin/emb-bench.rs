//! Demo CLI running the bundled benchmarks.
//!
//! Usage:
//!   emb-bench                     # Run all benchmarks
//!   emb-bench --list              # List benchmarks
//!   emb-bench loop                # Run benchmarks whose name contains "loop"
//!   emb-bench --clock cpu -n 200  # CPU time, 200 iterations each
//!   emb-bench --csv out.csv       # Also export the statistics to CSV

use clap::{Parser, ValueEnum};
use micro_emb::clock::{Clock, MonotonicClock};
use micro_emb::numeric::Magnitude;
use micro_emb::registry::{BenchConfig, Benchmarker, PinStrategy, DEFAULT_ITERATIONS};
use micro_emb::report::Reporter;
use micro_emb::state::State;
use micro_emb::utils::tui;
use micro_emb::utils::{CsvReporter, TabReporter, TableReporter};
use micro_emb::{dont_optimize, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ClockKind {
    /// Wall-clock time (std::time::Instant), nanoseconds
    Monotonic,
    /// Process CPU time, microseconds
    Cpu,
    /// CPU cycle counter (requires the cpu_cycles feature)
    Cycles,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Aligned table sized to the terminal
    Table,
    /// Tab-separated lines
    Tab,
    /// CSV on stdout
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "emb-bench", version, about = "Run the bundled micro-benchmarks")]
struct Cli {
    /// Run only benchmarks whose name contains this text
    filter: Option<String>,

    /// Iterations for benchmarks without their own count
    #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Timing source
    #[arg(long, value_enum, default_value_t = ClockKind::Monotonic)]
    clock: ClockKind,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Also write the statistics to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Pin the benchmark thread to its current core
    #[arg(long)]
    pin: bool,

    /// List benchmarks and exit
    #[arg(short, long)]
    list: bool,

    /// Seed for generated benchmark inputs (default: random)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = dispatch(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    match cli.clock {
        ClockKind::Monotonic => run::<MonotonicClock>(cli),
        #[cfg(unix)]
        ClockKind::Cpu => run::<micro_emb::clock::CpuClock>(cli),
        #[cfg(not(unix))]
        ClockKind::Cpu => Err(Error::ClockUnavailable("cpu")),
        #[cfg(feature = "cpu_cycles")]
        ClockKind::Cycles => run::<micro_emb::clock::CycleClock>(cli),
        #[cfg(not(feature = "cpu_cycles"))]
        ClockKind::Cycles => Err(Error::ClockUnavailable("cycles")),
    }
}

fn run<C>(cli: &Cli) -> Result<()>
where
    C: Clock + 'static,
    C::Accumulator: Magnitude,
{
    let config = BenchConfig {
        default_iterations: cli.iterations,
        pin_strategy: if cli.pin { PinStrategy::Run } else { PinStrategy::None },
    };
    config.validate()?;

    let mut benchmarker: Benchmarker<C> = Benchmarker::with_config(config);
    register_all(&mut benchmarker, cli.seed.unwrap_or_else(rand::random));

    if cli.list {
        tui::print_benchmark_list(benchmarker.entries().iter().map(|e| (e.name(), e.iterations())));
        return Ok(());
    }

    let mut export = CsvReporter::for_clock::<C>();
    match cli.format {
        Format::Table => {
            tui::print_header();
            let mut table = TableReporter::for_clock::<C>();
            execute(&mut benchmarker, cli.filter.as_deref(), &mut table, &mut export)?;
            table.finish()?;
        }
        Format::Tab => {
            let mut tab = TabReporter::for_clock::<C>();
            execute(&mut benchmarker, cli.filter.as_deref(), &mut tab, &mut export)?;
            tab.finish()?;
        }
        Format::Csv => {
            let mut silent = |_: &str, _: usize, _: C::Accumulator, _: C::Accumulator| {};
            execute(&mut benchmarker, cli.filter.as_deref(), &mut silent, &mut export)?;
            export.write(std::io::stdout().lock())?;
        }
    }

    if let Some(path) = &cli.csv {
        export_csv(&export, path, std::io::stderr().lock())?;
    }
    Ok(())
}

/// Write the CSV file and announce it on `notice`, which must not be stdout:
/// `--format csv` streams the rows there.
fn export_csv<W: Write>(export: &CsvReporter, path: &Path, mut notice: W) -> Result<()> {
    export.write_to(path)?;
    writeln!(notice, "Statistics exported to: {}", path.display())?;
    Ok(())
}

/// Run the selected benchmarks, feeding both the display and the export.
fn execute<C, R>(
    benchmarker: &mut Benchmarker<C>,
    filter: Option<&str>,
    display: &mut R,
    export: &mut CsvReporter,
) -> Result<()>
where
    C: Clock,
    C::Accumulator: Magnitude,
    R: Reporter<C::Accumulator>,
{
    let mut both = |name: &str, iterations: usize, mean: C::Accumulator, std_dev: C::Accumulator| {
        display.report(name, iterations, mean, std_dev);
        export.report(name, iterations, mean, std_dev);
    };
    match filter {
        Some(filter) => {
            benchmarker.run_matching(filter, &mut both)?;
        }
        None => benchmarker.run_all(&mut both),
    }
    Ok(())
}

/// Iterations for `benchmark_loop_double`: ten percent over the default.
fn extended_iterations(iterations: usize) -> usize {
    iterations.saturating_add(iterations / 10)
}

fn register_all<C: Clock + 'static>(benchmarker: &mut Benchmarker<C>, seed: u64) {
    let iterations = extended_iterations(benchmarker.config().default_iterations);
    benchmarker.register("benchmark_empty", benchmark_empty::<C>);
    benchmarker.register("benchmark_loop", benchmark_loop::<C>);
    benchmarker.register_with_iterations(
        "benchmark_loop_double",
        benchmark_loop_double::<C>,
        iterations,
    );
    for len in [64, 4096] {
        benchmarker.register(format!("sort_unstable_{}", len), sort_benchmark::<C>(len, seed));
    }
}

/// Measures the overhead of the timer itself.
fn benchmark_empty<C: Clock>(state: &mut State<C>) {
    for _iteration in state {}
}

fn benchmark_loop<C: Clock>(state: &mut State<C>) {
    for _iteration in state {
        for i in 0..10_000 {
            dont_optimize(i);
        }
    }
}

fn benchmark_loop_double<C: Clock>(state: &mut State<C>) {
    for _iteration in state {
        let mut i = 0.0f64;
        while i < 10_000.0 {
            dont_optimize(i);
            i += 1.0;
        }
    }
}

/// Sorts a fresh copy of the same random input each iteration; the copy is
/// outside the timed region.
fn sort_benchmark<C: Clock + 'static>(len: usize, seed: u64) -> impl FnMut(&mut State<C>) + 'static {
    let mut rng = StdRng::seed_from_u64(seed);
    let input: Vec<u32> = (0..len).map(|_| rng.random()).collect();
    let mut buf = input.clone();

    move |state: &mut State<C>| {
        loop {
            buf.copy_from_slice(&input);
            if state.measure(|| buf.sort_unstable()).is_none() {
                break;
            }
            dont_optimize(&buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micro_emb::clock::SimulatedClock;

    #[test]
    fn test_extended_iterations_saturates() {
        assert_eq!(extended_iterations(1000), 1100);
        assert_eq!(extended_iterations(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_export_notice_goes_to_given_writer() {
        let mut export = CsvReporter::new("ns");
        export.report("bench", 3, 2.0f64, 0.5f64);

        let path = std::env::temp_dir().join(format!("emb-bench-{}.csv", std::process::id()));
        let mut notice = Vec::new();
        export_csv(&export, &path, &mut notice).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(written.contains("bench"));
        assert!(!written.contains("Statistics exported"));
        let notice = String::from_utf8(notice).unwrap();
        assert!(notice.starts_with("Statistics exported to: "));
    }

    #[test]
    fn test_sort_benchmark_stops_at_target() {
        SimulatedClock::reset();
        let mut benchmarker: Benchmarker<SimulatedClock> = Benchmarker::new(5);
        benchmarker.register("sort", sort_benchmark::<SimulatedClock>(16, 7));

        let mut counts = Vec::new();
        benchmarker.run_all(&mut |_: &str, iterations: usize, _: f64, _: f64| {
            counts.push(iterations);
        });
        assert_eq!(counts, [5]);
    }
}
