//! Timing sources.
//!
//! A [`Clock`] provides a point in time; subtracting two points yields an
//! elapsed value that the chosen accumulator is built from. The session never
//! inspects precision, monotonicity or units: those belong to the clock.

use crate::numeric::{Accumulator, FromElapsed, Nanos};
use std::cell::Cell;
use std::ops::Sub;

/// A pluggable timing source.
pub trait Clock {
    /// A point in time.
    type Instant: Copy + Sub<Output = Self::Elapsed>;

    /// The difference between two points in time.
    type Elapsed;

    /// Accumulator used when a benchmarker does not name one.
    type Accumulator: Accumulator + FromElapsed<Self::Elapsed>;

    /// Unit of the default accumulator, for display.
    const UNIT: &'static str;

    fn now() -> Self::Instant;
}

/// Wall-clock time from `std::time::Instant`, accumulated in nanoseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    type Instant = std::time::Instant;
    type Elapsed = std::time::Duration;
    type Accumulator = Nanos;

    const UNIT: &'static str = "ns";

    #[inline(always)]
    fn now() -> Self::Instant {
        std::time::Instant::now()
    }
}

/// Process CPU time in microseconds.
///
/// Usually shows lower variance than wall-clock time, at the cost of a
/// coarser resolution on some platforms.
#[cfg(unix)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuClock;

#[cfg(unix)]
impl Clock for CpuClock {
    type Instant = f64;
    type Elapsed = f64;
    type Accumulator = f64;

    const UNIT: &'static str = "us";

    #[inline(always)]
    fn now() -> f64 {
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
        if rc != 0 {
            return f64::NAN;
        }
        ts.tv_sec as f64 * 1_000_000.0 + ts.tv_nsec as f64 / 1_000.0
    }
}

/// CPU cycle counter (RDTSC on x86, CNTVCT_EL0 on aarch64).
#[cfg(feature = "cpu_cycles")]
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleClock;

#[cfg(feature = "cpu_cycles")]
impl Clock for CycleClock {
    type Instant = crate::utils::cycles::Cycles;
    type Elapsed = u64;
    type Accumulator = f64;

    const UNIT: &'static str = crate::utils::cycles::UNIT;

    #[inline(always)]
    fn now() -> Self::Instant {
        crate::utils::cycles::Cycles::now()
    }
}

thread_local! {
    static SIMULATED_NOW: Cell<f64> = const { Cell::new(0.0) };
}

/// A manually driven clock for deterministic measurements.
///
/// Time only moves when [`SimulatedClock::advance`] is called. The current
/// time is thread-local, so parallel tests do not disturb each other.
///
/// ```
/// use micro_emb::clock::{Clock, SimulatedClock};
///
/// SimulatedClock::reset();
/// let start = SimulatedClock::now();
/// SimulatedClock::advance(2.0);
/// assert_eq!(SimulatedClock::now() - start, 2.0);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedClock;

impl SimulatedClock {
    /// Move the clock forward by `units`.
    pub fn advance(units: f64) {
        SIMULATED_NOW.with(|now| now.set(now.get() + units));
    }

    /// Set the clock back to zero.
    pub fn reset() {
        SIMULATED_NOW.with(|now| now.set(0.0));
    }
}

impl Clock for SimulatedClock {
    type Instant = f64;
    type Elapsed = f64;
    type Accumulator = f64;

    const UNIT: &'static str = "units";

    fn now() -> f64 {
        SIMULATED_NOW.with(Cell::get)
    }
}

/// The clock selected by the `cpu_cycles` / `use_time` features.
#[cfg(all(feature = "cpu_cycles", not(feature = "use_time")))]
pub type DefaultClock = CycleClock;

#[cfg(any(not(feature = "cpu_cycles"), feature = "use_time"))]
pub type DefaultClock = MonotonicClock;
