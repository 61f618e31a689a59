//! Per-benchmark measurement state.
//!
//! A [`State`] holds the running statistics of one benchmark run and hands out
//! one [`IterationTimer`] per loop iteration. Each timer measures the loop body
//! it lives in and folds the elapsed time into the running mean and sum of
//! squared deviations (Welford) when it is dropped. No raw samples are kept.
//!
//! ```
//! use micro_emb::prelude::*;
//!
//! fn sum_loop(state: &mut State<MonotonicClock>) {
//!     for _iteration in &mut *state {
//!         let mut sum = 0u64;
//!         for i in 0..1_000u64 {
//!             sum = dont_optimize(sum + i);
//!         }
//!     }
//! }
//! # let mut b: Benchmarker<MonotonicClock> = Benchmarker::new(10);
//! # b.register("sum_loop", sum_loop);
//! # b.run_all(&mut |_: &str, _: usize, _: Nanos, _: Nanos| {});
//! ```

use crate::clock::Clock;
use crate::numeric::{self, Accumulator, FromElapsed};
use crate::report::Reporter;
use std::cell::Cell;
use std::hint::black_box;
use std::marker::PhantomData;
use tracing::warn;

/// Running statistics for one benchmark run.
///
/// Only the benchmarker creates a `State`, and only routines receiving
/// `&mut State` can drive it. It is neither `Clone` nor `Sync`, and iterating
/// borrows it for the whole loop, so it can be neither duplicated nor moved
/// while measurements are in flight.
pub struct State<C: Clock, A = <C as Clock>::Accumulator> {
    /// Number of iterations to perform
    iterations: usize,
    /// Iterations measured so far
    completed: Cell<usize>,
    /// Running mean
    mean: Cell<A>,
    /// Sum of squared differences from the mean, for the variance
    squared_differences: Cell<A>,
    _clock: PhantomData<fn() -> C>,
}

impl<C, A> State<C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    pub(crate) fn new(iterations: usize) -> Self {
        Self {
            iterations,
            completed: Cell::new(0),
            mean: Cell::new(A::zero()),
            squared_differences: Cell::new(A::zero()),
            _clock: PhantomData,
        }
    }

    /// Target number of iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Iterations measured so far.
    pub fn completed(&self) -> usize {
        self.completed.get()
    }

    /// Whether the target number of iterations has been measured.
    pub fn done(&self) -> bool {
        self.completed.get() >= self.iterations
    }

    /// Iterate over the remaining iterations, timing each loop body.
    ///
    /// Bind the yielded timer to a named pattern (`_iteration`) so it lives
    /// until the end of the body.
    pub fn iter(&mut self) -> Iter<'_, C, A> {
        Iter {
            state: Some(&*self),
            started: 0,
        }
    }

    /// Time a single call to `f` as one iteration.
    ///
    /// Returns `None` without calling `f` once the target has been reached.
    #[inline(always)]
    pub fn measure<R, F: FnOnce() -> R>(&mut self, f: F) -> Option<R> {
        if self.done() {
            return None;
        }
        let _timer = IterationTimer::start(&*self);
        Some(black_box(f()))
    }

    /// Call `f` once per remaining iteration, timing each call.
    pub fn run<F: FnMut()>(&mut self, mut f: F) {
        while !self.done() {
            self.measure(&mut f);
        }
    }

    /// Fold one elapsed measurement into the running statistics.
    fn update(&self, elapsed: C::Elapsed) {
        let n = self.completed.get() + 1;
        self.completed.set(n);

        let value = A::from_elapsed(elapsed);
        let delta = value - self.mean.get();
        let mean = self.mean.get() + delta.div_count(n);
        self.mean.set(mean);
        let delta2 = value - mean;
        self.squared_differences
            .set(self.squared_differences.get() + numeric::multiply(delta, delta2));
    }

    /// Hand the final statistics to `reporter` and discard the state.
    ///
    /// The standard deviation is the Bessel-corrected sample deviation over
    /// the iterations actually measured. Fewer than two measured iterations
    /// yield a non-finite deviation, which is passed through untouched.
    pub(crate) fn report<R: Reporter<A>>(self, name: &str, reporter: &mut R) {
        let n = self.completed.get();
        if n < self.iterations {
            warn!(
                benchmark = name,
                completed = n,
                target = self.iterations,
                "benchmark loop exited early; reporting measured iterations only"
            );
        }

        let variance = self.squared_differences.get().div_count(n.saturating_sub(1));
        let std_dev = numeric::sqrt(variance);
        reporter.report(name, n, self.mean.get(), std_dev);
    }
}

impl<'a, C, A> IntoIterator for &'a mut State<C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    type Item = IterationTimer<'a, C, A>;
    type IntoIter = Iter<'a, C, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over the iterations of a [`State`].
///
/// Active while it points at a state, exhausted once the state is done.
pub struct Iter<'a, C: Clock, A> {
    state: Option<&'a State<C, A>>,
    started: usize,
}

impl<C: Clock, A> Iter<'_, C, A> {
    pub fn is_exhausted(&self) -> bool {
        self.state.is_none()
    }
}

/// Two cursors are equal when both are exhausted or both point at the same
/// state.
impl<C: Clock, A> PartialEq for Iter<'_, C, A> {
    fn eq(&self, other: &Self) -> bool {
        match (self.state, other.state) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

impl<'a, C, A> Iterator for Iter<'a, C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    type Item = IterationTimer<'a, C, A>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        let state = self.state?;
        // Bounded by `started` too, in case timers are held past the body.
        if state.done() || self.started >= state.iterations {
            self.state = None;
            return None;
        }
        self.started += 1;
        Some(IterationTimer::start(state))
    }
}

/// Measures one loop body: starts on creation, records on drop.
#[must_use = "the iteration is measured until the timer is dropped"]
pub struct IterationTimer<'a, C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    state: &'a State<C, A>,
    start: C::Instant,
}

impl<'a, C, A> IterationTimer<'a, C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    #[inline(always)]
    fn start(state: &'a State<C, A>) -> Self {
        Self {
            state,
            start: C::now(),
        }
    }
}

impl<C, A> Drop for IterationTimer<'_, C, A>
where
    C: Clock,
    A: Accumulator + FromElapsed<C::Elapsed>,
{
    #[inline(always)]
    fn drop(&mut self) {
        let now = C::now();
        self.state.update(now - self.start);
    }
}
