//! Numeric capability layer for accumulator types.
//!
//! The statistics engine needs to multiply two accumulator values and take a
//! square root. Plain floats support both natively; duration-like types such as
//! [`Nanos`] only expose their magnitude through [`Count::count`]. Each
//! accumulator picks its strategy once through [`Accumulator::Ops`], so the
//! choice is made at compile time and a type that satisfies neither strategy
//! simply fails to build.

use num_traits::{Float, Zero};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Sub};
use std::time::Duration;

/// Division of an accumulator by an iteration count.
pub trait DivCount {
    fn div_count(self, n: usize) -> Self;
}

/// Construction of an accumulator from a clock's elapsed value.
pub trait FromElapsed<E> {
    fn from_elapsed(elapsed: E) -> Self;
}

/// Structured duration-like values that expose their magnitude through a
/// count accessor, but do not multiply with each other.
pub trait Count: Sized {
    /// Underlying representation of the magnitude.
    type Rep: Float;

    fn count(&self) -> Self::Rep;

    fn from_count(count: Self::Rep) -> Self;
}

/// Magnitude of an accumulator as a plain `f64`, for presentation only.
pub trait Magnitude {
    fn magnitude(&self) -> f64;
}

/// Multiplication and square root for one accumulator type.
pub trait NumericOps<A> {
    fn multiply(a: A, b: A) -> A;

    fn sqrt(a: A) -> A;
}

/// Strategy for types with native arithmetic (`a * b`, `a.sqrt()`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

/// Strategy for types that only expose [`Count::count`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ByCount;

impl<A: Float> NumericOps<A> for Native {
    #[inline(always)]
    fn multiply(a: A, b: A) -> A {
        a * b
    }

    #[inline(always)]
    fn sqrt(a: A) -> A {
        a.sqrt()
    }
}

impl<A: Count> NumericOps<A> for ByCount {
    #[inline(always)]
    fn multiply(a: A, b: A) -> A {
        A::from_count(a.count() * b.count())
    }

    #[inline(always)]
    fn sqrt(a: A) -> A {
        A::from_count(a.count().sqrt())
    }
}

/// A numeric representation of elapsed time that the statistics engine can
/// aggregate.
///
/// Implementors must support addition, subtraction, division by an iteration
/// count and a zero value. `Ops` selects how two values are multiplied and how
/// a square root is taken: [`Native`] for float-like types, [`ByCount`] for
/// duration-like types.
pub trait Accumulator: Copy + Zero + Sub<Output = Self> + DivCount {
    type Ops: NumericOps<Self>;
}

/// Multiply two accumulators using the type's selected strategy.
#[inline(always)]
pub fn multiply<A: Accumulator>(a: A, b: A) -> A {
    A::Ops::multiply(a, b)
}

/// Square root of an accumulator using the type's selected strategy.
#[inline(always)]
pub fn sqrt<A: Accumulator>(a: A) -> A {
    A::Ops::sqrt(a)
}

// ============================================================================
// Plain floats
// ============================================================================

macro_rules! native_float {
    ($ty:ty) => {
        impl DivCount for $ty {
            #[inline(always)]
            fn div_count(self, n: usize) -> Self {
                self / n as $ty
            }
        }

        impl Magnitude for $ty {
            fn magnitude(&self) -> f64 {
                *self as f64
            }
        }

        impl Accumulator for $ty {
            type Ops = Native;
        }

        impl FromElapsed<$ty> for $ty {
            #[inline(always)]
            fn from_elapsed(elapsed: $ty) -> Self {
                elapsed
            }
        }

        /// Nanoseconds.
        impl FromElapsed<Duration> for $ty {
            #[inline(always)]
            fn from_elapsed(elapsed: Duration) -> Self {
                elapsed.as_nanos() as $ty
            }
        }
    };
}

native_float!(f32);
native_float!(f64);

// ============================================================================
// Duration-like accumulators
// ============================================================================

/// Marker for the time unit of a [`FloatDuration`].
pub trait Unit {
    const SUFFIX: &'static str;

    /// Convert a `Duration` into this unit.
    fn from_duration(d: Duration) -> f64;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Nano;

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Micro;

impl Unit for Nano {
    const SUFFIX: &'static str = "ns";

    fn from_duration(d: Duration) -> f64 {
        d.as_nanos() as f64
    }
}

impl Unit for Micro {
    const SUFFIX: &'static str = "us";

    fn from_duration(d: Duration) -> f64 {
        d.as_nanos() as f64 / 1_000.0
    }
}

/// Signed floating-point duration in a fixed unit.
///
/// Unlike `std::time::Duration` it can hold negative values, which the running
/// deviation needs, and it deliberately has no `Mul` impl: the statistics
/// engine reaches its magnitude through [`Count`].
pub struct FloatDuration<U> {
    count: f64,
    _unit: PhantomData<U>,
}

/// Nanoseconds stored as `f64`.
pub type Nanos = FloatDuration<Nano>;

/// Microseconds stored as `f64`.
pub type Micros = FloatDuration<Micro>;

impl<U> FloatDuration<U> {
    pub const fn new(count: f64) -> Self {
        Self {
            count,
            _unit: PhantomData,
        }
    }

    pub const fn count(&self) -> f64 {
        self.count
    }
}

// Manual impls keep them free of bounds on the unit marker.
impl<U> Clone for FloatDuration<U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U> Copy for FloatDuration<U> {}

impl<U> Default for FloatDuration<U> {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<U> PartialEq for FloatDuration<U> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
    }
}

impl<U> PartialOrd for FloatDuration<U> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.count.partial_cmp(&other.count)
    }
}

impl<U: Unit> fmt::Debug for FloatDuration<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.count, U::SUFFIX)
    }
}

impl<U: Unit> fmt::Display for FloatDuration<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.count, f)?;
        f.write_str(U::SUFFIX)
    }
}

impl<U> Add for FloatDuration<U> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.count + rhs.count)
    }
}

impl<U> Sub for FloatDuration<U> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.count - rhs.count)
    }
}

impl<U> Zero for FloatDuration<U> {
    fn zero() -> Self {
        Self::new(0.0)
    }

    fn is_zero(&self) -> bool {
        self.count == 0.0
    }
}

impl<U> DivCount for FloatDuration<U> {
    #[inline(always)]
    fn div_count(self, n: usize) -> Self {
        Self::new(self.count / n as f64)
    }
}

impl<U> Count for FloatDuration<U> {
    type Rep = f64;

    fn count(&self) -> f64 {
        self.count
    }

    fn from_count(count: f64) -> Self {
        Self::new(count)
    }
}

impl<U> Magnitude for FloatDuration<U> {
    fn magnitude(&self) -> f64 {
        self.count
    }
}

impl<U> Accumulator for FloatDuration<U> {
    type Ops = ByCount;
}

impl<U: Unit> FromElapsed<Duration> for FloatDuration<U> {
    #[inline(always)]
    fn from_elapsed(elapsed: Duration) -> Self {
        Self::new(U::from_duration(elapsed))
    }
}

/// Raw clock units taken as the count.
impl<U> FromElapsed<f64> for FloatDuration<U> {
    #[inline(always)]
    fn from_elapsed(elapsed: f64) -> Self {
        Self::new(elapsed)
    }
}
