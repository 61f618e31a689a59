//! CPU cycle counter backing [`CycleClock`](crate::clock::CycleClock).
//!
//! Architecture-specific counters for x86, x86_64 and aarch64.

use std::ops::Sub;

/// Display unit of a cycle count.
#[cfg(target_arch = "aarch64")]
pub const UNIT: &str = "ticks";

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
pub const UNIT: &str = "cycles";

#[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64", target_arch = "x86")))]
pub const UNIT: &str = "units";

/// A raw counter reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycles(pub u64);

impl Cycles {
    #[inline(always)]
    pub fn now() -> Self {
        Self(read_cycles())
    }
}

/// Counter readings can be reordered across cores; never underflow.
impl Sub for Cycles {
    type Output = u64;

    #[inline(always)]
    fn sub(self, start: Cycles) -> u64 {
        self.0.saturating_sub(start.0)
    }
}

/// Read the current CPU cycle counter / timer.
///
/// On x86_64: RDTSC fenced by LFENCE.
/// On aarch64: CNTVCT_EL0 (virtual timer, readable from userspace).
#[inline(always)]
pub fn read_cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        read_cycles_x86_64()
    }

    #[cfg(target_arch = "x86")]
    {
        read_cycles_x86()
    }

    #[cfg(target_arch = "aarch64")]
    {
        read_cycles_aarch64()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64")))]
    {
        compile_error!("cpu_cycles feature requires x86, x86_64, or aarch64 architecture");
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_cycles_x86_64() -> u64 {
    use core::arch::x86_64::{_mm_lfence, _rdtsc};
    unsafe {
        _mm_lfence();
        let cycles = _rdtsc();
        _mm_lfence();
        cycles
    }
}

#[cfg(target_arch = "x86")]
#[inline(always)]
fn read_cycles_x86() -> u64 {
    use core::arch::x86::{_mm_lfence, _rdtsc};
    unsafe {
        _mm_lfence();
        let cycles = _rdtsc();
        _mm_lfence();
        cycles
    }
}

// Fixed-frequency timer rather than true cycles, but consistent across cores.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_cycles_aarch64() -> u64 {
    let val: u64;
    unsafe {
        core::arch::asm!("mrs {}, cntvct_el0", out(reg) val);
    }
    val
}

/// Counts are raw clock units.
impl crate::numeric::FromElapsed<u64> for f64 {
    #[inline(always)]
    fn from_elapsed(elapsed: u64) -> Self {
        elapsed as f64
    }
}
