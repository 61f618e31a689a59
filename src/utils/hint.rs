//! Optimization barriers for benchmark bodies.
//!
//! Work whose result is never observed may be removed by the optimizer,
//! leaving an empty loop to be measured. Route such values through
//! [`dont_optimize`].

use std::sync::atomic::{compiler_fence, Ordering};

/// Keep `value` (and the work that produced it) alive.
///
/// ```
/// use micro_emb::dont_optimize;
///
/// let mut sum = 0u64;
/// for i in 0..100u64 {
///     sum = dont_optimize(sum + i);
/// }
/// assert_eq!(sum, 4950);
/// ```
#[inline(always)]
pub fn dont_optimize<T>(value: T) -> T {
    std::hint::black_box(value)
}

/// Force pending writes to memory to be considered observable, so stores
/// inside the measured body are not sunk out of it.
#[inline(always)]
pub fn clobber_memory() {
    compiler_fence(Ordering::SeqCst);
}
