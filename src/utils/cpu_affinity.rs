//! Thread pinning for the duration of a benchmark run.
//!
//! Keeping the benchmarking thread on one core avoids migrations between
//! iterations. Pinning is only implemented on Linux (via libc); elsewhere the
//! guard is a no-op and reports itself as unpinned.

use tracing::debug;

#[cfg(target_os = "linux")]
mod platform {
    /// Affinity mask saved before pinning.
    pub struct Saved(libc::cpu_set_t);

    pub fn current_cpu() -> Option<usize> {
        let cpu = unsafe { libc::sched_getcpu() };
        usize::try_from(cpu).ok()
    }

    pub fn pin(core_id: usize) -> Option<Saved> {
        unsafe {
            let mut original: libc::cpu_set_t = std::mem::zeroed();
            if libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut original) != 0 {
                return None;
            }

            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            libc::CPU_SET(core_id, &mut set);
            if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
                return None;
            }
            Some(Saved(original))
        }
    }

    pub fn restore(saved: &Saved) -> bool {
        unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &saved.0) == 0 }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    pub struct Saved;

    pub fn current_cpu() -> Option<usize> {
        None
    }

    pub fn pin(_core_id: usize) -> Option<Saved> {
        None
    }

    pub fn restore(_saved: &Saved) -> bool {
        true
    }
}

/// RAII guard for CPU pinning - pins on creation, restores on drop.
///
/// The original affinity is restored even when a benchmark panics.
pub struct CpuPinGuard {
    pinned: Option<(usize, platform::Saved)>,
}

impl CpuPinGuard {
    /// Pin the current thread to the core it is running on.
    pub fn new() -> Self {
        let core = platform::current_cpu().unwrap_or(0);
        Self::with_core(core)
    }

    /// Pin the current thread to `core_id`.
    pub fn with_core(core_id: usize) -> Self {
        let pinned = platform::pin(core_id).map(|saved| (core_id, saved));
        match pinned {
            Some(_) => debug!(core = core_id, "pinned benchmark thread"),
            None => debug!(core = core_id, "could not pin benchmark thread"),
        }
        Self { pinned }
    }

    /// The core this thread is pinned to, if pinning succeeded.
    pub fn core_id(&self) -> Option<usize> {
        self.pinned.as_ref().map(|(core, _)| *core)
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

impl Default for CpuPinGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CpuPinGuard {
    fn drop(&mut self) {
        if let Some((core, saved)) = self.pinned.take() {
            if !platform::restore(&saved) {
                debug!(core, "failed to restore thread affinity");
            }
        }
    }
}
