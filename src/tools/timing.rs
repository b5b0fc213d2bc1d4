//! Process-wide phase timers
//!
//! Atomic microsecond accumulators, written from whichever thread finishes
//! a phase. Observability only; nothing reads them on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static TIME_COMPUTE_STRUCTURE: AtomicU64 = AtomicU64::new(0);
pub static TIME_EVAL_COEF: AtomicU64 = AtomicU64::new(0);
pub static TIME_EVAL_BASES: AtomicU64 = AtomicU64::new(0);
pub static TIME_ASSEMBLE: AtomicU64 = AtomicU64::new(0);
pub static TIME_GEO_COMPUTE: AtomicU64 = AtomicU64::new(0);
pub static TIME_GEO_TRANSFORM: AtomicU64 = AtomicU64::new(0);
pub static TIME_MACRO_SETUP: AtomicU64 = AtomicU64::new(0);
pub static TIME_ADD_MACRO: AtomicU64 = AtomicU64::new(0);
pub static TIME_APPLY_TRIAL: AtomicU64 = AtomicU64::new(0);
pub static TIME_APPLY_KRONECKER: AtomicU64 = AtomicU64::new(0);

/// Guard accumulating its lifetime into a counter, in microseconds
pub struct PhaseTimer {
    counter: &'static AtomicU64,
    start: Instant,
}

impl PhaseTimer {
    pub fn new(counter: &'static AtomicU64) -> Self {
        Self {
            counter,
            start: Instant::now(),
        }
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        let micros = self.start.elapsed().as_micros() as u64;
        self.counter.fetch_add(micros, Ordering::Relaxed);
    }
}

/// Accumulated value of a counter in seconds
pub fn seconds(counter: &AtomicU64) -> f64 {
    counter.load(Ordering::Relaxed) as f64 / 1e6
}

/// CPU time consumed by the whole process so far, in seconds, summed
/// across all threads. Under full parallel utilization this grows roughly
/// `threads` times faster than wall-clock time.
#[cfg(unix)]
pub fn process_cpu_time() -> f64 {
    match nix::time::clock_gettime(nix::time::ClockId::CLOCK_PROCESS_CPUTIME_ID) {
        Ok(ts) => ts.tv_sec() as f64 + ts.tv_nsec() as f64 / 1e9,
        Err(_) => 0.0,
    }
}

#[cfg(not(unix))]
pub fn process_cpu_time() -> f64 {
    0.0
}
