//! Read-only, mostly-monotonic counters exposed by the reactor and worker
//! pool, per the observable-stats surface.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Reactor-side handle counts, updated as handles are added and removed.
#[derive(Debug, Default)]
pub struct ReactorStats {
    pub ready: AtomicU64,
    pub running: AtomicU64,
    pub listeners_count: AtomicUsize,
    pub connectors_count: AtomicUsize,
    pub connections_count: AtomicUsize,
    pub pipes_count: AtomicUsize,
}

impl ReactorStats {
    pub fn count(&self) -> usize {
        self.listeners_count.load(Ordering::Relaxed)
            + self.connectors_count.load(Ordering::Relaxed)
            + self.connections_count.load(Ordering::Relaxed)
            + self.pipes_count.load(Ordering::Relaxed)
    }
}

/// Worker pool counters.
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub processed_count: AtomicU64,
}

/// Counters kept by the blocking test/demo client helper only.
#[derive(Debug, Default)]
pub struct ClientStats {
    pub connect_count: AtomicU64,
    pub fail_count: AtomicU64,
    pub read_size: AtomicU64,
    pub write_size: AtomicU64,
}
