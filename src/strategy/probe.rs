//! Counted-active-workers probe.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts pool workers (threads or processes) that are currently alive.
///
/// Cloning shares the counters. A pool registers each worker with
/// [`enter`](Self::enter) and the returned guard deregisters it on drop, so
/// `active() == 0` after a run proves the pool was fully drained.
#[derive(Debug, Clone, Default)]
pub struct WorkerProbe {
    counters: Arc<ProbeCounters>,
}

#[derive(Debug, Default)]
struct ProbeCounters {
    active: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl WorkerProbe {
    /// Creates a probe with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live worker until the guard is dropped.
    #[must_use = "the worker is deregistered when the guard drops"]
    pub fn enter(&self) -> WorkerGuard {
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        WorkerGuard {
            counters: Arc::clone(&self.counters),
        }
    }

    /// Workers alive right now.
    #[must_use]
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously alive workers seen so far.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Total workers ever registered.
    #[must_use]
    pub fn started(&self) -> usize {
        self.counters.started.load(Ordering::SeqCst)
    }
}

/// Keeps one worker registered with a [`WorkerProbe`].
#[derive(Debug)]
pub struct WorkerGuard {
    counters: Arc<ProbeCounters>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}
