//! Scalars shared between independently scheduled stages.
//!
//! These cross task boundaries outside any queue, so every access is atomic.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide state written by one stage and read by another.
#[derive(Debug, Default)]
pub struct SharedState {
    mcu_build: AtomicU32,
    publish_ok: AtomicU64,
    publish_err: AtomicU64,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store the build number from the latest valid heartbeat.
    pub fn set_mcu_build(&self, build: u32) {
        self.mcu_build.store(build, Ordering::Relaxed);
    }

    /// Build number from the latest valid heartbeat, 0 before the first.
    pub fn mcu_build(&self) -> u32 {
        self.mcu_build.load(Ordering::Relaxed)
    }

    /// Count one telemetry publish attempt.
    pub fn record_publish(&self, ok: bool) {
        let counter = if ok {
            &self.publish_ok
        } else {
            &self.publish_err
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative `(ok, err)` publish counts.
    pub fn publish_counts(&self) -> (u64, u64) {
        (
            self.publish_ok.load(Ordering::Relaxed),
            self.publish_err.load(Ordering::Relaxed),
        )
    }
}

/// Internet reachability, written by an external probe.
#[derive(Debug, Clone, Default)]
pub struct ReachabilityFlag(Arc<AtomicBool>);

impl ReachabilityFlag {
    pub fn new(reachable: bool) -> Self {
        Self(Arc::new(AtomicBool::new(reachable)))
    }

    pub fn set(&self, reachable: bool) {
        self.0.store(reachable, Ordering::Relaxed);
    }

    pub fn is_reachable(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
