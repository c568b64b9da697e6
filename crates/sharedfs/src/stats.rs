//! Lock-free counters for a mounted volume.
//!
//! Handlers record every VFS call, every host round trip and every failure.
//! The counters are relaxed atomics: they need to be cheap, not ordered.

use std::sync::atomic::{AtomicU64, Ordering};

/// Activity counters for one volume.
#[derive(Debug, Default)]
pub struct VolumeStats {
    /// VFS operations handled.
    pub ops: AtomicU64,
    /// Calls made to the shared-folder service.
    pub remote_calls: AtomicU64,
    /// Calls to the shared-folder service that failed.
    pub remote_errors: AtomicU64,
    /// Operations that returned an error to the VFS.
    pub errors: AtomicU64,
    /// Live nodes in the registry, root included.
    pub nodes: AtomicU64,
}

impl VolumeStats {
    /// Create new volume statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a VFS operation.
    #[inline]
    pub fn record_op(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call to the shared-folder service and whether it failed.
    #[inline]
    pub fn record_remote_call(&self, failed: bool) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.remote_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an error returned to the VFS.
    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the current node count.
    #[inline]
    pub fn set_node_count(&self, count: u64) {
        self.nodes.store(count, Ordering::Relaxed);
    }

    /// Create a snapshot of current values.
    pub fn snapshot(&self) -> VolumeStatsSnapshot {
        VolumeStatsSnapshot {
            ops: self.ops.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            nodes: self.nodes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`VolumeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeStatsSnapshot {
    /// VFS operations handled.
    pub ops: u64,
    /// Calls made to the shared-folder service.
    pub remote_calls: u64,
    /// Calls to the shared-folder service that failed.
    pub remote_errors: u64,
    /// Operations that returned an error to the VFS.
    pub errors: u64,
    /// Live nodes in the registry, root included.
    pub nodes: u64,
}
