//! Volume lifecycle: mount, unmount and volume info.
//!
//! A [`SharedFolderVolume`] is the context object every handler runs against.
//! It owns the host connection and the node tree, and exists exactly between
//! a successful mount and the matching unmount.

use crate::attr::{FAKE_BLOCK_SIZE, S_IFDIR};
use crate::config::VolumeConfig;
use crate::error::{SharedFsError, SharedFsResult};
use crate::node::NodeRegistry;
use crate::remote::{RemoteResult, SharedFolders};
use crate::stats::{VolumeStats, VolumeStatsSnapshot};
use bitflags::bitflags;
use std::sync::Arc;
use tracing::{debug, info};

/// Mode published for the root: a directory open to everyone.
pub const ROOT_MODE: u32 = S_IFDIR | 0o777;

bitflags! {
    /// Volume capability flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VolumeFlags: u32 {
        /// Contents survive an unmount.
        const PERSISTENT = 0x0001;
    }
}

bitflags! {
    /// Volume-info fields named by a write request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VolumeInfoMask: u32 {
        /// Volume name.
        const NAME = 0x0001;
    }
}

/// Node handed to the VFS when a volume is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedNode {
    /// Node identity.
    pub identity: u64,
    /// File type and permission bits.
    pub mode: u32,
}

/// Capacity and naming figures for a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Capability flags.
    pub flags: VolumeFlags,
    /// Block size used for all block figures.
    pub block_size: u32,
    /// Preferred I/O size.
    pub io_size: u32,
    /// Total blocks.
    pub total_blocks: u64,
    /// Free blocks.
    pub free_blocks: u64,
    /// Total nodes.
    pub total_nodes: u64,
    /// Free nodes.
    pub free_nodes: u64,
    /// Backing device; always empty.
    pub device_name: String,
    /// Volume name.
    pub volume_name: String,
}

/// A mounted shared folder.
pub struct SharedFolderVolume<R> {
    pub(crate) remote: R,
    pub(crate) registry: NodeRegistry,
    pub(crate) config: VolumeConfig,
    pub(crate) stats: Arc<VolumeStats>,
}

impl<R: SharedFolders> SharedFolderVolume<R> {
    /// Mounts a shared folder.
    ///
    /// Rejects a non-empty device argument, then checks the host connection.
    /// The node tree is only created once the connection is known good, so a
    /// failed mount leaves nothing behind.
    pub fn mount_with(
        device: Option<&str>,
        remote: R,
        config: VolumeConfig,
    ) -> SharedFsResult<Self> {
        if let Some(device) = device.filter(|d| !d.is_empty()) {
            return Err(SharedFsError::InvalidArgument(format!(
                "shared folders are not device-backed: {device}"
            )));
        }

        remote.init_check().inspect_err(|e| {
            debug!(error = %e, "shared-folder service failed its health check");
        })?;

        let registry = NodeRegistry::new();
        let stats = Arc::new(VolumeStats::new());
        stats.set_node_count(registry.len() as u64);

        info!(
            volume = %config.volume_name,
            root = registry.root_identity(),
            "shared folder mounted"
        );
        Ok(Self {
            remote,
            registry,
            config,
            stats,
        })
    }

    /// Identity of the root node; also the volume's device identity.
    #[inline]
    pub fn root_identity(&self) -> u64 {
        self.registry.root_identity()
    }

    /// The root node as published to the VFS.
    pub fn published_root(&self) -> PublishedNode {
        PublishedNode {
            identity: self.root_identity(),
            mode: ROOT_MODE,
        }
    }

    /// Synthetic capacity figures. The host reports no quota.
    pub fn info(&self) -> VolumeInfo {
        let block_size = FAKE_BLOCK_SIZE;
        let total_blocks = self.config.total_capacity / u64::from(block_size);
        VolumeInfo {
            flags: VolumeFlags::PERSISTENT,
            block_size,
            io_size: self.config.io_size,
            total_blocks,
            free_blocks: total_blocks,
            total_nodes: u64::from(block_size),
            free_nodes: u64::from(block_size),
            device_name: String::new(),
            volume_name: self.config.volume_name.clone(),
        }
    }

    /// Node tree of this volume.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Shared handle to the volume's counters.
    pub fn stats(&self) -> Arc<VolumeStats> {
        Arc::clone(&self.stats)
    }

    /// Current counter values.
    pub fn stats_snapshot(&self) -> VolumeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Volume configuration.
    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Releases the node tree and the host connection.
    pub fn teardown(self) {
        let nodes = self.registry.len();
        let Self {
            remote, registry, ..
        } = self;
        drop(registry);
        drop(remote);
        info!(nodes = nodes, "shared folder unmounted");
    }

    /// Runs one host call, counting it and logging a failure.
    pub(crate) fn remote_call<T>(
        &self,
        op: &'static str,
        call: impl FnOnce(&R) -> RemoteResult<T>,
    ) -> SharedFsResult<T> {
        let result = call(&self.remote);
        self.stats.record_remote_call(result.is_err());
        result.map_err(|e| {
            debug!(op = op, error = %e, errno = e.to_errno(), "shared-folder call failed");
            SharedFsError::from(e)
        })
    }

    /// Counts a finished VFS operation and logs its failure.
    pub(crate) fn finish<T>(
        &self,
        op: &'static str,
        result: SharedFsResult<T>,
    ) -> SharedFsResult<T> {
        self.stats.record_op();
        if let Err(e) = &result {
            self.stats.record_error();
            debug!(op = op, error = %e, errno = e.to_errno(), "operation failed");
        }
        result
    }

    /// Publishes the current node count.
    pub(crate) fn update_node_count(&self) {
        self.stats.set_node_count(self.registry.len() as u64);
    }
}
