//! The operation set the VFS boundary dispatches to a shared-folder volume.
//!
//! The host VFS owns the dispatch mechanism (callback tables, threads,
//! re-entrancy); this crate only implements [`VfsOperations`]. Every method
//! runs synchronously on the calling thread and may block for a host round
//! trip. Nothing is retried and nothing times out.

use crate::attr::{Metadata, S_IFDIR, S_IFMT, StatMask};
use crate::config::VolumeConfig;
use crate::error::SharedFsResult;
use crate::volume::{PublishedNode, VolumeInfo, VolumeInfoMask};
use bitflags::bitflags;

bitflags! {
    /// Access requested by an access check, in `access(2)` bit layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessMode: u32 {
        /// `R_OK`
        const READ = 4;
        /// `W_OK`
        const WRITE = 2;
        /// `X_OK`
        const EXECUTE = 1;
    }
}

impl AccessMode {
    /// Builds a mode from a raw `access(2)` mask, ignoring unknown bits.
    /// Negative masks request nothing.
    pub fn from_raw(mask: i32) -> Self {
        Self::from_bits_truncate(u32::try_from(mask).unwrap_or(0))
    }
}

/// Identity of the thread making a VFS call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Effective user ID.
    pub uid: u32,
}

impl Caller {
    /// Caller with the given effective user ID.
    pub fn new(uid: u32) -> Self {
        Self { uid }
    }

    /// Caller for the current thread's effective user ID.
    #[cfg(unix)]
    pub fn current() -> Self {
        Self::new(nix::unistd::geteuid().as_raw())
    }

    /// Caller for the current thread. Without Unix credentials every caller
    /// is treated as unprivileged.
    #[cfg(not(unix))]
    pub fn current() -> Self {
        Self::new(u32::MAX)
    }

    /// Returns true for the superuser.
    #[inline]
    pub fn is_privileged(&self) -> bool {
        self.uid == 0
    }
}

/// Type and permission bits of a node the VFS already holds an identity for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeType {
    /// File type and permission bits.
    pub mode: u32,
}

impl NodeType {
    /// Returns true for directories.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }
}

/// Callbacks the VFS boundary invokes on a mounted volume.
///
/// Node arguments are identities previously handed out by [`resolve`] or
/// [`root`]. Errors convert to errno with [`ToErrno`](crate::ToErrno).
///
/// [`resolve`]: VfsOperations::resolve
/// [`root`]: VfsOperations::root
pub trait VfsOperations: Sized {
    /// Collaborator the volume talks to.
    type Remote;

    /// Mounts a volume. `device` must be absent or empty.
    fn mount(device: Option<&str>, remote: Self::Remote, config: VolumeConfig)
    -> SharedFsResult<Self>;

    /// The root node published at mount time.
    fn root(&self) -> PublishedNode;

    /// Tears the volume down.
    fn unmount(self) -> SharedFsResult<()>;

    /// Synthetic capacity figures.
    fn volume_info(&self) -> VolumeInfo;

    /// Accepts a volume-info update. Nothing is persisted.
    fn write_volume_info(&self, info: &VolumeInfo, mask: VolumeInfoMask) -> SharedFsResult<()>;

    /// Resolves `name` inside the directory node `dir`.
    fn resolve(&self, dir: u64, name: &str) -> SharedFsResult<u64>;

    /// Classifies a node by identity.
    fn get_by_identity(&self, identity: u64) -> SharedFsResult<NodeType>;

    /// The node's own path segment.
    fn get_name(&self, identity: u64) -> SharedFsResult<String>;

    /// The VFS no longer needs the handle.
    fn forget(&self, identity: u64) -> SharedFsResult<()>;

    /// The entry behind the node is gone; detach it from the tree.
    fn remove(&self, identity: u64) -> SharedFsResult<()>;

    /// Deletes `name` inside `dir` on the host.
    fn unlink(&self, dir: u64, name: &str) -> SharedFsResult<()>;

    /// Moves `from_name` in `from_dir` to `to_name` in `to_dir` on the host.
    fn rename(&self, from_dir: u64, from_name: &str, to_dir: u64, to_name: &str)
    -> SharedFsResult<()>;

    /// Checks whether `caller` may access the node with `mode`.
    fn check_access(&self, identity: u64, caller: &Caller, mode: AccessMode)
    -> SharedFsResult<()>;

    /// Fresh metadata for the node.
    fn read_metadata(&self, identity: u64) -> SharedFsResult<Metadata>;

    /// Writes the metadata fields named in `mask`.
    fn write_metadata(&self, identity: u64, metadata: &Metadata, mask: StatMask)
    -> SharedFsResult<()>;
}
