//! VFS adapter for host shared folders.
//!
//! This crate exposes a host-provided shared-folder service as a mountable
//! volume. The host addresses entries purely by path and knows nothing about
//! inodes, so the adapter keeps a tree of nodes with stable numeric
//! identities and translates between the host's coarse attributes and POSIX
//! metadata.
//!
//! # Features
//!
//! - Stable, never-recycled node identities per mount
//! - Fresh attributes on every query (the host directory can change underneath)
//! - Coarse read/write/execute permissions mapped to and from POSIX modes
//! - Host timestamps (100ns ticks since 1601) converted to Unix seconds
//! - Thread-safe concurrent access; no lock held across host calls
//! - Errors mapped to errno, host failures passed through unchanged
//!
//! # Usage
//!
//! ```ignore
//! use sharedfs::{SharedFolderVolume, VfsOperations, VolumeConfig};
//!
//! let volume = SharedFolderVolume::mount(None, channel, VolumeConfig::default())?;
//! let docs = volume.resolve(volume.root().identity, "docs")?;
//! let meta = volume.read_metadata(docs)?;
//! ```

#![warn(missing_docs)]

pub mod attr;
pub mod config;
pub mod error;
mod handlers;
pub mod node;
pub mod ops;
pub mod path;
pub mod remote;
pub mod stats;
pub mod testing;
pub mod volume;

pub use attr::{
    FAKE_BLOCK_SIZE, Metadata, Permissions, RemoteAttrMask, RemoteAttributes, StatMask,
};
pub use config::VolumeConfig;
pub use error::{SharedFsError, SharedFsResult, ToErrno};
pub use node::{NodeEntry, NodeRegistry, ROOT_IDENTITY};
pub use ops::{AccessMode, Caller, NodeType, VfsOperations};
pub use path::SharePath;
pub use remote::{RemoteError, RemoteResult, RemoteStat, SharedFolders};
pub use stats::{VolumeStats, VolumeStatsSnapshot};
pub use volume::{PublishedNode, SharedFolderVolume, VolumeFlags, VolumeInfo, VolumeInfoMask};
