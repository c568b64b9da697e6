//! Testing utilities for shared-folder volumes.
//!
//! This module provides shared test infrastructure for unit and integration
//! tests. It includes:
//!
//! - **Share**: [`MemoryShare`], an in-memory [`SharedFolders`](crate::SharedFolders)
//!   with failure injection and a call log
//! - **Assertions**: errno checks with helpful failure messages
//!
//! # Usage
//!
//! ```
//! use sharedfs::testing::MemoryShare;
//! use sharedfs::{Permissions, SharedFolderVolume, VfsOperations, VolumeConfig, ROOT_IDENTITY};
//!
//! let share = MemoryShare::new();
//! share.add_dir("docs", Permissions::all());
//!
//! let volume = SharedFolderVolume::mount(None, share, VolumeConfig::default()).unwrap();
//! let docs = volume.resolve(ROOT_IDENTITY, "docs").unwrap();
//! assert!(volume.get_by_identity(docs).unwrap().is_dir());
//! ```

pub mod assertions;
pub mod share;

pub use assertions::{assert_errno, assert_not_found};
pub use share::{DEFAULT_TIMESTAMP, MemoryShare, RemoteCall};
