//! Error handling and errno mapping for the shared-folder adapter.
//!
//! Every handler returns [`SharedFsResult`]. The VFS boundary turns a failure
//! into a POSIX error code with [`ToErrno`]; host failures keep the code the
//! host gave them.

use crate::remote::RemoteError;
use std::io;
use thiserror::Error;

/// Errors returned by node-registry and VFS operations.
#[derive(Debug, Error)]
pub enum SharedFsError {
    /// Bad argument from the VFS boundary (device path at mount, invalid name, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Identity or path allocation failed.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// The identity is not present in the node tree.
    #[error("Unknown node: {0}")]
    NodeNotFound(u64),

    /// Access check failed.
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path whose attributes refused the access.
        path: String,
    },

    /// Failure reported by the shared-folder service, passed through unchanged.
    #[error("Shared-folder service error: {0}")]
    Remote(#[from] RemoteError),
}

impl SharedFsError {
    /// Converts this error to a libc error code.
    pub fn to_errno(&self) -> i32 {
        match self {
            SharedFsError::InvalidArgument(_) => libc::EINVAL,
            SharedFsError::OutOfMemory(_) => libc::ENOMEM,
            SharedFsError::NodeNotFound(_) => libc::ENOENT,
            SharedFsError::PermissionDenied { .. } => libc::EACCES,
            SharedFsError::Remote(e) => e.to_errno(),
        }
    }

    /// Returns true for "no such entry", whether the tree or the host said so.
    pub fn is_not_found(&self) -> bool {
        match self {
            SharedFsError::NodeNotFound(_) => true,
            SharedFsError::Remote(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Result type for adapter operations.
pub type SharedFsResult<T> = Result<T, SharedFsError>;

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for SharedFsError {
    fn to_errno(&self) -> i32 {
        SharedFsError::to_errno(self)
    }
}

impl ToErrno for RemoteError {
    fn to_errno(&self) -> i32 {
        RemoteError::to_errno(self)
    }
}

impl ToErrno for io::Error {
    fn to_errno(&self) -> i32 {
        io_error_to_errno(self)
    }
}

/// Maps an IO error to its raw OS error, or EIO when it has none.
pub fn io_error_to_errno(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(libc::EIO)
}
