//! Contract with the host's shared-folder service.
//!
//! The service is stateless and addressed purely by path: it knows nothing
//! about node identities. Every call made by this crate goes through the
//! [`SharedFolders`] trait, so the transport (backdoor channel, RPC, test
//! fixture) stays outside the adapter.

use crate::attr::{RemoteAttrMask, RemoteAttributes};
use crate::path::SharePath;
use std::io;
use thiserror::Error;

/// Failures reported by the shared-folder service.
///
/// These are surfaced to the VFS boundary unchanged; the adapter never
/// retries or reinterprets them.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The path does not exist on the host.
    #[error("No such entry on host: {path}")]
    NotFound {
        /// Path that was queried.
        path: String,
    },

    /// The host refused the operation.
    #[error("Host denied access to {path}")]
    PermissionDenied {
        /// Path that was refused.
        path: String,
    },

    /// The destination of a move already exists.
    #[error("Entry already exists on host: {path}")]
    AlreadyExists {
        /// Conflicting path.
        path: String,
    },

    /// A directory could not be removed because it still has entries.
    #[error("Directory not empty on host: {path}")]
    NotEmpty {
        /// Directory path.
        path: String,
    },

    /// The service cannot be reached or failed its health check.
    #[error("Shared-folder service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something the adapter cannot use.
    #[error("Shared-folder protocol error: {0}")]
    Protocol(String),

    /// Transport-level IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RemoteError {
    /// Converts this error to a libc error code.
    pub fn to_errno(&self) -> i32 {
        match self {
            RemoteError::NotFound { .. } => libc::ENOENT,
            RemoteError::PermissionDenied { .. } => libc::EACCES,
            RemoteError::AlreadyExists { .. } => libc::EEXIST,
            RemoteError::NotEmpty { .. } => libc::ENOTEMPTY,
            RemoteError::Unavailable(_) => libc::EIO,
            RemoteError::Protocol(_) => libc::EPROTO,
            RemoteError::Io(e) => crate::error::io_error_to_errno(e),
        }
    }

    /// Returns true if the host reported that the entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Result type for shared-folder service calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Attributes of one host entry together with its directory flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStat {
    /// Permission bits, size and timestamps as the host reports them.
    pub attributes: RemoteAttributes,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Operations the adapter needs from the shared-folder service.
///
/// Implementations must be callable from several VFS threads at once. Calls
/// may block for a full host round trip; the adapter never holds its tree
/// lock while one is in flight.
pub trait SharedFolders: Send + Sync {
    /// Checks that the connection to the host is usable.
    ///
    /// Called exactly once, at mount time.
    fn init_check(&self) -> RemoteResult<()>;

    /// Queries the attributes of `path`.
    fn get_attributes(&self, path: &SharePath) -> RemoteResult<RemoteStat>;

    /// Checks that `path` exists without keeping its attributes.
    fn probe(&self, path: &SharePath) -> RemoteResult<()> {
        self.get_attributes(path).map(|_| ())
    }

    /// Writes the attribute fields named in `mask`; all other fields of
    /// `attributes` are ignored.
    fn set_attributes(
        &self,
        path: &SharePath,
        attributes: &RemoteAttributes,
        mask: RemoteAttrMask,
    ) -> RemoteResult<()>;

    /// Deletes the entry at `path`.
    fn delete_file(&self, path: &SharePath) -> RemoteResult<()>;

    /// Moves the entry at `from` to `to`.
    fn move_entry(&self, from: &SharePath, to: &SharePath) -> RemoteResult<()>;
}

impl<T: SharedFolders + ?Sized> SharedFolders for Box<T> {
    fn init_check(&self) -> RemoteResult<()> {
        (**self).init_check()
    }

    fn get_attributes(&self, path: &SharePath) -> RemoteResult<RemoteStat> {
        (**self).get_attributes(path)
    }

    fn probe(&self, path: &SharePath) -> RemoteResult<()> {
        (**self).probe(path)
    }

    fn set_attributes(
        &self,
        path: &SharePath,
        attributes: &RemoteAttributes,
        mask: RemoteAttrMask,
    ) -> RemoteResult<()> {
        (**self).set_attributes(path, attributes, mask)
    }

    fn delete_file(&self, path: &SharePath) -> RemoteResult<()> {
        (**self).delete_file(path)
    }

    fn move_entry(&self, from: &SharePath, to: &SharePath) -> RemoteResult<()> {
        (**self).move_entry(from, to)
    }
}
