//! Volume configuration.
//!
//! The host exposes no quota or volume name, so the figures reported through
//! volume info are synthetic. A host can ship them as JSON; every field is
//! optional and falls back to its default.

use serde::{Deserialize, Serialize};

/// Default name reported for a mounted share.
pub const DEFAULT_VOLUME_NAME: &str = "Shared Folders";

/// Default reported capacity: 2 TiB.
pub const DEFAULT_TOTAL_CAPACITY: u64 = 2 * 1024 * 1024 * 1024 * 1024;

/// Default preferred I/O size.
pub const DEFAULT_IO_SIZE: u32 = 4096;

/// Configuration for a mounted shared-folder volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Name reported in volume info.
    pub volume_name: String,

    /// Capacity reported in volume info, in bytes. Not enforced.
    pub total_capacity: u64,

    /// Preferred I/O size reported in volume info.
    pub io_size: u32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            volume_name: DEFAULT_VOLUME_NAME.to_string(),
            total_capacity: DEFAULT_TOTAL_CAPACITY,
            io_size: DEFAULT_IO_SIZE,
        }
    }
}

impl VolumeConfig {
    /// Sets the reported volume name.
    #[must_use]
    pub fn volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = name.into();
        self
    }

    /// Sets the reported capacity in bytes.
    #[must_use]
    pub fn total_capacity(mut self, bytes: u64) -> Self {
        self.total_capacity = bytes;
        self
    }

    /// Sets the preferred I/O size.
    #[must_use]
    pub fn io_size(mut self, size: u32) -> Self {
        self.io_size = size;
        self
    }
}
