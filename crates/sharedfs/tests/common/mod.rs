//! Shared harness for volume integration tests.
//!
//! Provides `TestVolume`, a mounted volume paired with a handle onto its
//! in-memory share so tests can seed and inspect the host side.

// Not all tests use all TestVolume methods
#![allow(dead_code)]

use sharedfs::testing::MemoryShare;
use sharedfs::{
    Metadata, ROOT_IDENTITY, SharedFolderVolume, SharedFsResult, VfsOperations, VolumeConfig,
};
use std::sync::Once;

static TRACING_ONCE: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`, once per test process.
pub fn init_tracing() {
    TRACING_ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A mounted share for testing.
pub struct TestVolume {
    pub share: MemoryShare,
    pub volume: SharedFolderVolume<MemoryShare>,
}

impl TestVolume {
    /// Mount an empty share with the default configuration.
    pub fn new() -> Self {
        Self::with_share(MemoryShare::new())
    }

    /// Mount an already seeded share.
    pub fn with_share(share: MemoryShare) -> Self {
        init_tracing();
        let volume = SharedFolderVolume::mount(None, share.clone(), VolumeConfig::default())
            .expect("mount failed");
        Self { share, volume }
    }

    /// Resolve a slash-separated path from the root, one segment at a time.
    pub fn lookup(&self, path: &str) -> SharedFsResult<u64> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(ROOT_IDENTITY, |dir, name| self.volume.resolve(dir, name))
    }

    /// Resolve then read metadata.
    pub fn stat(&self, path: &str) -> SharedFsResult<Metadata> {
        let identity = self.lookup(path)?;
        self.volume.read_metadata(identity)
    }
}
