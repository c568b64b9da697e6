//! VFS handlers for a mounted shared folder.
//!
//! Each handler follows the same shape: resolve identities to paths under the
//! tree lock, drop the lock, make the host call(s), then translate the result.
//! Attributes are fetched fresh on every call because the host directory can
//! change underneath us at any time.
//!
//! # Operation notes
//!
//! | Operation | Host calls | Tree effect |
//! |-----------|------------|-------------|
//! | resolve | probe | creates the child node on success |
//! | get_by_identity | get_attributes | none |
//! | forget | none | none |
//! | remove | none | detaches the node and its subtree |
//! | unlink | delete_file | none (converges via later resolve/remove) |
//! | rename | move_entry | none (converges via later resolve/remove) |
//! | check_access | get_attributes | none |
//! | read_metadata | get_attributes | none |
//! | write_metadata | set_attributes | none |

use crate::attr::{self, Metadata, Permissions, StatMask};
use crate::config::VolumeConfig;
use crate::error::{SharedFsError, SharedFsResult};
use crate::ops::{AccessMode, Caller, NodeType, VfsOperations};
use crate::remote::SharedFolders;
use crate::volume::{PublishedNode, SharedFolderVolume, VolumeInfo, VolumeInfoMask};
use tracing::{debug, trace, warn};

impl<R: SharedFolders> SharedFolderVolume<R> {
    fn resolve_inner(&self, dir: u64, name: &str) -> SharedFsResult<u64> {
        match name {
            "." => Ok(self.registry.resolve_by_identity(dir)?.identity),
            ".." => Ok(self.registry.container_of(dir)?.unwrap_or(dir)),
            _ => {
                let path = self.registry.child_path(dir, name)?;
                // Only register names the host confirms.
                self.remote_call("probe", |r| r.probe(&path))?;
                let identity = self.registry.resolve_child(dir, name)?;
                self.update_node_count();
                Ok(identity)
            }
        }
    }

    fn get_by_identity_inner(&self, identity: u64) -> SharedFsResult<NodeType> {
        let path = self.registry.path_of(identity)?;
        let stat = self.remote_call("get_attributes", |r| r.get_attributes(&path))?;
        Ok(NodeType {
            mode: attr::mode_bits(stat.attributes.permissions, stat.is_dir),
        })
    }

    fn remove_inner(&self, identity: u64) -> SharedFsResult<()> {
        self.registry.detach(identity)?;
        self.update_node_count();
        Ok(())
    }

    fn unlink_inner(&self, dir: u64, name: &str) -> SharedFsResult<()> {
        let path = self.registry.child_path(dir, name)?;
        self.remote_call("delete_file", |r| r.delete_file(&path))
    }

    fn rename_inner(
        &self,
        from_dir: u64,
        from_name: &str,
        to_dir: u64,
        to_name: &str,
    ) -> SharedFsResult<()> {
        let from = self.registry.child_path(from_dir, from_name)?;
        let to = self.registry.child_path(to_dir, to_name)?;
        self.remote_call("move_entry", |r| r.move_entry(&from, &to))
    }

    fn check_access_inner(
        &self,
        identity: u64,
        caller: &Caller,
        mode: AccessMode,
    ) -> SharedFsResult<()> {
        let path = self.registry.path_of(identity)?;
        let stat = self.remote_call("get_attributes", |r| r.get_attributes(&path))?;
        let granted = stat.attributes.permissions;

        // The superuser gets everything except execute on a non-executable entry.
        if caller.is_privileged()
            && (!mode.contains(AccessMode::EXECUTE) || granted.contains(Permissions::EXECUTE))
        {
            return Ok(());
        }

        let denied = (mode.contains(AccessMode::READ) && !granted.contains(Permissions::READ))
            || (mode.contains(AccessMode::WRITE) && !granted.contains(Permissions::WRITE))
            || (mode.contains(AccessMode::EXECUTE) && !granted.contains(Permissions::EXECUTE));
        if denied {
            return Err(SharedFsError::PermissionDenied {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn read_metadata_inner(&self, identity: u64) -> SharedFsResult<Metadata> {
        let path = self.registry.path_of(identity)?;
        let stat = self.remote_call("get_attributes", |r| r.get_attributes(&path))?;
        Ok(attr::to_metadata(
            &stat.attributes,
            stat.is_dir,
            identity,
            self.root_identity(),
        ))
    }

    fn write_metadata_inner(
        &self,
        identity: u64,
        metadata: &Metadata,
        mask: StatMask,
    ) -> SharedFsResult<()> {
        let path = self.registry.path_of(identity)?;
        if mask.intersects(StatMask::UID | StatMask::GID) {
            debug!(path = %path, "ownership changes are not stored by the host");
        }
        let (attributes, remote_mask) = attr::to_attribute_update(metadata, mask);
        self.remote_call("set_attributes", |r| {
            r.set_attributes(&path, &attributes, remote_mask)
        })
    }
}

impl<R: SharedFolders> VfsOperations for SharedFolderVolume<R> {
    type Remote = R;

    fn mount(device: Option<&str>, remote: R, config: VolumeConfig) -> SharedFsResult<Self> {
        Self::mount_with(device, remote, config)
    }

    fn root(&self) -> PublishedNode {
        self.published_root()
    }

    fn unmount(self) -> SharedFsResult<()> {
        self.teardown();
        Ok(())
    }

    fn volume_info(&self) -> VolumeInfo {
        trace!("volume_info");
        self.stats.record_op();
        self.info()
    }

    fn write_volume_info(&self, info: &VolumeInfo, mask: VolumeInfoMask) -> SharedFsResult<()> {
        if mask.contains(VolumeInfoMask::NAME) {
            warn!(
                requested = %info.volume_name,
                "volume names are not persisted; keeping {}",
                self.config.volume_name
            );
        }
        self.finish("write_volume_info", Ok(()))
    }

    fn resolve(&self, dir: u64, name: &str) -> SharedFsResult<u64> {
        trace!(dir = dir, name = name, "resolve");
        self.finish("resolve", self.resolve_inner(dir, name))
    }

    fn get_by_identity(&self, identity: u64) -> SharedFsResult<NodeType> {
        trace!(identity = identity, "get_by_identity");
        self.finish("get_by_identity", self.get_by_identity_inner(identity))
    }

    fn get_name(&self, identity: u64) -> SharedFsResult<String> {
        trace!(identity = identity, "get_name");
        self.finish("get_name", self.registry.name_of(identity))
    }

    fn forget(&self, identity: u64) -> SharedFsResult<()> {
        // Forgetting a handle is not deletion; the node stays until `remove`.
        trace!(identity = identity, "forget");
        self.finish("forget", Ok(()))
    }

    fn remove(&self, identity: u64) -> SharedFsResult<()> {
        trace!(identity = identity, "remove");
        self.finish("remove", self.remove_inner(identity))
    }

    fn unlink(&self, dir: u64, name: &str) -> SharedFsResult<()> {
        trace!(dir = dir, name = name, "unlink");
        self.finish("unlink", self.unlink_inner(dir, name))
    }

    fn rename(
        &self,
        from_dir: u64,
        from_name: &str,
        to_dir: u64,
        to_name: &str,
    ) -> SharedFsResult<()> {
        trace!(
            from_dir = from_dir,
            from_name = from_name,
            to_dir = to_dir,
            to_name = to_name,
            "rename"
        );
        self.finish(
            "rename",
            self.rename_inner(from_dir, from_name, to_dir, to_name),
        )
    }

    fn check_access(
        &self,
        identity: u64,
        caller: &Caller,
        mode: AccessMode,
    ) -> SharedFsResult<()> {
        trace!(identity = identity, uid = caller.uid, mode = ?mode, "check_access");
        self.finish(
            "check_access",
            self.check_access_inner(identity, caller, mode),
        )
    }

    fn read_metadata(&self, identity: u64) -> SharedFsResult<Metadata> {
        trace!(identity = identity, "read_metadata");
        self.finish("read_metadata", self.read_metadata_inner(identity))
    }

    fn write_metadata(
        &self,
        identity: u64,
        metadata: &Metadata,
        mask: StatMask,
    ) -> SharedFsResult<()> {
        trace!(identity = identity, mask = ?mask, "write_metadata");
        self.finish(
            "write_metadata",
            self.write_metadata_inner(identity, metadata, mask),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{FAKE_BLOCK_SIZE, S_IFDIR, S_IFREG, unix_to_ticks};
    use crate::node::ROOT_IDENTITY;
    use crate::testing::MemoryShare;

    fn mounted(share: &MemoryShare) -> SharedFolderVolume<MemoryShare> {
        SharedFolderVolume::mount(None, share.clone(), VolumeConfig::default()).unwrap()
    }

    #[test]
    fn test_resolve_registers_only_existing_names() {
        let share = MemoryShare::new();
        share.add_file("present.txt", Permissions::READ, 3);
        let volume = mounted(&share);

        let id = volume.resolve(ROOT_IDENTITY, "present.txt").unwrap();
        assert_ne!(id, ROOT_IDENTITY);

        let err = volume.resolve(ROOT_IDENTITY, "absent.txt").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_errno(), libc::ENOENT);
        // root + present.txt only
        assert_eq!(volume.registry().len(), 2);
    }

    #[test]
    fn test_resolve_dot_entries() {
        let share = MemoryShare::new();
        share.add_dir("docs", Permissions::all());
        let volume = mounted(&share);

        let docs = volume.resolve(ROOT_IDENTITY, "docs").unwrap();
        let calls = share.call_count();
        assert_eq!(volume.resolve(docs, ".").unwrap(), docs);
        assert_eq!(volume.resolve(docs, "..").unwrap(), ROOT_IDENTITY);
        assert_eq!(volume.resolve(ROOT_IDENTITY, "..").unwrap(), ROOT_IDENTITY);
        assert_eq!(share.call_count(), calls, "dot entries never reach the host");
    }

    #[test]
    fn test_resolve_invalid_name() {
        let share = MemoryShare::new();
        let volume = mounted(&share);
        let err = volume.resolve(ROOT_IDENTITY, "a/b").unwrap_err();
        assert_eq!(err.to_errno(), libc::EINVAL);
        assert_eq!(share.call_count(), 1, "only the mount health check");
    }

    #[test]
    fn test_get_by_identity() {
        let share = MemoryShare::new();
        share.add_dir("d", Permissions::READ | Permissions::EXECUTE);
        share.add_file("f", Permissions::READ | Permissions::WRITE, 1);
        let volume = mounted(&share);

        let d = volume.resolve(ROOT_IDENTITY, "d").unwrap();
        let f = volume.resolve(ROOT_IDENTITY, "f").unwrap();

        assert_eq!(volume.get_by_identity(d).unwrap().mode, S_IFDIR | 0o555);
        assert_eq!(volume.get_by_identity(f).unwrap().mode, S_IFREG | 0o644);
        assert!(volume.get_by_identity(999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_name() {
        let share = MemoryShare::new();
        share.add_file("name.txt", Permissions::READ, 0);
        let volume = mounted(&share);
        let id = volume.resolve(ROOT_IDENTITY, "name.txt").unwrap();
        assert_eq!(volume.get_name(id).unwrap(), "name.txt");
        assert_eq!(volume.get_name(ROOT_IDENTITY).unwrap(), "");
    }

    #[test]
    fn test_forget_keeps_node() {
        let share = MemoryShare::new();
        share.add_file("keep", Permissions::READ, 0);
        let volume = mounted(&share);
        let id = volume.resolve(ROOT_IDENTITY, "keep").unwrap();

        volume.forget(id).unwrap();
        assert!(volume.registry().contains(id));
        assert_eq!(volume.resolve(ROOT_IDENTITY, "keep").unwrap(), id);
        // Unknown identities are acknowledged too
        volume.forget(12345).unwrap();
    }

    #[test]
    fn test_remove_detaches_without_host_call() {
        let share = MemoryShare::new();
        share.add_dir("dir", Permissions::all());
        share.add_file("dir/inner", Permissions::READ, 0);
        let volume = mounted(&share);

        let dir = volume.resolve(ROOT_IDENTITY, "dir").unwrap();
        let inner = volume.resolve(dir, "inner").unwrap();
        let calls = share.call_count();

        volume.remove(dir).unwrap();
        assert_eq!(share.call_count(), calls);
        assert!(!volume.registry().contains(dir));
        assert!(!volume.registry().contains(inner));
        assert!(share.get("dir/inner").is_some(), "host entry untouched");
        assert_eq!(volume.stats_snapshot().nodes, 1);
    }

    #[test]
    fn test_remove_root_refused() {
        let volume = mounted(&MemoryShare::new());
        assert_eq!(
            volume.remove(ROOT_IDENTITY).unwrap_err().to_errno(),
            libc::EINVAL
        );
    }

    #[test]
    fn test_remove_traces_on_entry() {
        use parking_lot::Mutex;
        use std::io;
        use std::sync::Arc;

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let volume = mounted(&MemoryShare::new());
        // A refused removal is still logged when it arrives
        let result =
            tracing::subscriber::with_default(subscriber, || volume.remove(ROOT_IDENTITY));
        assert!(result.is_err());

        let output = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(
            output.contains(&format!("remove identity={ROOT_IDENTITY}")),
            "missing entry trace in: {output}"
        );
    }

    #[test]
    fn test_unlink_then_remove() {
        let share = MemoryShare::new();
        share.add_file("old.log", Permissions::all(), 10);
        let volume = mounted(&share);
        let id = volume.resolve(ROOT_IDENTITY, "old.log").unwrap();

        volume.unlink(ROOT_IDENTITY, "old.log").unwrap();
        assert!(share.get("old.log").is_none());
        // Tree converges lazily
        assert!(volume.registry().contains(id));
        assert!(volume.resolve(ROOT_IDENTITY, "old.log").unwrap_err().is_not_found());
        volume.remove(id).unwrap();
        assert!(!volume.registry().contains(id));
    }

    #[test]
    fn test_unlink_missing_passes_host_error_through() {
        let share = MemoryShare::new();
        let volume = mounted(&share);
        let err = volume.unlink(ROOT_IDENTITY, "ghost").unwrap_err();
        assert!(matches!(err, SharedFsError::Remote(_)));
        assert_eq!(err.to_errno(), libc::ENOENT);
    }

    #[test]
    fn test_rename_does_not_touch_tree() {
        let share = MemoryShare::new();
        share.add_file("a.txt", Permissions::all(), 1);
        share.add_dir("sub", Permissions::all());
        let volume = mounted(&share);
        let a = volume.resolve(ROOT_IDENTITY, "a.txt").unwrap();
        let sub = volume.resolve(ROOT_IDENTITY, "sub").unwrap();

        volume.rename(ROOT_IDENTITY, "a.txt", sub, "b.txt").unwrap();
        assert!(share.get("a.txt").is_none());
        assert!(share.get("sub/b.txt").is_some());
        assert_eq!(volume.get_name(a).unwrap(), "a.txt");
        assert_eq!(volume.registry().len(), 3);
    }

    #[test]
    fn test_access_checks_each_bit() {
        let share = MemoryShare::new();
        share.add_file("ro", Permissions::READ, 0);
        let volume = mounted(&share);
        let ro = volume.resolve(ROOT_IDENTITY, "ro").unwrap();
        let user = Caller::new(1000);

        volume.check_access(ro, &user, AccessMode::READ).unwrap();
        volume.check_access(ro, &user, AccessMode::empty()).unwrap();
        for mode in [
            AccessMode::WRITE,
            AccessMode::EXECUTE,
            AccessMode::READ | AccessMode::WRITE,
        ] {
            let err = volume.check_access(ro, &user, mode).unwrap_err();
            assert_eq!(err.to_errno(), libc::EACCES, "{mode:?}");
        }
    }

    #[test]
    fn test_access_privileged_bypass() {
        let share = MemoryShare::new();
        share.add_file("locked", Permissions::empty(), 0);
        share.add_file("tool", Permissions::EXECUTE, 0);
        let volume = mounted(&share);
        let locked = volume.resolve(ROOT_IDENTITY, "locked").unwrap();
        let tool = volume.resolve(ROOT_IDENTITY, "tool").unwrap();
        let root = Caller::new(0);

        volume
            .check_access(locked, &root, AccessMode::READ | AccessMode::WRITE)
            .unwrap();
        // Execute still needs the execute bit, even for the superuser
        assert!(
            volume
                .check_access(locked, &root, AccessMode::EXECUTE)
                .is_err()
        );
        volume
            .check_access(tool, &root, AccessMode::all())
            .unwrap();
    }

    #[test]
    fn test_read_metadata_is_fresh() {
        let share = MemoryShare::new();
        share.add_file("f", Permissions::READ, 10);
        let volume = mounted(&share);
        let f = volume.resolve(ROOT_IDENTITY, "f").unwrap();

        assert_eq!(volume.read_metadata(f).unwrap().size, 10);
        // The host changes the entry behind our back
        share.add_file("f", Permissions::READ | Permissions::WRITE, 2000);
        let meta = volume.read_metadata(f).unwrap();
        assert_eq!(meta.size, 2000);
        assert_eq!(meta.blocks, 2000_u64.div_ceil(u64::from(FAKE_BLOCK_SIZE)));
        assert_eq!(meta.mode, S_IFREG | 0o644);
        assert_eq!(meta.ino, f);
        assert_eq!(meta.dev, ROOT_IDENTITY);
    }

    #[test]
    fn test_write_metadata_times_and_mode() {
        let share = MemoryShare::new();
        share.add_file("t", Permissions::READ, 0);
        let volume = mounted(&share);
        let t = volume.resolve(ROOT_IDENTITY, "t").unwrap();

        let update = Metadata {
            mode: S_IFREG | 0o700,
            mtime: 1_234_567_890,
            ..Metadata::default()
        };
        volume
            .write_metadata(t, &update, StatMask::MODE | StatMask::MTIME)
            .unwrap();

        let stored = share.get("t").unwrap();
        assert_eq!(stored.attributes.permissions, Permissions::all());
        assert_eq!(stored.attributes.write_time, unix_to_ticks(1_234_567_890));

        let meta = volume.read_metadata(t).unwrap();
        assert_eq!(meta.mtime, 1_234_567_890);
        assert_eq!(meta.mode, S_IFREG | 0o755);
    }

    #[test]
    fn test_write_metadata_creation_time_from_ctime() {
        let share = MemoryShare::new();
        share.add_file("c", Permissions::READ, 0);
        let volume = mounted(&share);
        let c = volume.resolve(ROOT_IDENTITY, "c").unwrap();

        let update = Metadata {
            ctime: 1_500_000_000,
            crtime: 0,
            ..Metadata::default()
        };
        volume.write_metadata(c, &update, StatMask::CRTIME).unwrap();

        let meta = volume.read_metadata(c).unwrap();
        assert_eq!(meta.ctime, 1_500_000_000);
        assert_eq!(meta.crtime, 1_500_000_000);
    }

    #[test]
    fn test_write_metadata_ownership_only_writes_nothing() {
        let share = MemoryShare::new();
        share.add_file("o", Permissions::READ, 5);
        let before = share.get("o").unwrap();
        let volume = mounted(&share);
        let o = volume.resolve(ROOT_IDENTITY, "o").unwrap();

        let update = Metadata {
            uid: 501,
            gid: 20,
            ..Metadata::default()
        };
        volume
            .write_metadata(o, &update, StatMask::UID | StatMask::GID)
            .unwrap();
        assert_eq!(share.get("o").unwrap(), before);
    }

    #[test]
    fn test_host_failure_is_counted() {
        let share = MemoryShare::new();
        share.add_file("flaky", Permissions::READ, 0);
        let volume = mounted(&share);
        let flaky = volume.resolve(ROOT_IDENTITY, "flaky").unwrap();

        share.fail_path("flaky");
        let err = volume.read_metadata(flaky).unwrap_err();
        assert_eq!(err.to_errno(), libc::EIO);

        let stats = volume.stats_snapshot();
        assert_eq!(stats.remote_errors, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_write_volume_info_is_accepted_and_ignored() {
        let volume = mounted(&MemoryShare::new());
        let mut info = volume.volume_info();
        info.volume_name = "renamed".to_string();
        volume
            .write_volume_info(&info, VolumeInfoMask::NAME)
            .unwrap();
        assert_eq!(volume.volume_info().volume_name, "Shared Folders");
    }

    #[test]
    fn test_unmount() {
        let share = MemoryShare::new();
        let volume = mounted(&share);
        volume.unmount().unwrap();
        assert_eq!(share.handle_count(), 1);
    }
}
