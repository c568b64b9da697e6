//! In-memory shared-folder service.

use crate::attr::{Permissions, RemoteAttrMask, RemoteAttributes, unix_to_ticks};
use crate::path::SharePath;
use crate::remote::{RemoteError, RemoteResult, RemoteStat, SharedFolders};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Unix timestamp given to every entry created through the builders.
pub const DEFAULT_TIMESTAMP: i64 = 1_700_000_000;

/// One call received by a [`MemoryShare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `init_check`
    InitCheck,
    /// `get_attributes`
    GetAttributes(SharePath),
    /// `set_attributes`
    SetAttributes(SharePath, RemoteAttrMask),
    /// `delete_file`
    DeleteFile(SharePath),
    /// `move_entry`
    MoveEntry(SharePath, SharePath),
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<SharePath, RemoteStat>,
    failing: HashSet<SharePath>,
    init_fails: bool,
    calls: Vec<RemoteCall>,
}

impl State {
    fn stat(&self, path: &SharePath) -> RemoteResult<RemoteStat> {
        if self.failing.contains(path) {
            return Err(RemoteError::Unavailable("injected failure".to_string()));
        }
        self.entries
            .get(path)
            .copied()
            .ok_or_else(|| RemoteError::NotFound {
                path: path.to_string(),
            })
    }

    fn has_children(&self, path: &SharePath) -> bool {
        self.entries
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }
}

/// Shared-folder service backed by a map of paths.
///
/// Clones share the same state, so a test can keep one handle to seed and
/// inspect the share while the volume owns another.
#[derive(Debug, Clone)]
pub struct MemoryShare {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryShare {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryShare {
    /// Creates a share holding only its root directory.
    pub fn new() -> Self {
        let mut state = State::default();
        state
            .entries
            .insert(SharePath::root(), stat(Permissions::all(), 0, true));
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Adds or replaces a directory.
    pub fn add_dir(&self, path: impl AsRef<str>, permissions: Permissions) {
        self.insert(SharePath::new(path), stat(permissions, 0, true));
    }

    /// Adds or replaces a regular file.
    pub fn add_file(&self, path: impl AsRef<str>, permissions: Permissions, size: u64) {
        self.insert(SharePath::new(path), stat(permissions, size, false));
    }

    /// Adds or replaces an entry with explicit attributes.
    pub fn insert(&self, path: SharePath, entry: RemoteStat) {
        self.state.lock().entries.insert(path, entry);
    }

    /// Current host-side view of `path`, without logging a call.
    pub fn get(&self, path: impl AsRef<str>) -> Option<RemoteStat> {
        self.state
            .lock()
            .entries
            .get(&SharePath::new(path))
            .copied()
    }

    /// Makes the next and all later health checks fail.
    pub fn fail_init_check(&self) {
        self.state.lock().init_fails = true;
    }

    /// Makes every call touching `path` fail as unavailable.
    pub fn fail_path(&self, path: impl AsRef<str>) {
        self.state.lock().failing.insert(SharePath::new(path));
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.failing.clear();
        state.init_fails = false;
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of live handles onto this share's state.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.state)
    }
}

fn stat(permissions: Permissions, size: u64, is_dir: bool) -> RemoteStat {
    let ticks = unix_to_ticks(DEFAULT_TIMESTAMP);
    RemoteStat {
        attributes: RemoteAttributes {
            permissions,
            size,
            creation_time: ticks,
            access_time: ticks,
            write_time: ticks,
        },
        is_dir,
    }
}

impl SharedFolders for MemoryShare {
    fn init_check(&self) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::InitCheck);
        if state.init_fails {
            return Err(RemoteError::Unavailable("health check failed".to_string()));
        }
        Ok(())
    }

    fn get_attributes(&self, path: &SharePath) -> RemoteResult<RemoteStat> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::GetAttributes(path.clone()));
        state.stat(path)
    }

    fn set_attributes(
        &self,
        path: &SharePath,
        attributes: &RemoteAttributes,
        mask: RemoteAttrMask,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(RemoteCall::SetAttributes(path.clone(), mask));
        state.stat(path)?;

        let Some(entry) = state.entries.get_mut(path) else {
            return Err(RemoteError::NotFound {
                path: path.to_string(),
            });
        };
        let current = &mut entry.attributes;
        if mask.contains(RemoteAttrMask::PERMISSIONS) {
            current.permissions = attributes.permissions;
        }
        if mask.contains(RemoteAttrMask::SIZE) {
            current.size = attributes.size;
        }
        if mask.contains(RemoteAttrMask::ACCESS_TIME) {
            current.access_time = attributes.access_time;
        }
        if mask.contains(RemoteAttrMask::WRITE_TIME) {
            current.write_time = attributes.write_time;
        }
        if mask.contains(RemoteAttrMask::CREATION_TIME) {
            current.creation_time = attributes.creation_time;
        }
        Ok(())
    }

    fn delete_file(&self, path: &SharePath) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::DeleteFile(path.clone()));
        let entry = state.stat(path)?;
        if entry.is_dir && state.has_children(path) {
            return Err(RemoteError::NotEmpty {
                path: path.to_string(),
            });
        }
        state.entries.remove(path);
        Ok(())
    }

    fn move_entry(&self, from: &SharePath, to: &SharePath) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(RemoteCall::MoveEntry(from.clone(), to.clone()));
        state.stat(from)?;
        if state.failing.contains(to) {
            return Err(RemoteError::Unavailable("injected failure".to_string()));
        }
        if state.entries.get(to).is_some_and(|e| e.is_dir) {
            return Err(RemoteError::AlreadyExists {
                path: to.to_string(),
            });
        }

        let moved: Vec<SharePath> = state
            .entries
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = state.entries.remove(&old) {
                let suffix = old.components().skip(from.components().count());
                let mut new = to.clone();
                for component in suffix {
                    new = new.join(component);
                }
                state.entries.insert(new, entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_share_has_root() {
        let share = MemoryShare::new();
        let root = share.get("").unwrap();
        assert!(root.is_dir);
        assert_eq!(root.attributes.permissions, Permissions::all());
        assert_eq!(share.call_count(), 0);
    }

    #[test]
    fn test_set_attributes_honours_mask() {
        let share = MemoryShare::new();
        share.add_file("f", Permissions::READ, 7);
        let update = RemoteAttributes {
            size: 99,
            permissions: Permissions::all(),
            ..RemoteAttributes::default()
        };
        share
            .set_attributes(&SharePath::new("f"), &update, RemoteAttrMask::SIZE)
            .unwrap();
        let stored = share.get("f").unwrap();
        assert_eq!(stored.attributes.size, 99);
        assert_eq!(stored.attributes.permissions, Permissions::READ);
        assert_eq!(
            stored.attributes.write_time,
            unix_to_ticks(DEFAULT_TIMESTAMP)
        );
    }

    #[test]
    fn test_delete_non_empty_dir() {
        let share = MemoryShare::new();
        share.add_dir("d", Permissions::all());
        share.add_file("d/x", Permissions::READ, 0);
        let err = share.delete_file(&SharePath::new("d")).unwrap_err();
        assert!(matches!(err, RemoteError::NotEmpty { .. }));

        share.delete_file(&SharePath::new("d/x")).unwrap();
        share.delete_file(&SharePath::new("d")).unwrap();
        assert!(share.get("d").is_none());
    }

    #[test]
    fn test_move_rekeys_subtree() {
        let share = MemoryShare::new();
        share.add_dir("a", Permissions::all());
        share.add_file("a/b/c", Permissions::READ, 1);
        share.add_file("ab", Permissions::READ, 2);

        share
            .move_entry(&SharePath::new("a"), &SharePath::new("z"))
            .unwrap();
        assert!(share.get("a").is_none());
        assert!(share.get("z").is_some());
        assert_eq!(share.get("z/b/c").unwrap().attributes.size, 1);
        // Sibling with a shared prefix is not part of the subtree
        assert_eq!(share.get("ab").unwrap().attributes.size, 2);
    }

    #[test]
    fn test_move_onto_directory_fails() {
        let share = MemoryShare::new();
        share.add_file("f", Permissions::READ, 0);
        share.add_dir("d", Permissions::all());
        let err = share
            .move_entry(&SharePath::new("f"), &SharePath::new("d"))
            .unwrap_err();
        assert!(matches!(err, RemoteError::AlreadyExists { .. }));
    }

    #[test]
    fn test_failure_injection_and_heal() {
        let share = MemoryShare::new();
        share.add_file("f", Permissions::READ, 0);
        share.fail_path("f");
        share.fail_init_check();
        assert!(share.get_attributes(&SharePath::new("f")).is_err());
        assert!(share.init_check().is_err());

        share.heal();
        assert!(share.get_attributes(&SharePath::new("f")).is_ok());
        assert!(share.init_check().is_ok());
        assert_eq!(share.calls().len(), 4);
        assert_eq!(share.calls()[1], RemoteCall::InitCheck);
    }
}
