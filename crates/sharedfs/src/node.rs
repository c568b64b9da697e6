//! Node registry: stable identities for shared-folder paths.
//!
//! The host has no inode concept, so every path segment the VFS touches gets a
//! node with a process-unique numeric identity. Nodes form an owned tree: a
//! parent's `children` map is the only owner of a child, and each child keeps
//! the identity of its container as a non-owning back-reference. Removing a
//! node drops its whole subtree.
//!
//! # Locking
//!
//! The whole tree sits behind one `parking_lot::RwLock`. Mutations are rare
//! (first lookup of a name, removal), so a single tree-wide lock is enough.
//! Path reconstruction walks the parent chain under the read lock, so it never
//! sees a half-detached ancestor. Callers must release every guard before
//! talking to the host; no method here hands a guard out.

use crate::error::{SharedFsError, SharedFsResult};
use crate::path::SharePath;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Identity of the root node (FUSE convention).
pub const ROOT_IDENTITY: u64 = 1;

/// First identity handed to a non-root node.
const FIRST_IDENTITY: u64 = 2;

/// One path segment in the tree.
#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<u64>,
    children: HashMap<String, u64>,
}

impl Node {
    fn new(name: String, parent: Option<u64>) -> Self {
        Self {
            name,
            parent,
            children: HashMap::new(),
        }
    }
}

/// Snapshot of a node, detached from the tree lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    /// Stable identity.
    pub identity: u64,
    /// Path segment; empty for the root.
    pub name: String,
    /// Identity of the containing node; `None` for the root.
    pub parent: Option<u64>,
}

impl NodeEntry {
    /// Returns true if this is the root node.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug)]
struct Tree {
    nodes: HashMap<u64, Node>,
    next_identity: u64,
}

impl Tree {
    fn node(&self, identity: u64) -> SharedFsResult<&Node> {
        self.nodes
            .get(&identity)
            .ok_or(SharedFsError::NodeNotFound(identity))
    }

    fn allocate_identity(&mut self) -> SharedFsResult<u64> {
        let identity = self.next_identity;
        self.next_identity = identity.checked_add(1).ok_or_else(|| {
            SharedFsError::OutOfMemory("node identity space exhausted".to_string())
        })?;
        Ok(identity)
    }

    fn path_of(&self, identity: u64) -> SharedFsResult<SharePath> {
        let mut names = Vec::new();
        let mut current = self.node(identity)?;
        while let Some(parent) = current.parent {
            names.push(current.name.as_str());
            // A live node's parent is always live; a miss means the tree is corrupt.
            current = self.node(parent)?;
        }
        Ok(SharePath::from_components(names.into_iter().rev()))
    }

    /// Unlinks `name` from `parent` and drops the child's subtree.
    /// Returns the number of nodes dropped.
    fn remove_child(&mut self, parent: u64, name: &str) -> SharedFsResult<usize> {
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(SharedFsError::NodeNotFound(parent))?;
        let Some(child) = parent_node.children.remove(name) else {
            return Ok(0);
        };

        let mut removed = 0;
        let mut pending = vec![child];
        while let Some(identity) = pending.pop() {
            if let Some(node) = self.nodes.remove(&identity) {
                pending.extend(node.children.into_values());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Rejects names that cannot be a single path segment.
///
/// `.` and `..` are handled by the VFS handlers and never stored.
pub fn validate_name(name: &str) -> SharedFsResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(SharedFsError::InvalidArgument(format!(
            "not a path segment: {name:?}"
        )));
    }
    if name.contains(['/', '\0']) {
        return Err(SharedFsError::InvalidArgument(format!(
            "name contains a separator: {name:?}"
        )));
    }
    Ok(())
}

/// Thread-safe tree of nodes keyed by identity.
///
/// Identities are never reused while the registry lives, even after the node
/// that held one is removed.
#[derive(Debug)]
pub struct NodeRegistry {
    tree: RwLock<Tree>,
}

impl NodeRegistry {
    /// Creates a registry holding only the root node.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_IDENTITY, Node::new(String::new(), None));
        Self {
            tree: RwLock::new(Tree {
                nodes,
                next_identity: FIRST_IDENTITY,
            }),
        }
    }

    /// Returns the root identity.
    #[inline]
    pub fn root_identity(&self) -> u64 {
        ROOT_IDENTITY
    }

    /// Returns the child `name` of `parent`, creating it on first reference.
    ///
    /// Resolving the same name twice without a removal in between returns the
    /// same identity.
    pub fn resolve_child(&self, parent: u64, name: &str) -> SharedFsResult<u64> {
        validate_name(name)?;

        // Fast path: already known
        {
            let tree = self.tree.read();
            if let Some(&child) = tree.node(parent)?.children.get(name) {
                return Ok(child);
            }
        }

        let mut tree = self.tree.write();
        // Re-check under the write lock: another thread may have won the race,
        // or the parent may have been removed meanwhile.
        if let Some(&child) = tree.node(parent)?.children.get(name) {
            return Ok(child);
        }
        let identity = tree.allocate_identity()?;
        tree.nodes
            .insert(identity, Node::new(name.to_string(), Some(parent)));
        if let Some(parent_node) = tree.nodes.get_mut(&parent) {
            parent_node.children.insert(name.to_string(), identity);
        }
        trace!(parent = parent, name = name, identity = identity, "node created");
        Ok(identity)
    }

    /// Looks up a node anywhere in the tree by identity.
    pub fn resolve_by_identity(&self, identity: u64) -> SharedFsResult<NodeEntry> {
        let tree = self.tree.read();
        let node = tree.node(identity)?;
        Ok(NodeEntry {
            identity,
            name: node.name.clone(),
            parent: node.parent,
        })
    }

    /// Returns true if the identity is live.
    pub fn contains(&self, identity: u64) -> bool {
        self.tree.read().nodes.contains_key(&identity)
    }

    /// Returns the path segment of a node (empty for the root).
    pub fn name_of(&self, identity: u64) -> SharedFsResult<String> {
        Ok(self.tree.read().node(identity)?.name.clone())
    }

    /// Returns the identity of the node containing `identity`, or `None` for the root.
    pub fn container_of(&self, identity: u64) -> SharedFsResult<Option<u64>> {
        Ok(self.tree.read().node(identity)?.parent)
    }

    /// Rebuilds the share path of a node by walking up to the root.
    pub fn path_of(&self, identity: u64) -> SharedFsResult<SharePath> {
        self.tree.read().path_of(identity)
    }

    /// Path of `name` inside the directory node `parent`, without registering it.
    pub fn child_path(&self, parent: u64, name: &str) -> SharedFsResult<SharePath> {
        validate_name(name)?;
        Ok(self.tree.read().path_of(parent)?.join(name))
    }

    /// Detaches the child `name` of `parent` together with its subtree.
    ///
    /// Returns the number of nodes dropped; 0 if there was no such child.
    /// Identities of dropped nodes resolve to `NodeNotFound` afterwards.
    pub fn remove_child_if_present(&self, parent: u64, name: &str) -> SharedFsResult<usize> {
        let removed = self.tree.write().remove_child(parent, name)?;
        if removed > 0 {
            trace!(parent = parent, name = name, removed = removed, "subtree detached");
        }
        Ok(removed)
    }

    /// Detaches a node from its container, dropping its subtree.
    ///
    /// The container lookup and the removal happen under one write lock.
    pub fn detach(&self, identity: u64) -> SharedFsResult<usize> {
        let mut tree = self.tree.write();
        let node = tree.node(identity)?;
        let Some(parent) = node.parent else {
            return Err(SharedFsError::InvalidArgument(
                "the root node cannot be removed".to_string(),
            ));
        };
        let name = node.name.clone();
        let removed = tree.remove_child(parent, &name)?;
        trace!(identity = identity, removed = removed, "node detached");
        Ok(removed)
    }

    /// Returns the number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.tree.read().nodes.len()
    }

    /// Returns true if only the root is live.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
