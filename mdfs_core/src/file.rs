//! The mutable file entity.
//!
//! A `File` owns a reference to the current root node of an immutable merkle
//! tree and governs access to it. Writes never mutate the node: a write
//! session accumulates changes in a content editor and, on commit, replaces
//! the root reference wholesale with a freshly persisted node.
//!
//! Two independent reader-writer locks guard disjoint concerns:
//!
//! - the *descriptor lock* serializes write sessions against each other and
//!   against read sessions, held from open until the descriptor is closed;
//! - the *node lock* guards only the instant of reading or replacing the
//!   root reference, never the lifetime of a session.

use crate::chunking::Chunker;
use crate::cid::Cid;
use crate::editor::DagEditor;
use crate::error::{Error, Result};
use crate::fd::{FileDescriptor, SessionLock};
use crate::node::{Node, NodeKind};
use crate::store::NodeStore;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Open flags for a file session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    /// Allow reads through the descriptor.
    pub read: bool,
    /// Allow writes through the descriptor.
    pub write: bool,
    /// Request full synchronization on commit. Recorded on the descriptor;
    /// commits in this layer always replace the node and notify the parent.
    pub sync: bool,
}

/// Entry type in the enclosing tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryType {
    /// A file.
    File = 1,
    /// A directory.
    Directory = 2,
}

impl EntryType {
    /// Get the string name of this entry type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Directory => "directory",
        }
    }
}

/// Capability interface for reporting a replaced root to the enclosing
/// directory tree. The tree owns the file; the file only reports upward.
pub trait ParentNotifier: Send + Sync {
    /// Called after a write session has replaced the file's root node.
    fn child_root_changed(&self, name: &str, new_root: &Cid);
}

struct NoParent;

impl ParentNotifier for NoParent {
    fn child_root_changed(&self, _name: &str, _new_root: &Cid) {}
}

/// A parent reference for files that report to nobody (roots, tests).
pub fn detached_parent() -> Weak<dyn ParentNotifier> {
    Weak::<NoParent>::new()
}

/// Externally reportable description of a file.
#[derive(Debug, Clone, Serialize)]
pub struct FileStat {
    /// File name within its parent.
    pub name: String,
    /// Current root identifier.
    pub cid: String,
    /// Declared kind of the root node.
    pub kind: NodeKind,
    /// Logical size in bytes.
    pub size: u64,
}

/// A mutable file over an immutable node tree.
pub struct File {
    name: String,
    parent: Weak<dyn ParentNotifier>,
    store: Arc<dyn NodeStore>,
    /// Current root, replaced wholesale on commit. Guarded by the node lock.
    node: RwLock<(Cid, Node)>,
    /// Exclusive holder = an open write session; shared holders = read sessions.
    desclock: RwLock<()>,
    raw_leaves: bool,
}

impl File {
    /// Create a file over an existing node.
    ///
    /// If the identifier's format version is above 0, raw leaves are enabled
    /// for every editor this file creates.
    pub fn new(
        name: impl Into<String>,
        cid: Cid,
        node: Node,
        parent: Weak<dyn ParentNotifier>,
        store: Arc<dyn NodeStore>,
    ) -> Result<Self> {
        let raw_leaves = cid.version() > 0;
        Ok(Self {
            name: name.into(),
            parent,
            store,
            node: RwLock::new((cid, node)),
            desclock: RwLock::new(()),
            raw_leaves,
        })
    }

    /// File name within its parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether editors created by this file emit raw leaves.
    pub fn raw_leaves(&self) -> bool {
        self.raw_leaves
    }

    /// Open a session against the current node.
    ///
    /// Write access takes the descriptor lock exclusively, read access takes
    /// it shared; the guard travels with the returned descriptor and is
    /// released when the descriptor closes. Any failure past acquisition
    /// releases the lock before the error surfaces.
    pub fn open(&self, flags: Flags) -> Result<FileDescriptor<'_>> {
        let lock = if flags.write {
            SessionLock::Exclusive(
                self.desclock
                    .write()
                    .unwrap_or_else(PoisonError::into_inner),
            )
        } else if flags.read {
            SessionLock::Shared(self.desclock.read().unwrap_or_else(PoisonError::into_inner))
        } else {
            return Err(Error::InvalidFlags);
        };

        let (cid, node) = self.snapshot();

        if let Node::Structured(sn) = &node {
            match sn.meta()?.kind {
                NodeKind::File | NodeKind::Raw => {}
                NodeKind::Symlink => return Err(Error::unsupported_feature("symlink")),
                other => return Err(Error::unsupported_node_kind(other.as_str())),
            }
        }
        // A raw leaf is always openable; a foreign node is rejected by the
        // editor below.

        let mut editor = DagEditor::new(cid, node, Arc::clone(&self.store), Chunker::default())?;
        editor.raw_leaves = self.raw_leaves;

        Ok(FileDescriptor::new(self, flags, editor, lock))
    }

    /// Logical size of the file in bytes.
    pub fn size(&self) -> Result<u64> {
        let (_, node) = self.snapshot();
        match &node {
            Node::Structured(sn) => Ok(sn.meta()?.length),
            Node::Raw(bytes) => Ok(bytes.len() as u64),
            Node::Foreign(_) => Err(Error::unrecognized_node_type("file size query")),
        }
    }

    /// Snapshot of the current root node.
    pub fn node(&self) -> Node {
        self.snapshot().1
    }

    /// Snapshot of the current root identifier.
    pub fn cid(&self) -> Cid {
        self.snapshot().0
    }

    /// Describe the file from its current root.
    pub fn stat(&self) -> Result<FileStat> {
        let (cid, node) = self.snapshot();
        let (kind, size) = match &node {
            Node::Structured(sn) => {
                let meta = sn.meta()?;
                (meta.kind, meta.length)
            }
            Node::Raw(bytes) => (NodeKind::Raw, bytes.len() as u64),
            Node::Foreign(_) => return Err(Error::unrecognized_node_type("file stat")),
        };
        Ok(FileStat {
            name: self.name.clone(),
            cid: cid.to_string(),
            kind,
            size,
        })
    }

    /// Commit any buffered state by running a full write session.
    ///
    /// The session is closed on every exit path.
    pub fn flush(&self) -> Result<()> {
        let mut fd = self.open(Flags {
            read: false,
            write: true,
            sync: true,
        })?;

        let flush_res = fd.flush();
        let close_res = fd.close();
        flush_res?;
        close_res
    }

    /// Wait until no write session is in flight.
    ///
    /// Being able to take the exclusive descriptor lock means any previously
    /// completed write has already committed its node replacement; no
    /// independent persistence step is performed.
    pub fn sync(&self) -> Result<()> {
        drop(
            self.desclock
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        Ok(())
    }

    /// The entry type of this entity within the enclosing tree.
    pub fn entry_type(&self) -> EntryType {
        EntryType::File
    }

    fn snapshot(&self) -> (Cid, Node) {
        self.node
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the root reference. Held only for the instant of the swap.
    pub(crate) fn set_node(&self, cid: Cid, node: Node) {
        *self.node.write().unwrap_or_else(PoisonError::into_inner) = (cid, node);
    }

    /// Report a replaced root to the parent, if one is still alive.
    pub(crate) fn report_root(&self, new_root: &Cid) {
        if let Some(parent) = self.parent.upgrade() {
            parent.child_root_changed(&self.name, new_root);
        }
    }
}
