//! # mdfs Core
//!
//! A mutable, POSIX-like file layer over an immutable, content-addressed
//! merkle DAG.
//!
//! Each logical file is a chain of immutable tree nodes addressed by BLAKE3
//! content identifiers. This library lets callers open, read, resize-via-write
//! and synchronize such a file while the underlying node identity changes on
//! every committed write.
//!
//! ## Features
//!
//! - File entity with independent descriptor and node locks: one writer or
//!   many readers per file, snapshot reads of the current root
//! - Single-use file descriptors that commit on close or explicit flush
//! - Content editor that re-encodes written bytes into chunked leaves
//! - Content-addressed node stores: in-memory and on-disk (sharded, atomic
//!   writes, zstd compression, corruption detection)
//! - Raw-leaf encoding for files created under version-1 identifiers
//!
//! ## Example
//!
//! ```
//! use mdfs_core::{File, Flags, MemoryStore, Node, NodeStore, detached_parent};
//! use std::sync::Arc;
//!
//! # fn main() -> mdfs_core::Result<()> {
//! let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
//!
//! // Persist an initial node and wrap it in a file entity
//! let node = Node::Raw(b"hello".to_vec());
//! let cid = store.put(&node, 1)?;
//! let file = File::new("greeting.txt", cid, node, detached_parent(), store)?;
//!
//! // Open a write session, extend the content, commit on close
//! let mut fd = file.open(Flags { read: false, write: true, sync: false })?;
//! fd.write(b"hello, world")?;
//! fd.close()?;
//!
//! assert_eq!(file.size()?, 12);
//! # Ok(())
//! # }
//! ```

mod chunking;
mod cid;
mod editor;
mod error;
mod fd;
mod file;
mod node;
mod store;

pub use chunking::{Chunker, ChunkerConfig, DEFAULT_BLOCK_SIZE};
pub use cid::{Cid, HASH_SIZE, Hash};
pub use editor::DagEditor;
pub use error::{Error, Result};
pub use fd::FileDescriptor;
pub use file::{EntryType, File, FileStat, Flags, ParentNotifier, detached_parent};
pub use node::{Link, Meta, Node, NodeKind, StructuredNode};
pub use store::{FsStore, MemoryStore, NodeStore};
