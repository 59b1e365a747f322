//! The content editor: logical byte-level access over a node graph.
//!
//! A `DagEditor` is bound to one snapshot node. It materializes the logical
//! content once, accumulates positioned writes in memory, and on commit
//! re-encodes the content into fresh leaves plus a root, returning the new
//! node and its identifier. The snapshot node is never modified.

use crate::chunking::Chunker;
use crate::cid::Cid;
use crate::error::{Error, Result};
use crate::node::{Link, Meta, Node, NodeKind, StructuredNode};
use crate::store::NodeStore;
use std::sync::Arc;

/// An editor over the logical content of one file node.
pub struct DagEditor {
    store: Arc<dyn NodeStore>,
    chunker: Chunker,
    /// When set, committed leaves are raw nodes under version-1 identifiers.
    pub raw_leaves: bool,
    content: Vec<u8>,
    root: (Cid, Node),
    dirty: bool,
}

impl DagEditor {
    /// Create an editor over a snapshot node.
    ///
    /// Fails if the node graph cannot be interpreted as file content.
    pub fn new(
        cid: Cid,
        node: Node,
        store: Arc<dyn NodeStore>,
        chunker: Chunker,
    ) -> Result<Self> {
        let content = materialize(&node, store.as_ref())?;
        Ok(Self {
            store,
            chunker,
            raw_leaves: false,
            content,
            root: (cid, node),
            dirty: false,
        })
    }

    /// Current logical content length in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Whether there are uncommitted writes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The root identifier as of the last commit (or the snapshot).
    pub fn root_cid(&self) -> &Cid {
        &self.root.0
    }

    /// Read into `buf` starting at `offset`; returns the number of bytes
    /// read. Reading at or past the end returns 0.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = offset as usize;
        if start >= self.content.len() {
            return Ok(0);
        }
        let end = (start + buf.len()).min(self.content.len());
        let n = end - start;
        buf[..n].copy_from_slice(&self.content[start..end]);
        Ok(n)
    }

    /// Write `data` at `offset`, extending the content if needed. A gap
    /// between the old end and `offset` is zero-filled.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let start = offset as usize;
        if start > self.content.len() {
            self.content.resize(start, 0);
        }
        let end = start + data.len();
        if end > self.content.len() {
            self.content.resize(end, 0);
        }
        self.content[start..end].copy_from_slice(data);
        self.dirty = true;
        Ok(data.len())
    }

    /// Resize the content to `len` bytes, zero-filling on growth.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let len = len as usize;
        if len != self.content.len() {
            self.content.resize(len, 0);
            self.dirty = true;
        }
        Ok(())
    }

    /// Commit accumulated writes, producing a new root node.
    ///
    /// A clean editor commits as a no-op, returning the current root.
    pub fn commit(&mut self) -> Result<(Cid, Node)> {
        if !self.dirty {
            return Ok(self.root.clone());
        }

        let version = if self.raw_leaves { 1 } else { 0 };
        let ranges = self.chunker.split(&self.content);

        let node = if ranges.len() <= 1 {
            // Single leaf holds the whole content
            if self.raw_leaves {
                Node::Raw(self.content.clone())
            } else {
                Node::file(self.content.len() as u64, &self.content, vec![])
            }
        } else {
            let mut links = Vec::with_capacity(ranges.len());
            for range in ranges {
                let chunk = &self.content[range.clone()];
                let leaf = if self.raw_leaves {
                    Node::Raw(chunk.to_vec())
                } else {
                    Node::Structured(StructuredNode::new(
                        Meta::new(NodeKind::Raw, chunk.len() as u64),
                        chunk,
                        vec![],
                    ))
                };
                let leaf_cid = self.store.put(&leaf, version)?;
                links.push(Link {
                    cid: leaf_cid,
                    size: range.len() as u64,
                });
            }
            Node::file(self.content.len() as u64, &[], links)
        };

        let cid = self.store.put(&node, version)?;
        self.root = (cid, node.clone());
        self.dirty = false;
        Ok((cid, node))
    }
}

/// Flatten a node graph into its logical byte content.
fn materialize(node: &Node, store: &dyn NodeStore) -> Result<Vec<u8>> {
    match node {
        Node::Raw(bytes) => Ok(bytes.clone()),
        Node::Structured(sn) => {
            let meta = sn.meta()?;
            match meta.kind {
                NodeKind::Raw | NodeKind::File => {}
                other => return Err(Error::unsupported_node_kind(other.as_str())),
            }

            let mut out = sn.content().to_vec();
            for link in &sn.links {
                let child = store.get(&link.cid)?;
                let child_bytes = materialize(&child, store)?;
                if child_bytes.len() as u64 != link.size {
                    return Err(Error::decode(format!(
                        "link size mismatch: declared {}, got {}",
                        link.size,
                        child_bytes.len()
                    )));
                }
                out.extend_from_slice(&child_bytes);
            }
            Ok(out)
        }
        Node::Foreign(_) => Err(Error::unrecognized_node_type("content editor")),
    }
}
