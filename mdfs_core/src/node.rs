//! Node model and binary encoding.
//!
//! A node is the immutable unit of the merkle tree. Two encodings are
//! understood, selected by a leading tag byte:
//!
//! Raw leaf (tag 2):
//! ```text
//! 0x00  1   tag = 2
//! 0x01  ... file bytes, verbatim
//! ```
//!
//! Structured node (tag 1):
//! ```text
//! 0x00  1   tag = 1
//! 0x01  4   link count (u32 LE)
//! 0x05  41  per link: cid version (u8), hash (32 bytes), size (u64 LE)
//! ...   ... data: 16-byte metadata header followed by inline content
//! ```
//!
//! Metadata header (inside the data section):
//! ```text
//! 0x00  4   "MDFS" magic
//! 0x04  1   format version (u8) = 1
//! 0x05  1   kind: 1=raw, 2=file, 3=directory, 4=symlink
//! 0x06  2   reserved (must be 0)
//! 0x08  8   declared byte length (u64 LE)
//! ```
//!
//! Any other tag byte is preserved as a `Foreign` node: content this layer
//! can store and address but cannot interpret.

use crate::cid::{Cid, HASH_SIZE, Hash};
use crate::error::{Error, Result};
use serde::Serialize;

/// Magic bytes at the start of every metadata header.
pub const META_MAGIC: &[u8; 4] = b"MDFS";

/// Current metadata header format version.
pub const META_VERSION: u8 = 1;

/// Size of the metadata header in bytes.
pub const META_SIZE: usize = 16;

/// Size of an encoded link entry in bytes (1-byte version + 32-byte hash + 8-byte size).
pub const LINK_SIZE: usize = 41;

/// Node tag for the structured encoding.
pub const TAG_STRUCTURED: u8 = 1;

/// Node tag for the raw-leaf encoding.
pub const TAG_RAW: u8 = 2;

/// Declared kind of a structured node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Raw file bytes wrapped in a metadata header.
    Raw = 1,
    /// A file, possibly linking to further leaves.
    File = 2,
    /// A directory.
    Directory = 3,
    /// A symbolic link.
    Symlink = 4,
}

impl NodeKind {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(NodeKind::Raw),
            2 => Ok(NodeKind::File),
            3 => Ok(NodeKind::Directory),
            4 => Ok(NodeKind::Symlink),
            _ => Err(Error::decode(format!("Invalid node kind: {}", value))),
        }
    }

    /// Get the string name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Raw => "raw",
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
            NodeKind::Symlink => "symlink",
        }
    }
}

/// Decoded metadata of a structured node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    /// Declared kind.
    pub kind: NodeKind,
    /// Declared logical byte length of the content this node describes.
    pub length: u64,
}

impl Meta {
    /// Create a new metadata header.
    pub fn new(kind: NodeKind, length: u64) -> Self {
        Meta { kind, length }
    }

    /// Encode the header to a 16-byte array.
    pub fn encode(&self) -> [u8; META_SIZE] {
        let mut buf = [0u8; META_SIZE];
        buf[0..4].copy_from_slice(META_MAGIC);
        buf[4] = META_VERSION;
        buf[5] = self.kind.to_u8();
        // buf[6..8] reserved, zero
        buf[8..16].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Decode a header from the data section of a structured node.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < META_SIZE {
            return Err(Error::decode(format!(
                "Metadata too short: {} bytes (expected at least {})",
                buf.len(),
                META_SIZE
            )));
        }

        if &buf[0..4] != META_MAGIC {
            return Err(Error::decode(format!(
                "Invalid metadata magic: expected {:?}, got {:?}",
                META_MAGIC,
                &buf[0..4]
            )));
        }

        if buf[4] != META_VERSION {
            return Err(Error::decode(format!(
                "Unsupported metadata version: {}",
                buf[4]
            )));
        }

        let kind = NodeKind::from_u8(buf[5])?;

        if buf[6] != 0 || buf[7] != 0 {
            return Err(Error::decode("Reserved metadata bytes must be 0"));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[8..16]);
        let length = u64::from_le_bytes(len_bytes);

        Ok(Meta { kind, length })
    }
}

/// A link from a structured node to a child node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Content identifier of the child.
    pub cid: Cid,
    /// Logical byte size of the content behind the child.
    pub size: u64,
}

impl Link {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.cid.version());
        buf.extend_from_slice(self.cid.hash().as_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let version = buf[0];
        let hash_bytes: [u8; HASH_SIZE] = buf[1..1 + HASH_SIZE]
            .try_into()
            .map_err(|_| Error::decode("Failed to parse link hash"))?;
        let size = u64::from_le_bytes(
            buf[1 + HASH_SIZE..LINK_SIZE]
                .try_into()
                .map_err(|_| Error::decode("Failed to parse link size"))?,
        );
        Ok(Link {
            cid: Cid::new(version, Hash::from_bytes(hash_bytes)),
            size,
        })
    }
}

/// A structured node: a data section (metadata header plus inline content)
/// and links to child nodes.
///
/// The data section is kept as raw bytes; metadata is decoded on demand so
/// that a malformed header surfaces as a decode error at the point of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredNode {
    /// Metadata header followed by inline content.
    pub data: Vec<u8>,
    /// Links to child nodes, in content order.
    pub links: Vec<Link>,
}

impl StructuredNode {
    /// Build a structured node from decoded metadata, inline content and links.
    pub fn new(meta: Meta, inline: &[u8], links: Vec<Link>) -> Self {
        let mut data = Vec::with_capacity(META_SIZE + inline.len());
        data.extend_from_slice(&meta.encode());
        data.extend_from_slice(inline);
        StructuredNode { data, links }
    }

    /// Decode the metadata header from the data section.
    pub fn meta(&self) -> Result<Meta> {
        Meta::decode(&self.data)
    }

    /// Inline content following the metadata header.
    pub fn content(&self) -> &[u8] {
        self.data.get(META_SIZE..).unwrap_or(&[])
    }
}

/// The closed set of node representations this layer works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A node with a metadata header and optional links.
    Structured(StructuredNode),
    /// A raw leaf: file bytes with no wrapping.
    Raw(Vec<u8>),
    /// An encoding this layer does not understand, carried verbatim.
    Foreign(Vec<u8>),
}

impl Node {
    /// Build a structured file node.
    pub fn file(length: u64, inline: &[u8], links: Vec<Link>) -> Self {
        Node::Structured(StructuredNode::new(Meta::new(NodeKind::File, length), inline, links))
    }

    /// Encode the node to its canonical byte form.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Raw(bytes) => {
                let mut buf = Vec::with_capacity(1 + bytes.len());
                buf.push(TAG_RAW);
                buf.extend_from_slice(bytes);
                buf
            }
            Node::Structured(sn) => {
                let mut buf =
                    Vec::with_capacity(1 + 4 + sn.links.len() * LINK_SIZE + sn.data.len());
                buf.push(TAG_STRUCTURED);
                buf.extend_from_slice(&(sn.links.len() as u32).to_le_bytes());
                for link in &sn.links {
                    link.encode_into(&mut buf);
                }
                buf.extend_from_slice(&sn.data);
                buf
            }
            Node::Foreign(bytes) => bytes.clone(),
        }
    }

    /// Decode a node from its canonical byte form.
    ///
    /// Unknown tag bytes decode to `Node::Foreign`; the metadata header of a
    /// structured node is not validated here.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&tag) = bytes.first() else {
            return Err(Error::decode("Empty node encoding"));
        };

        match tag {
            TAG_RAW => Ok(Node::Raw(bytes[1..].to_vec())),
            TAG_STRUCTURED => {
                if bytes.len() < 5 {
                    return Err(Error::decode("Structured node truncated before link count"));
                }
                let count = u32::from_le_bytes(
                    bytes[1..5]
                        .try_into()
                        .map_err(|_| Error::decode("Failed to parse link count"))?,
                ) as usize;

                let links_end = 5usize
                    .checked_add(count.checked_mul(LINK_SIZE).ok_or_else(|| {
                        Error::decode(format!("Link count overflow: {}", count))
                    })?)
                    .ok_or_else(|| Error::decode(format!("Link count overflow: {}", count)))?;
                if bytes.len() < links_end {
                    return Err(Error::decode(format!(
                        "Structured node truncated: {} links declared, {} bytes available",
                        count,
                        bytes.len() - 5
                    )));
                }

                let mut links = Vec::with_capacity(count);
                for entry in bytes[5..links_end].chunks_exact(LINK_SIZE) {
                    links.push(Link::decode(entry)?);
                }

                Ok(Node::Structured(StructuredNode {
                    data: bytes[links_end..].to_vec(),
                    links,
                }))
            }
            _ => Ok(Node::Foreign(bytes.to_vec())),
        }
    }
}
