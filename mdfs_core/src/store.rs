//! Node stores: content-addressed persistence of immutable nodes.

use crate::cid::{Cid, Hash};
use crate::error::{Error, Result};
use crate::node::Node;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Compression threshold: objects >= 4KB are compressed on disk.
const COMPRESSION_THRESHOLD: usize = 4096;

/// Size of the on-disk object header in bytes.
const OBJECT_HEADER_SIZE: usize = 16;

/// Magic bytes at the start of every on-disk object file.
const OBJECT_MAGIC: &[u8; 4] = b"MDFO";

/// On-disk object format version.
const OBJECT_VERSION: u8 = 1;

const COMP_NONE: u8 = 0;
const COMP_ZSTD: u8 = 1;

/// Content-addressed storage of immutable nodes.
///
/// `put` hashes the node's canonical encoding, so identical content always
/// yields the same identifier and is stored once. Objects are never modified
/// after being persisted.
pub trait NodeStore: Send + Sync {
    /// Fetch a node by its content identifier.
    fn get(&self, cid: &Cid) -> Result<Node>;

    /// Persist a node, addressed under the given identifier version.
    fn put(&self, node: &Node, version: u8) -> Result<Cid>;

    /// Whether the store holds an object for this identifier.
    fn contains(&self, cid: &Cid) -> bool;
}

/// An in-memory node store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeStore for MemoryStore {
    fn get(&self, cid: &Cid) -> Result<Node> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let bytes = objects
            .get(cid)
            .ok_or_else(|| Error::node_not_found(cid.to_string()))?;
        Node::decode(bytes)
    }

    fn put(&self, node: &Node, version: u8) -> Result<Cid> {
        let encoded = node.encode();
        let cid = Cid::of(version, &encoded);
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cid)
            .or_insert(encoded);
        Ok(cid)
    }

    fn contains(&self, cid: &Cid) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(cid)
    }
}

/// An on-disk node store.
///
/// Layout:
/// - `objects/v{cid_version}/{prefix}/{suffix}` for object files
/// - `config` file with the store format version
///
/// Object files carry a 16-byte header (magic, version, compression,
/// payload length) followed by the possibly-compressed node encoding. The
/// content address is always the hash of the uncompressed encoding.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Initialize a new store at the given path.
    pub fn init<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("objects"))?;

        let config_path = root.join("config");
        fs::write(&config_path, "version=1\n")?;

        Ok(Self { root })
    }

    /// Open an existing store at the given path.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(Error::invalid_store(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_store(&root, "config file not found"));
        }
        let config_content = fs::read_to_string(&config_path)?;
        Self::parse_config(&root, &config_content)?;

        if !root.join("objects").exists() {
            return Err(Error::invalid_store(&root, "objects directory missing"));
        }

        Ok(Self { root })
    }

    /// Parse the config file and validate the store format version.
    fn parse_config(root: &Path, content: &str) -> Result<()> {
        let mut version = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == "version" {
                    version = Some(value.trim());
                }
            }
        }

        if version != Some("1") {
            return Err(Error::invalid_store(
                root,
                format!("unsupported config version: {:?}", version),
            ));
        }
        Ok(())
    }

    /// Get the path to an object file given its identifier.
    ///
    /// Returns: `objects/v{version}/{prefix}/{suffix}`
    pub fn object_path(&self, cid: &Cid) -> PathBuf {
        self.root
            .join("objects")
            .join(format!("v{}", cid.version()))
            .join(cid.hash().prefix())
            .join(cid.hash().suffix())
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and validate an object file, returning the node encoding.
    fn read_object(&self, cid: &Cid) -> Result<Vec<u8>> {
        let path = self.object_path(cid);
        if !path.exists() {
            return Err(Error::node_not_found(cid.to_string()));
        }

        let mut file = fs::File::open(&path)?;
        let mut header = [0u8; OBJECT_HEADER_SIZE];
        file.read_exact(&mut header)?;

        if &header[0..4] != OBJECT_MAGIC {
            return Err(Error::corrupted_object(&path, "invalid object magic"));
        }
        if header[4] != OBJECT_VERSION {
            return Err(Error::corrupted_object(
                &path,
                format!("unsupported object version: {}", header[4]),
            ));
        }
        let compression = header[5];
        let payload_len = u64::from_le_bytes(
            header[8..16]
                .try_into()
                .map_err(|_| Error::corrupted_object(&path, "bad payload length"))?,
        );

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;
        if payload.len() as u64 != payload_len {
            return Err(Error::corrupted_object(
                &path,
                format!(
                    "payload length mismatch: expected {}, got {}",
                    payload_len,
                    payload.len()
                ),
            ));
        }

        let encoded = match compression {
            COMP_NONE => payload,
            COMP_ZSTD => zstd::decode_all(&payload[..])?,
            other => {
                return Err(Error::corrupted_object(
                    &path,
                    format!("unknown compression type: {}", other),
                ));
            }
        };

        // Corruption detection: the address is the hash of the encoding.
        let computed = Hash::hash_bytes(&encoded);
        if computed != *cid.hash() {
            return Err(Error::corrupted_object(
                &path,
                format!(
                    "hash mismatch: expected {}, got {}",
                    cid.hash().to_hex(),
                    computed.to_hex()
                ),
            ));
        }

        Ok(encoded)
    }

    /// Write an object atomically using tempfile.
    fn write_object_atomic(&self, cid: &Cid, encoded: &[u8]) -> Result<()> {
        let obj_path = self.object_path(cid);

        if let Some(parent) = obj_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (payload, compression) = if encoded.len() >= COMPRESSION_THRESHOLD {
            (
                zstd::encode_all(encoded, zstd::DEFAULT_COMPRESSION_LEVEL)?,
                COMP_ZSTD,
            )
        } else {
            (encoded.to_vec(), COMP_NONE)
        };

        let mut header = [0u8; OBJECT_HEADER_SIZE];
        header[0..4].copy_from_slice(OBJECT_MAGIC);
        header[4] = OBJECT_VERSION;
        header[5] = compression;
        // header[6..8] reserved, zero
        header[8..16].copy_from_slice(&(payload.len() as u64).to_le_bytes());

        let temp_dir = obj_path.parent().ok_or_else(|| {
            Error::invalid_store(&self.root, "object path has no parent directory")
        })?;
        let mut temp_file = tempfile::NamedTempFile::new_in(temp_dir)?;
        temp_file.write_all(&header)?;
        temp_file.write_all(&payload)?;
        temp_file.flush()?;
        temp_file.persist(&obj_path)?;

        Ok(())
    }
}

impl NodeStore for FsStore {
    fn get(&self, cid: &Cid) -> Result<Node> {
        let encoded = self.read_object(cid)?;
        Node::decode(&encoded)
    }

    fn put(&self, node: &Node, version: u8) -> Result<Cid> {
        let encoded = node.encode();
        let cid = Cid::of(version, &encoded);

        // Deduplication: identical content is already on disk.
        if self.object_path(&cid).exists() {
            return Ok(cid);
        }

        self.write_object_atomic(&cid, &encoded)?;
        Ok(cid)
    }

    fn contains(&self, cid: &Cid) -> bool {
        self.object_path(cid).exists()
    }
}
