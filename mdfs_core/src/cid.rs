//! Content identifiers: BLAKE3 digests plus a format version.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Hash digest size in bytes (BLAKE3 produces 256-bit hashes).
pub const HASH_SIZE: usize = 32;

/// A 32-byte BLAKE3 hash digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a hex string (64 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::decode(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::decode(format!("Invalid hex: {}", e)))?;

        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }

    /// Convert to hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the first 2 hex characters (for directory sharding).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Get the remaining 62 hex characters (for filename).
    pub fn suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Hash raw bytes using BLAKE3.
    pub fn hash_bytes(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

/// A content identifier: a node's fingerprint plus its format version.
///
/// Version 0 is the legacy format whose leaves are structured nodes; any
/// version above 0 stores file bytes as raw leaves.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid {
    version: u8,
    hash: Hash,
}

impl Cid {
    /// Create a Cid from a version and an existing digest.
    pub fn new(version: u8, hash: Hash) -> Self {
        Cid { version, hash }
    }

    /// Compute the Cid of an encoded node.
    pub fn of(version: u8, encoded: &[u8]) -> Self {
        Cid {
            version,
            hash: Hash::hash_bytes(encoded),
        }
    }

    /// The content identifier format version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The content digest.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}-{}", self.version, self.hash.to_hex())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl FromStr for Cid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix('v')
            .ok_or_else(|| Error::decode(format!("Cid missing version prefix: {}", s)))?;
        let (version_str, hex_str) = rest
            .split_once('-')
            .ok_or_else(|| Error::decode(format!("Cid missing separator: {}", s)))?;
        let version = version_str
            .parse::<u8>()
            .map_err(|e| Error::decode(format!("Invalid Cid version: {}", e)))?;
        let hash = Hash::from_hex(hex_str)?;
        Ok(Cid { version, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_empty() {
        let hash = Hash::hash_bytes(b"");
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn test_hash_hello_world() {
        let hash = Hash::hash_bytes(b"hello world");
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);

        // BLAKE3 of "hello world"
        assert_eq!(
            hex,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_hash_from_hex_roundtrip() {
        let original = Hash::hash_bytes(b"test data");
        let hex = original.to_hex();
        let parsed = Hash::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_hash_from_hex_invalid_length() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("").is_err());
    }

    #[test]
    fn test_hash_from_hex_invalid_chars() {
        let invalid = "z".repeat(64);
        assert!(Hash::from_hex(&invalid).is_err());
    }

    #[test]
    fn test_hash_prefix_suffix() {
        let hash = Hash::hash_bytes(b"test");
        let prefix = hash.prefix();
        let suffix = hash.suffix();

        assert_eq!(prefix.len(), 2);
        assert_eq!(suffix.len(), 62);

        let full = format!("{}{}", prefix, suffix);
        assert_eq!(full, hash.to_hex());
    }

    #[test]
    fn test_cid_display_parse_roundtrip() {
        let cid = Cid::of(1, b"some node bytes");
        let rendered = cid.to_string();
        assert!(rendered.starts_with("v1-"));

        let parsed: Cid = rendered.parse().unwrap();
        assert_eq!(parsed, cid);
    }

    #[test]
    fn test_cid_version_preserved() {
        let v0 = Cid::of(0, b"payload");
        let v1 = Cid::of(1, b"payload");
        assert_eq!(v0.version(), 0);
        assert_eq!(v1.version(), 1);
        // Same content, same digest, different identity
        assert_eq!(v0.hash(), v1.hash());
        assert_ne!(v0, v1);
    }

    #[test]
    fn test_cid_parse_invalid() {
        assert!("".parse::<Cid>().is_err());
        assert!("1-abcd".parse::<Cid>().is_err());
        assert!("vX-abcd".parse::<Cid>().is_err());
        assert!(format!("v1-{}", "g".repeat(64)).parse::<Cid>().is_err());
        assert!("v1-abcd".parse::<Cid>().is_err());
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Hash determinism - hashing the same data always produces the same hash
        #[test]
        fn prop_hash_deterministic(data: Vec<u8>) {
            let hash1 = Hash::hash_bytes(&data);
            let hash2 = Hash::hash_bytes(&data);
            prop_assert_eq!(hash1, hash2);
        }

        /// Hex encoding is bijective - round-trip through hex preserves hash
        #[test]
        fn prop_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
            let hash = Hash::from_bytes(bytes);
            let hex = hash.to_hex();
            let parsed = Hash::from_hex(&hex)?;
            prop_assert_eq!(hash, parsed);
        }

        /// Cid rendering is bijective for any version and digest
        #[test]
        fn prop_cid_roundtrip(version: u8, bytes in prop::array::uniform32(any::<u8>())) {
            let cid = Cid::new(version, Hash::from_bytes(bytes));
            let parsed: Cid = cid.to_string().parse()?;
            prop_assert_eq!(parsed, cid);
        }

        /// Invalid hex length always fails
        #[test]
        fn prop_invalid_hex_length_fails(
            s in "[0-9a-f]{0,63}|[0-9a-f]{65,128}"
        ) {
            prop_assert!(Hash::from_hex(&s).is_err());
        }
    }
}
