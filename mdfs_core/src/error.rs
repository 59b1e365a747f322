//! Error types for mdfs_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using mdfs_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the file layer and its collaborators.
#[derive(Error, Debug)]
pub enum Error {
    /// Open was called with neither read nor write access.
    #[error("file opened for neither reading nor writing")]
    InvalidFlags,

    /// The node declares a feature this layer does not implement.
    #[error("unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    /// A structured node declares a kind that cannot be opened as a file.
    #[error("unsupported node kind for file: {kind}")]
    UnsupportedNodeKind { kind: String },

    /// The node representation cannot be classified by this layer.
    #[error("unrecognized node type in {context}")]
    UnrecognizedNodeType { context: String },

    /// Node metadata or encoding is malformed.
    #[error("decode error: {reason}")]
    Decode { reason: String },

    /// Node not found in the store.
    #[error("node not found: {cid}")]
    NodeNotFound { cid: String },

    /// Stored object is corrupted or does not match its content address.
    #[error("corrupted object at {path}: {reason}")]
    CorruptedObject { path: PathBuf, reason: String },

    /// Store directory is invalid or not initialized.
    #[error("invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// A read was attempted on a descriptor opened write-only.
    #[error("descriptor not opened for reading")]
    NotOpenedForReading,

    /// A write was attempted on a descriptor opened read-only.
    #[error("descriptor not opened for writing")]
    NotOpenedForWriting,

    /// A seek resolved to a position outside the addressable range.
    #[error("invalid seek: {reason}")]
    InvalidSeek { reason: String },

    /// I/O error occurred during store operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an UnsupportedFeature error.
    pub fn unsupported_feature(feature: impl Into<String>) -> Self {
        Error::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    /// Create an UnsupportedNodeKind error.
    pub fn unsupported_node_kind(kind: impl Into<String>) -> Self {
        Error::UnsupportedNodeKind { kind: kind.into() }
    }

    /// Create an UnrecognizedNodeType error.
    pub fn unrecognized_node_type(context: impl Into<String>) -> Self {
        Error::UnrecognizedNodeType {
            context: context.into(),
        }
    }

    /// Create a Decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }

    /// Create a NodeNotFound error.
    pub fn node_not_found(cid: impl Into<String>) -> Self {
        Error::NodeNotFound { cid: cid.into() }
    }

    /// Create a CorruptedObject error.
    pub fn corrupted_object(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedObject {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidSeek error.
    pub fn invalid_seek(reason: impl Into<String>) -> Self {
        Error::InvalidSeek {
            reason: reason.into(),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}
