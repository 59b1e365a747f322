//! Chunking strategies for re-encoding written content.

use std::ops::Range;

/// Default fixed block size in bytes (256 KB).
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Configuration for the content-defined chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Minimum chunk size in bytes.
    pub min_size: usize,
    /// Average (target) chunk size in bytes.
    pub avg_size: usize,
    /// Maximum chunk size in bytes.
    pub max_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_size: 256 * 1024,  // 256 KB
            avg_size: 512 * 1024,  // 512 KB
            max_size: 1024 * 1024, // 1 MB
        }
    }
}

/// A chunking strategy: how logical content is split into leaf nodes.
#[derive(Debug, Clone)]
pub enum Chunker {
    /// Fixed-size blocks.
    Fixed(usize),
    /// Content-defined chunking using FastCDC.
    Cdc(ChunkerConfig),
}

impl Default for Chunker {
    fn default() -> Self {
        Chunker::Fixed(DEFAULT_BLOCK_SIZE)
    }
}

impl Chunker {
    /// Split content into chunk ranges.
    ///
    /// The ranges cover the input exactly and in order; empty input yields no
    /// ranges.
    pub fn split(&self, data: &[u8]) -> Vec<Range<usize>> {
        if data.is_empty() {
            return Vec::new();
        }

        match self {
            Chunker::Fixed(size) => {
                let size = (*size).max(1);
                let mut ranges = Vec::with_capacity(data.len().div_ceil(size));
                let mut offset = 0;
                while offset < data.len() {
                    let end = (offset + size).min(data.len());
                    ranges.push(offset..end);
                    offset = end;
                }
                ranges
            }
            Chunker::Cdc(config) => {
                use fastcdc::ronomon::FastCDC;

                let chunker =
                    FastCDC::new(data, config.min_size, config.avg_size, config.max_size);
                chunker
                    .map(|chunk| chunk.offset..chunk.offset + chunk.length)
                    .collect()
            }
        }
    }
}
