//! Document, chunk and embedding types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw upload for one query request
///
/// Lives only for the duration of the request that received it.
#[derive(Debug, Clone)]
pub struct Document {
    /// Request-scoped identifier, also used to name scratch files
    pub id: Uuid,
    /// Filename as uploaded (informational only)
    pub filename: String,
    /// PDF bytes
    pub data: Bytes,
}

impl Document {
    /// Create a document with a fresh id
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A contiguous span of the normalized document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in document order, unique within one document
    pub ordinal: u32,
    /// Chunk text, exactly `normalized[start..end]`
    pub text: String,
    /// Byte offset of the first byte in the normalized text
    pub start: usize,
    /// Byte offset one past the last byte in the normalized text
    pub end: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(ordinal: u32, text: String, start: usize, end: usize) -> Self {
        Self {
            ordinal,
            text,
            start,
            end,
        }
    }

    /// Length of the chunk text in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Vector representation of one chunk
///
/// Keeps the chunk's ordinal and text so search hits can be returned
/// verbatim without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub ordinal: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

impl Embedding {
    /// Pair a chunk with its vector
    pub fn for_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            ordinal: chunk.ordinal,
            text: chunk.text.clone(),
            vector,
        }
    }

    /// Vector dimensionality
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}
