//! Nearest-neighbor search over the prebuilt complaint vectors.
//!
//! The index is a build-time artifact: an external builder embeds every
//! corpus chunk, writes the vectors here in insertion order, and writes the
//! matching metadata rows to the [`crate::store::MetadataStore`] in the same
//! order. Position `i` in this index and row `i` in the store describe the
//! same chunk; that alignment is the one contract the query path depends on.

use std::fmt;
use std::fs;
use std::path::Path;

/// Artifact file layout, all integers little-endian:
/// magic, format version, model name (u16 length + UTF-8 bytes),
/// dimensions (u32), vector count (u32), then `count * dimensions` f32s.
const MAGIC: &[u8; 4] = b"CRAG";
const FORMAT_VERSION: u8 = 1;

/// Errors from loading or searching the vector index.
#[derive(Debug)]
pub enum IndexError {
    /// Could not read or write the artifact file.
    Io(String),
    /// The artifact file is not a valid index.
    Format(String),
    /// A vector's dimensionality does not match the index.
    DimensionMismatch { expected: usize, got: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "index i/o error: {msg}"),
            Self::Format(msg) => write!(f, "invalid index file: {msg}"),
            Self::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// A single nearest-neighbor hit: a position into the metadata store and
/// the cosine similarity between the stored vector and the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: usize,
    pub score: f32,
}

/// Trait abstracting nearest-neighbor search over the indexed vectors.
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` hits ordered by descending similarity.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Hit>, IndexError>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of the indexed vectors.
    fn dimensions(&self) -> usize;
}

/// In-memory vector index with brute-force cosine search.
///
/// The whole corpus is held as one flat `f32` buffer; search scores every
/// vector, sorts by descending similarity, and truncates to `top_k`. At the
/// corpus sizes this service targets (tens of thousands of chunks) that is
/// well under a millisecond and needs no approximate-search structure.
#[derive(Debug)]
pub struct FlatIndex {
    data: Vec<f32>,
    dimensions: usize,
    model_name: String,
}

impl FlatIndex {
    /// Build an index from per-chunk vectors, in metadata-store order.
    pub fn from_vectors(
        model_name: &str,
        dimensions: usize,
        vectors: &[Vec<f32>],
    ) -> Result<Self, IndexError> {
        if dimensions == 0 {
            return Err(IndexError::Format("dimensions must be non-zero".into()));
        }
        let mut data = Vec::with_capacity(vectors.len() * dimensions);
        for vector in vectors {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }
        Ok(Self {
            data,
            dimensions,
            model_name: model_name.to_string(),
        })
    }

    /// Load an index artifact from disk.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = fs::read(path).map_err(|e| {
            IndexError::Io(format!("failed to read index '{}': {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Write the index artifact to disk.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        fs::write(path, self.to_bytes()).map_err(|e| {
            IndexError::Io(format!("failed to write index '{}': {e}", path.display()))
        })
    }

    /// Name of the embedding model the vectors were produced with.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        let mut cursor = Cursor { bytes, offset: 0 };

        let magic = cursor.take(4)?;
        if magic != MAGIC {
            return Err(IndexError::Format("bad magic bytes".into()));
        }
        let version = cursor.take(1)?[0];
        if version != FORMAT_VERSION {
            return Err(IndexError::Format(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }

        let name_len = u16::from_le_bytes(cursor.take_array()?) as usize;
        let model_name = String::from_utf8(cursor.take(name_len)?.to_vec())
            .map_err(|_| IndexError::Format("model name is not valid UTF-8".into()))?;

        let dimensions = u32::from_le_bytes(cursor.take_array()?) as usize;
        if dimensions == 0 {
            return Err(IndexError::Format("dimensions must be non-zero".into()));
        }
        let count = u32::from_le_bytes(cursor.take_array()?) as usize;

        let data_len = count
            .checked_mul(dimensions)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexError::Format("vector data length overflow".into()))?;
        let data_bytes = cursor.take(data_len)?;
        if cursor.offset != bytes.len() {
            return Err(IndexError::Format("trailing bytes after vector data".into()));
        }

        let data = data_bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self {
            data,
            dimensions,
            model_name,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let count = self.data.len() / self.dimensions;
        let mut bytes = Vec::with_capacity(15 + self.model_name.len() + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&(self.model_name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(self.model_name.as_bytes());
        bytes.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
        bytes.extend_from_slice(&(count as u32).to_le_bytes());
        for &v in &self.data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], IndexError> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| IndexError::Format("unexpected end of file".into()))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], IndexError> {
        let slice = self.take(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }
}

/// Compute cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Hit>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut hits: Vec<Hit> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, vector)| Hit {
                position,
                score: cosine_similarity(query, vector),
            })
            .collect();

        // Sort by descending similarity score.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
