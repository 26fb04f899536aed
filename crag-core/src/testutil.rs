//! Test helpers shared by crag-core and crag-server tests.

use crate::embedding::{EmbedError, Embedder};
use crate::index::{Hit, IndexError, VectorIndex};
use crate::retriever::RetrievedChunk;
use crate::store::{ComplaintChunk, MetadataStore};

/// Embedder returning the same fixed vector for every input.
pub struct MockEmbedder {
    pub vector: Vec<f32>,
}

impl MockEmbedder {
    /// A mock embedder producing zero vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self {
            vector: vec![0.0; dimensions],
        }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}

/// Embedder that always fails, for error-path tests.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::EncodingFailed("mock failure".into()))
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "failing-embedder"
    }
}

/// Index returning a canned hit list regardless of the query, while
/// reporting a configurable length. Lets tests exercise the retriever
/// against arbitrary positions, including ones past the end of the store.
pub struct StubIndex {
    pub hits: Vec<Hit>,
    pub len: usize,
    pub dimensions: usize,
}

impl VectorIndex for StubIndex {
    fn search(&self, _query: &[f32], top_k: usize) -> Result<Vec<Hit>, IndexError> {
        Ok(self.hits.iter().take(top_k).copied().collect())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Canned hits for the given positions, with strictly decreasing scores.
pub fn hits(positions: &[usize]) -> Vec<Hit> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &position)| Hit {
            position,
            score: 1.0 - i as f32 * 0.1,
        })
        .collect()
}

/// A chunk with the three fields the pipeline reads.
pub fn chunk(product: &str, complaint_id: &str, text: &str) -> ComplaintChunk {
    ComplaintChunk {
        product: product.to_string(),
        complaint_id: complaint_id.to_string(),
        text: text.to_string(),
        issue: None,
        received: None,
    }
}

/// An in-memory store holding `n` chunks: "Product 0" / "CMP-0" /
/// "complaint text 0" and so on.
pub fn store_with_chunks(n: usize) -> MetadataStore {
    let store = MetadataStore::open_in_memory().unwrap();
    for i in 0..n {
        store
            .append(&chunk(
                &format!("Product {i}"),
                &format!("CMP-{i}"),
                &format!("complaint text {i}"),
            ))
            .unwrap();
    }
    store
}

/// A retrieved chunk for generator tests.
pub fn retrieved(position: usize, product: &str, complaint_id: &str, text: &str) -> RetrievedChunk {
    RetrievedChunk {
        position,
        score: 0.9,
        chunk: chunk(product, complaint_id, text),
    }
}
