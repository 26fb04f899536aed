//! Query-time orchestration: embed the question, search the index, and map
//! hit positions back to complaint metadata.

use std::fmt;
use std::sync::Arc;

use crate::embedding::{EmbedError, Embedder};
use crate::index::{IndexError, VectorIndex};
use crate::store::{ComplaintChunk, MetadataStore, StoreError};

/// Errors from retrieval.
#[derive(Debug)]
pub enum RetrieveError {
    /// The query was empty or whitespace-only.
    EmptyQuery,
    /// `top_k` was zero.
    InvalidTopK,
    /// The vector index and metadata store disagree on corpus size.
    IndexMismatch { index_len: usize, store_len: usize },
    /// Query embedding failed.
    Embed(EmbedError),
    /// Index search failed.
    Index(IndexError),
    /// Metadata lookup failed.
    Store(StoreError),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "question must not be empty"),
            Self::InvalidTopK => write!(f, "top_k must be greater than zero"),
            Self::IndexMismatch {
                index_len,
                store_len,
            } => write!(
                f,
                "vector index has {index_len} vectors but metadata store has {store_len} chunks; \
                 the artifacts were not built together"
            ),
            Self::Embed(e) => write!(f, "{e}"),
            Self::Index(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RetrieveError {}

impl From<EmbedError> for RetrieveError {
    fn from(e: EmbedError) -> Self {
        Self::Embed(e)
    }
}

impl From<IndexError> for RetrieveError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<StoreError> for RetrieveError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// A chunk returned by retrieval, in descending relevance order.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// Position of the chunk in the index and metadata store.
    pub position: usize,
    /// Cosine similarity between the query and the chunk's vector.
    pub score: f32,
    pub chunk: ComplaintChunk,
}

/// Retrieves complaint chunks relevant to a question.
///
/// Holds the loaded embedder, index, and store; all three are initialized
/// once at startup and shared read-only across requests.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<MetadataStore>,
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever").finish_non_exhaustive()
    }
}

impl Retriever {
    /// Build a retriever over loaded artifacts.
    ///
    /// Fails when the index and metadata store disagree on corpus size: a
    /// desynchronized pair would attribute answers to the wrong complaints,
    /// so the mismatch is rejected at startup instead of surfacing as
    /// silently truncated results.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<MetadataStore>,
    ) -> Result<Self, RetrieveError> {
        let index_len = index.len();
        let store_len = store.len()?;
        if index_len != store_len {
            return Err(RetrieveError::IndexMismatch {
                index_len,
                store_len,
            });
        }
        Ok(Self {
            embedder,
            index,
            store,
        })
    }

    /// Return up to `top_k` chunks relevant to `query`, most similar first.
    ///
    /// Hit positions past the end of the metadata store are dropped with a
    /// warning rather than failing the query, so the result can be shorter
    /// than `top_k` — down to empty for an empty corpus.
    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrieveError> {
        if query.trim().is_empty() {
            return Err(RetrieveError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(RetrieveError::InvalidTopK);
        }

        let embedding = self.embedder.embed_one(query)?;
        let hits = self.index.search(&embedding, top_k)?;
        let store_len = self.store.len()?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.store.get(hit.position)? {
                Some(chunk) => results.push(RetrievedChunk {
                    position: hit.position,
                    score: hit.score,
                    chunk,
                }),
                None => {
                    eprintln!(
                        "Warning: index returned position {} but metadata store holds {} chunks; dropping hit",
                        hit.position, store_len
                    );
                }
            }
        }
        Ok(results)
    }
}
