pub mod local;

use std::fmt;

/// Errors that can occur during embedding.
#[derive(Debug)]
pub enum EmbedError {
    /// Failed to load or initialize the embedding model.
    ModelLoad(String),
    /// Failed to encode input texts into vectors.
    EncodingFailed(String),
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoad(msg) => write!(f, "model load error: {msg}"),
            Self::EncodingFailed(msg) => write!(f, "encoding failed: {msg}"),
        }
    }
}

impl std::error::Error for EmbedError {}

/// Trait abstracting text-to-vector embedding.
///
/// The index builder and the query path must use the same model: the index
/// stores vectors produced at build time, and nearest-neighbor search is
/// only meaningful against query vectors from the identical model version.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts into vectors.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single text. Convenience wrapper over `embed` for the query path.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::EncodingFailed("embedder returned no vectors".into()))
    }

    /// Dimensionality of the output vectors.
    fn dimensions(&self) -> usize;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}
