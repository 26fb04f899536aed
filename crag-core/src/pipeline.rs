use crate::generator::{self, Answer};
use crate::retriever::{RetrieveError, Retriever};

/// The full question-answering chain: retrieve relevant complaints, then
/// compose them into an [`Answer`].
pub struct Pipeline {
    retriever: Retriever,
}

impl Pipeline {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Answer a question over the complaint corpus.
    ///
    /// Retrieval failures propagate untouched; composition itself cannot
    /// fail, including for an empty retrieval result.
    pub fn answer(&self, query: &str, top_k: usize) -> Result<Answer, RetrieveError> {
        let chunks = self.retriever.retrieve(query, top_k)?;
        Ok(generator::compose(query, &chunks))
    }
}
