// crag-core: retrieval and answer composition over a complaint corpus.

pub mod embedding;
pub mod generator;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod store;

// Test utilities - always available for use by crag-server and tests
pub mod testutil;
