use std::sync::Arc;

use tokio::signal;
use tower_http::services::ServeDir;

mod api;
mod config;

use api::{AppState, HealthInfo};
use crag_core::embedding::Embedder;
use crag_core::embedding::local::LocalEmbedder;
use crag_core::index::{FlatIndex, VectorIndex};
use crag_core::pipeline::Pipeline;
use crag_core::retriever::Retriever;
use crag_core::store::MetadataStore;

#[tokio::main]
async fn main() {
    let config = config::Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let addr = config.bind_address();
    let default_top_k = config.retrieval.default_top_k;

    let index = FlatIndex::load(&config.artifacts.index).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let store = MetadataStore::open(&config.artifacts.metadata).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let embedder = LocalEmbedder::new().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    // The index must have been built with the model we are about to query
    // with, or every similarity score is meaningless.
    if index.model_name() != embedder.model_name() {
        eprintln!(
            "Error: index was built with model '{}' but the embedder is '{}'; rebuild the index",
            index.model_name(),
            embedder.model_name()
        );
        std::process::exit(1);
    }
    if index.dimensions() != embedder.dimensions() {
        eprintln!(
            "Error: index vectors have {} dimensions but the embedder produces {}",
            index.dimensions(),
            embedder.dimensions()
        );
        std::process::exit(1);
    }

    let health = HealthInfo {
        model_name: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        corpus_size: index.len(),
    };

    let retriever = Retriever::new(Arc::new(embedder), Arc::new(index), Arc::new(store))
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(retriever),
        default_top_k,
        health: health.clone(),
    });

    let app = api::router(state).fallback_service(ServeDir::new("frontend"));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to bind to {addr}: {e}");
            std::process::exit(1);
        });

    println!("crag server started");
    println!("  address: http://{addr}");
    println!("  model:   {} ({}d)", health.model_name, health.dimensions);
    println!("  corpus:  {} chunks", health.corpus_size);
    println!("  top_k:   {default_top_k} (default)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    println!("\nShutting down...");
}
