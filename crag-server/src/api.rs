//! HTTP API layer for the complaint answering service.
//!
//! One JSON endpoint does the work: `POST /api/ask` takes a question and
//! returns the rendered answer plus its source listing, the two views of a
//! single composed [`crag_core::generator::Answer`]. The form UI itself is
//! static files served by the fallback in `main.rs`; clearing the output
//! fields is purely client-side and never reaches this layer.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crag_core::pipeline::Pipeline;
use crag_core::retriever::RetrieveError;

/// Shared application state. Everything is built before the server starts
/// serving and immutable afterwards.
pub struct AppState {
    pub pipeline: Pipeline,
    pub default_top_k: usize,
    pub health: HealthInfo,
}

/// Startup snapshot reported by `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthInfo {
    pub model_name: String,
    pub dimensions: usize,
    pub corpus_size: usize,
}

/// Incoming question.
#[derive(Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Number of complaints to retrieve; falls back to the configured
    /// default when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Rendered answer plus its source listing.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AskResponse {
    pub answer: String,
    pub sources: String,
}

/// Structured API error response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Build the API router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ask", post(ask_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

/// `POST /api/ask` — answer a question over the complaint corpus.
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ApiError>)> {
    let top_k = request.top_k.unwrap_or(state.default_top_k);
    let answer = state
        .pipeline
        .answer(&request.question, top_k)
        .map_err(error_response)?;

    Ok(Json(AskResponse {
        answer: answer.render_text(),
        sources: answer.render_sources(),
    }))
}

/// `GET /api/health` — report the loaded model and corpus size.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthInfo> {
    Json(state.health.clone())
}

fn error_response(err: RetrieveError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match err {
        RetrieveError::EmptyQuery => (StatusCode::BAD_REQUEST, "empty_question"),
        RetrieveError::InvalidTopK => (StatusCode::BAD_REQUEST, "invalid_top_k"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    (
        status,
        Json(ApiError {
            code: code.into(),
            message: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crag_core::retriever::Retriever;
    use crag_core::testutil::{FailingEmbedder, MockEmbedder, StubIndex, hits, store_with_chunks};

    use super::*;

    fn stub_app(positions: &[usize], store_len: usize, default_top_k: usize) -> Router {
        let retriever = Retriever::new(
            Arc::new(MockEmbedder::new(3)),
            Arc::new(StubIndex {
                hits: hits(positions),
                len: store_len,
                dimensions: 3,
            }),
            Arc::new(store_with_chunks(store_len)),
        )
        .unwrap();
        let state = Arc::new(AppState {
            pipeline: Pipeline::new(retriever),
            default_top_k,
            health: HealthInfo {
                model_name: "mock-embedder".into(),
                dimensions: 3,
                corpus_size: store_len,
            },
        });
        router(state)
    }

    async fn post_ask(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn ask_returns_answer_and_sources() {
        let app = stub_app(&[2, 0], 3, 5);
        let (status, body) = post_ask(app, r#"{"question": "late fee dispute"}"#).await;

        assert_eq!(status, StatusCode::OK);
        let answer = body["answer"].as_str().unwrap();
        assert!(answer.starts_with("Question: late fee dispute\n\n"));
        assert!(answer.contains("1. [Product 2] complaint text 2\n"));
        assert!(answer.contains("2. [Product 0] complaint text 0\n"));
        assert_eq!(
            body["sources"],
            "1. Product: Product 2, Complaint ID: CMP-2\n\
             2. Product: Product 0, Complaint ID: CMP-0\n"
        );
    }

    #[tokio::test]
    async fn out_of_range_hits_are_dropped_from_the_response() {
        // Index returns [2, 7, 100] against a 10-chunk store: the response
        // enumerates exactly the two valid hits.
        let app = stub_app(&[2, 7, 100], 10, 5);
        let (status, body) = post_ask(app, r#"{"question": "late fee dispute", "top_k": 3}"#).await;

        assert_eq!(status, StatusCode::OK);
        let answer = body["answer"].as_str().unwrap();
        assert!(answer.contains("1. [Product 2]"));
        assert!(answer.contains("2. [Product 7]"));
        assert!(!answer.contains("3. "));
        assert_eq!(
            body["sources"],
            "1. Product: Product 2, Complaint ID: CMP-2\n\
             2. Product: Product 7, Complaint ID: CMP-7\n"
        );
    }

    #[tokio::test]
    async fn empty_corpus_yields_header_note_and_empty_sources() {
        let app = stub_app(&[], 0, 5);
        let (status, body) = post_ask(app, r#"{"question": "anything"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["answer"],
            "Question: anything\n\n\
             Based on the complaints, here are the key points:\n\
             \nNote: This summary is based only on the retrieved complaints."
        );
        assert_eq!(body["sources"], "");
    }

    #[tokio::test]
    async fn empty_question_is_a_400() {
        let app = stub_app(&[0], 1, 5);
        let (status, body) = post_ask(app, r#"{"question": "   "}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "empty_question");
    }

    #[tokio::test]
    async fn zero_top_k_is_a_400() {
        let app = stub_app(&[0], 1, 5);
        let (status, body) = post_ask(app, r#"{"question": "late fees", "top_k": 0}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_top_k");
    }

    #[tokio::test]
    async fn request_top_k_overrides_the_default() {
        let app = stub_app(&[0, 1, 2], 3, 5);
        let (status, body) = post_ask(app, r#"{"question": "late fees", "top_k": 1}"#).await;

        assert_eq!(status, StatusCode::OK);
        let answer = body["answer"].as_str().unwrap();
        assert!(answer.contains("1. [Product 0]"));
        assert!(!answer.contains("2. "));
    }

    #[tokio::test]
    async fn embedder_failure_is_a_readable_500() {
        let retriever = Retriever::new(
            Arc::new(FailingEmbedder),
            Arc::new(StubIndex {
                hits: vec![],
                len: 1,
                dimensions: 3,
            }),
            Arc::new(store_with_chunks(1)),
        )
        .unwrap();
        let state = Arc::new(AppState {
            pipeline: Pipeline::new(retriever),
            default_top_k: 5,
            health: HealthInfo {
                model_name: "failing-embedder".into(),
                dimensions: 3,
                corpus_size: 1,
            },
        });
        let app = router(state);
        let (status, body) = post_ask(app, r#"{"question": "late fees"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal_error");
        assert!(body["message"].as_str().unwrap().contains("mock failure"));
    }

    #[tokio::test]
    async fn health_reports_model_and_corpus() {
        let app = stub_app(&[], 7, 5);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthInfo = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            health,
            HealthInfo {
                model_name: "mock-embedder".into(),
                dimensions: 3,
                corpus_size: 7,
            }
        );
    }
}
