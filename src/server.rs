//! HTTP front end: a single `POST /ask` route over the RAG engine

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    routing::post,
    Json, Router,
};
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServiceConfig;
use crate::error::AskError;
use crate::rag::RagEngine;

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Build the router with all routes
pub fn router(engine: Arc<RagEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(ask))
        .with_state(engine)
        .layer(cors)
}

/// Bind the configured address and serve until the process stops
pub async fn serve(config: &ServiceConfig, engine: Arc<RagEngine>) -> Result<()> {
    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Listening on http://{}", address);
    axum::serve(listener, router(engine))
        .await
        .context("Server error")?;

    Ok(())
}

/// POST /ask
///
/// The body is read raw so that any parse failure, whatever the content
/// type, is reported through `AskError`.
async fn ask(
    State(engine): State<Arc<RagEngine>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AskResponse>, AskError> {
    let question = parse_question(&body?)?;
    info!("Question: {}", question);

    let answer = engine.answer(&question).await?;
    info!(
        "Answer ({} chunks): {}",
        answer.context.len(),
        answer.answer
    );

    Ok(Json(AskResponse {
        answer: answer.answer,
    }))
}

/// The body must be a JSON object. An absent or false-like `question`
/// (`null`, `""`, `false`, `0`, `[]`, `{}`) is missing; any other
/// non-string value is malformed.
fn parse_question(body: &[u8]) -> Result<String, AskError> {
    let mut request: Map<String, Value> = serde_json::from_slice(body)?;
    match request.remove("question") {
        Some(question) if !is_blank(&question) => Ok(serde_json::from_value(question)?),
        _ => Err(AskError::MissingQuestion),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
