use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::index::IndexError;

/// Message returned when a request carries no question
pub const MISSING_QUESTION: &str = "Please provide a question";

/// Errors raised while answering a question
#[derive(Debug, Error)]
pub enum AskError {
    /// The request has no usable `question`
    #[error("{}", MISSING_QUESTION)]
    MissingQuestion,

    /// The request body could not be read, e.g. it is over the size limit
    #[error("{0}")]
    UnreadableBody(#[from] BytesRejection),

    /// The request body is not the expected JSON
    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),

    /// The question could not be embedded
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The index could not be queried
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    /// The chat model failed or returned nothing
    #[error("Generation failed: {0}")]
    Generation(String),
}

impl AskError {
    /// Create an embedding error, keeping the whole context chain
    pub fn embedding(err: anyhow::Error) -> Self {
        Self::Embedding(format!("{:#}", err))
    }

    /// Create a generation error, keeping the whole context chain
    pub fn generation(err: anyhow::Error) -> Self {
        Self::Generation(format!("{:#}", err))
    }

    /// Stable name of the failure class, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AskError::MissingQuestion => "missing_question",
            AskError::UnreadableBody(_) => "unreadable_body",
            AskError::MalformedBody(_) => "malformed_body",
            AskError::Embedding(_) => "embedding",
            AskError::Retrieval(_) => "retrieval",
            AskError::Generation(_) => "generation",
        }
    }

    /// Only input validation is a client error; every failure past it is a 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            AskError::MissingQuestion => StatusCode::BAD_REQUEST,
            AskError::UnreadableBody(_)
            | AskError::MalformedBody(_)
            | AskError::Embedding(_)
            | AskError::Retrieval(_)
            | AskError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AskError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed ({}): {}", self.kind(), self);
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
