use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Error taxonomy shared by the services and the HTTP layer.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("Session not found")]
    NotFound,
    #[error("Login required")]
    Unauthenticated,
    #[error("Failed to generate a reply")]
    Generation(String),
    #[error("Storage error: {0}")]
    Persistence(String),
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ChatError::Validation(msg.into())
    }
}

impl From<duckdb::Error> for ChatError {
    fn from(e: duckdb::Error) -> Self {
        ChatError::Persistence(e.to_string())
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::NotFound => StatusCode::NOT_FOUND,
            ChatError::Unauthenticated => StatusCode::UNAUTHORIZED,
            // Generation detail stays server-side; the client sees one generic failure.
            ChatError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChatError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
