use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Graph database error: {message}")]
    Graph { message: String },

    #[error("Search backend error: {message}")]
    Search { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Search found nothing; carries spellcheck suggestions for the client.
    #[error("No entries found for query '{query}'")]
    NoSearchResults {
        query: String,
        suggestions: Vec<String>,
    },
}

impl ContentServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ContentServiceError::NotFound(what.into())
    }

    pub fn bad_request(what: impl Into<String>) -> Self {
        ContentServiceError::BadRequest(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ContentServiceError::NotFound(_) | ContentServiceError::NoSearchResults { .. } => {
                StatusCode::NOT_FOUND
            }
            ContentServiceError::BadRequest(_)
            | ContentServiceError::Json(_)
            | ContentServiceError::Toml(_) => StatusCode::BAD_REQUEST,
            ContentServiceError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ContentServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ContentServiceError::Http(_) => StatusCode::BAD_GATEWAY,
            ContentServiceError::Graph { .. }
            | ContentServiceError::Search { .. }
            | ContentServiceError::Io(_)
            | ContentServiceError::Config(_)
            | ContentServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            ContentServiceError::NoSearchResults { query, suggestions } => {
                let mut messages = vec![format!("No entries found for query '{}'", query)];
                messages.extend(suggestions.iter().cloned());
                messages
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<neo4rs::Error> for ContentServiceError {
    fn from(err: neo4rs::Error) -> Self {
        ContentServiceError::Graph {
            message: err.to_string(),
        }
    }
}

impl From<neo4rs::DeError> for ContentServiceError {
    fn from(err: neo4rs::DeError) -> Self {
        ContentServiceError::Graph {
            message: err.to_string(),
        }
    }
}

/// Error payload returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub reason: String,
    pub messages: Vec<String>,
}

impl IntoResponse for ContentServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = ErrorBody {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error").to_string(),
            messages: self.messages(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ContentServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ContentServiceError::not_found("x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ContentServiceError::bad_request("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ContentServiceError::UnsupportedMediaType("image/png".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ContentServiceError::Graph { message: "down".into() }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_no_results_messages_carry_suggestions() {
        let err = ContentServiceError::NoSearchResults {
            query: "glucse".into(),
            suggestions: vec!["glucose".into()],
        };
        let messages = err.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], "glucose");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
