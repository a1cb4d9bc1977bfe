//! Fetch-boundary errors and their user-visible rendering.

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    /// The request future panicked; a client bug rather than a server or
    /// network problem.
    #[error("request failed internally: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorCategory {
    Transport,
    NotFound,
    Server,
    Data,
    Validation,
}

impl FetchError {
    pub fn http(status: u16, body: &str) -> Self {
        let message = ApiError::message_from_body(body)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Self::Http {
            status,
            code: ErrorCode::from_status(status),
            message,
        }
    }

    pub fn category(&self) -> FetchErrorCategory {
        match self {
            FetchError::Network(_) => FetchErrorCategory::Transport,
            FetchError::Http {
                code: ErrorCode::NotFound,
                ..
            } => FetchErrorCategory::NotFound,
            FetchError::Http {
                code: ErrorCode::Validation,
                ..
            } => FetchErrorCategory::Validation,
            FetchError::Http { .. } => FetchErrorCategory::Server,
            FetchError::Decode(_) | FetchError::Internal(_) => FetchErrorCategory::Data,
            FetchError::Validation(_) => FetchErrorCategory::Validation,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text shown to the user in place of the page content.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => {
                "Could not reach the server. Is the backend server running?".to_string()
            }
            FetchError::Http { message, .. } => message.clone(),
            FetchError::Decode(_) => "Received malformed data from the server.".to_string(),
            FetchError::Validation(message) => message.clone(),
            FetchError::Internal(_) => {
                "Something went wrong while handling the response.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                code: ErrorCode::from_status(status.as_u16()),
                message: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_prefers_server_message() {
        let err = FetchError::http(404, r#"{"error":"Invalid ticker symbol 'ZZZZ'"}"#);
        assert_eq!(err.user_message(), "Invalid ticker symbol 'ZZZZ'");
        assert_eq!(err.category(), FetchErrorCategory::NotFound);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn http_error_falls_back_when_body_is_not_json() {
        let err = FetchError::http(502, "<html>bad gateway</html>");
        assert_eq!(err.user_message(), "request failed with status 502");
        assert_eq!(err.category(), FetchErrorCategory::Server);
    }

    #[test]
    fn network_errors_point_at_the_backend() {
        let err = FetchError::Network("connection refused".to_string());
        assert_eq!(err.category(), FetchErrorCategory::Transport);
        assert!(err.user_message().contains("backend server"));
    }
}
