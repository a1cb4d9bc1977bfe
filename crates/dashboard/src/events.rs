//! Error and notice modeling shared by the page controllers.

use client_core::{FetchError, FetchErrorCategory};

/// Turns a startup failure (config, base url, client construction) into a hint
/// the terminal can print before exiting.
pub fn classify_startup_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("invalid api base url") || lower.contains("unsupported scheme") {
        "Invalid API URL; check --api-url, MARKETMIND_API_URL or marketmind.toml.".to_string()
    } else if lower.contains("failed to parse config") || lower.contains("toml") {
        "Config file could not be parsed; fix marketmind.toml and retry.".to_string()
    } else if lower.contains("failed to build http client") {
        "HTTP client could not be initialised; check TLS/system configuration.".to_string()
    } else {
        format!("Startup error: {message}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageError {
    category: FetchErrorCategory,
    message: String,
}

impl PageError {
    pub fn from_fetch(err: &FetchError) -> Self {
        Self {
            category: err.category(),
            message: err.user_message(),
        }
    }

    /// Page-specific wording replaces the server text, except for client-side
    /// validation and an unreachable backend, which always read as-is.
    pub fn with_fallback(err: &FetchError, fallback: impl Into<String>) -> Self {
        let mut page_error = Self::from_fetch(err);
        if !matches!(err, FetchError::Validation(_)) && !page_error.backend_unreachable() {
            page_error.message = fallback.into();
        }
        page_error
    }

    pub fn backend_unreachable(&self) -> bool {
        matches!(self.category, FetchErrorCategory::Transport)
    }

    pub fn category(&self) -> FetchErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn render(&self) -> String {
        format!("Error: {}", self.message)
    }
}

/// Outcome of a user action (trade, alert, watchlist edit) shown above the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Error(text) => text,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Notice::Success(text) => format!("OK: {text}"),
            Notice::Error(text) => format!("Error: {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn fallback_replaces_server_text_but_not_validation() {
        let http = FetchError::Http {
            status: 500,
            code: ErrorCode::Internal,
            message: "Traceback (most recent call last)".to_string(),
        };
        let err = PageError::with_fallback(&http, "Could not load.");
        assert_eq!(err.message(), "Could not load.");

        let validation = FetchError::Validation("Please enter a stock ticker".to_string());
        let err = PageError::with_fallback(&validation, "Could not load.");
        assert_eq!(err.message(), "Please enter a stock ticker");
    }

    #[test]
    fn network_failure_keeps_backend_hint() {
        let err = PageError::with_fallback(
            &FetchError::Network("connection refused".to_string()),
            "Could not load.",
        );
        assert!(err.backend_unreachable());
        assert!(err.render().contains("backend server"));
    }

    #[test]
    fn startup_failures_are_classified() {
        assert!(
            classify_startup_failure("invalid API base url 'ftp://x': unsupported scheme 'ftp'")
                .starts_with("Invalid API URL")
        );
        assert_eq!(classify_startup_failure("boom"), "Startup error: boom");
    }
}
