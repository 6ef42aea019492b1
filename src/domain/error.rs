//! Domain-level error types for teams-chat-export.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The remote API answered with a non-success status.
    #[error("{}", remote_fetch_message(*status, conversation_id.as_deref(), url))]
    RemoteFetch {
        status: u16,
        conversation_id: Option<String>,
        url: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Token acquisition failed.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A template could not be loaded or is missing a placeholder.
    #[error("Template error: {message}")]
    Template { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

fn remote_fetch_message(status: u16, conversation_id: Option<&str>, url: &str) -> String {
    match conversation_id {
        Some(id) => format!("Remote fetch failed with status {status} for conversation {id} ({url})"),
        None => format!("Remote fetch failed with status {status} ({url})"),
    }
}

impl AppError {
    /// Create a remote fetch error for a non-success response.
    pub fn remote_fetch(status: u16, url: impl Into<String>) -> Self {
        Self::RemoteFetch {
            status,
            conversation_id: None,
            url: url.into(),
        }
    }

    /// Create an HTTP error from a client error.
    pub fn http(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Http {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Attach the conversation being processed to a remote fetch error.
    #[must_use]
    pub fn for_conversation(self, id: &str) -> Self {
        match self {
            Self::RemoteFetch { status, url, .. } => Self::RemoteFetch {
                status,
                conversation_id: Some(id.to_string()),
                url,
            },
            other => other,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_conversation_tags_remote_fetch() {
        let err = AppError::remote_fetch(403, "https://example/chats/1/messages").for_conversation("19:a");
        match &err {
            AppError::RemoteFetch {
                status,
                conversation_id,
                ..
            } => {
                assert_eq!(*status, 403);
                assert_eq!(conversation_id.as_deref(), Some("19:a"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("conversation 19:a"));
    }

    #[test]
    fn test_for_conversation_leaves_other_errors() {
        let err = AppError::Config {
            message: "bad".into(),
        }
        .for_conversation("19:a");
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_http_keeps_source() {
        let err = AppError::http(std::io::Error::other("connection reset"));
        assert_eq!(err.to_string(), "HTTP error: connection reset");
        assert!(std::error::Error::source(&err).is_some());
    }
}
