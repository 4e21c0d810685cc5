//! Authentication error types.

use serde_json::Value;
use storefront_config_and_utils::CoreError;
use storefront_storage::StorageError;
use thiserror::Error;

/// Authentication error type.
///
/// The operation-level variants (`Rejected`, `Unreachable`, `Malformed`)
/// display only their human-readable message so the UI can show it as is.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The server answered with a non-success status.
    /// `message` is the body's `detail` or the operation's fallback.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response (connection refused, DNS, timeout).
    #[error("{message}")]
    Unreachable {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// A success response whose body did not have the expected shape.
    #[error("{message}")]
    Malformed {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid transition in the auth mode machine
    #[error("Invalid auth mode transition: {0}")]
    InvalidModeTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),
}

impl AuthError {
    /// Build a `Rejected` error from a response body, preferring its `detail`.
    pub fn rejected(status: u16, body: &str, fallback: &str) -> Self {
        AuthError::Rejected {
            status,
            message: detail_message(body).unwrap_or_else(|| fallback.to_string()),
        }
    }

    /// HTTP status for server rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            AuthError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Unreachable server
    /// - 5xx responses
    /// - Connection errors and timeouts
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Unreachable { .. } => true,
            AuthError::Rejected { status, .. } => *status >= 500,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }

    /// Rewrite transport and decoding failures into the operation's
    /// user-facing fallback message. Other errors pass through.
    pub(crate) fn with_fallback(self, fallback: &str) -> Self {
        match self {
            AuthError::Http(source) => AuthError::Unreachable {
                message: fallback.to_string(),
                source,
            },
            AuthError::Json(source) => AuthError::Malformed {
                message: fallback.to_string(),
                source,
            },
            other => other,
        }
    }
}

/// Extract the human-readable `detail` from an error body.
///
/// Accepts `{"detail": "text"}` and the validation shape
/// `{"detail": [{"msg": "text", ...}, ...]}` (first entry wins).
pub fn detail_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(entries) => entries
            .first()
            .and_then(|entry| entry.get("msg"))
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
