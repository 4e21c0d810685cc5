use storefront_config_and_utils::CoreError;
use thiserror::Error;

/// Catalog error type. Service-level variants display only their message.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Non-success status; `message` is the body's `detail` or the fallback.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// No response from the service.
    #[error("{message}")]
    Unreachable {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CatalogError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
