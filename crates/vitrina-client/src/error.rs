use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by backend (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid backend URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

/// Failures of a [`crate::CatalogSession`] operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backend call an operation depends on failed. Local state is
    /// unchanged for the entry that call was about.
    #[error("backend unavailable during {operation}: {source}")]
    BackendUnavailable {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("product {0} is not in this catalog")]
    NotInCatalog(String),

    #[error("catalog has not been saved yet")]
    NotPersisted,
}

impl CatalogError {
    pub(crate) fn backend(operation: &'static str) -> impl FnOnce(ClientError) -> Self {
        move |source| CatalogError::BackendUnavailable { operation, source }
    }
}
