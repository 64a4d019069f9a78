use thiserror::Error;

/// Errors returned while fetching, enriching or persisting posts.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The platform answered HTTP 429.
    #[error("rate limited by platform API (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Any other non-success status from the platform API.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// A request could not be built from the given input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The post store or cycle journal failed.
    #[error("storage error: {0}")]
    Db(#[from] postwatch_db::DbError),
}
