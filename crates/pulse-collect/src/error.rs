use thiserror::Error;

/// Errors surfaced while collecting from upstream sources.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credentials were rejected by the upstream API (401/403).
    #[error("{source_name} authentication failed: {reason}")]
    Auth {
        source_name: &'static str,
        reason: String,
    },

    /// The local request budget for a source is exhausted for the current
    /// window. Not retriable within a cycle; the source is skipped.
    #[error("{source_name} request budget exhausted ({budget} per {window_secs}s)")]
    RateLimitExceeded {
        source_name: &'static str,
        budget: usize,
        window_secs: u64,
    },

    /// Every community or topic for a source failed this cycle.
    #[error("{source_name} unavailable: all {attempts} fetches failed; last error: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        attempts: usize,
        reason: String,
    },

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The upstream returned a status the adapter does not handle.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// An adapter was constructed with a base URL that does not parse.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Persistence failure while landing a cycle's results.
    #[error(transparent)]
    Db(#[from] pulse_db::DbError),
}
