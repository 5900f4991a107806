//! Upstream source adapters.

pub mod news;
pub mod reddit;

pub use news::NewsClient;
pub use reddit::RedditClient;

use crate::error::CollectError;

/// Base URL normalization shared by the adapters: exactly one trailing slash
/// so [`reqwest::Url::join`] appends instead of replacing the last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<reqwest::Url, CollectError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    reqwest::Url::parse(&normalised).map_err(|e| CollectError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

/// Fatal per-source errors abort the whole source instead of moving on to
/// the next community or topic.
pub(crate) fn is_fatal_for_source(err: &CollectError) -> bool {
    matches!(
        err,
        CollectError::Auth { .. } | CollectError::RateLimitExceeded { .. }
    )
}
