use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod app_config;
mod config;
mod watchlist;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use watchlist::{load_watchlist, Watchlist};

/// One upstream data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Reddit,
    News,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::News => "news",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reddit" => Ok(Source::Reddit),
            "news" => Ok(Source::News),
            other => Err(CoreError::InvalidSource(other.to_string())),
        }
    }
}

/// A normalized collected item, ready for scoring and storage.
///
/// `(source, origin_id)` is the global identity; storing the same pair twice
/// refreshes `engagement` only. `sentiment_score` and `keywords` stay empty
/// until the scoring pipeline fills them in.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub source: Source,
    pub origin_id: String,
    pub collected_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub text: String,
    pub community: String,
    pub engagement: i64,
    pub sentiment_score: Option<f64>,
    pub keywords: Vec<String>,
}

/// Engagement-only refresh for a record that is already stored.
#[derive(Debug, Clone)]
pub struct EngagementUpdate {
    pub source: Source,
    pub origin_id: String,
    pub engagement: i64,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid source: {0}")]
    InvalidSource(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read watchlist {path}: {source}")]
    WatchlistIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse watchlist {path}: {source}")]
    WatchlistParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn source_round_trips_through_str() {
        assert_eq!(Source::from_str("reddit").unwrap(), Source::Reddit);
        assert_eq!(Source::from_str("news").unwrap(), Source::News);
        assert_eq!(Source::Reddit.as_str(), "reddit");
        assert_eq!(Source::News.as_str(), "news");
    }

    #[test]
    fn source_rejects_unknown_values() {
        assert!(matches!(
            Source::from_str("twitter"),
            Err(CoreError::InvalidSource(ref s)) if s == "twitter"
        ));
    }
}
