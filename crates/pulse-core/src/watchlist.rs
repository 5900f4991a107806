use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Tracked communities and topics, loaded from a YAML file at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Watchlist {
    pub subreddits: Vec<String>,
    pub news_topics: Vec<String>,
    #[serde(default)]
    pub news_sources: Vec<String>,
}

impl Watchlist {
    /// Built-in default watchlist, used when no file is configured.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            subreddits: [
                "technology",
                "science",
                "worldnews",
                "politics",
                "datascience",
                "MachineLearning",
                "artificial",
                "futurology",
                "space",
                "environment",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            news_topics: [
                "artificial intelligence",
                "machine learning",
                "technology",
                "science",
                "climate",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            news_sources: ["bbc-news", "reuters", "associated-press", "cnn", "techcrunch"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Load the watchlist from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::WatchlistIo`] if the file cannot be read, or
/// [`ConfigError::WatchlistParse`] if it is not valid YAML.
pub fn load_watchlist(path: &Path) -> Result<Watchlist, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::WatchlistIo {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yaml::from_str(&raw).map_err(|e| ConfigError::WatchlistParse {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_watchlist_is_nonempty() {
        let w = Watchlist::builtin();
        assert_eq!(w.subreddits.len(), 10);
        assert!(!w.news_topics.is_empty());
        assert!(!w.news_sources.is_empty());
    }

    #[test]
    fn parses_yaml_watchlist() {
        let yaml = "subreddits:\n  - rust\nnews_topics:\n  - compilers\n";
        let w: Watchlist = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(w.subreddits, vec!["rust"]);
        assert_eq!(w.news_topics, vec!["compilers"]);
        assert!(w.news_sources.is_empty(), "news_sources defaults to empty");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_watchlist(Path::new("/nonexistent/watchlist.yaml"));
        assert!(matches!(result, Err(ConfigError::WatchlistIo { .. })));
    }
}
