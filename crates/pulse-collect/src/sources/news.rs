//! News API adapter using key-in-header authentication.
//!
//! Pulls recent articles per watched topic plus a top-headlines sweep over
//! the watched outlets, then dedups by article URL and caps the batch. The
//! upstream marks withdrawn articles with a `[Removed]` placeholder; those
//! are dropped during parsing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::{AppConfig, Source};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::CollectError;
use crate::rate_limit::RateLimiter;
use crate::retry::retry_with_backoff;
use crate::sources::{is_fatal_for_source, parse_base_url};
use crate::types::RawItem;

const DEFAULT_BASE_URL: &str = "https://newsapi.org/";

const REMOVED_MARKER: &str = "[Removed]";

const USER_AGENT: &str = "socialpulse/0.1 (trend-monitor)";

/// Client for the News API.
pub struct NewsClient {
    client: Client,
    api_key: String,
    base_url: Url,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    source: ArticleSource,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl NewsClient {
    /// Creates a client pointed at the production News API.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &AppConfig, limiter: Arc<RateLimiter>) -> Result<Self, CollectError> {
        Self::with_base_url(config, limiter, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CollectError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        config: &AppConfig,
        limiter: Arc<RateLimiter>,
        base_url: &str,
    ) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key: config.news_api_key.clone(),
            base_url: parse_base_url(base_url)?,
            limiter,
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        })
    }

    /// Fetch recent articles for every watched topic, plus top headlines
    /// from the watched outlets.
    ///
    /// Per-topic failures are logged and skipped. Credential and budget
    /// failures abort the whole source; if every topic fails the source is
    /// reported unavailable. The combined batch is deduped by URL and capped
    /// at `article_limit`.
    ///
    /// # Errors
    ///
    /// - [`CollectError::Auth`] if the API key is rejected.
    /// - [`CollectError::RateLimitExceeded`] if the request budget runs out.
    /// - [`CollectError::SourceUnavailable`] if all topics fail.
    pub async fn collect(
        &self,
        topics: &[String],
        outlets: &[String],
        article_limit: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RawItem>, CollectError> {
        let mut items: Vec<RawItem> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut failures = 0usize;
        let mut last_error: Option<CollectError> = None;

        for topic in topics {
            match self.fetch_everything(topic, article_limit, cutoff).await {
                Ok(articles) => {
                    tracing::debug!(topic, count = articles.len(), "fetched topic");
                    for item in articles {
                        if seen_urls.insert(item.origin_id.clone()) {
                            items.push(item);
                        }
                    }
                }
                Err(err) if is_fatal_for_source(&err) => return Err(err),
                Err(err) => {
                    tracing::warn!(topic, error = %err, "topic fetch failed, skipping");
                    failures += 1;
                    last_error = Some(err);
                }
            }
        }

        if !topics.is_empty() && failures == topics.len() {
            let reason = last_error.map_or_else(String::new, |e| e.to_string());
            return Err(CollectError::SourceUnavailable {
                source_name: "news",
                attempts: failures,
                reason,
            });
        }

        if !outlets.is_empty() {
            match self.fetch_top_headlines(outlets, article_limit).await {
                Ok(articles) => {
                    for item in articles {
                        if seen_urls.insert(item.origin_id.clone()) {
                            items.push(item);
                        }
                    }
                }
                Err(err) if is_fatal_for_source(&err) => return Err(err),
                Err(err) => {
                    // Headlines are a bonus sweep on top of the topic queries.
                    tracing::warn!(error = %err, "top-headlines fetch failed, skipping");
                }
            }
        }

        items.truncate(article_limit);
        Ok(items)
    }

    /// Fetch recent articles matching `topic`, newest first.
    ///
    /// # Errors
    ///
    /// See [`NewsClient::collect`]; additionally returns
    /// [`CollectError::Deserialize`] if the response does not match the
    /// expected shape.
    pub async fn fetch_everything(
        &self,
        topic: &str,
        page_size: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RawItem>, CollectError> {
        let mut url = self.endpoint("v2/everything")?;
        url.query_pairs_mut()
            .append_pair("q", topic)
            .append_pair("from", &cutoff.to_rfc3339())
            .append_pair("language", "en")
            .append_pair("sortBy", "publishedAt")
            .append_pair("pageSize", &page_size.to_string());

        self.request_articles(url).await
    }

    /// Fetch current top headlines from the given outlets.
    ///
    /// # Errors
    ///
    /// See [`NewsClient::fetch_everything`].
    pub async fn fetch_top_headlines(
        &self,
        outlets: &[String],
        page_size: usize,
    ) -> Result<Vec<RawItem>, CollectError> {
        let mut url = self.endpoint("v2/top-headlines")?;
        url.query_pairs_mut()
            .append_pair("sources", &outlets.join(","))
            .append_pair("pageSize", &page_size.to_string());

        self.request_articles(url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, CollectError> {
        self.base_url
            .join(path)
            .map_err(|e| CollectError::InvalidBaseUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn request_articles(&self, url: Url) -> Result<Vec<RawItem>, CollectError> {
        let response = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move { self.request_once(url).await }
        })
        .await?;

        Ok(response
            .articles
            .into_iter()
            .filter_map(article_to_item)
            .collect())
    }

    async fn request_once(&self, url: Url) -> Result<ArticlesResponse, CollectError> {
        self.limiter.acquire().await?;

        let response = self
            .client
            .get(url.clone())
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CollectError::Auth {
                source_name: "news",
                reason: format!("request returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(CollectError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CollectError::Deserialize {
            context: url.path().to_string(),
            source: e,
        })
    }
}

/// Convert one upstream article, dropping removed or URL-less entries.
fn article_to_item(article: Article) -> Option<RawItem> {
    let url = article.url?;
    let title = article.title.unwrap_or_default();
    if title.is_empty() || title == REMOVED_MARKER {
        return None;
    }
    let community = article
        .source
        .name
        .map(|n| n.to_lowercase())
        .unwrap_or_else(|| "unknown".to_string());

    Some(RawItem {
        source: Source::News,
        origin_id: url,
        title,
        body: article.description.unwrap_or_default(),
        community,
        engagement: 0,
        published_at: article.published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: Option<&str>, url: Option<&str>) -> Article {
        Article {
            source: ArticleSource {
                name: Some("BBC News".to_string()),
            },
            title: title.map(ToString::to_string),
            description: Some("description".to_string()),
            url: url.map(ToString::to_string),
            published_at: None,
        }
    }

    #[test]
    fn removed_articles_are_dropped() {
        assert!(article_to_item(article(Some(REMOVED_MARKER), Some("https://x"))).is_none());
        assert!(article_to_item(article(None, Some("https://x"))).is_none());
        assert!(article_to_item(article(Some("ok"), None)).is_none());
    }

    #[test]
    fn outlet_name_becomes_lowercase_community() {
        let item = article_to_item(article(Some("A headline"), Some("https://x"))).expect("item");
        assert_eq!(item.community, "bbc news");
        assert_eq!(item.origin_id, "https://x");
        assert_eq!(item.engagement, 0);
    }
}
