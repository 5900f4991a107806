//! Reddit adapter using the OAuth2 client-credentials flow.
//!
//! Tokens are fetched from the auth host, cached until shortly before
//! expiry, and sent as bearer credentials to the API host. Every request,
//! including token requests, passes through the shared rate limiter.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pulse_core::{AppConfig, Source};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::CollectError;
use crate::rate_limit::RateLimiter;
use crate::retry::retry_with_backoff;
use crate::sources::{is_fatal_for_source, parse_base_url};
use crate::types::RawItem;

const DEFAULT_AUTH_BASE: &str = "https://www.reddit.com/";
const DEFAULT_API_BASE: &str = "https://oauth.reddit.com/";

/// Expire cached tokens this long before the upstream deadline.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

/// How many comments are worth one upvote when computing engagement.
const COMMENT_WEIGHT: i64 = 2;

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Client for the Reddit data API.
pub struct RedditClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_base: Url,
    api_base: Url,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    backoff_base_ms: u64,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    /// Fullname, e.g. `t3_abc123`.
    name: String,
    title: String,
    #[serde(default)]
    selftext: String,
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    created_utc: f64,
}

impl RedditClient {
    /// Creates a client pointed at the production Reddit hosts.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &AppConfig, limiter: Arc<RateLimiter>) -> Result<Self, CollectError> {
        Self::with_base_urls(config, limiter, DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    /// Creates a client with custom auth and API hosts (for testing with
    /// wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CollectError::InvalidBaseUrl`] if either
    /// base URL does not parse.
    pub fn with_base_urls(
        config: &AppConfig,
        limiter: Arc<RateLimiter>,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.reddit_user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            client_id: config.reddit_client_id.clone(),
            client_secret: config.reddit_client_secret.clone(),
            auth_base: parse_base_url(auth_base)?,
            api_base: parse_base_url(api_base)?,
            limiter,
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            token: Mutex::new(None),
        })
    }

    /// Fetch hot posts from every watched subreddit.
    ///
    /// Per-subreddit failures are logged and skipped so one broken community
    /// does not cost the others. Credential and budget failures abort the
    /// whole source; if every subreddit fails the source is reported
    /// unavailable. Posts published before `cutoff` are dropped.
    ///
    /// # Errors
    ///
    /// - [`CollectError::Auth`] if Reddit rejects the credentials.
    /// - [`CollectError::RateLimitExceeded`] if the request budget runs out.
    /// - [`CollectError::SourceUnavailable`] if all subreddits fail.
    pub async fn collect(
        &self,
        subreddits: &[String],
        post_limit: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RawItem>, CollectError> {
        let mut items = Vec::new();
        let mut failures = 0usize;
        let mut last_error: Option<CollectError> = None;

        for subreddit in subreddits {
            match self.fetch_hot(subreddit, post_limit, cutoff).await {
                Ok(posts) => {
                    tracing::debug!(subreddit, count = posts.len(), "fetched subreddit");
                    items.extend(posts);
                }
                Err(err) if is_fatal_for_source(&err) => return Err(err),
                Err(err) => {
                    tracing::warn!(subreddit, error = %err, "subreddit fetch failed, skipping");
                    failures += 1;
                    last_error = Some(err);
                }
            }
        }

        if !subreddits.is_empty() && failures == subreddits.len() {
            let reason = last_error.map_or_else(String::new, |e| e.to_string());
            return Err(CollectError::SourceUnavailable {
                source_name: "reddit",
                attempts: failures,
                reason,
            });
        }

        Ok(items)
    }

    /// Fetch one subreddit's hot listing, with retries on transient errors.
    ///
    /// # Errors
    ///
    /// See [`RedditClient::collect`]; additionally returns
    /// [`CollectError::Deserialize`] if the listing does not match the
    /// expected shape.
    pub async fn fetch_hot(
        &self,
        subreddit: &str,
        limit: usize,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RawItem>, CollectError> {
        let token = self.access_token().await?;
        let posts = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let token = token.clone();
            async move { self.fetch_hot_once(subreddit, limit, &token).await }
        })
        .await?;

        Ok(posts
            .into_iter()
            .filter_map(|p| {
                #[allow(clippy::cast_possible_truncation)]
                let published_at = Utc.timestamp_opt(p.created_utc as i64, 0).single();
                // Posts with an unparseable timestamp are kept; the lookback
                // filter only drops posts known to be stale.
                if published_at.is_some_and(|ts| ts < cutoff) {
                    return None;
                }
                Some(RawItem {
                    source: Source::Reddit,
                    origin_id: p.name,
                    title: p.title,
                    body: p.selftext,
                    community: p.subreddit,
                    engagement: p.score + COMMENT_WEIGHT * p.num_comments,
                    published_at,
                })
            })
            .collect())
    }

    async fn fetch_hot_once(
        &self,
        subreddit: &str,
        limit: usize,
        token: &str,
    ) -> Result<Vec<Post>, CollectError> {
        self.limiter.acquire().await?;

        let mut url = self
            .api_base
            .join(&format!("r/{subreddit}/hot.json"))
            .map_err(|e| CollectError::InvalidBaseUrl {
                url: format!("r/{subreddit}/hot.json"),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("raw_json", "1");

        let response = self.client.get(url.clone()).bearer_auth(token).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CollectError::Auth {
                source_name: "reddit",
                reason: format!("listing request returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(CollectError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let listing: Listing =
            serde_json::from_str(&body).map_err(|e| CollectError::Deserialize {
                context: format!("r/{subreddit}/hot"),
                source: e,
            })?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Returns a cached application token, fetching a fresh one when the
    /// cache is empty or about to expire.
    async fn access_token(&self) -> Result<String, CollectError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async {
            self.fetch_token_once().await
        })
        .await?;

        let access_token = fresh.access_token.clone();
        let ttl = fresh.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        *cached = Some(CachedToken {
            access_token: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });
        Ok(access_token)
    }

    async fn fetch_token_once(&self) -> Result<TokenResponse, CollectError> {
        self.limiter.acquire().await?;

        let url = self
            .auth_base
            .join("api/v1/access_token")
            .map_err(|e| CollectError::InvalidBaseUrl {
                url: "api/v1/access_token".to_string(),
                reason: e.to_string(),
            })?;

        let response = self
            .client
            .post(url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CollectError::Auth {
                source_name: "reddit",
                reason: format!("token endpoint returned {status}"),
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
            context: "access_token".to_string(),
            source: e,
        })
    }
}
