//! One end-to-end collection cycle.
//!
//! A [`Collector`] is built once at process startup and reused for every
//! cycle, so the per-source rate limiters keep their rolling windows across
//! cycles; the News budget in particular is a per-day allowance that must
//! not reset every 30 minutes. A cycle fans out to both sources
//! concurrently, normalizes and scores the combined batch, lands it in the
//! store, recomputes the trend cache, and evicts expired rows. A cycle with
//! one dead source finishes as `partial`; only both sources failing marks it
//! `failed`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pulse_analysis::{score_records, LexiconScorer};
use pulse_core::{AppConfig, Watchlist};
use pulse_db::{CycleOutcome, DbError};
use sqlx::SqlitePool;

use crate::error::CollectError;
use crate::normalize::normalize_batch;
use crate::rate_limit::RateLimiter;
use crate::sources::{NewsClient, RedditClient};
use crate::types::RawItem;

const REDDIT_WINDOW_SECS: u64 = 60;
const NEWS_WINDOW_SECS: u64 = 86_400;

/// Minimum per-source mentions for a keyword to count as cross-platform.
const TREND_SUPPORT: i64 = 2;

/// Upstream hosts a collector talks to. Overridden in tests to point at mock
/// servers.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub reddit_auth: String,
    pub reddit_api: String,
    pub news_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            reddit_auth: "https://www.reddit.com/".to_string(),
            reddit_api: "https://oauth.reddit.com/".to_string(),
            news_api: "https://newsapi.org/".to_string(),
        }
    }
}

/// Summary of a finished cycle, mirrored into the `collection_cycles` row.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: i64,
    pub public_id: String,
    pub status: String,
    pub reddit_outcome: String,
    pub news_outcome: String,
    pub fetched: usize,
    pub deduplicated: usize,
    pub inserted: u64,
    pub updated: u64,
    pub evicted: u64,
    pub trends: usize,
}

/// Long-lived collection driver holding both source clients.
///
/// The rate limiters (and the Reddit token cache) live inside the clients,
/// so their state spans cycles for as long as the collector does. Build one
/// per process and share it between the scheduler and any manual triggers.
pub struct Collector {
    reddit: RedditClient,
    news: NewsClient,
}

impl Collector {
    /// Build a collector pointed at the production hosts.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if a `reqwest::Client` cannot be
    /// constructed.
    pub fn new(config: &AppConfig) -> Result<Self, CollectError> {
        Self::with_endpoints(config, &Endpoints::default())
    }

    /// Build a collector pointed at explicit hosts.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if a `reqwest::Client` cannot be
    /// constructed, or [`CollectError::InvalidBaseUrl`] if a host does not
    /// parse.
    pub fn with_endpoints(
        config: &AppConfig,
        endpoints: &Endpoints,
    ) -> Result<Self, CollectError> {
        let reddit_limiter = Arc::new(RateLimiter::new(
            "reddit",
            config.reddit_requests_per_minute,
            Duration::from_secs(REDDIT_WINDOW_SECS),
            Duration::from_secs(config.rate_limit_max_wait_secs),
        ));
        let news_limiter = Arc::new(RateLimiter::new(
            "news",
            config.news_requests_per_day,
            Duration::from_secs(NEWS_WINDOW_SECS),
            Duration::from_secs(config.rate_limit_max_wait_secs),
        ));

        let reddit = RedditClient::with_base_urls(
            config,
            reddit_limiter,
            &endpoints.reddit_auth,
            &endpoints.reddit_api,
        )?;
        let news = NewsClient::with_base_url(config, news_limiter, &endpoints.news_api)?;

        Ok(Self { reddit, news })
    }

    /// Run one collection cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Db`] if persistence fails. Source failures do
    /// not error; they degrade the cycle's status instead.
    pub async fn run_cycle(
        &self,
        pool: &SqlitePool,
        config: &AppConfig,
        watchlist: &Watchlist,
    ) -> Result<CycleReport, CollectError> {
        let cycle = pulse_db::create_cycle(pool).await?;
        tracing::info!(cycle_id = cycle.id, public_id = %cycle.public_id, "collection cycle started");

        let now = Utc::now();
        let lookback_cutoff = now
            - chrono::Duration::hours(i64::try_from(config.lookback_hours).unwrap_or(i64::MAX));

        let (reddit_result, news_result) = tokio::join!(
            self.reddit.collect(
                &watchlist.subreddits,
                config.reddit_post_limit,
                lookback_cutoff
            ),
            self.news.collect(
                &watchlist.news_topics,
                &watchlist.news_sources,
                config.news_article_limit,
                lookback_cutoff,
            ),
        );

        let mut items: Vec<RawItem> = Vec::new();
        let reddit_outcome = match reddit_result {
            Ok(fetched) => {
                items.extend(fetched);
                SUCCEEDED.to_string()
            }
            Err(err) => {
                tracing::error!(error = %err, "reddit collection failed this cycle");
                failure_outcome(&err)
            }
        };
        let news_outcome = match news_result {
            Ok(fetched) => {
                items.extend(fetched);
                SUCCEEDED.to_string()
            }
            Err(err) => {
                tracing::error!(error = %err, "news collection failed this cycle");
                failure_outcome(&err)
            }
        };

        if reddit_outcome != SUCCEEDED && news_outcome != SUCCEEDED {
            pulse_db::fail_cycle(pool, cycle.id, "both sources unavailable").await?;
            return Ok(CycleReport {
                cycle_id: cycle.id,
                public_id: cycle.public_id,
                status: "failed".to_string(),
                reddit_outcome,
                news_outcome,
                fetched: 0,
                deduplicated: 0,
                inserted: 0,
                updated: 0,
                evicted: 0,
                trends: 0,
            });
        }

        let landed = land_batch(pool, config, items).await;
        let (fetched, deduplicated, inserted, updated, evicted, trends) = match landed {
            Ok(counts) => counts,
            Err(err) => {
                // Keep the cycle row honest even when persistence blows up.
                let _ = pulse_db::fail_cycle(pool, cycle.id, &err.to_string()).await;
                return Err(err.into());
            }
        };

        let status = if reddit_outcome == SUCCEEDED && news_outcome == SUCCEEDED {
            "succeeded"
        } else {
            "partial"
        };

        let outcome = CycleOutcome {
            reddit_outcome: reddit_outcome.clone(),
            news_outcome: news_outcome.clone(),
            fetched: i64::try_from(fetched).unwrap_or(i64::MAX),
            deduplicated: i64::try_from(deduplicated).unwrap_or(i64::MAX),
            inserted: i64::try_from(inserted).unwrap_or(i64::MAX),
            updated: i64::try_from(updated).unwrap_or(i64::MAX),
            evicted: i64::try_from(evicted).unwrap_or(i64::MAX),
        };
        pulse_db::complete_cycle(pool, cycle.id, status, &outcome).await?;

        tracing::info!(
            cycle_id = cycle.id,
            status,
            fetched,
            deduplicated,
            inserted,
            updated,
            evicted,
            trends,
            "collection cycle finished"
        );

        Ok(CycleReport {
            cycle_id: cycle.id,
            public_id: cycle.public_id,
            status: status.to_string(),
            reddit_outcome,
            news_outcome,
            fetched,
            deduplicated,
            inserted,
            updated,
            evicted,
            trends,
        })
    }
}

const SUCCEEDED: &str = "succeeded";

/// Label a failed source outcome with the failure kind, so an operator can
/// tell a credential problem from an outage or a spent request budget.
fn failure_outcome(err: &CollectError) -> String {
    let kind = match err {
        CollectError::Auth { .. } => "auth",
        CollectError::RateLimitExceeded { .. } => "rate_limited",
        CollectError::SourceUnavailable { .. } => "unavailable",
        _ => "error",
    };
    format!("failed: {kind}")
}

/// Normalize, score, persist, recompute trends, and evict, in that order.
async fn land_batch(
    pool: &SqlitePool,
    config: &AppConfig,
    items: Vec<RawItem>,
) -> Result<(usize, usize, u64, u64, u64, usize), DbError> {
    let now = Utc::now();

    let known = pulse_db::fetch_known_keys(pool).await?;
    let mut batch = normalize_batch(items, &known, now);
    score_records(
        &LexiconScorer,
        &mut batch.new_records,
        config.keywords_per_record,
    );

    let (inserted, updated) =
        pulse_db::upsert_batch(pool, &batch.new_records, &batch.engagement_updates).await?;

    let trends =
        pulse_db::compute_trend_aggregates(pool, now, config.lookback_hours, TREND_SUPPORT)
            .await?;

    let retention_cutoff =
        now - chrono::Duration::days(i64::try_from(config.retention_days).unwrap_or(i64::MAX));
    let evicted = pulse_db::evict_older_than(pool, retention_cutoff).await?;
    let cycles_evicted = pulse_db::evict_cycles_older_than(pool, retention_cutoff).await?;
    if cycles_evicted > 0 {
        tracing::debug!(cycles_evicted, "expired cycle rows removed");
    }

    Ok((
        batch.fetched,
        batch.deduplicated,
        inserted,
        updated,
        evicted,
        trends,
    ))
}
