//! Trend aggregation over stored records.
//!
//! Aggregates are computed in Rust from the keyword lists attached to each
//! record, then written to the `trend_aggregates` cache in one transaction so
//! readers never observe a half-rewritten table.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::DbError;

/// Keywords whose momentum gets a fixed boost when ranking trends.
const PRIORITY_KEYWORDS: &[&str] = &[
    "artificial",
    "intelligence",
    "climate",
    "election",
    "economy",
    "vaccine",
    "crypto",
    "energy",
];

const PRIORITY_BOOST: f64 = 1.5;

/// A row from the `trend_aggregates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendAggregateRow {
    pub id: i64,
    pub keyword: String,
    pub reddit_mentions: i64,
    pub news_mentions: i64,
    pub mean_sentiment: f64,
    pub cross_platform: bool,
    pub momentum: f64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Accumulator {
    reddit_mentions: i64,
    news_mentions: i64,
    sentiment_sum: f64,
    scored: i64,
    momentum: f64,
}

/// Recompute the trend cache from records collected in the lookback window.
///
/// A keyword makes the cache when its total mentions reach `support`; it is
/// flagged cross-platform when each source independently reaches `support`.
/// Momentum is the sum of `engagement / age_hours` over mentioning records,
/// where age is measured from publication (or collection, when unpublished)
/// to `now` and floored at one hour. Priority keywords get a 1.5x boost.
/// The cache is rewritten wholesale in one transaction. Returns the number
/// of cached keywords.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if reading records or rewriting the cache fails.
pub async fn compute_trend_aggregates(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    lookback_hours: u64,
    support: i64,
) -> Result<usize, DbError> {
    let cutoff = now - Duration::hours(i64::try_from(lookback_hours).unwrap_or(i64::MAX));

    let rows: Vec<(String, Option<DateTime<Utc>>, DateTime<Utc>, i64, Option<f64>, Json<Vec<String>>)> =
        sqlx::query_as(
            "SELECT source, published_at, collected_at, engagement, sentiment_score, keywords \
             FROM records \
             WHERE collected_at >= ?1",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

    let mut by_keyword: HashMap<String, Accumulator> = HashMap::new();

    for (source, published_at, collected_at, engagement, sentiment_score, Json(keywords)) in rows {
        let age = now - published_at.unwrap_or(collected_at);
        let age_hours = (age.num_seconds() as f64 / 3600.0).max(1.0);
        let velocity = engagement as f64 / age_hours;

        for keyword in keywords {
            let acc = by_keyword.entry(keyword).or_default();
            match source.as_str() {
                "reddit" => acc.reddit_mentions += 1,
                _ => acc.news_mentions += 1,
            }
            if let Some(score) = sentiment_score {
                acc.sentiment_sum += score;
                acc.scored += 1;
            }
            acc.momentum += velocity;
        }
    }

    let mut aggregates: Vec<(String, Accumulator)> = by_keyword
        .into_iter()
        .filter(|(_, acc)| acc.reddit_mentions + acc.news_mentions >= support)
        .collect();
    aggregates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM trend_aggregates")
        .execute(&mut *tx)
        .await?;

    let count = aggregates.len();
    for (keyword, acc) in aggregates {
        let mean_sentiment = if acc.scored > 0 {
            acc.sentiment_sum / acc.scored as f64
        } else {
            0.0
        };
        let cross_platform = acc.reddit_mentions >= support && acc.news_mentions >= support;
        let momentum = if PRIORITY_KEYWORDS.contains(&keyword.as_str()) {
            acc.momentum * PRIORITY_BOOST
        } else {
            acc.momentum
        };

        sqlx::query(
            "INSERT INTO trend_aggregates \
                 (keyword, reddit_mentions, news_mentions, mean_sentiment, \
                  cross_platform, momentum, computed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&keyword)
        .bind(acc.reddit_mentions)
        .bind(acc.news_mentions)
        .bind(mean_sentiment)
        .bind(cross_platform)
        .bind(momentum)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(count)
}

/// Returns up to `limit` cached trends ordered by momentum, strongest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_trend_aggregates(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<TrendAggregateRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendAggregateRow>(
        "SELECT id, keyword, reddit_mentions, news_mentions, mean_sentiment, \
                cross_platform, momentum, computed_at \
         FROM trend_aggregates \
         ORDER BY momentum DESC, keyword ASC \
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
