//! Database operations for the `records` table.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pulse_core::{EngagementUpdate, NewRecord, Source};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::DbError;

/// A row from the `records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub source: String,
    pub origin_id: String,
    pub collected_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub text: String,
    pub community: String,
    pub engagement: i64,
    pub sentiment_score: Option<f64>,
    pub keywords: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Rows returned by a defaulted [`RecordFilter`].
const DEFAULT_QUERY_LIMIT: i64 = 50;

/// Optional filters for [`query_window`].
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub source: Option<Source>,
    pub community: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            source: None,
            community: None,
            since: None,
            until: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// Persist a batch of collected records inside a single transaction.
///
/// New records are inserted in full. Records whose `(source, origin_id)` key
/// already exists get an engagement-only refresh; stored text, sentiment and
/// keywords are never overwritten. `updates` carries keys the caller already
/// knows to be stored. Returns `(inserted, updated)` counts. Nothing is
/// written if any statement fails.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement in the transaction fails.
pub async fn upsert_batch(
    pool: &SqlitePool,
    new_records: &[NewRecord],
    updates: &[EngagementUpdate],
) -> Result<(u64, u64), DbError> {
    let mut tx = pool.begin().await?;
    let mut inserted: u64 = 0;
    let mut updated: u64 = 0;
    let now = Utc::now();

    for record in new_records {
        // A concurrent writer may have stored this key since the caller
        // snapshotted known keys; fall back to an engagement refresh.
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM records WHERE source = ?1 AND origin_id = ?2")
                .bind(record.source.as_str())
                .bind(&record.origin_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(id) = existing {
            sqlx::query("UPDATE records SET engagement = ?1 WHERE id = ?2")
                .bind(record.engagement)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            updated += 1;
        } else {
            sqlx::query(
                "INSERT INTO records \
                     (source, origin_id, collected_at, published_at, text, community, \
                      engagement, sentiment_score, keywords, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .bind(record.source.as_str())
            .bind(&record.origin_id)
            .bind(record.collected_at)
            .bind(record.published_at)
            .bind(&record.text)
            .bind(&record.community)
            .bind(record.engagement)
            .bind(record.sentiment_score)
            .bind(Json(&record.keywords))
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }
    }

    for update in updates {
        let result = sqlx::query(
            "UPDATE records SET engagement = ?1 WHERE source = ?2 AND origin_id = ?3",
        )
        .bind(update.engagement)
        .bind(update.source.as_str())
        .bind(&update.origin_id)
        .execute(&mut *tx)
        .await?;
        updated += result.rows_affected();
    }

    tx.commit().await?;
    Ok((inserted, updated))
}

/// Query stored records with optional source/community/time filters, newest
/// first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn query_window(
    pool: &SqlitePool,
    filter: &RecordFilter,
) -> Result<Vec<RecordRow>, DbError> {
    let rows = sqlx::query_as::<_, RecordRow>(
        "SELECT id, source, origin_id, collected_at, published_at, text, community, \
                engagement, sentiment_score, keywords, created_at \
         FROM records \
         WHERE (?1 IS NULL OR source = ?1) \
           AND (?2 IS NULL OR community = ?2) \
           AND (?3 IS NULL OR collected_at >= ?3) \
           AND (?4 IS NULL OR collected_at <= ?4) \
         ORDER BY collected_at DESC, id DESC \
         LIMIT ?5",
    )
    .bind(filter.source.map(Source::as_str))
    .bind(filter.community.as_deref())
    .bind(filter.since)
    .bind(filter.until)
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every `(source, origin_id)` key currently stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_known_keys(pool: &SqlitePool) -> Result<HashSet<(Source, String)>, DbError> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT source, origin_id FROM records")
        .fetch_all(pool)
        .await?;

    let mut keys = HashSet::with_capacity(rows.len());
    for (source, origin_id) in rows {
        // The CHECK constraint limits source to known values.
        if let Ok(source) = Source::from_str(&source) {
            keys.insert((source, origin_id));
        }
    }
    Ok(keys)
}

/// Delete records collected before `cutoff`. Returns the number of rows
/// removed. Records collected exactly at the cutoff are retained.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn evict_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM records WHERE collected_at < ?1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
