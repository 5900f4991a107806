//! Database operations for the `collection_cycles` table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `collection_cycles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CycleRow {
    pub id: i64,
    pub public_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub reddit_outcome: String,
    pub news_outcome: String,
    pub fetched: i64,
    pub deduplicated: i64,
    pub inserted: i64,
    pub updated: i64,
    pub evicted: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-cycle counters recorded when a cycle finishes.
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub reddit_outcome: String,
    pub news_outcome: String,
    pub fetched: i64,
    pub deduplicated: i64,
    pub inserted: i64,
    pub updated: i64,
    pub evicted: i64,
}

const SELECT_COLUMNS: &str = "id, public_id, status, started_at, finished_at, \
     reddit_outcome, news_outcome, fetched, deduplicated, inserted, updated, evicted, \
     error_message, created_at";

/// Creates a new cycle in `running` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_cycle(pool: &SqlitePool) -> Result<CycleRow, DbError> {
    let public_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let row = sqlx::query_as::<_, CycleRow>(&format!(
        "INSERT INTO collection_cycles (public_id, status, started_at, created_at) \
         VALUES (?1, 'running', ?2, ?3) \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(public_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a cycle as finished with the given terminal status and counters.
///
/// `status` is `succeeded` when both sources delivered, `partial` when one
/// did. Only a `running` cycle can finish.
///
/// # Errors
///
/// Returns [`DbError::InvalidCycleTransition`] if the cycle is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_cycle(
    pool: &SqlitePool,
    id: i64,
    status: &str,
    outcome: &CycleOutcome,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_cycles \
         SET status = ?1, finished_at = ?2, reddit_outcome = ?3, news_outcome = ?4, \
             fetched = ?5, deduplicated = ?6, inserted = ?7, updated = ?8, evicted = ?9 \
         WHERE id = ?10 AND status = 'running'",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(&outcome.reddit_outcome)
    .bind(&outcome.news_outcome)
    .bind(outcome.fetched)
    .bind(outcome.deduplicated)
    .bind(outcome.inserted)
    .bind(outcome.updated)
    .bind(outcome.evicted)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCycleTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a cycle as `failed` and records the error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidCycleTransition`] if the cycle is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_cycle(pool: &SqlitePool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_cycles \
         SET status = 'failed', finished_at = ?1, error_message = ?2 \
         WHERE id = ?3 AND status = 'running'",
    )
    .bind(Utc::now())
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCycleTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single cycle by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_cycle(pool: &SqlitePool, id: i64) -> Result<CycleRow, DbError> {
    let row = sqlx::query_as::<_, CycleRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM collection_cycles WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` cycles, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cycles(pool: &SqlitePool, limit: i64) -> Result<Vec<CycleRow>, DbError> {
    let rows = sqlx::query_as::<_, CycleRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM collection_cycles \
         ORDER BY started_at DESC, id DESC \
         LIMIT ?1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete cycle rows started before `cutoff`. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn evict_cycles_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM collection_cycles WHERE started_at < ?1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
