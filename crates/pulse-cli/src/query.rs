//! Read-only query commands against the local database.

use chrono::{Duration, Utc};
use pulse_core::Source;
use pulse_db::RecordFilter;
use sqlx::SqlitePool;

const TEXT_PREVIEW_LEN: usize = 60;

/// Show recently collected records, newest first.
///
/// # Errors
///
/// Returns an error if the source filter is unknown or the query fails.
pub(crate) async fn run_recent(
    pool: &SqlitePool,
    hours: Option<i64>,
    source: Option<&str>,
    community: Option<String>,
    limit: i64,
) -> anyhow::Result<()> {
    let source = match source {
        Some(raw) => Some(
            raw.parse::<Source>()
                .map_err(|_| anyhow::anyhow!("unknown source '{raw}', expected 'reddit' or 'news'"))?,
        ),
        None => None,
    };

    let filter = RecordFilter {
        source,
        community,
        since: hours.map(|h| Utc::now() - Duration::hours(h.max(1))),
        until: None,
        limit,
    };
    let records = pulse_db::query_window(pool, &filter).await?;

    if records.is_empty() {
        println!("no records found; run `pulse-cli collect` first");
        return Ok(());
    }

    println!(
        "{:<8}{:<20}{:<18}{:<8}TEXT",
        "SOURCE", "COMMUNITY", "COLLECTED", "ENGAGE"
    );
    for record in &records {
        let collected = record.collected_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<8}{:<20}{:<18}{:<8}{}",
            record.source,
            record.community,
            collected,
            record.engagement,
            preview(&record.text)
        );
    }

    Ok(())
}

/// Show the cached trend ranking, strongest momentum first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_trends(pool: &SqlitePool, limit: i64) -> anyhow::Result<()> {
    let trends = pulse_db::list_trend_aggregates(pool, limit).await?;

    if trends.is_empty() {
        println!("no cached trends; run `pulse-cli collect` first");
        return Ok(());
    }

    println!(
        "{:<20}{:<8}{:<8}{:<10}{:<10}CROSS",
        "KEYWORD", "REDDIT", "NEWS", "SENTIMENT", "MOMENTUM"
    );
    for trend in &trends {
        println!(
            "{:<20}{:<8}{:<8}{:<10.2}{:<10.1}{}",
            trend.keyword,
            trend.reddit_mentions,
            trend.news_mentions,
            trend.mean_sentiment,
            trend.momentum,
            if trend.cross_platform { "yes" } else { "" }
        );
    }

    Ok(())
}

/// Show recent collection cycle history, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_cycles(pool: &SqlitePool, limit: i64) -> anyhow::Result<()> {
    let cycles = pulse_db::list_cycles(pool, limit).await?;

    if cycles.is_empty() {
        println!("no collection cycles recorded yet");
        return Ok(());
    }

    println!(
        "{:<18}{:<11}{:<10}{:<10}{:<9}{:<9}ERROR",
        "STARTED", "STATUS", "REDDIT", "NEWS", "FETCHED", "INSERTED"
    );
    for cycle in &cycles {
        let started = cycle.started_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<18}{:<11}{:<10}{:<10}{:<9}{:<9}{}",
            started,
            cycle.status,
            cycle.reddit_outcome,
            cycle.news_outcome,
            cycle.fetched,
            cycle.inserted,
            cycle.error_message.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn preview(text: &str) -> String {
    if text.chars().count() <= TEXT_PREVIEW_LEN {
        return text.to_string();
    }
    let truncated: String = text.chars().take(TEXT_PREVIEW_LEN).collect();
    format!("{truncated}...")
}
