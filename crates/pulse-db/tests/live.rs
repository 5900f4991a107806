//! Live integration tests for pulse-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated `SQLite` database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/pulse-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, Utc};
use pulse_core::{EngagementUpdate, NewRecord, Source};
use pulse_db::{
    complete_cycle, compute_trend_aggregates, connect_pool, create_cycle,
    evict_cycles_older_than, evict_older_than, fail_cycle, fetch_known_keys, get_cycle,
    list_cycles, list_trend_aggregates, query_window, run_migrations, upsert_batch,
    CycleOutcome, PoolConfig, RecordFilter,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_record(source: Source, origin_id: &str, engagement: i64) -> NewRecord {
    NewRecord {
        source,
        origin_id: origin_id.to_string(),
        collected_at: Utc::now(),
        published_at: Some(Utc::now() - Duration::hours(2)),
        text: format!("sample text for {origin_id}"),
        community: match source {
            Source::Reddit => "technology".to_string(),
            Source::News => "bbc-news".to_string(),
        },
        engagement,
        sentiment_score: Some(0.25),
        keywords: vec!["sample".to_string(), "text".to_string()],
    }
}

// ---------------------------------------------------------------------------
// Section 1: Record upserts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_batch_counts_inserts_and_updates(pool: sqlx::SqlitePool) {
    // Seed 5 records that will later arrive again as engagement updates.
    let seed: Vec<NewRecord> = (0..5)
        .map(|i| make_record(Source::Reddit, &format!("t3_seed{i}"), 10))
        .collect();
    let (inserted, updated) = upsert_batch(&pool, &seed, &[]).await.expect("seed upsert");
    assert_eq!(inserted, 5);
    assert_eq!(updated, 0);

    // 70 genuinely new records across both sources plus refreshes for the 5.
    let mut fresh: Vec<NewRecord> = (0..25)
        .map(|i| make_record(Source::Reddit, &format!("t3_new{i}"), 50))
        .collect();
    fresh.extend((0..45).map(|i| make_record(Source::News, &format!("https://n.example/{i}"), 0)));
    let refreshes: Vec<EngagementUpdate> = (0..5)
        .map(|i| EngagementUpdate {
            source: Source::Reddit,
            origin_id: format!("t3_seed{i}"),
            engagement: 99,
        })
        .collect();

    let (inserted, updated) = upsert_batch(&pool, &fresh, &refreshes)
        .await
        .expect("second upsert");
    assert_eq!(inserted, 70);
    assert_eq!(updated, 5);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(total, 75);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_batch_is_idempotent_on_duplicate_keys(pool: sqlx::SqlitePool) {
    let record = make_record(Source::News, "https://n.example/a", 3);
    let (inserted, _) = upsert_batch(&pool, &[record.clone()], &[])
        .await
        .expect("first upsert");
    assert_eq!(inserted, 1);

    // Same key arriving again as a full record falls back to a refresh.
    let mut again = record;
    again.engagement = 7;
    again.text = "completely different text".to_string();
    let (inserted, updated) = upsert_batch(&pool, &[again], &[]).await.expect("re-upsert");
    assert_eq!(inserted, 0);
    assert_eq!(updated, 1);

    let (engagement, text): (i64, String) =
        sqlx::query_as("SELECT engagement, text FROM records WHERE origin_id = ?1")
            .bind("https://n.example/a")
            .fetch_one(&pool)
            .await
            .expect("fetch");
    assert_eq!(engagement, 7, "engagement refreshed");
    assert!(
        text.starts_with("sample text"),
        "stored text is never overwritten"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_known_keys_returns_stored_identities(pool: sqlx::SqlitePool) {
    let records = vec![
        make_record(Source::Reddit, "t3_a", 1),
        make_record(Source::News, "https://n.example/b", 0),
    ];
    upsert_batch(&pool, &records, &[]).await.expect("upsert");

    let keys = fetch_known_keys(&pool).await.expect("fetch keys");
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&(Source::Reddit, "t3_a".to_string())));
    assert!(keys.contains(&(Source::News, "https://n.example/b".to_string())));
}

// ---------------------------------------------------------------------------
// Section 2: Windowed queries and eviction
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn query_window_filters_by_source_and_community(pool: sqlx::SqlitePool) {
    let records = vec![
        make_record(Source::Reddit, "t3_a", 1),
        make_record(Source::Reddit, "t3_b", 2),
        make_record(Source::News, "https://n.example/c", 0),
    ];
    upsert_batch(&pool, &records, &[]).await.expect("upsert");

    let all = query_window(
        &pool,
        &RecordFilter {
            limit: 50,
            ..RecordFilter::default()
        },
    )
    .await
    .expect("query all");
    assert_eq!(all.len(), 3);

    let reddit_only = query_window(
        &pool,
        &RecordFilter {
            source: Some(Source::Reddit),
            limit: 50,
            ..RecordFilter::default()
        },
    )
    .await
    .expect("query reddit");
    assert_eq!(reddit_only.len(), 2);
    assert!(reddit_only.iter().all(|r| r.source == "reddit"));

    let by_community = query_window(
        &pool,
        &RecordFilter {
            community: Some("bbc-news".to_string()),
            limit: 50,
            ..RecordFilter::default()
        },
    )
    .await
    .expect("query community");
    assert_eq!(by_community.len(), 1);
    assert_eq!(by_community[0].origin_id, "https://n.example/c");
}

#[sqlx::test(migrations = "../../migrations")]
async fn query_window_respects_since_and_limit(pool: sqlx::SqlitePool) {
    let now = Utc::now();
    let mut old = make_record(Source::Reddit, "t3_old", 1);
    old.collected_at = now - Duration::hours(48);
    let recent = make_record(Source::Reddit, "t3_recent", 2);
    upsert_batch(&pool, &[old, recent], &[]).await.expect("upsert");

    let windowed = query_window(
        &pool,
        &RecordFilter {
            since: Some(now - Duration::hours(24)),
            limit: 50,
            ..RecordFilter::default()
        },
    )
    .await
    .expect("query since");
    assert_eq!(windowed.len(), 1);
    assert_eq!(windowed[0].origin_id, "t3_recent");

    let limited = query_window(
        &pool,
        &RecordFilter {
            limit: 1,
            ..RecordFilter::default()
        },
    )
    .await
    .expect("query limited");
    assert_eq!(limited.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn defaulted_filter_returns_stored_rows(pool: sqlx::SqlitePool) {
    let records = vec![
        make_record(Source::Reddit, "t3_plain", 1),
        make_record(Source::News, "https://n.example/plain", 0),
    ];
    upsert_batch(&pool, &records, &[]).await.expect("upsert");

    let rows = query_window(&pool, &RecordFilter::default())
        .await
        .expect("query with defaults");
    assert_eq!(rows.len(), 2, "default filter must not suppress results");
}

#[sqlx::test(migrations = "../../migrations")]
async fn evict_older_than_keeps_cutoff_boundary(pool: sqlx::SqlitePool) {
    let cutoff = Utc::now() - Duration::days(7);

    let mut expired = make_record(Source::Reddit, "t3_expired", 1);
    expired.collected_at = cutoff - Duration::seconds(1);
    let mut boundary = make_record(Source::Reddit, "t3_boundary", 2);
    boundary.collected_at = cutoff;
    let fresh = make_record(Source::Reddit, "t3_fresh", 3);

    upsert_batch(&pool, &[expired, boundary, fresh], &[])
        .await
        .expect("upsert");

    let removed = evict_older_than(&pool, cutoff).await.expect("evict");
    assert_eq!(removed, 1, "only the pre-cutoff record is removed");

    let remaining = query_window(
        &pool,
        &RecordFilter {
            limit: 50,
            ..RecordFilter::default()
        },
    )
    .await
    .expect("query");
    let ids: Vec<&str> = remaining.iter().map(|r| r.origin_id.as_str()).collect();
    assert!(ids.contains(&"t3_boundary"), "record at cutoff is retained");
    assert!(ids.contains(&"t3_fresh"));
}

// ---------------------------------------------------------------------------
// Section 3: Trend aggregation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn trend_aggregates_flag_cross_platform_keywords(pool: sqlx::SqlitePool) {
    let now = Utc::now();
    let mut records = Vec::new();
    // "shared" appears twice on each platform; "lonely" only on reddit.
    for i in 0..2 {
        let mut r = make_record(Source::Reddit, &format!("t3_s{i}"), 100);
        r.keywords = vec!["shared".to_string(), "lonely".to_string()];
        records.push(r);
        let mut n = make_record(Source::News, &format!("https://n.example/s{i}"), 0);
        n.keywords = vec!["shared".to_string()];
        records.push(n);
    }
    upsert_batch(&pool, &records, &[]).await.expect("upsert");

    let cached = compute_trend_aggregates(&pool, now, 24, 2)
        .await
        .expect("compute");
    assert_eq!(cached, 2, "both keywords reach the support threshold");

    let trends = list_trend_aggregates(&pool, 10).await.expect("list");
    let shared = trends
        .iter()
        .find(|t| t.keyword == "shared")
        .expect("shared trend");
    assert_eq!(shared.reddit_mentions, 2);
    assert_eq!(shared.news_mentions, 2);
    assert!(shared.cross_platform);
    assert!((shared.mean_sentiment - 0.25).abs() < 1e-9);
    assert!(shared.momentum > 0.0);

    let lonely = trends
        .iter()
        .find(|t| t.keyword == "lonely")
        .expect("lonely trend");
    assert_eq!(lonely.news_mentions, 0);
    assert!(!lonely.cross_platform);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trend_aggregates_ignore_records_outside_lookback(pool: sqlx::SqlitePool) {
    let now = Utc::now();
    let mut stale = make_record(Source::Reddit, "t3_stale", 500);
    stale.collected_at = now - Duration::hours(48);
    stale.keywords = vec!["stale".to_string(), "stale2".to_string()];
    upsert_batch(&pool, &[stale], &[]).await.expect("upsert");

    let cached = compute_trend_aggregates(&pool, now, 24, 1)
        .await
        .expect("compute");
    assert_eq!(cached, 0);
    assert!(list_trend_aggregates(&pool, 10)
        .await
        .expect("list")
        .is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn trend_cache_is_rewritten_wholesale(pool: sqlx::SqlitePool) {
    let now = Utc::now();
    let mut first = make_record(Source::Reddit, "t3_one", 10);
    first.keywords = vec!["morning".to_string()];
    upsert_batch(&pool, &[first], &[]).await.expect("upsert");
    compute_trend_aggregates(&pool, now, 24, 1)
        .await
        .expect("first compute");

    // Replace the record set, then recompute; the old cache must not linger.
    sqlx::query("DELETE FROM records")
        .execute(&pool)
        .await
        .expect("clear records");
    let mut second = make_record(Source::News, "https://n.example/two", 5);
    second.keywords = vec!["evening".to_string()];
    upsert_batch(&pool, &[second], &[]).await.expect("upsert");
    compute_trend_aggregates(&pool, now, 24, 1)
        .await
        .expect("second compute");

    let trends = list_trend_aggregates(&pool, 10).await.expect("list");
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].keyword, "evening");
}

// ---------------------------------------------------------------------------
// Section 4: Cycle lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn cycle_lifecycle_running_to_succeeded(pool: sqlx::SqlitePool) {
    let cycle = create_cycle(&pool).await.expect("create");
    assert_eq!(cycle.status, "running");
    assert!(cycle.finished_at.is_none());
    assert_eq!(cycle.reddit_outcome, "pending");

    let outcome = CycleOutcome {
        reddit_outcome: "succeeded".to_string(),
        news_outcome: "succeeded".to_string(),
        fetched: 75,
        deduplicated: 5,
        inserted: 70,
        updated: 5,
        evicted: 3,
    };
    complete_cycle(&pool, cycle.id, "succeeded", &outcome)
        .await
        .expect("complete");

    let fetched = get_cycle(&pool, cycle.id).await.expect("get");
    assert_eq!(fetched.status, "succeeded");
    assert!(fetched.finished_at.is_some());
    assert_eq!(fetched.inserted, 70);
    assert_eq!(fetched.updated, 5);
    assert_eq!(fetched.evicted, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn cycle_cannot_finish_twice(pool: sqlx::SqlitePool) {
    let cycle = create_cycle(&pool).await.expect("create");
    fail_cycle(&pool, cycle.id, "both sources unavailable")
        .await
        .expect("fail");

    let result = complete_cycle(&pool, cycle.id, "succeeded", &CycleOutcome::default()).await;
    assert!(
        matches!(
            result,
            Err(pulse_db::DbError::InvalidCycleTransition { expected_status: "running", .. })
        ),
        "finished cycle must reject further transitions, got: {result:?}"
    );

    let fetched = get_cycle(&pool, cycle.id).await.expect("get");
    assert_eq!(fetched.status, "failed");
    assert_eq!(
        fetched.error_message.as_deref(),
        Some("both sources unavailable")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_cycles_returns_newest_first(pool: sqlx::SqlitePool) {
    let first = create_cycle(&pool).await.expect("create first");
    let second = create_cycle(&pool).await.expect("create second");

    let cycles = list_cycles(&pool, 10).await.expect("list");
    assert_eq!(cycles.len(), 2);
    assert_eq!(cycles[0].id, second.id);
    assert_eq!(cycles[1].id, first.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn evict_cycles_older_than_removes_stale_rows(pool: sqlx::SqlitePool) {
    let cycle = create_cycle(&pool).await.expect("create");
    fail_cycle(&pool, cycle.id, "boom").await.expect("fail");

    let removed = evict_cycles_older_than(&pool, Utc::now() - Duration::days(7))
        .await
        .expect("evict nothing");
    assert_eq!(removed, 0);

    let removed = evict_cycles_older_than(&pool, Utc::now() + Duration::seconds(1))
        .await
        .expect("evict all");
    assert_eq!(removed, 1);
}

// ---------------------------------------------------------------------------
// Section 5: Concurrent access
// ---------------------------------------------------------------------------

/// Readers on a WAL database see the state before or after a batch commit,
/// never a partially applied one. This needs a file-backed pool from
/// [`connect_pool`]; the sqlx test harness databases don't run in WAL mode.
#[tokio::test]
async fn readers_never_observe_a_partial_batch_commit() {
    let path = std::env::temp_dir().join(format!("pulse-live-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = connect_pool(&url, PoolConfig::default())
        .await
        .expect("connect");
    run_migrations(&pool).await.expect("migrate");

    let total = 400;
    let writer = {
        let pool = pool.clone();
        tokio::spawn(async move {
            let batch: Vec<NewRecord> = (0..total)
                .map(|i| make_record(Source::Reddit, &format!("t3_bulk{i}"), 1))
                .collect();
            upsert_batch(&pool, &batch, &[]).await.expect("bulk upsert")
        })
    };

    let filter = RecordFilter {
        limit: 1_000,
        ..RecordFilter::default()
    };
    while !writer.is_finished() {
        let rows = query_window(&pool, &filter).await.expect("concurrent read");
        assert!(
            rows.is_empty() || rows.len() == total,
            "reader saw {} of {total} rows mid-commit",
            rows.len()
        );
        tokio::task::yield_now().await;
    }

    let (inserted, _) = writer.await.expect("join writer");
    assert_eq!(inserted as usize, total);
    let rows = query_window(&pool, &filter).await.expect("final read");
    assert_eq!(rows.len(), total);

    pool.close().await;
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(format!("{}-wal", path.display()));
    let _ = std::fs::remove_file(format!("{}-shm", path.display()));
}
