//! Normalization and dedup of raw items into storable records.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use pulse_core::{EngagementUpdate, NewRecord, Source};
use regex::Regex;

use crate::types::RawItem;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tags regex"));

/// Output of [`normalize_batch`]: records to insert, engagement refreshes for
/// records already stored, and batch counters.
#[derive(Debug, Default)]
pub struct ProcessedBatch {
    pub new_records: Vec<NewRecord>,
    pub engagement_updates: Vec<EngagementUpdate>,
    pub fetched: usize,
    /// Items not stored as new rows because their key was already seen, in
    /// this batch or in the store.
    pub deduplicated: usize,
}

/// Strip HTML tags and unescape the entities that commonly survive in API
/// payloads.
fn strip_markup(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, " ");
    without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Combine title and body into one cleaned text field.
///
/// Markup is stripped and whitespace runs are collapsed so downstream word
/// splitting behaves the same for both sources.
#[must_use]
pub(crate) fn normalize_text(title: &str, body: &str) -> String {
    let combined = format!("{} {}", strip_markup(title), strip_markup(body));
    combined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a fetched batch against the set of keys already stored.
///
/// Pure function: within-batch duplicates keep the first occurrence, items
/// whose `(source, origin_id)` is in `known` become engagement-only
/// refreshes, and everything else becomes a [`NewRecord`] stamped with
/// `collected_at`. Sentiment and keywords are left for the scoring pipeline.
#[must_use]
pub fn normalize_batch(
    items: Vec<RawItem>,
    known: &HashSet<(Source, String)>,
    collected_at: DateTime<Utc>,
) -> ProcessedBatch {
    let mut batch = ProcessedBatch {
        fetched: items.len(),
        ..ProcessedBatch::default()
    };
    let mut seen: HashSet<(Source, String)> = HashSet::with_capacity(items.len());

    for item in items {
        let key = (item.source, item.origin_id.clone());
        if !seen.insert(key.clone()) {
            batch.deduplicated += 1;
            continue;
        }
        if known.contains(&key) {
            batch.deduplicated += 1;
            batch.engagement_updates.push(EngagementUpdate {
                source: item.source,
                origin_id: item.origin_id,
                engagement: item.engagement,
            });
            continue;
        }

        batch.new_records.push(NewRecord {
            source: item.source,
            origin_id: item.origin_id,
            collected_at,
            published_at: item.published_at,
            text: normalize_text(&item.title, &item.body),
            community: item.community,
            engagement: item.engagement,
            sentiment_score: None,
            keywords: Vec::new(),
        });
    }

    batch
}
