use chrono::{DateTime, Utc};
use pulse_core::Source;

/// An item as fetched from a source adapter, before normalization.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub source: Source,
    /// Stable upstream identity: Reddit fullname (`t3_…`) or article URL.
    pub origin_id: String,
    pub title: String,
    pub body: String,
    /// Subreddit name or news outlet identifier.
    pub community: String,
    pub engagement: i64,
    pub published_at: Option<DateTime<Utc>>,
}
