//! Sentiment scoring and keyword extraction for collected records.

mod keywords;
mod pipeline;
mod scorer;

pub use keywords::extract_keywords;
pub use pipeline::score_records;
pub use scorer::{LexiconScorer, ScoreError, SentimentScorer};
