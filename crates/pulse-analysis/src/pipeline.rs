//! Scoring pipeline applied to normalized records before storage.

use pulse_core::NewRecord;

use crate::keywords::extract_keywords;
use crate::scorer::SentimentScorer;

/// Attach sentiment scores and keywords to a batch of records in place.
///
/// Records with empty text get a neutral score of `0.0` and no keywords.
/// A scorer failure on one record is logged and scored neutral; keywords are
/// still extracted and the rest of the batch is unaffected. One bad record
/// never sinks the batch.
pub fn score_records<S: SentimentScorer>(
    scorer: &S,
    records: &mut [NewRecord],
    keywords_per_record: usize,
) {
    for record in records.iter_mut() {
        if record.text.trim().is_empty() {
            record.sentiment_score = Some(0.0);
            record.keywords = Vec::new();
            continue;
        }

        let score = match scorer.score(&record.text) {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(
                    source = %record.source,
                    origin_id = %record.origin_id,
                    error = %e,
                    "sentiment scoring failed, recording neutral score"
                );
                0.0
            }
        };
        record.sentiment_score = Some(score);
        record.keywords = extract_keywords(&record.text, keywords_per_record);
    }
}
