//! Lexicon scorer for general news and social-media text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("scoring failed: {0}")]
    Internal(String),
}

/// Assigns a sentiment score in `[-1.0, 1.0]` to a piece of text.
///
/// Implementations must be deterministic for a given input.
pub trait SentimentScorer: Send + Sync {
    /// Score `text`, returning a value in `[-1.0, 1.0]`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError`] if the scorer cannot produce a score.
    fn score(&self, text: &str) -> Result<f64, ScoreError>;
}

/// Word weights for general news and discussion text.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("breakthrough", 0.5),
    ("success", 0.4),
    ("successful", 0.4),
    ("win", 0.4),
    ("wins", 0.4),
    ("growth", 0.3),
    ("improve", 0.3),
    ("improved", 0.3),
    ("innovative", 0.4),
    ("promising", 0.4),
    ("record", 0.2),
    ("surge", 0.3),
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("love", 0.5),
    ("best", 0.5),
    ("amazing", 0.5),
    ("hope", 0.3),
    ("optimistic", 0.4),
    ("recovery", 0.3),
    ("progress", 0.3),
    // Negative signals
    ("crisis", -0.6),
    ("crash", -0.6),
    ("collapse", -0.6),
    ("fraud", -0.7),
    ("scandal", -0.6),
    ("lawsuit", -0.5),
    ("layoffs", -0.5),
    ("decline", -0.4),
    ("fail", -0.4),
    ("failed", -0.4),
    ("failure", -0.4),
    ("bad", -0.4),
    ("terrible", -0.6),
    ("worst", -0.6),
    ("death", -0.5),
    ("dangerous", -0.6),
    ("threat", -0.5),
    ("warning", -0.4),
    ("fear", -0.4),
    ("loss", -0.3),
    ("ban", -0.5),
    ("banned", -0.5),
    ("outage", -0.5),
    ("breach", -0.6),
];

/// Deterministic scorer backed by the built-in word lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps the
/// result to `[-1.0, 1.0]`. Empty or unknown text scores `0.0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Result<f64, ScoreError> {
        let mut score = 0.0_f64;
        for word in text.split_whitespace() {
            let w = word
                .trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase();
            for &(lex_word, weight) in LEXICON {
                if w == lex_word {
                    score += weight;
                    break;
                }
            }
        }
        Ok(score.clamp(-1.0, 1.0))
    }
}
