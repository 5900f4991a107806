//! Frequency-based keyword extraction.

use std::collections::HashMap;

/// Common English words excluded from keyword extraction.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if",
    "in", "into", "is", "it", "its", "just", "like", "me", "more", "most", "my", "new", "no",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own",
    "said", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
    "until", "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "why", "will", "with", "would", "you", "your",
];

const MIN_KEYWORD_LEN: usize = 3;

/// Extract up to `max` keywords from `text` by word frequency.
///
/// Words are lowercased and stripped of surrounding punctuation; stopwords
/// and words shorter than three characters are dropped. Ties break
/// alphabetically so extraction is deterministic.
#[must_use]
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if w.len() < MIN_KEYWORD_LEN || STOPWORDS.contains(&w.as_str()) {
            continue;
        }
        *counts.entry(w).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max);
    ranked.into_iter().map(|(word, _)| word).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_keywords() {
        assert!(extract_keywords("", 8).is_empty());
    }

    #[test]
    fn stopwords_and_short_words_are_dropped() {
        let keywords = extract_keywords("the cat is on a mat at it", 8);
        assert_eq!(keywords, vec!["cat", "mat"]);
    }

    #[test]
    fn most_frequent_words_rank_first() {
        let keywords = extract_keywords("rust rust rust compiler compiler borrow", 2);
        assert_eq!(keywords, vec!["rust", "compiler"]);
    }

    #[test]
    fn ties_break_alphabetically() {
        let keywords = extract_keywords("zebra apple", 8);
        assert_eq!(keywords, vec!["apple", "zebra"]);
    }

    #[test]
    fn punctuation_and_case_are_normalized() {
        let keywords = extract_keywords("Climate, climate! CLIMATE? policy.", 8);
        assert_eq!(keywords, vec!["climate", "policy"]);
    }

    #[test]
    fn max_caps_the_result() {
        let keywords = extract_keywords("one1 two2 three3 four4 five5", 3);
        assert_eq!(keywords.len(), 3);
    }
}
