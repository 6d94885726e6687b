//! Fixed English stop-word set used by the query optimizer.

/// A deliberately small, fixed set — matching the closed vocabulary the
/// optimizer is specified against rather than a general-purpose NLP list.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "this", "but", "or",
    "not", "can", "do", "does",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token.to_lowercase().as_str())
}
