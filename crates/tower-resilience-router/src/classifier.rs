//! Pure syntactic analysis of a query string into a [`QueryInfo`].
//!
//! Nothing here touches an engine, a weight, or a request; the classifier
//! only looks at the characters the caller typed.

use search_types::{QueryCategory, QueryInfo};

const BOOLEAN_MARKERS: [&str; 5] = ["AND", "OR", "NOT", "&&", "||"];

/// Stateless query classifier. Classification is a pure function of the
/// input string — the same query always yields the same [`QueryInfo`].
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, query: &str) -> QueryInfo {
        classify(query)
    }
}

/// Free function form, used by both [`QueryClassifier`] and the optimizer's
/// suggestion pipeline (which classifies rewritten candidates).
pub fn classify(query: &str) -> QueryInfo {
    let trimmed = query.trim();
    let normalized_query = collapse_whitespace(trimmed);
    let token_count = normalized_query.split_whitespace().count();

    QueryInfo {
        length: normalized_query.chars().count(),
        category: QueryCategory::from_token_count(token_count),
        wildcard: normalized_query.contains('*') || normalized_query.contains('?'),
        phrase: normalized_query.contains('"'),
        boolean: is_boolean(&normalized_query),
        special: has_special_chars(&normalized_query),
        normalized_query,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_boolean(query: &str) -> bool {
    let upper = query.to_uppercase();
    BOOLEAN_MARKERS.iter().any(|m| upper.contains(m)) || query.contains('!')
}

fn has_special_chars(query: &str) -> bool {
    query.chars().any(|c| {
        !(c.is_ascii_alphanumeric()
            || c == '_'
            || c.is_whitespace()
            || c == '*'
            || c == '?'
            || c == '"'
            || c == '-')
    })
}
