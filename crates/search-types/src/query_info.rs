use serde::{Deserialize, Serialize};

/// Bucket assigned by the classifier based on token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Empty,
    SingleTerm,
    ShortPhrase,
    MediumPhrase,
    LongQuery,
}

impl QueryCategory {
    pub fn from_token_count(n: usize) -> Self {
        match n {
            0 => Self::Empty,
            1 => Self::SingleTerm,
            2..=3 => Self::ShortPhrase,
            4..=6 => Self::MediumPhrase,
            _ => Self::LongQuery,
        }
    }
}

/// The classifier's pure, side-effect-free analysis of a query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub normalized_query: String,
    pub category: QueryCategory,
    pub length: usize,
    pub wildcard: bool,
    pub phrase: bool,
    pub boolean: bool,
    pub special: bool,
}
