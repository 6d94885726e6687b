//! Stop-word removal, synonym expansion, normalization and "did you mean"
//! suggestions, plus the running statistics block the optimizer is
//! specified to keep as a side effect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::stopwords::is_stop_word;
use crate::synonyms::{synonyms_for, known_words};

/// Result of running the optimizer pipeline over one query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptimizedQuery {
    /// `Some` only when the pipeline actually changed the query.
    pub rewritten_query: Option<String>,
    pub rewritten: bool,
    pub suggestions: Vec<String>,
}

/// Running counters updated as a side effect of every [`QueryOptimizer::optimize`]
/// call. Shared by `Arc` across request-scoped callers.
#[derive(Debug, Default)]
pub struct OptimizerStats {
    total_queries: AtomicU64,
    rewrites: AtomicU64,
    total_processing_nanos: AtomicU64,
}

impl OptimizerStats {
    pub fn total_queries(&self) -> u64 {
        self.total_queries.load(Ordering::Relaxed)
    }

    pub fn rewrites(&self) -> u64 {
        self.rewrites.load(Ordering::Relaxed)
    }

    /// Average processing time across every call so far, in microseconds.
    pub fn average_processing_micros(&self) -> f64 {
        let total = self.total_queries.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let nanos = self.total_processing_nanos.load(Ordering::Relaxed);
        (nanos as f64 / total as f64) / 1000.0
    }

    fn record(&self, rewritten: bool, elapsed_nanos: u64) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if rewritten {
            self.rewrites.fetch_add(1, Ordering::Relaxed);
        }
        self.total_processing_nanos
            .fetch_add(elapsed_nanos, Ordering::Relaxed);
    }
}

/// Pure in its output (same query always pipelines to the same
/// [`OptimizedQuery`]); the only side effect is the shared [`OptimizerStats`]
/// block, which does not feed back into the computation.
#[derive(Debug, Default)]
pub struct QueryOptimizer {
    stats: OptimizerStats,
}

impl QueryOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &OptimizerStats {
        &self.stats
    }

    pub fn optimize(&self, query: &str) -> OptimizedQuery {
        let started = Instant::now();

        let normalized_original = normalize(query);
        let tokens: Vec<&str> = query.split_whitespace().collect();

        let kept: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|t| !is_stop_word(t))
            .collect();

        let mut expanded: Vec<String> = kept.iter().map(|t| t.to_string()).collect();
        for token in &kept {
            for syn in synonyms_for(token) {
                if !expanded.iter().any(|t| t == syn) {
                    expanded.push(syn.to_string());
                }
            }
        }

        let candidate = normalize(&expanded.join(" "));
        let rewritten = candidate != normalized_original && !candidate.is_empty();

        let suggestions = suggest(&tokens);

        self.stats
            .record(rewritten, started.elapsed().as_nanos() as u64);

        OptimizedQuery {
            rewritten_query: rewritten.then_some(candidate),
            rewritten,
            suggestions,
        }
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// For each token within Levenshtein distance 1 of a known dictionary word,
/// produce a whole-query rewrite with that token substituted.
fn suggest(tokens: &[&str]) -> Vec<String> {
    let mut suggestions = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let lower = token.to_lowercase();
        if known_words().iter().any(|w| *w == lower.as_str()) {
            continue;
        }
        for candidate in known_words() {
            if levenshtein_within_one(&lower, candidate) {
                let mut rewritten_tokens: Vec<String> =
                    tokens.iter().map(|t| t.to_string()).collect();
                rewritten_tokens[i] = candidate.to_string();
                suggestions.push(rewritten_tokens.join(" "));
            }
        }
    }
    suggestions
}

/// True iff `a` and `b` differ by at most one insertion, deletion, or
/// substitution. Cheap length pre-check avoids running the DP on
/// obviously-unrelated words.
fn levenshtein_within_one(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (la, lb) = (a.len(), b.len());
    if la.abs_diff(lb) > 1 {
        return false;
    }
    if la == 0 || lb == 0 {
        return la.max(lb) <= 1;
    }

    // Walk both strings together, allowing exactly one mismatch/skip.
    let (shorter, longer) = if la <= lb { (a, b) } else { (b, a) };
    let mut i = 0;
    let mut j = 0;
    let mut edits = 0;
    while i < shorter.len() && j < longer.len() {
        if shorter[i] == longer[j] {
            i += 1;
            j += 1;
            continue;
        }
        edits += 1;
        if edits > 1 {
            return false;
        }
        if shorter.len() == longer.len() {
            // substitution
            i += 1;
            j += 1;
        } else {
            // deletion from the longer string
            j += 1;
        }
    }
    edits += longer.len() - j;
    edits <= 1
}
