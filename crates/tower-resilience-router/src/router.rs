//! Engine + weight selection: an ordered list of predicates, first
//! `Some` wins. Keeping this as a `Vec` of boxed predicates (rather than a
//! generic dispatch table) makes the ordering invariant — which strategy
//! is tried before which — visible at the call site instead of buried in
//! trait-resolution order.

use std::collections::HashMap;

use search_types::{QueryInfo, RoutingDecision, SearchRequest, unix_millis_now};

/// One candidate selection: the chosen strategy's name plus its engines and
/// weights. Returned by a [`RoutingStrategy`] when it accepts a request.
struct Candidate {
    strategy: &'static str,
    engines: Vec<String>,
    weights: HashMap<String, f64>,
}

fn equal_weights(engines: &[&'static str]) -> HashMap<String, f64> {
    let w = 1.0 / engines.len() as f64;
    engines.iter().map(|e| (e.to_string(), w)).collect()
}

fn owned(engines: &[&'static str]) -> Vec<String> {
    engines.iter().map(|e| e.to_string()).collect()
}

type RoutingStrategy = dyn Fn(&SearchRequest, &QueryInfo) -> Option<Candidate> + Send + Sync;

/// Four consecutive consonants in any word longer than 3 characters — the
/// heuristic §4.6 uses to flag a likely typo and route to fuzzy search.
fn has_typo_heuristic(query: &str) -> bool {
    const VOWELS: &str = "aeiouAEIOU";
    query.split_whitespace().any(|word| {
        if word.chars().count() <= 3 {
            return false;
        }
        let mut run = 0;
        for c in word.chars() {
            if c.is_alphabetic() && !VOWELS.contains(c) {
                run += 1;
                if run >= 4 {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    })
}

fn explicit_override(req: &SearchRequest, _info: &QueryInfo) -> Option<Candidate> {
    let engines = req.engines.as_ref()?;
    if engines.is_empty() {
        return None;
    }
    let w = 1.0 / engines.len() as f64;
    Some(Candidate {
        strategy: "explicit_override",
        engines: engines.clone(),
        weights: engines.iter().map(|e| (e.clone(), w)).collect(),
    })
}

fn exact_match(_req: &SearchRequest, info: &QueryInfo) -> Option<Candidate> {
    let token_count = info.normalized_query.split_whitespace().count();
    if token_count <= 3 || info.phrase || info.wildcard || info.length <= 20 {
        return Some(Candidate {
            strategy: "exact_match",
            engines: owned(&["bm25"]),
            weights: equal_weights(&["bm25"]),
        });
    }
    None
}

fn fuzzy_search(req: &SearchRequest, info: &QueryInfo) -> Option<Candidate> {
    let fuzziness_requested = req.engine_overrides.get("fuzziness").is_some();
    if fuzziness_requested
        || has_typo_heuristic(&info.normalized_query)
        || info.wildcard
    {
        return Some(Candidate {
            strategy: "fuzzy_search",
            engines: owned(&["flexsearch"]),
            weights: equal_weights(&["flexsearch"]),
        });
    }
    None
}

fn semantic_search(_req: &SearchRequest, info: &QueryInfo) -> Option<Candidate> {
    let token_count = info.normalized_query.split_whitespace().count();
    let has_stop_word_content = info
        .normalized_query
        .split_whitespace()
        .any(crate::stopwords::is_stop_word);
    if token_count >= 4 || (token_count >= 3 && has_stop_word_content) {
        return Some(Candidate {
            strategy: "semantic_search",
            engines: owned(&["vector"]),
            weights: equal_weights(&["vector"]),
        });
    }
    None
}

fn hybrid_search(req: &SearchRequest, info: &QueryInfo) -> Option<Candidate> {
    let token_count = info.normalized_query.split_whitespace().count();
    let hybrid_flag = req.engine_overrides.get("hybrid").map(String::as_str) == Some("true");
    if (3..=6).contains(&token_count) || hybrid_flag {
        let engines = owned(&["bm25", "vector"]);
        let mut weights = HashMap::new();
        weights.insert("bm25".to_string(), 0.5);
        weights.insert("vector".to_string(), 0.5);
        return Some(Candidate {
            strategy: "hybrid_search",
            engines,
            weights,
        });
    }
    None
}

fn auto_routing(_req: &SearchRequest, _info: &QueryInfo) -> Option<Candidate> {
    let engines = owned(&["flexsearch", "bm25", "vector"]);
    let mut weights = HashMap::new();
    weights.insert("flexsearch".to_string(), 0.3);
    weights.insert("bm25".to_string(), 0.3);
    weights.insert("vector".to_string(), 0.4);
    Some(Candidate {
        strategy: "auto_routing",
        engines,
        weights,
    })
}

/// Chooses an engine set and weight vector for a classified request.
///
/// Strategies are evaluated in the fixed order from §4.6: explicit
/// override, exact match, fuzzy search, semantic search, hybrid search,
/// then auto-routing as the fallback that always accepts. This ordering is
/// the specified behavior, not an implementation detail — never reorder it.
pub struct Router {
    strategies: Vec<Box<RoutingStrategy>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(explicit_override),
                Box::new(exact_match),
                Box::new(fuzzy_search),
                Box::new(semantic_search),
                Box::new(hybrid_search),
                Box::new(auto_routing),
            ],
        }
    }

    pub fn route(&self, req: &SearchRequest, info: &QueryInfo) -> RoutingDecision {
        for strategy in &self.strategies {
            if let Some(candidate) = strategy(req, info) {
                return RoutingDecision {
                    strategy: candidate.strategy.to_string(),
                    engines: candidate.engines,
                    weights: candidate.weights,
                    query_info: info.clone(),
                    decided_at_unix_ms: unix_millis_now(),
                };
            }
        }
        unreachable!("auto_routing always accepts")
    }
}
