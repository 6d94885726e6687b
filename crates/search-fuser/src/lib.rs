//! Rank fusion: combining per-engine ranked lists into one ranked list.
//!
//! Deliberately engine-agnostic — a [`FusionStrategy`] only ever sees
//! [`EngineResult`]/[`Hit`] values, never a concrete engine type, so new
//! engines never require a fuser change.

use std::collections::HashMap;

use search_types::{EngineResult, Hit};

/// Reciprocal-rank-fusion's default smoothing constant.
pub const DEFAULT_RRF_K: u32 = 60;
/// Default number of fused hits returned.
pub const DEFAULT_TOP_K: usize = 100;

/// An in-progress fused score for one document, carrying the first hit
/// seen for it so non-score fields (title, content, highlights...) come
/// from whichever engine reported the document first.
struct ScoredHit {
    hit: Hit,
    score: f64,
}

/// Accumulates per-engine contributions into a single score per document.
/// The shared [`finish`] function turns the accumulated scores into a
/// ranked, deduplicated [`Hit`] list — every strategy differs only in how
/// it scores, never in how it sorts or assigns rank.
pub trait FusionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns first-seen document order (for stable tie-breaking) and the
    /// accumulated score per document id.
    fn accumulate(
        &self,
        results: &[EngineResult],
        weights: &HashMap<String, f64>,
    ) -> (Vec<String>, HashMap<String, ScoredHit>);
}

/// Reciprocal Rank Fusion: `score(id) += 1 / (k + rank + 1)` for each
/// engine's 0-based rank, ignoring hit scores entirely.
pub struct Rrf {
    pub k: u32,
}

impl Default for Rrf {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

impl FusionStrategy for Rrf {
    fn name(&self) -> &'static str {
        "rrf"
    }

    fn accumulate(
        &self,
        results: &[EngineResult],
        _weights: &HashMap<String, f64>,
    ) -> (Vec<String>, HashMap<String, ScoredHit>) {
        let mut order = Vec::new();
        let mut by_id: HashMap<String, ScoredHit> = HashMap::new();

        for result in results.iter().filter(|r| r.is_usable()) {
            for (rank_in_engine, hit) in result.hits.iter().enumerate() {
                let contribution = 1.0 / (self.k as f64 + rank_in_engine as f64 + 1.0);
                match by_id.get_mut(&hit.doc_id) {
                    Some(scored) => scored.score += contribution,
                    None => {
                        order.push(hit.doc_id.clone());
                        by_id.insert(
                            hit.doc_id.clone(),
                            ScoredHit {
                                hit: hit.clone(),
                                score: contribution,
                            },
                        );
                    }
                }
            }
        }

        (order, by_id)
    }
}

/// Weighted fusion: each engine's hit scores are normalized by that
/// engine's own max score, then scaled by the engine's weight (defaulting
/// to an even split across contributing engines) and summed per document.
#[derive(Default)]
pub struct Weighted;

impl FusionStrategy for Weighted {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn accumulate(
        &self,
        results: &[EngineResult],
        weights: &HashMap<String, f64>,
    ) -> (Vec<String>, HashMap<String, ScoredHit>) {
        let usable: Vec<&EngineResult> = results.iter().filter(|r| r.is_usable()).collect();
        let even_split = if usable.is_empty() {
            0.0
        } else {
            1.0 / usable.len() as f64
        };

        let mut order = Vec::new();
        let mut by_id: HashMap<String, ScoredHit> = HashMap::new();

        for result in usable {
            let max_score = result
                .hits
                .iter()
                .map(|h| h.score)
                .fold(0.0_f64, f64::max);
            // Treat a zero (or all-negative-clamped-to-zero) max as 1.0 so
            // division never produces NaN or inflates a degenerate engine.
            let max_score = if max_score == 0.0 { 1.0 } else { max_score };
            let weight = weights.get(&result.engine).copied().unwrap_or(even_split);

            for hit in &result.hits {
                let contribution = weight * (hit.score / max_score);
                match by_id.get_mut(&hit.doc_id) {
                    Some(scored) => scored.score += contribution,
                    None => {
                        order.push(hit.doc_id.clone());
                        by_id.insert(
                            hit.doc_id.clone(),
                            ScoredHit {
                                hit: hit.clone(),
                                score: contribution,
                            },
                        );
                    }
                }
            }
        }

        (order, by_id)
    }
}

/// Dedup/sort/rank assignment shared by every [`FusionStrategy`]. `order`
/// fixes the first-seen position of each id, so the subsequent stable sort
/// breaks score ties by insertion order, not by hash iteration order.
fn finish(order: Vec<String>, mut by_id: HashMap<String, ScoredHit>, top_k: usize) -> Vec<Hit> {
    let mut scored: Vec<ScoredHit> = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, scored)| {
            let mut hit = scored.hit;
            hit.score = scored.score;
            hit.rank = (i + 1) as u32;
            hit
        })
        .collect()
}

/// Resolves a strategy name to a [`FusionStrategy`], defaulting to RRF for
/// anything unrecognized or empty — RRF is the spec's default strategy.
pub fn strategy_for(name: &str) -> Box<dyn FusionStrategy> {
    match name.to_ascii_lowercase().as_str() {
        "weighted" => Box::new(Weighted),
        _ => Box::new(Rrf::default()),
    }
}

/// Set of engines that contributed at least one non-error hit — computed
/// from the raw per-engine results, independent of fusion strategy.
pub fn engines_used(results: &[EngineResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.is_usable() && !r.hits.is_empty())
        .map(|r| r.engine.clone())
        .collect()
}

/// Runs `strategy` over `results`, returning up to `top_k` deduplicated,
/// ranked hits.
pub fn fuse(
    strategy: &dyn FusionStrategy,
    results: &[EngineResult],
    weights: &HashMap<String, f64>,
    top_k: usize,
) -> Vec<Hit> {
    let (order, by_id) = strategy.accumulate(results, weights);
    finish(order, by_id, top_k)
}
