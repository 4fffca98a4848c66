//! Candidate retrieval from the embedding space.
//!
//! Asks the provider for nearest neighbors and keeps the ones that survive
//! filtering, widening the query each round until enough candidates are
//! collected or the round cap is hit.

use crate::embeddings::EmbeddingProvider;
use crate::filter::WordFilter;
use crate::normalize::normalize;
use serde::Serialize;
use std::collections::HashSet;

/// Hard upper bound on expansion rounds per retrieval.
pub const MAX_ROUNDS: usize = 6;

/// Smallest neighbor query issued in any round.
const MIN_QUERY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub token: String,
    /// Neighbor-ranking score from the provider.
    pub score: f32,
}

/// Find the vocabulary entry for a user-supplied word.
///
/// Tries the word as given, its case variants and common POS-tagged forms,
/// then falls back to the first vocabulary entry containing it.
pub fn resolve_token(provider: &dyn EmbeddingProvider, base: &str) -> Option<String> {
    let base = base.trim();
    if base.is_empty() {
        return None;
    }

    let variants = [
        base.to_string(),
        base.to_lowercase(),
        title_case(base),
        base.to_uppercase(),
        format!("{}|N", base),
        format!("{}.n", base),
        format!("{}_NOUN", base),
    ];
    if let Some(hit) = variants.iter().find_map(|v| provider.resolve(v)) {
        return Some(hit);
    }

    let lower = base.to_lowercase();
    provider
        .vocabulary()
        .find(|t| t.to_lowercase().contains(&lower))
        .map(str::to_string)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

pub struct CandidateRetriever<'a> {
    provider: &'a dyn EmbeddingProvider,
    filter: &'a WordFilter,
}

impl<'a> CandidateRetriever<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, filter: &'a WordFilter) -> Self {
        Self { provider, filter }
    }

    /// Up to `target_count` filtered neighbors of `base`, in discovery order.
    ///
    /// Neighbors are dropped when their normalized key was already seen in
    /// this call, is in `forbidden`, overlaps the base word's key as a
    /// substring, or fails the validity filter. Fewer than `target_count`
    /// results is a normal outcome.
    pub fn get_candidates(
        &self,
        base: &str,
        target_count: usize,
        expand_factor: usize,
        forbidden: &HashSet<String>,
    ) -> Vec<Candidate> {
        let Some(root) = resolve_token(self.provider, base) else {
            tracing::debug!(base, "no vocabulary entry, nothing to retrieve");
            return Vec::new();
        };

        let base_key = normalize(&root);
        let mut seen: HashSet<String> = HashSet::new();
        let mut result: Vec<Candidate> = Vec::new();
        let mut round = 1;

        while result.len() < target_count && round <= MAX_ROUNDS {
            let top_n = MIN_QUERY.max(
                target_count
                    .saturating_mul(expand_factor)
                    .saturating_mul(round),
            );
            let neighbors = self.provider.neighbors(&root, top_n);
            let exhausted = neighbors.len() < top_n;

            for (word, score) in neighbors {
                let key = normalize(&word);
                if seen.contains(&key)
                    || forbidden.contains(&key)
                    || key.contains(&base_key)
                    || base_key.contains(&key)
                    || !self.filter.is_valid(&word)
                {
                    continue;
                }

                seen.insert(key);
                result.push(Candidate { token: word, score });
                if result.len() >= target_count {
                    break;
                }
            }

            tracing::debug!(base = %root, round, top_n, collected = result.len(), "retrieval round");

            // A wider query cannot surface anything new
            if exhausted {
                break;
            }
            round += 1;
        }

        result.truncate(target_count);
        result
    }
}
