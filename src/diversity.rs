//! Sibling diversity checks.
//!
//! Two siblings are near-duplicates when their spellings are almost the same
//! (edit similarity) or when the embedding space places them almost on top of
//! each other (cosine similarity).

use crate::embeddings::EmbeddingProvider;

/// Default edit-similarity ceiling for siblings.
pub const STRING_DUP_THRESHOLD: f32 = 0.84;
/// Default cosine ceiling for siblings.
pub const EMBEDDING_DUP_THRESHOLD: f32 = 0.78;

/// Levenshtein distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Edit distance mapped onto 0..=1 (1 = identical, 0 = nothing in common).
pub fn normalized_similarity(a: &str, b: &str) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f32 / longest as f32
}

#[derive(Debug, Clone, Copy)]
pub struct DiversityChecker {
    pub string_threshold: f32,
    pub embedding_threshold: f32,
}

impl Default for DiversityChecker {
    fn default() -> Self {
        Self {
            string_threshold: STRING_DUP_THRESHOLD,
            embedding_threshold: EMBEDDING_DUP_THRESHOLD,
        }
    }
}

impl DiversityChecker {
    pub fn near_duplicate_by_string(&self, a: &str, b: &str) -> bool {
        normalized_similarity(a, b) >= self.string_threshold
    }

    /// OOV tokens are never duplicates.
    pub fn near_duplicate_by_embedding(
        &self,
        provider: &dyn EmbeddingProvider,
        a: &str,
        b: &str,
    ) -> bool {
        provider
            .similarity(a, b)
            .map(|sim| sim >= self.embedding_threshold)
            .unwrap_or(false)
    }

    /// True when `candidate` is a near-duplicate of any accepted sibling.
    pub fn is_sibling_duplicate<S: AsRef<str>>(
        &self,
        provider: &dyn EmbeddingProvider,
        candidate: &str,
        siblings: &[S],
    ) -> bool {
        siblings.iter().any(|sib| {
            let sib = sib.as_ref();
            self.near_duplicate_by_string(candidate, sib)
                || self.near_duplicate_by_embedding(provider, candidate, sib)
        })
    }
}
