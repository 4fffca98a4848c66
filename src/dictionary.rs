//! Spelling dictionary used by the validity filter.
//!
//! [`WordListDictionary`] is a frequency-weighted word list with
//! edit-distance correction. [`NoDictionary`] is the null object used when no
//! list is configured: it knows every word, so the dictionary step never
//! rejects anything.

use crate::diversity::levenshtein_distance;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub trait Dictionary: Send + Sync {
    fn contains(&self, word: &str) -> bool;

    /// Most likely intended spelling; the word itself when nothing better exists.
    fn correction(&self, word: &str) -> String;

    /// Add words to the known vocabulary.
    fn register(&mut self, words: &[String]);
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDictionary;

impl Dictionary for NoDictionary {
    fn contains(&self, _word: &str) -> bool {
        true
    }

    fn correction(&self, word: &str) -> String {
        word.to_string()
    }

    fn register(&mut self, _words: &[String]) {}
}

#[derive(Debug, Clone)]
pub struct WordListDictionary {
    words: HashMap<String, u64>,
    /// Maximum edit distance considered when correcting.
    distance: usize,
    language: String,
}

impl WordListDictionary {
    pub fn new(language: &str, distance: usize) -> Self {
        Self {
            words: HashMap::new(),
            distance,
            language: language.to_string(),
        }
    }

    /// Load a word list: one `word` or `word count` per line, `#` comments allowed.
    pub fn load(path: impl AsRef<Path>, language: &str, distance: usize) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut dict = Self::new(language, distance);

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let word = fields.next().unwrap_or_default().to_lowercase();
            let count = match fields.next() {
                Some(c) => c.parse::<u64>().map_err(|e| Error::WordList {
                    path: path.to_path_buf(),
                    line: i + 1,
                    message: format!("bad frequency '{}': {}", c, e),
                })?,
                None => 1,
            };
            *dict.words.entry(word).or_insert(0) += count;
        }

        tracing::info!(
            path = %path.display(),
            words = dict.words.len(),
            language = %dict.language,
            "loaded dictionary"
        );
        Ok(dict)
    }

    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for w in words {
            *self.words.entry(w.as_ref().to_lowercase()).or_insert(0) += 1;
        }
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordListDictionary {
    fn contains(&self, word: &str) -> bool {
        self.words.contains_key(&word.to_lowercase())
    }

    fn correction(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if self.words.contains_key(&lower) || self.distance == 0 {
            return lower;
        }

        let len = lower.chars().count();
        let mut best: Option<(usize, u64, &str)> = None;

        for (candidate, &freq) in &self.words {
            if candidate.chars().count().abs_diff(len) > self.distance {
                continue;
            }
            let dist = levenshtein_distance(&lower, candidate);
            if dist > self.distance {
                continue;
            }
            // Closest first, then most frequent, then alphabetical
            let better = match best {
                None => true,
                Some((bd, bf, bw)) => {
                    dist < bd || (dist == bd && (freq > bf || (freq == bf && candidate.as_str() < bw)))
                }
            };
            if better {
                best = Some((dist, freq, candidate.as_str()));
            }
        }

        best.map(|(_, _, w)| w.to_string()).unwrap_or(lower)
    }

    fn register(&mut self, words: &[String]) {
        for w in words {
            self.words.entry(w.to_lowercase()).or_insert(1);
        }
    }
}
