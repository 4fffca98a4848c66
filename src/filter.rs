//! Hybrid validity filter: allow-list, shape heuristics, deny-list, dictionary.
//!
//! Rules are applied in that order and the first one that decides wins. The
//! dictionary step is optional; without a dictionary the filter is purely
//! heuristic.

use crate::dictionary::{Dictionary, NoDictionary, WordListDictionary};
use crate::normalize::normalize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;

static LETTERS_ONLY: OnceLock<Regex> = OnceLock::new();

fn letters_only() -> &'static Regex {
    LETTERS_ONLY.get_or_init(|| Regex::new(r"^[A-Za-z]+$").expect("static regex"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Always-valid words (case-insensitive).
    #[serde(default)]
    pub allow: Vec<String>,
    /// Always-invalid words (case-insensitive), checked after the shape rules.
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Edit-distance tolerance used for spelling corrections.
    #[serde(default = "default_spell_distance")]
    pub spell_distance: usize,
    #[serde(default = "default_true")]
    pub use_spell: bool,
    /// Word list backing the dictionary check.
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_spell_distance() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            deny: Vec::new(),
            language: default_language(),
            spell_distance: default_spell_distance(),
            use_spell: true,
            dictionary_path: None,
        }
    }
}

/// Starts and ends with an ASCII letter (so at least two chars long).
pub fn is_clean_word(word: &str) -> bool {
    let bytes = word.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[bytes.len() - 1].is_ascii_alphabetic()
}

/// Has at least one uppercase letter and no lowercase ones.
pub fn is_all_upper(word: &str) -> bool {
    word.chars().any(|c| c.is_uppercase()) && !word.chars().any(|c| c.is_lowercase())
}

fn has_triple_run(word: &str) -> bool {
    let chars: Vec<char> = word.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

/// Cheap shape test that throws out obvious junk and typos.
///
/// Short all-caps acronyms (2-5 chars) pass outright; everything else must be
/// at least 3 ASCII letters with no letter repeated 3+ times in a row.
pub fn is_probable_shape(word: &str) -> bool {
    let w = word.trim();
    let len = w.chars().count();
    if (2..=5).contains(&len) && is_all_upper(w) {
        return true;
    }
    if !letters_only().is_match(w) {
        return false;
    }
    len >= 3 && !has_triple_run(w)
}

pub struct WordFilter {
    allow: HashSet<String>,
    deny: HashSet<String>,
    dictionary: Box<dyn Dictionary>,
}

impl std::fmt::Debug for WordFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordFilter")
            .field("allow", &self.allow)
            .field("deny", &self.deny)
            .finish_non_exhaustive()
    }
}

impl Default for WordFilter {
    fn default() -> Self {
        Self::heuristic(&FilterConfig::default())
    }
}

impl WordFilter {
    /// Build with an explicit dictionary. Allow-listed words are registered
    /// into it so they are never treated as misspellings.
    pub fn new(config: &FilterConfig, mut dictionary: Box<dyn Dictionary>) -> Self {
        let allow_words: Vec<String> = config.allow.iter().map(|w| w.trim().to_lowercase()).collect();
        if config.use_spell {
            dictionary.register(&allow_words);
        } else {
            dictionary = Box::new(NoDictionary);
        }

        Self {
            allow: allow_words.iter().map(|w| normalize(w)).collect(),
            deny: config.deny.iter().map(|w| normalize(w.trim())).collect(),
            dictionary,
        }
    }

    /// Allow/deny and shape rules only.
    pub fn heuristic(config: &FilterConfig) -> Self {
        Self::new(config, Box::new(NoDictionary))
    }

    /// Load the configured word list if any. A list that cannot be read
    /// degrades to heuristic-only filtering.
    pub fn from_config(config: &FilterConfig) -> Self {
        if !config.use_spell {
            return Self::heuristic(config);
        }
        let Some(path) = &config.dictionary_path else {
            tracing::debug!("no dictionary configured, using heuristic filter");
            return Self::heuristic(config);
        };

        match WordListDictionary::load(path, &config.language, config.spell_distance) {
            Ok(dict) if dict.is_empty() => {
                tracing::warn!(path = %path.display(), "dictionary is empty, using heuristic filter");
                Self::heuristic(config)
            }
            Ok(dict) => {
                tracing::debug!(language = dict.language(), "spelling check enabled");
                Self::new(config, Box::new(dict))
            }
            Err(e) => {
                tracing::warn!(error = %e, "dictionary unavailable, using heuristic filter");
                Self::heuristic(config)
            }
        }
    }

    /// Decision order: allow-list, shape, deny-list, dictionary.
    pub fn is_valid(&self, word: &str) -> bool {
        let key = normalize(word);
        if self.allow.contains(&key) {
            return true;
        }

        let w = word.trim();
        if !is_clean_word(w) || !is_probable_shape(w) {
            return false;
        }
        if self.deny.contains(&key) {
            return false;
        }

        if w.chars().count() > 3 && !is_all_upper(w) {
            let lower = w.to_lowercase();
            if !self.dictionary.contains(&lower) && self.dictionary.correction(&lower) != lower {
                return false;
            }
        }
        true
    }
}
