//! Morphological families.
//!
//! Inflectional variants ("thinker", "thinking") share a family key so a tree
//! level never shows more than one of them. Keys come from a pluggable
//! [`Lemmatizer`]; the default [`SuffixStemmer`] strips the longest known
//! suffix instead.

use crate::error::{Error, Result};
use crate::normalize::normalize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Checked longest-first: "ations" must win over "s".
const SUFFIXES: &[&str] = &[
    "ations", "ation", "ators", "ator", "ating", "ated", "ates", "ative", "ments", "ment",
    "ings", "ing", "ers", "er", "ed", "es", "s",
];

const MIN_STEM_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    Verb,
}

impl FromStr for PartOfSpeech {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "noun" => Ok(PartOfSpeech::Noun),
            "v" | "verb" => Ok(PartOfSpeech::Verb),
            _ => Err(format!("unknown part of speech '{}'", s)),
        }
    }
}

pub trait Lemmatizer: Send + Sync {
    /// Dictionary form of `word` for the given part of speech, or `None` if
    /// the lemmatizer cannot answer.
    fn lemma(&self, word: &str, pos: PartOfSpeech) -> Option<String>;
}

/// Strip the longest listed suffix that leaves a stem of 3+ chars.
pub fn suffix_stem(word: &str) -> String {
    for suf in SUFFIXES {
        if let Some(stem) = word.strip_suffix(suf) {
            if stem.chars().count() >= MIN_STEM_LEN {
                return stem.to_string();
            }
        }
    }
    word.to_string()
}

/// Fallback lemmatizer: nouns pass through, verbs are suffix-stemmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixStemmer;

impl Lemmatizer for SuffixStemmer {
    fn lemma(&self, word: &str, pos: PartOfSpeech) -> Option<String> {
        match pos {
            PartOfSpeech::Noun => Some(word.to_string()),
            PartOfSpeech::Verb => Some(suffix_stem(word)),
        }
    }
}

/// Lookup-table lemmatizer read from `form<TAB>pos<TAB>lemma` lines.
/// Forms missing from the table are their own lemma.
#[derive(Debug, Clone, Default)]
pub struct LemmaTable {
    entries: HashMap<(PartOfSpeech, String), String>,
}

impl LemmaTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut table = LemmaTable::default();

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bad_line = |message: String| Error::WordList {
                path: path.to_path_buf(),
                line: i + 1,
                message,
            };

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let [form, pos, lemma] = fields.as_slice() else {
                return Err(bad_line(format!("expected 3 tab-separated fields, got {}", fields.len())));
            };
            let pos: PartOfSpeech = pos.parse().map_err(bad_line)?;
            table.insert(form, pos, lemma);
        }

        tracing::info!(path = %path.display(), entries = table.entries.len(), "loaded lemma table");
        Ok(table)
    }

    pub fn insert(&mut self, form: &str, pos: PartOfSpeech, lemma: &str) {
        self.entries
            .insert((pos, form.to_lowercase()), lemma.to_lowercase());
    }
}

impl Lemmatizer for LemmaTable {
    fn lemma(&self, word: &str, pos: PartOfSpeech) -> Option<String> {
        Some(
            self.entries
                .get(&(pos, word.to_lowercase()))
                .cloned()
                .unwrap_or_else(|| word.to_string()),
        )
    }
}

pub struct Canonicalizer {
    lemmatizer: Box<dyn Lemmatizer>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(Box::new(SuffixStemmer))
    }
}

impl Canonicalizer {
    pub fn new(lemmatizer: Box<dyn Lemmatizer>) -> Self {
        Self { lemmatizer }
    }

    /// Use the lemma table at `path` when it loads, suffix stemming otherwise.
    pub fn from_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match LemmaTable::load(path) {
            Ok(table) => Self::new(Box::new(table)),
            Err(e) => {
                tracing::warn!(error = %e, "lemmatizer unavailable, falling back to suffix stemming");
                Self::default()
            }
        }
    }

    /// Family key: noun lemma, then verb lemma of that; suffix stem if the
    /// lemmatizer gives up.
    pub fn canonical_key(&self, word: &str) -> String {
        let w = normalize(word);
        self.lemmatizer
            .lemma(&w, PartOfSpeech::Noun)
            .and_then(|noun| self.lemmatizer.lemma(&noun, PartOfSpeech::Verb))
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| suffix_stem(&w))
    }

    /// Keep the highest-scoring member of each family (first one on ties),
    /// preserving the original order of the winners.
    pub fn keep_best_per_family<T, K, S>(&self, candidates: Vec<T>, token: K, score: S) -> Vec<T>
    where
        K: Fn(&T) -> &str,
        S: Fn(&T) -> f32,
    {
        let keys: Vec<String> = candidates
            .iter()
            .map(|c| self.canonical_key(token(c)))
            .collect();

        let mut best: HashMap<&str, usize> = HashMap::new();
        for (i, key) in keys.iter().enumerate() {
            match best.get(key.as_str()) {
                Some(&j) if score(&candidates[i]) <= score(&candidates[j]) => {}
                _ => {
                    best.insert(key.as_str(), i);
                }
            }
        }

        let winners: HashSet<usize> = best.into_values().collect();
        candidates
            .into_iter()
            .enumerate()
            .filter(|(i, _)| winners.contains(i))
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_suffix_stem_longest_first() {
        assert_eq!(suffix_stem("creations"), "cre");
        assert_eq!(suffix_stem("thinking"), "think");
        assert_eq!(suffix_stem("thinker"), "think");
        assert_eq!(suffix_stem("arguments"), "argu");
    }

    #[test]
    fn test_suffix_stem_keeps_short_stems() {
        // stripping "ing" would leave "th"
        assert_eq!(suffix_stem("thing"), "thing");
        assert_eq!(suffix_stem("bed"), "bed");
        assert_eq!(suffix_stem("mind"), "mind");
    }

    #[test]
    fn test_canonical_key_with_stemmer() {
        let canon = Canonicalizer::default();
        assert_eq!(canon.canonical_key("Thinking"), "think");
        assert_eq!(canon.canonical_key("thinkers"), "think");
        assert_eq!(canon.canonical_key("neurons"), canon.canonical_key("neuron"));
    }

    #[test]
    fn test_canonical_key_with_lemma_table() {
        let mut table = LemmaTable::default();
        table.insert("ran", PartOfSpeech::Verb, "run");
        table.insert("running", PartOfSpeech::Verb, "run");
        table.insert("mice", PartOfSpeech::Noun, "mouse");
        let canon = Canonicalizer::new(Box::new(table));

        assert_eq!(canon.canonical_key("running"), "run");
        assert_eq!(canon.canonical_key("ran"), "run");
        assert_eq!(canon.canonical_key("run"), "run");
        assert_eq!(canon.canonical_key("Mice"), "mouse");
        // not in the table: its own lemma, no stemming
        assert_eq!(canon.canonical_key("thinking"), "thinking");
    }

    struct Broken;

    impl Lemmatizer for Broken {
        fn lemma(&self, _word: &str, _pos: PartOfSpeech) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_canonical_key_falls_back_when_lemmatizer_fails() {
        let canon = Canonicalizer::new(Box::new(Broken));
        assert_eq!(canon.canonical_key("thinking"), "think");
    }

    #[test]
    fn test_keep_best_per_family() {
        let canon = Canonicalizer::default();
        let cands = vec![
            ("thinker".to_string(), 0.70),
            ("idea".to_string(), 0.65),
            ("thinking".to_string(), 0.80),
            ("thinks".to_string(), 0.80),
            ("mind".to_string(), 0.60),
        ];

        let kept = canon.keep_best_per_family(cands, |c| c.0.as_str(), |c| c.1);
        let tokens: Vec<&str> = kept.iter().map(|c| c.0.as_str()).collect();
        // "thinking" beats "thinker"; "thinks" ties with it and loses
        assert_eq!(tokens, vec!["idea", "thinking", "mind"]);
    }

    #[test]
    fn test_keep_best_per_family_empty() {
        let canon = Canonicalizer::default();
        let kept: Vec<(String, f32)> = canon.keep_best_per_family(Vec::new(), |c| c.0.as_str(), |c| c.1);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_lemma_table_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "running\tv\trun").unwrap();
        writeln!(file, "mice\tnoun\tmouse").unwrap();
        let table = LemmaTable::load(file.path()).unwrap();
        assert_eq!(table.lemma("mice", PartOfSpeech::Noun).as_deref(), Some("mouse"));
        assert_eq!(table.lemma("mice", PartOfSpeech::Verb).as_deref(), Some("mice"));
    }

    #[test]
    fn test_part_of_speech_parse() {
        assert_eq!("n".parse::<PartOfSpeech>(), Ok(PartOfSpeech::Noun));
        assert_eq!("VERB".parse::<PartOfSpeech>(), Ok(PartOfSpeech::Verb));
        assert!("adj".parse::<PartOfSpeech>().is_err());
    }

    #[test]
    fn test_lemma_table_rejects_bad_pos() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "running\tadj\trun").unwrap();
        assert!(LemmaTable::load(file.path()).is_err());
    }

    #[test]
    fn test_from_path_missing_file_degrades() {
        let canon = Canonicalizer::from_path(Some(Path::new("/no/such/lemmas.tsv")));
        assert_eq!(canon.canonical_key("thinking"), "think");
    }
}
