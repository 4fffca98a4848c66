//! Application settings storage
//!
//! Stores build parameters and provider paths in a JSON file. Every field has
//! a default, so a partial (or missing) file is fine. A few environment
//! variables override the stored paths.

use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::tree::{constants, TreeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_VECTORS: &str = "WORDTREE_VECTORS";
pub const ENV_DICTIONARY: &str = "WORDTREE_DICTIONARY";
pub const ENV_BIND: &str = "WORDTREE_BIND";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// word2vec text file (optionally .gz)
    #[serde(default)]
    pub vectors_path: Option<PathBuf>,
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default = "default_breadth")]
    pub breadth: usize,
    #[serde(default = "default_min_sim_to_parent")]
    pub min_sim_to_parent: f32,
    #[serde(default = "default_min_sim_to_root")]
    pub min_sim_to_root: f32,
    #[serde(default = "default_expand_factor")]
    pub expand_factor: usize,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_spell_distance")]
    pub spell_distance: usize,
    #[serde(default = "default_true")]
    pub use_spell: bool,
    /// Word list for the spelling check (None = heuristic filter only)
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
    /// Lemma table (None = suffix stemming)
    #[serde(default)]
    pub lemma_path: Option<PathBuf>,
    /// Where the server writes the latest tree
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_depth() -> usize {
    constants::DEPTH
}

fn default_breadth() -> usize {
    constants::BREADTH
}

fn default_min_sim_to_parent() -> f32 {
    constants::MIN_SIM_TO_PARENT
}

fn default_min_sim_to_root() -> f32 {
    constants::MIN_SIM_TO_ROOT
}

fn default_expand_factor() -> usize {
    constants::EXPAND_FACTOR
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

fn default_output_path() -> PathBuf {
    PathBuf::from("trees.json")
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vectors_path: None,
            depth: default_depth(),
            breadth: default_breadth(),
            min_sim_to_parent: default_min_sim_to_parent(),
            min_sim_to_root: default_min_sim_to_root(),
            expand_factor: default_expand_factor(),
            allow: Vec::new(),
            deny: Vec::new(),
            language: default_language(),
            spell_distance: default_spell_distance(),
            use_spell: true,
            dictionary_path: None,
            lemma_path: None,
            output_path: default_output_path(),
            bind: default_bind(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from `path` (or the default location) and apply env overrides
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::load(p)?,
            None => match default_path() {
                Some(p) => Self::load(&p)?,
                None => Settings::default(),
            },
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        fs::write(path, content).map_err(|e| Error::io(path, e))
    }

    /// Environment variables take precedence over stored values
    pub fn apply_env(&mut self) {
        if let Some(v) = non_empty_env(ENV_VECTORS) {
            self.vectors_path = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty_env(ENV_DICTIONARY) {
            self.dictionary_path = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty_env(ENV_BIND) {
            self.bind = v;
        }
    }

    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            depth: self.depth,
            breadth: self.breadth,
            min_sim_to_parent: self.min_sim_to_parent,
            min_sim_to_root: self.min_sim_to_root,
            expand_factor: self.expand_factor,
            ..Default::default()
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            allow: self.allow.clone(),
            deny: self.deny.clone(),
            language: self.language.clone(),
            spell_distance: self.spell_distance,
            use_spell: self.use_spell,
            dictionary_path: self.dictionary_path.clone(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// `<config dir>/wordtree/settings.json`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wordtree").join("settings.json"))
}

/// Newline-separated words, lowercased; blank lines skipped.
pub fn load_word_file(path: &Path) -> Result<BTreeSet<String>> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(content
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Comma-separated words, lowercased; empty items skipped.
pub fn parse_csv_words(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
