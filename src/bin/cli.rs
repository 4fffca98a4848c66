//! wordtree CLI - build similarity trees from the command line
//!
//! Usage: wordtree-cli [OPTIONS] <COMMAND>
//!
//! Settings come from the settings file (see `--settings`), then
//! `WORDTREE_*` environment variables, then command-line flags.

use clap::{Args, Parser, Subcommand};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wordtree_lib::retriever::CandidateRetriever;
use wordtree_lib::settings::{self, Settings};
use wordtree_lib::{render, Canonicalizer, KeyedVectors, TreeBuilder, TreeNode, WordFilter};

// ============================================================================
// Main CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "wordtree-cli")]
#[command(version, about = "Grow trees of related words from word embeddings", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (default: <config dir>/wordtree/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Detailed logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a tree for each root word
    Build {
        /// Root words to expand
        #[arg(long, num_args = 1.., required = true)]
        roots: Vec<String>,
        #[command(flatten)]
        vectors: VectorArgs,
        /// Tree depth (levels, including root)
        #[arg(long)]
        depth: Option<usize>,
        /// Children per node
        #[arg(long)]
        breadth: Option<usize>,
        /// Min similarity to parent
        #[arg(long)]
        min_sim_parent: Option<f32>,
        /// Min similarity to root
        #[arg(long)]
        min_sim_root: Option<f32>,
        /// Lemma table (form<TAB>pos<TAB>lemma); suffix stemming if absent
        #[arg(long)]
        lemmas: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Save combined trees to a JSON file
        #[arg(long)]
        save_json: Option<PathBuf>,
        /// Save combined trees to a Markdown file
        #[arg(long)]
        save_md: Option<PathBuf>,
    },
    /// Report whether words pass the validity filter
    Check {
        words: Vec<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List filtered nearest neighbors of a word
    Neighbors {
        word: String,
        #[command(flatten)]
        vectors: VectorArgs,
        /// Number of candidates
        #[arg(long, short, default_value = "20")]
        n: usize,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args)]
struct VectorArgs {
    /// word2vec text file (.txt or .txt.gz)
    #[arg(long)]
    kv: Option<PathBuf>,
}

#[derive(Args)]
struct FilterArgs {
    /// Dictionary language tag
    #[arg(long)]
    lang: Option<String>,
    /// Edit distance for spelling corrections
    #[arg(long)]
    spell_distance: Option<usize>,
    /// Disable the dictionary check
    #[arg(long)]
    no_spell: bool,
    /// Word list for the dictionary check
    #[arg(long)]
    dictionary: Option<PathBuf>,
    /// Comma-separated allow-list
    #[arg(long, default_value = "")]
    allow: String,
    /// Comma-separated deny-list
    #[arg(long, default_value = "")]
    deny: String,
    /// Newline-separated allow-list file
    #[arg(long)]
    allow_file: Option<PathBuf>,
    /// Newline-separated deny-list file
    #[arg(long)]
    deny_file: Option<PathBuf>,
}

impl FilterArgs {
    /// Merge flags into the stored settings.
    fn apply(&self, settings: &mut Settings) -> Result<(), String> {
        if let Some(lang) = &self.lang {
            settings.language = lang.clone();
        }
        if let Some(d) = self.spell_distance {
            settings.spell_distance = d;
        }
        if self.no_spell {
            settings.use_spell = false;
        }
        if let Some(path) = &self.dictionary {
            settings.dictionary_path = Some(path.clone());
        }

        let allow = merge_words(&settings.allow, &self.allow, self.allow_file.as_deref())?;
        let deny = merge_words(&settings.deny, &self.deny, self.deny_file.as_deref())?;
        settings.allow = allow;
        settings.deny = deny;
        Ok(())
    }
}

fn merge_words(stored: &[String], csv: &str, file: Option<&Path>) -> Result<Vec<String>, String> {
    let mut words: BTreeSet<String> = stored.iter().map(|w| w.to_lowercase()).collect();
    words.extend(settings::parse_csv_words(csv));
    if let Some(path) = file {
        words.extend(settings::load_word_file(path).map_err(|e| e.to_string())?);
    }
    Ok(words.into_iter().collect())
}

fn load_vectors(args: &VectorArgs, settings: &Settings) -> Result<KeyedVectors, String> {
    let path = args
        .kv
        .clone()
        .or_else(|| settings.vectors_path.clone())
        .ok_or_else(|| format!("No vectors file: pass --kv or set {}", settings::ENV_VECTORS))?;

    eprintln!("Loading vectors: {}", path.display());
    KeyedVectors::load(&path).map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<(), String> {
    let mut settings =
        Settings::load_with_env(cli.settings.as_deref()).map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Build {
            roots,
            vectors,
            depth,
            breadth,
            min_sim_parent,
            min_sim_root,
            lemmas,
            filter,
            save_json,
            save_md,
        } => {
            filter.apply(&mut settings)?;
            if let Some(d) = depth {
                settings.depth = d;
            }
            if let Some(b) = breadth {
                settings.breadth = b;
            }
            if let Some(s) = min_sim_parent {
                settings.min_sim_to_parent = s;
            }
            if let Some(s) = min_sim_root {
                settings.min_sim_to_root = s;
            }
            if lemmas.is_some() {
                settings.lemma_path = lemmas;
            }

            let kv = load_vectors(&vectors, &settings)?;
            let word_filter = WordFilter::from_config(&settings.filter_config());
            let canonicalizer = Canonicalizer::from_path(settings.lemma_path.as_deref());
            let builder = TreeBuilder::new(&kv, &word_filter, &canonicalizer, settings.tree_config())
                .map_err(|e| e.to_string())?;

            let mut all_trees: BTreeMap<String, TreeNode> = BTreeMap::new();
            for root in &roots {
                let tree = builder.build(root);
                if !cli.json {
                    println!("\n=== Root: {} ===", root);
                    render::print_tree(&tree);
                }
                all_trees.insert(root.clone(), tree);
            }

            let json = render::to_json(&all_trees).map_err(|e| e.to_string())?;
            if cli.json {
                println!("{}", json);
            }

            if let Some(path) = save_json {
                fs::write(&path, json)
                    .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
                println!("\nSaved JSON to {}", path.display());
            }

            if let Some(path) = save_md {
                fs::write(&path, render::markdown_document(&all_trees))
                    .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
                println!("Saved Markdown to {}", path.display());
            }
        }

        Commands::Check { words, filter } => {
            filter.apply(&mut settings)?;
            let word_filter = WordFilter::from_config(&settings.filter_config());

            let results: BTreeMap<&str, bool> = words
                .iter()
                .map(|w| (w.as_str(), word_filter.is_valid(w)))
                .collect();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results).map_err(|e| e.to_string())?);
            } else {
                for word in &words {
                    let verdict = if results[word.as_str()] { "valid" } else { "invalid" };
                    println!("{:<24} {}", word, verdict);
                }
            }
        }

        Commands::Neighbors { word, vectors, n, filter } => {
            filter.apply(&mut settings)?;
            let kv = load_vectors(&vectors, &settings)?;
            let word_filter = WordFilter::from_config(&settings.filter_config());
            let retriever = CandidateRetriever::new(&kv, &word_filter);

            let candidates =
                retriever.get_candidates(&word, n, settings.expand_factor, &Default::default());

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&candidates).map_err(|e| e.to_string())?);
            } else if candidates.is_empty() {
                println!("No candidates for '{}'", word);
            } else {
                for (i, c) in candidates.iter().enumerate() {
                    println!("{:>3}. {:<24} {:.3}", i + 1, c.token, c.score);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_save_paths() {
        let cli = Cli::try_parse_from([
            "wordtree-cli", "--json", "build", "--roots", "brain", "mind",
            "--save-json", "trees.json", "--save-md", "trees.md",
        ]).expect("should parse save paths");
        assert!(cli.json, "--json only switches stdout to JSON");
        match cli.command {
            Commands::Build { roots, save_json, save_md, .. } => {
                assert_eq!(roots, vec!["brain", "mind"]);
                assert_eq!(save_json, Some(PathBuf::from("trees.json")));
                assert_eq!(save_md, Some(PathBuf::from("trees.md")));
            }
            _ => panic!("expected Build"),
        }
    }

    #[test]
    fn test_oversized_breadth_is_a_config_error() {
        let cli = Cli::try_parse_from([
            "wordtree-cli", "build", "--roots", "brain", "--breadth", "4611686018427387903",
        ]).expect("should parse a large breadth");
        let Commands::Build { breadth, .. } = cli.command else {
            panic!("expected Build");
        };
        let settings = Settings {
            breadth: breadth.unwrap(),
            ..Default::default()
        };
        assert!(settings.tree_config().validate().is_err());
    }

    #[test]
    fn test_neighbors_short_count_flag() {
        let cli = Cli::try_parse_from([
            "wordtree-cli", "neighbors", "brain", "-n", "5", "-v",
        ]).expect("should parse -n with -v");
        assert!(cli.verbose);
        match cli.command {
            Commands::Neighbors { word, n, .. } => {
                assert_eq!(word, "brain");
                assert_eq!(n, 5);
            }
            _ => panic!("expected Neighbors"),
        }
    }

    #[test]
    fn test_filter_args_merge_into_settings() {
        let cli = Cli::try_parse_from([
            "wordtree-cli", "check", "braiin", "--deny", "Braiin, typo", "--no-spell",
        ]).expect("should parse filter flags");
        let Commands::Check { filter, .. } = cli.command else {
            panic!("expected Check");
        };
        let mut settings = Settings {
            deny: vec!["old".to_string()],
            ..Default::default()
        };
        filter.apply(&mut settings).unwrap();
        assert!(!settings.use_spell);
        assert_eq!(settings.deny, vec!["braiin", "old", "typo"]);
    }
}
