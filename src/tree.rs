//! Similarity tree construction.
//!
//! Grows a depth- and breadth-bounded tree around a seed word. Each child is
//! close to its parent and to the root, unique across the whole tree (by
//! normalized key), the only member of its morphological family among its
//! siblings, and not a near-duplicate of any sibling.
//!
//! Construction is a single depth-first pass. All mutable state lives in a
//! [`BuildContext`] owned by one `build` call, so concurrent builds over the
//! same provider never interfere.

use crate::diversity::{DiversityChecker, EMBEDDING_DUP_THRESHOLD, STRING_DUP_THRESHOLD};
use crate::embeddings::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::filter::WordFilter;
use crate::morphology::Canonicalizer;
use crate::normalize::normalize;
use crate::retriever::{resolve_token, CandidateRetriever};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Algorithm constants.
pub mod constants {
    /// Default number of levels, root included.
    pub const DEPTH: usize = 4;
    /// Default children per node.
    pub const BREADTH: usize = 4;
    pub const MIN_SIM_TO_PARENT: f32 = 0.32;
    pub const MIN_SIM_TO_ROOT: f32 = 0.28;
    /// Neighbor query growth per retrieval round.
    pub const EXPAND_FACTOR: usize = 6;
    /// Floor on the candidate pool fetched per node.
    pub const MIN_POOL: usize = 60;
    /// Pool size per requested child.
    pub const POOL_PER_CHILD: usize = 12;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub token: String,
    /// Cosine similarity to the parent; `None` only at the root.
    pub similarity_to_parent: Option<f32>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(token: impl Into<String>, similarity_to_parent: Option<f32>) -> Self {
        Self {
            token: token.into(),
            similarity_to_parent,
            children: Vec::new(),
        }
    }

    /// Total nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Number of levels in this subtree (a lone node has depth 1).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    /// Nodes in pre-order.
    pub fn preorder(&self) -> Vec<&TreeNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.preorder());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Levels including the root.
    pub depth: usize,
    /// Maximum children per node.
    pub breadth: usize,
    pub min_sim_to_parent: f32,
    pub min_sim_to_root: f32,
    pub expand_factor: usize,
    pub min_pool: usize,
    pub pool_per_child: usize,
    /// Edit-similarity at or above which two siblings are duplicates.
    pub string_dup_threshold: f32,
    /// Cosine at or above which two siblings are duplicates.
    pub embedding_dup_threshold: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: constants::DEPTH,
            breadth: constants::BREADTH,
            min_sim_to_parent: constants::MIN_SIM_TO_PARENT,
            min_sim_to_root: constants::MIN_SIM_TO_ROOT,
            expand_factor: constants::EXPAND_FACTOR,
            min_pool: constants::MIN_POOL,
            pool_per_child: constants::POOL_PER_CHILD,
            string_dup_threshold: STRING_DUP_THRESHOLD,
            embedding_dup_threshold: EMBEDDING_DUP_THRESHOLD,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::config("depth must be at least 1"));
        }
        if self.breadth == 0 {
            return Err(Error::config("breadth must be at least 1"));
        }
        if self.expand_factor == 0 {
            return Err(Error::config("expand_factor must be at least 1"));
        }
        if self.min_pool < constants::MIN_POOL {
            return Err(Error::config(format!(
                "min_pool must be at least {}, got {}",
                constants::MIN_POOL,
                self.min_pool
            )));
        }
        if self.pool_per_child < constants::POOL_PER_CHILD {
            return Err(Error::config(format!(
                "pool_per_child must be at least {}, got {}",
                constants::POOL_PER_CHILD,
                self.pool_per_child
            )));
        }
        if self.breadth.checked_mul(self.pool_per_child).is_none() {
            return Err(Error::config(format!("breadth {} is too large", self.breadth)));
        }
        for (name, value) in [
            ("min_sim_to_parent", self.min_sim_to_parent),
            ("min_sim_to_root", self.min_sim_to_root),
        ] {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(Error::config(format!("{} must be within [-1, 1], got {}", name, value)));
            }
        }
        for (name, value) in [
            ("string_dup_threshold", self.string_dup_threshold),
            ("embedding_dup_threshold", self.embedding_dup_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        Ok(())
    }

    /// Candidates fetched per node before filtering.
    pub fn pool_size(&self) -> usize {
        self.min_pool
            .max(self.breadth.saturating_mul(self.pool_per_child))
    }
}

/// Counters for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub nodes: usize,
    pub retrievals: usize,
    pub rejected_similarity: usize,
    pub rejected_visited: usize,
    pub rejected_sibling: usize,
}

/// Per-build state threaded through the recursion.
#[derive(Debug)]
struct BuildContext {
    root_token: String,
    /// Normalized keys of every accepted node.
    visited: HashSet<String>,
    stats: BuildStats,
}

impl BuildContext {
    fn new(root_token: &str) -> Self {
        let mut visited = HashSet::new();
        visited.insert(normalize(root_token));
        Self {
            root_token: root_token.to_string(),
            visited,
            stats: BuildStats::default(),
        }
    }
}

pub struct TreeBuilder<'a> {
    provider: &'a dyn EmbeddingProvider,
    filter: &'a WordFilter,
    canonicalizer: &'a Canonicalizer,
    diversity: DiversityChecker,
    config: TreeConfig,
}

impl<'a> TreeBuilder<'a> {
    /// Fails only on an invalid configuration.
    pub fn new(
        provider: &'a dyn EmbeddingProvider,
        filter: &'a WordFilter,
        canonicalizer: &'a Canonicalizer,
        config: TreeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let diversity = DiversityChecker {
            string_threshold: config.string_dup_threshold,
            embedding_threshold: config.embedding_dup_threshold,
        };
        Ok(Self {
            provider,
            filter,
            canonicalizer,
            diversity,
            config,
        })
    }

    pub fn build(&self, root_word: &str) -> TreeNode {
        self.build_with_stats(root_word).0
    }

    /// An unknown root yields a childless node carrying the word as given.
    pub fn build_with_stats(&self, root_word: &str) -> (TreeNode, BuildStats) {
        let Some(root_token) = resolve_token(self.provider, root_word) else {
            tracing::info!(root = root_word, "root not in vocabulary");
            let stats = BuildStats {
                nodes: 1,
                ..Default::default()
            };
            return (TreeNode::leaf(root_word.trim(), None), stats);
        };

        let mut ctx = BuildContext::new(&root_token);
        let tree = self.build_node(&mut ctx, root_token, None, 0);

        tracing::info!(
            root = %ctx.root_token,
            nodes = ctx.stats.nodes,
            depth = tree.depth(),
            rejected_similarity = ctx.stats.rejected_similarity,
            rejected_visited = ctx.stats.rejected_visited,
            rejected_sibling = ctx.stats.rejected_sibling,
            "built similarity tree"
        );
        (tree, ctx.stats)
    }

    fn build_node(
        &self,
        ctx: &mut BuildContext,
        token: String,
        similarity_to_parent: Option<f32>,
        level: usize,
    ) -> TreeNode {
        ctx.stats.nodes += 1;
        let mut node = TreeNode::leaf(token, similarity_to_parent);
        if level + 1 >= self.config.depth {
            return node;
        }

        // Select every sibling before descending so deeper levels cannot
        // claim words this level wants.
        let picked = self.choose_children(ctx, &node.token, level);
        node.children = picked
            .into_iter()
            .map(|(child, sim)| self.build_node(ctx, child, Some(sim), level + 1))
            .collect();
        node
    }

    fn choose_children(&self, ctx: &mut BuildContext, parent: &str, level: usize) -> Vec<(String, f32)> {
        ctx.stats.retrievals += 1;
        let retriever = CandidateRetriever::new(self.provider, self.filter);
        let pool = retriever.get_candidates(
            parent,
            self.config.pool_size(),
            self.config.expand_factor,
            &ctx.visited,
        );
        let pool = self
            .canonicalizer
            .keep_best_per_family(pool, |c| c.token.as_str(), |c| c.score);

        let mut picked: Vec<(String, f32)> = Vec::new();
        let mut siblings: Vec<String> = Vec::new();

        for cand in pool {
            let key = normalize(&cand.token);
            if ctx.visited.contains(&key) {
                ctx.stats.rejected_visited += 1;
                continue;
            }
            if !self.filter.is_valid(&cand.token) {
                continue;
            }

            let Some(sim_parent) = self.provider.similarity(parent, &cand.token) else {
                continue;
            };
            if sim_parent < self.config.min_sim_to_parent {
                ctx.stats.rejected_similarity += 1;
                continue;
            }

            // Children of the root answer to the parent floor only
            if level >= 1 {
                let sim_root = self.provider.similarity(&ctx.root_token, &cand.token);
                if sim_root.map_or(true, |s| s < self.config.min_sim_to_root) {
                    ctx.stats.rejected_similarity += 1;
                    continue;
                }
            }

            if self
                .diversity
                .is_sibling_duplicate(self.provider, &cand.token, &siblings)
            {
                ctx.stats.rejected_sibling += 1;
                continue;
            }

            ctx.visited.insert(key);
            siblings.push(cand.token.clone());
            picked.push((cand.token, sim_parent));

            if picked.len() >= self.config.breadth {
                break;
            }
        }

        tracing::debug!(parent, level, children = picked.len(), "chose children");
        picked
    }
}

/// Build a tree with the default suffix-stemming canonicalizer.
pub fn build_tree(
    provider: &dyn EmbeddingProvider,
    root_word: &str,
    config: TreeConfig,
    filter: &WordFilter,
) -> Result<TreeNode> {
    let canonicalizer = Canonicalizer::default();
    let builder = TreeBuilder::new(provider, filter, &canonicalizer, config)?;
    Ok(builder.build(root_word))
}
