//! Word trees grown from an embedding space.
//!
//! A seed word is expanded into a bounded tree of related words. Candidates
//! come from nearest-neighbor queries; a validity filter, morphological
//! family collapsing and sibling-diversity checks keep the result readable.

pub mod dictionary;
pub mod diversity;
pub mod embeddings;
pub mod error;
pub mod filter;
pub mod morphology;
pub mod normalize;
pub mod render;
pub mod retriever;
pub mod settings;
pub mod similarity;
pub mod tree;

pub use embeddings::{EmbeddingProvider, KeyedVectors};
pub use error::{Error, Result};
pub use filter::{FilterConfig, WordFilter};
pub use morphology::Canonicalizer;
pub use tree::{build_tree, BuildStats, TreeBuilder, TreeConfig, TreeNode};
