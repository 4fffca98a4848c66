//! Word-embedding provider.
//!
//! The tree builder only talks to [`EmbeddingProvider`]. [`KeyedVectors`] is
//! the in-memory implementation, loaded from a word2vec text file (plain or
//! gzip-compressed). Vectors are L2-normalised at load time so every
//! similarity is a plain dot product.

use crate::error::{Error, Result};
use crate::similarity::{dot, find_similar, l2_normalize};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Read-only view of an embedding space.
///
/// Implementations must be deterministic: the same query always yields the
/// same ranking. They are shared across concurrent builds, hence `Sync`.
pub trait EmbeddingProvider: Send + Sync {
    /// The vocabulary entry for exactly this token, if present.
    fn resolve(&self, token: &str) -> Option<String>;

    /// Up to `top_n` nearest neighbors of `token` by cosine similarity,
    /// highest first, never including `token` itself. Empty for OOV tokens.
    fn neighbors(&self, token: &str, top_n: usize) -> Vec<(String, f32)>;

    /// Cosine similarity of two tokens; `None` if either is OOV.
    fn similarity(&self, a: &str, b: &str) -> Option<f32>;

    /// All vocabulary entries in their canonical (file) order.
    fn vocabulary(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Token → unit vector table, kept in file order.
#[derive(Debug, Clone, Default)]
pub struct KeyedVectors {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl KeyedVectors {
    /// Build from (token, vector) pairs. Repeated tokens keep the first vector.
    pub fn from_entries(entries: Vec<(String, Vec<f32>)>) -> Result<Self> {
        let mut kv = KeyedVectors::default();
        for (token, vector) in entries {
            kv.insert(token, vector)?;
        }
        Ok(kv)
    }

    /// Load a word2vec text file; `.gz` files are decompressed on the fly.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let kv = Self::from_reader(BufReader::new(reader))?;
        tracing::info!(
            path = %path.display(),
            tokens = kv.len(),
            dim = kv.dim,
            "loaded word vectors"
        );
        Ok(kv)
    }

    /// Parse word2vec text format: optional `"<count> <dim>"` header, then
    /// one `token v1 v2 ...` line per entry.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut kv = KeyedVectors::default();
        let mut header_seen = false;

        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|e| Error::VectorFormat {
                line: line_no,
                message: e.to_string(),
            })?;
            let mut fields = line.split_whitespace();
            let Some(token) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if !header_seen && kv.tokens.is_empty() {
                header_seen = true;
                if let [dim] = rest.as_slice() {
                    if let (Ok(_), Ok(dim)) = (token.parse::<usize>(), dim.parse::<usize>()) {
                        kv.dim = dim;
                        continue;
                    }
                }
            }

            if rest.is_empty() {
                return Err(Error::VectorFormat {
                    line: line_no,
                    message: format!("token '{}' has no vector", token),
                });
            }

            let vector = rest
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| Error::VectorFormat {
                    line: line_no,
                    message: format!("bad component for '{}': {}", token, e),
                })?;

            kv.insert(token.to_string(), vector)?;
        }

        Ok(kv)
    }

    fn insert(&mut self, token: String, mut vector: Vec<f32>) -> Result<()> {
        if self.dim == 0 {
            self.dim = vector.len();
        }
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                token,
                expected: self.dim,
                found: vector.len(),
            });
        }
        if self.index.contains_key(&token) {
            return Ok(());
        }

        l2_normalize(&mut vector);
        self.index.insert(token.clone(), self.tokens.len());
        self.tokens.push(token);
        self.vectors.push(vector);
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.index.get(token).map(|&i| self.vectors[i].as_slice())
    }
}

impl EmbeddingProvider for KeyedVectors {
    fn resolve(&self, token: &str) -> Option<String> {
        self.index.get(token).map(|&i| self.tokens[i].clone())
    }

    fn neighbors(&self, token: &str, top_n: usize) -> Vec<(String, f32)> {
        let Some(&idx) = self.index.get(token) else {
            return Vec::new();
        };

        find_similar(&self.vectors[idx], &self.vectors, Some(idx), top_n)
            .into_iter()
            .map(|(i, score)| (self.tokens[i].clone(), score))
            .collect()
    }

    fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        Some(dot(self.get(a)?, self.get(b)?))
    }

    fn vocabulary(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.tokens.iter().map(|t| t.as_str()))
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Small hand-built embedding space with a known geometry.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::KeyedVectors;

    /// Brain-themed vocabulary in 4 dimensions.
    ///
    /// Axes loosely mean: 0 = brain/anatomy, 1 = cortex/tissue,
    /// 2 = neuron/cell, 3 = mind/thought.
    pub fn brain_space() -> KeyedVectors {
        let entries: Vec<(&str, [f32; 4])> = vec![
            ("brain", [1.0, 0.0, 0.0, 0.0]),
            ("brains", [0.98, 0.1, 0.1, 0.0]),
            ("braiin", [0.97, 0.15, 0.1, 0.1]),
            ("cortex", [0.8, 0.6, 0.0, 0.0]),
            ("cortical", [0.78, 0.62, 0.05, 0.0]),
            ("neuron", [0.8, 0.0, 0.6, 0.0]),
            ("neurons", [0.79, 0.05, 0.61, 0.0]),
            ("mind", [0.7, 0.0, 0.0, 0.7]),
            ("xx99", [0.9, 0.2, 0.2, 0.2]),
            ("cerebral", [0.75, 0.35, 0.35, 0.35]),
            ("thinking", [0.5, 0.0, 0.1, 0.85]),
            ("thinker", [0.45, 0.0, 0.15, 0.88]),
            ("thought", [0.4, 0.0, 0.0, 0.9]),
            ("tissue", [0.3, 0.95, 0.0, 0.0]),
            ("synapse", [0.35, 0.1, 0.93, 0.0]),
            ("axon", [0.3, 0.2, 0.93, 0.0]),
            ("idea", [0.1, 0.0, 0.0, 1.0]),
            ("membrane", [0.1, 0.9, 0.4, 0.0]),
            ("banana", [-0.5, 0.1, 0.0, 0.2]),
        ];

        KeyedVectors::from_entries(
            entries
                .into_iter()
                .map(|(t, v)| (t.to_string(), v.to_vec()))
                .collect(),
        )
        .expect("fixture vectors share one dimension")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_reader_with_header() {
        let text = "3 2\nbrain 1 0\nmind 0.6 0.8\nidea 0 1\n";
        let kv = KeyedVectors::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(kv.len(), 3);
        assert_eq!(kv.dim(), 2);
        let sim = kv.similarity("brain", "mind").unwrap();
        assert!((sim - 0.6).abs() < 0.0001);
    }

    #[test]
    fn test_from_reader_without_header() {
        let text = "brain 2 0\n\nidea 0 3\n";
        let kv = KeyedVectors::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(kv.len(), 2);
        // vectors are unit length after loading
        let v = kv.get("brain").unwrap();
        assert!((v[0] - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_from_reader_rejects_bad_component() {
        let text = "brain 1 zero\n";
        let err = KeyedVectors::from_reader(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Error::VectorFormat { line: 1, .. }), "got {:?}", err);
    }

    #[test]
    fn test_from_reader_rejects_dimension_mismatch() {
        let text = "brain 1 0\nmind 1 0 0\n";
        let err = KeyedVectors::from_reader(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_load_gzip_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let file = tempfile::Builder::new().suffix(".txt.gz").tempfile().unwrap();
        let mut enc = GzEncoder::new(File::create(file.path()).unwrap(), Compression::default());
        enc.write_all(b"2 2\nbrain 1 0\nidea 0 1\n").unwrap();
        enc.finish().unwrap();

        let kv = KeyedVectors::load(file.path()).unwrap();
        assert_eq!(kv.len(), 2);
        assert_eq!(kv.resolve("idea").as_deref(), Some("idea"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = KeyedVectors::load("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_load_plain_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "brain 1 0").unwrap();
        writeln!(file, "mind 1 1").unwrap();
        let kv = KeyedVectors::load(file.path()).unwrap();
        assert_eq!(kv.vocabulary().collect::<Vec<_>>(), vec!["brain", "mind"]);
    }

    #[test]
    fn test_neighbors_exclude_query_and_rank() {
        let kv = fixtures::brain_space();
        let neighbors = kv.neighbors("brain", 3);
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.iter().all(|(t, _)| t != "brain"));
        assert_eq!(neighbors[0].0, "brains");
        assert!(neighbors[0].1 >= neighbors[1].1 && neighbors[1].1 >= neighbors[2].1);
    }

    #[test]
    fn test_oov_behaviour() {
        let kv = fixtures::brain_space();
        assert!(kv.neighbors("zzz", 5).is_empty());
        assert!(kv.similarity("brain", "zzz").is_none());
        assert!(kv.resolve("Brain").is_none());
    }
}
