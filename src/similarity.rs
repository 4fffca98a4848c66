//! Semantic similarity calculations for embeddings
//!
//! Vector helpers and top-N nearest-neighbor ranking over a table of unit
//! vectors, where cosine similarity reduces to a dot product.

use std::cmp::Ordering;

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        for val in v.iter_mut() {
            *val /= norm;
        }
    }
}

/// Dot product; equals cosine similarity for unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Find the top N rows of `table` most similar to `target`.
///
/// `table` rows are expected to be unit length so the dot product is the
/// cosine. Returns (row_index, similarity) pairs sorted by similarity
/// descending; equal scores keep table order, so the ranking is
/// deterministic.
pub fn find_similar(
    target: &[f32],
    table: &[Vec<f32>],
    exclude: Option<usize>,
    top_n: usize,
) -> Vec<(usize, f32)> {
    let mut similarities: Vec<(usize, f32)> = table
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != exclude)
        .map(|(idx, row)| (idx, dot(target, row)))
        .collect();

    // Stable sort keeps index order among ties
    similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    similarities.truncate(top_n);
    similarities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 0.0001);
        assert!((v[1] - 0.8).abs() < 0.0001);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_find_similar() {
        let target = vec![1.0, 0.0, 0.0];
        let table = vec![
            vec![1.0, 0.0, 0.0],    // identical
            vec![0.6, 0.8, 0.0],    // similar
            vec![0.0, 1.0, 0.0],    // orthogonal
            vec![-1.0, 0.0, 0.0],   // opposite
        ];

        let similar = find_similar(&target, &table, Some(0), 2);
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].0, 1); // Most similar after excluding row 0
        assert_eq!(similar[1].0, 2);
    }

    #[test]
    fn test_find_similar_ties_keep_table_order() {
        let target = vec![1.0, 0.0];
        let table = vec![vec![0.0, 1.0], vec![0.6, 0.8], vec![0.6, 0.8]];
        let similar = find_similar(&target, &table, None, 3);
        let order: Vec<usize> = similar.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_find_similar_empty() {
        let target = vec![1.0, 0.0, 0.0];
        let similar = find_similar(&target, &[], None, 5);
        assert!(similar.is_empty());
    }
}
