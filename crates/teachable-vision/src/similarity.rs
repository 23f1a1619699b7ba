//! Vector similarity and neighbor ranking for embeddings.

use crate::types::Label;

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(values: Vec<f32>) -> Vec<f32> {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| x / norm).collect()
    } else {
        values
    }
}

/// A stored example ranked against a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub label: Label,
    pub similarity: f32,
}

/// Rank labeled examples by similarity to `query` and keep the `top_k` closest.
///
/// Ties keep their input order, so earlier examples win.
pub fn nearest_neighbors<'a, I>(query: &[f32], examples: I, top_k: usize) -> Vec<Neighbor>
where
    I: IntoIterator<Item = (Label, &'a [f32])>,
{
    if top_k == 0 {
        return Vec::new();
    }

    let mut neighbors: Vec<Neighbor> = examples
        .into_iter()
        .filter(|(_, e)| !e.is_empty())
        .map(|(label, e)| Neighbor {
            label,
            similarity: cosine_similarity(query, e),
        })
        .collect();

    neighbors.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    neighbors.truncate(top_k);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_nearest_neighbors_ordering() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        let c = [0.9, 0.1];
        let examples = vec![(Label(0), &a[..]), (Label(1), &b[..]), (Label(2), &c[..])];

        let ranked = nearest_neighbors(&[1.0, 0.0], examples, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, Label(0));
        assert_eq!(ranked[1].label, Label(2));
    }

    #[test]
    fn test_nearest_neighbors_zero_k() {
        let a = [1.0, 0.0];
        assert!(nearest_neighbors(&[1.0, 0.0], vec![(Label(0), &a[..])], 0).is_empty());
    }

    #[test]
    fn test_nearest_neighbors_ties_keep_insertion_order() {
        let a = [1.0, 0.0];
        let examples = vec![(Label(3), &a[..]), (Label(1), &a[..])];
        let ranked = nearest_neighbors(&[1.0, 0.0], examples, 1);
        assert_eq!(ranked[0].label, Label(3));
    }

    #[test]
    fn test_l2_normalize() {
        let unit = l2_normalize(vec![3.0, 4.0]);
        assert!((unit[0] - 0.6).abs() < 1e-6);
        assert!((unit[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
