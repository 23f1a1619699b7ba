//! Incremental k-nearest-neighbor classifier over frame embeddings.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;

use crate::similarity::nearest_neighbors;
use crate::types::{AddOutcome, Embedding, Label, PredictionResult, VisionError, VisionResult};

/// Example store and predictor consumed by the capture loop.
///
/// The loop only ever appends; it never removes or rewrites stored examples.
#[async_trait(?Send)]
pub trait Classifier {
    /// Append one labeled example.
    fn add_example(&mut self, embedding: &Embedding, label: Label) -> VisionResult<AddOutcome>;

    /// Number of labels holding at least one example.
    fn class_count(&self) -> usize;

    /// Example count for every label holding at least one example.
    fn example_count_per_label(&self) -> BTreeMap<Label, usize>;

    fn total_examples(&self) -> usize {
        self.example_count_per_label().values().sum()
    }

    /// Predict a label for `embedding` from its `k` nearest stored examples.
    async fn predict(&self, embedding: &Embedding, k: usize) -> VisionResult<PredictionResult>;
}

/// Cosine-similarity k-NN over L2-normalized examples.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    num_classes: usize,
    max_examples_per_class: Option<usize>,
    dim: Option<usize>,
    examples: Vec<VecDeque<Vec<f32>>>,
}

impl KnnClassifier {
    /// Create an empty classifier for labels `0..num_classes`.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            max_examples_per_class: None,
            dim: None,
            examples: vec![VecDeque::new(); num_classes],
        }
    }

    /// Cap each class at `max` examples, evicting the oldest beyond that.
    pub fn with_capacity_per_class(mut self, max: Option<usize>) -> Self {
        self.max_examples_per_class = max.filter(|m| *m > 0);
        self
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Embedding dimension fixed by the first stored example.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    fn check_label(&self, label: Label) -> VisionResult<()> {
        if label.index() >= self.num_classes {
            return Err(VisionError::InvalidLabel {
                label,
                num_classes: self.num_classes,
            });
        }
        Ok(())
    }

    fn check_dim(&self, actual: usize) -> VisionResult<()> {
        match self.dim {
            Some(expected) if expected != actual => {
                Err(VisionError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn labeled_examples(&self) -> impl Iterator<Item = (Label, &[f32])> {
        self.examples.iter().enumerate().flat_map(|(i, class)| {
            class.iter().map(move |e| (Label(i), e.as_slice()))
        })
    }
}

#[async_trait(?Send)]
impl Classifier for KnnClassifier {
    fn add_example(&mut self, embedding: &Embedding, label: Label) -> VisionResult<AddOutcome> {
        self.check_label(label)?;
        if embedding.dim() == 0 {
            return Err(VisionError::InvalidInput("Empty embedding".to_string()));
        }
        self.check_dim(embedding.dim())?;
        self.dim.get_or_insert(embedding.dim());

        let class = &mut self.examples[label.index()];
        class.push_back(embedding.normalized());

        match self.max_examples_per_class {
            Some(max) if class.len() > max => {
                class.pop_front();
                tracing::debug!("Class {label} at capacity ({max}), evicted oldest example");
                Ok(AddOutcome::Evicted { count: class.len() })
            }
            _ => Ok(AddOutcome::Added { count: class.len() }),
        }
    }

    fn class_count(&self) -> usize {
        self.examples.iter().filter(|c| !c.is_empty()).count()
    }

    fn example_count_per_label(&self) -> BTreeMap<Label, usize> {
        self.examples
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, c)| (Label(i), c.len()))
            .collect()
    }

    async fn predict(&self, embedding: &Embedding, k: usize) -> VisionResult<PredictionResult> {
        let total = self.total_examples();
        if total == 0 {
            return Err(VisionError::EmptyExampleSet);
        }
        self.check_dim(embedding.dim())?;

        let counts = self.example_count_per_label();
        let k_eff = k.min(total);
        if k_eff == 0 {
            return Ok(PredictionResult {
                top_label: None,
                confidences: counts.keys().map(|l| (*l, 0.0)).collect(),
            });
        }

        let query = embedding.normalized();
        let neighbors = nearest_neighbors(&query, self.labeled_examples(), k_eff);

        let mut votes: BTreeMap<Label, usize> = counts.keys().map(|l| (*l, 0)).collect();
        for n in &neighbors {
            *votes.entry(n.label).or_default() += 1;
        }

        let mut top_label = None;
        let mut top_confidence = -1.0f32;
        let mut confidences = BTreeMap::new();
        for (label, count) in votes {
            let confidence = count as f32 / k_eff as f32;
            if confidence > top_confidence {
                top_confidence = confidence;
                top_label = Some(label);
            }
            confidences.insert(label, confidence);
        }

        Ok(PredictionResult {
            top_label,
            confidences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[tokio::test]
    async fn test_single_class_full_confidence() {
        let mut knn = KnnClassifier::new(5);
        for _ in 0..5 {
            knn.add_example(&emb(&[0.2, 0.9, 0.1]), Label(2)).unwrap();
        }
        assert_eq!(knn.class_count(), 1);
        assert_eq!(knn.example_count_per_label()[&Label(2)], 5);

        let res = knn.predict(&emb(&[0.3, 0.8, 0.0]), 30).await.unwrap();
        assert_eq!(res.top_label, Some(Label(2)));
        assert!((res.confidence(Label(2)) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_votes_split_between_classes() {
        let mut knn = KnnClassifier::new(3);
        knn.add_example(&emb(&[1.0, 0.0]), Label(0)).unwrap();
        knn.add_example(&emb(&[0.9, 0.1]), Label(0)).unwrap();
        knn.add_example(&emb(&[0.0, 1.0]), Label(1)).unwrap();

        let res = knn.predict(&emb(&[1.0, 0.05]), 3).await.unwrap();
        assert_eq!(res.top_label, Some(Label(0)));
        assert!((res.confidence(Label(0)) - 2.0 / 3.0).abs() < 1e-6);
        assert!((res.confidence(Label(1)) - 1.0 / 3.0).abs() < 1e-6);
        assert!(res.confidences.values().all(|c| (0.0..=1.0).contains(c)));
    }

    #[tokio::test]
    async fn test_nearest_wins_with_k_one() {
        let mut knn = KnnClassifier::new(2);
        knn.add_example(&emb(&[1.0, 0.0]), Label(0)).unwrap();
        knn.add_example(&emb(&[0.0, 1.0]), Label(1)).unwrap();

        let res = knn.predict(&emb(&[0.1, 0.9]), 1).await.unwrap();
        assert_eq!(res.top_label, Some(Label(1)));
        assert_eq!(res.confidence(Label(0)), 0.0);
    }

    #[tokio::test]
    async fn test_tie_goes_to_lowest_label() {
        let mut knn = KnnClassifier::new(4);
        knn.add_example(&emb(&[0.0, 1.0]), Label(3)).unwrap();
        knn.add_example(&emb(&[1.0, 0.0]), Label(1)).unwrap();

        let res = knn.predict(&emb(&[1.0, 1.0]), 2).await.unwrap();
        assert_eq!(res.top_label, Some(Label(1)));
        assert!((res.confidence(Label(1)) - 0.5).abs() < 1e-6);
        assert!((res.confidence(Label(3)) - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_zero_k_has_no_top_label() {
        let mut knn = KnnClassifier::new(2);
        knn.add_example(&emb(&[1.0, 0.0]), Label(0)).unwrap();
        let res = knn.predict(&emb(&[1.0, 0.0]), 0).await.unwrap();
        assert_eq!(res.top_label, None);
        assert_eq!(res.confidence(Label(0)), 0.0);
    }

    #[tokio::test]
    async fn test_empty_store_is_an_error() {
        let knn = KnnClassifier::new(2);
        let err = knn.predict(&emb(&[1.0, 0.0]), 3).await.unwrap_err();
        assert!(matches!(err, VisionError::EmptyExampleSet));
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let mut knn = KnnClassifier::new(2);
        let err = knn.add_example(&emb(&[1.0]), Label(2)).unwrap_err();
        assert!(matches!(err, VisionError::InvalidLabel { .. }));
        assert_eq!(knn.total_examples(), 0);
    }

    #[test]
    fn test_rejects_dimension_change() {
        let mut knn = KnnClassifier::new(2);
        knn.add_example(&emb(&[1.0, 0.0]), Label(0)).unwrap();
        let err = knn.add_example(&emb(&[1.0, 0.0, 0.0]), Label(1)).unwrap_err();
        assert!(matches!(
            err,
            VisionError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(knn.dim(), Some(2));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut knn = KnnClassifier::new(1).with_capacity_per_class(Some(2));
        assert_eq!(
            knn.add_example(&emb(&[1.0]), Label(0)).unwrap(),
            AddOutcome::Added { count: 1 }
        );
        knn.add_example(&emb(&[1.0]), Label(0)).unwrap();
        assert_eq!(
            knn.add_example(&emb(&[1.0]), Label(0)).unwrap(),
            AddOutcome::Evicted { count: 2 }
        );
        assert_eq!(knn.total_examples(), 2);
    }
}
