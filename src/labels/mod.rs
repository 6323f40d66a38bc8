//! Fuzzy deduplication of categorical labels such as defect descriptions.

mod mapping;
mod normalizer;
mod similarity;

pub use mapping::{CanonicalMapping, MappingEntry};
pub use normalizer::normalize_label;
pub(crate) use normalizer::normalize_header;
pub use similarity::{
    InvalidThreshold, SimilarityMetric, SimilarityThreshold, DEFAULT_SIMILARITY_THRESHOLD,
};

use tracing::debug;

/// Greedy, order-sensitive clustering of near-duplicate labels.
///
/// Each label is scored against the representatives opened so far. When the
/// best score reaches the threshold the label joins that representative,
/// otherwise it opens a new cluster. The first label of a cluster is its
/// permanent representative and clusters are never merged afterwards, so
/// `A ~ B` and `B ~ C` does not imply that `A` and `C` share a label.
///
/// Cost is one similarity evaluation per (label, representative) pair, which
/// is quadratic in the number of distinct labels. Intended for column
/// cardinalities in the hundreds or low thousands.
#[derive(Debug, Clone, Copy)]
pub struct LabelCanonicalizer {
    threshold: f64,
    metric: SimilarityMetric,
}

impl Default for LabelCanonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl LabelCanonicalizer {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            metric: SimilarityMetric::default(),
        }
    }

    pub fn from_threshold(threshold: SimilarityThreshold) -> Self {
        Self::new(threshold.value())
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn canonicalize<I, S>(&self, labels: I) -> CanonicalMapping
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels.into_iter();
        let mut mapping = CanonicalMapping::with_capacity(labels.size_hint().0);
        let mut representatives: Vec<String> = Vec::new();

        for label in labels {
            let label = label.as_ref();
            if mapping.contains(label) {
                continue;
            }

            match self.best_match(label, &representatives) {
                Some((representative, score)) if score >= self.threshold => {
                    debug!(label, representative, score, "merged near-duplicate label");
                    mapping.insert_new(label.to_string(), representative.to_string());
                }
                _ => {
                    representatives.push(label.to_string());
                    mapping.insert_new(label.to_string(), label.to_string());
                }
            }
        }

        mapping
    }

    /// Highest-scoring representative; ties keep the earliest one.
    fn best_match<'r>(&self, label: &str, representatives: &'r [String]) -> Option<(&'r str, f64)> {
        let mut best: Option<(&'r str, f64)> = None;
        for representative in representatives {
            let score = self.metric.score(label, representative);
            if best.map_or(true, |(_, current)| score > current) {
                best = Some((representative.as_str(), score));
            }
        }
        best
    }
}

/// Canonicalizes `labels` with the normalized Levenshtein ratio.
///
/// See [`LabelCanonicalizer`] for the clustering rules and cost.
pub fn canonicalize<I, S>(labels: I, threshold: f64) -> CanonicalMapping
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    LabelCanonicalizer::new(threshold).canonicalize(labels)
}
