// Common types and structures shared across the crate

use crate::core::data::ReviewRecord;
use crate::core::hdbscan::NOISE;
use crate::core::reduction::ProjectionSource;
use crate::core::sentiment::SentimentLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Annotated rows
// ============================================================================

/// A sampled review with every annotation the pipeline adds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedReview {
    pub record: ReviewRecord,
    /// Lemmatised, stop-word free text
    pub cleaned: String,
    pub vader_compound: f32,
    pub vader_label: SentimentLabel,
    /// Cluster label, `None` when clustering was not run
    pub cluster: Option<i32>,
    /// Projected coordinates, empty when clustering was not run
    pub coordinates: Vec<f32>,
}

impl AnnotatedReview {
    pub fn new(record: ReviewRecord, cleaned: String, vader_compound: f32, vader_label: SentimentLabel) -> Self {
        AnnotatedReview {
            record,
            cleaned,
            vader_compound,
            vader_label,
            cluster: None,
            coordinates: Vec::new(),
        }
    }

    pub fn with_cluster(mut self, label: i32, coordinates: Vec<f32>) -> Self {
        self.cluster = Some(label);
        self.coordinates = coordinates;
        self
    }
}

// ============================================================================
// Cluster summaries
// ============================================================================

/// Member of a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Index in the sample
    pub index: usize,
    /// The text
    pub text: String,
}

/// Cluster information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    /// Cluster label, [`NOISE`] for the unassigned group
    pub label: i32,
    /// Number of members
    pub size: usize,
    /// Member details
    pub members: Vec<ClusterMember>,
}

/// Per-label breakdown of one clustering run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Non-noise clusters, ordered by label
    pub clusters: Vec<ClusterInfo>,
    /// Points labelled [`NOISE`]
    pub noise: usize,
    /// Label for each input
    pub assignments: Vec<i32>,
    /// True when the sample was too small to cluster and every label is 0
    /// by convention rather than by a density decision
    pub trivial: bool,
    /// Which projector produced the coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionSource>,
}

impl ClusterSummary {
    /// Build from texts and labels
    pub fn from_labels(texts: &[String], labels: &[i32]) -> Self {
        let mut groups: BTreeMap<i32, Vec<ClusterMember>> = BTreeMap::new();
        for (index, &label) in labels.iter().enumerate() {
            groups.entry(label).or_default().push(ClusterMember {
                index,
                text: texts.get(index).cloned().unwrap_or_default(),
            });
        }

        let noise = groups.remove(&NOISE).map(|m| m.len()).unwrap_or(0);
        let clusters = groups
            .into_iter()
            .map(|(label, members)| ClusterInfo {
                label,
                size: members.len(),
                members,
            })
            .collect();

        ClusterSummary {
            clusters,
            noise,
            assignments: labels.to_vec(),
            trivial: labels.len() < 2,
            projection: None,
        }
    }

    pub fn with_projection(mut self, projection: ProjectionSource) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Number of non-noise clusters
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// `(label, size)` pairs, largest first, noise included
    pub fn distribution(&self) -> Vec<(i32, usize)> {
        let mut counts: Vec<(i32, usize)> = self.clusters.iter().map(|c| (c.label, c.size)).collect();
        if self.noise > 0 {
            counts.push((NOISE, self.noise));
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

// ============================================================================
// Sentiment summary
// ============================================================================

/// Label counts of a scored sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive: usize,
    pub negative: usize,
}

impl SentimentSummary {
    pub fn from_labels(labels: &[SentimentLabel]) -> Self {
        let positive = labels.iter().filter(|&&l| l == SentimentLabel::Positive).count();
        SentimentSummary {
            positive,
            negative: labels.len() - positive,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {}", i)).collect()
    }

    #[test]
    fn test_cluster_summary_from_labels() {
        let labels = vec![0, 1, 0, NOISE, 1, 0];
        let summary = ClusterSummary::from_labels(&texts(6), &labels);

        assert_eq!(summary.cluster_count(), 2);
        assert_eq!(summary.clusters[0].label, 0);
        assert_eq!(summary.clusters[0].size, 3);
        assert_eq!(summary.clusters[1].members[1].index, 4);
        assert_eq!(summary.noise, 1);
        assert!(!summary.trivial);
    }

    #[test]
    fn test_single_point_summary_is_trivial() {
        let summary = ClusterSummary::from_labels(&texts(1), &[0]);
        assert!(summary.trivial);
        assert_eq!(summary.cluster_count(), 1);
    }

    #[test]
    fn test_distribution_sorted_by_size() {
        let labels = vec![1, 1, 1, 0, NOISE, NOISE];
        let summary = ClusterSummary::from_labels(&texts(6), &labels);
        assert_eq!(summary.distribution(), vec![(1, 3), (NOISE, 2), (0, 1)]);
    }

    #[test]
    fn test_summary_serializes_projection_tag() {
        let summary = ClusterSummary::from_labels(&texts(2), &[0, 0]).with_projection(ProjectionSource::Fallback {
            reason: "degenerate".to_string(),
        });
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["projection"]["kind"], "fallback");
        assert_eq!(json["projection"]["reason"], "degenerate");
    }

    #[test]
    fn test_sentiment_summary() {
        let labels = vec![SentimentLabel::Positive, SentimentLabel::Negative, SentimentLabel::Positive];
        let summary = SentimentSummary::from_labels(&labels);
        assert_eq!(summary.positive, 2);
        assert_eq!(summary.negative, 1);
        assert_eq!(summary.total(), 3);
    }
}
