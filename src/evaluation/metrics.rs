//! Classification metrics against ground-truth labels

use std::collections::HashSet;
use serde::{Serialize, Deserialize};
use crate::graph::{AttributedGraph, NodeId};

/// Confusion matrix of anomaly predictions over labelled nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// Compare predicted anomalies with the graph's labels.
    ///
    /// Every labelled node not in `predicted` counts as predicted normal;
    /// unlabelled nodes are ignored.
    pub fn from_predictions(graph: &AttributedGraph, predicted: &[NodeId]) -> Self {
        let predicted: HashSet<NodeId> = predicted.iter().copied().collect();
        let mut counts = Self::default();

        for node in graph.nodes() {
            let flagged = predicted.contains(&node);
            match (graph.label(node), flagged) {
                (Some(1), true) => counts.true_positives += 1,
                (Some(1), false) => counts.false_negatives += 1,
                (Some(_), true) => counts.false_positives += 1,
                (Some(_), false) => counts.true_negatives += 1,
                (None, _) => {}
            }
        }

        counts
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) }
}

/// Precision, recall and F1 for the anomalous class, plus macro and
/// support-weighted averages over both classes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub weighted_precision: f64,
    pub weighted_recall: f64,
    pub weighted_f1: f64,
}

impl ClassificationMetrics {
    /// Derive all metrics from a confusion matrix; empty classes score 0
    pub fn from_counts(c: &ConfusionCounts) -> Self {
        let precision_1 = ratio(c.true_positives, c.true_positives + c.false_positives);
        let recall_1 = ratio(c.true_positives, c.true_positives + c.false_negatives);
        let f1_1 = f1(precision_1, recall_1);

        let precision_0 = ratio(c.true_negatives, c.true_negatives + c.false_negatives);
        let recall_0 = ratio(c.true_negatives, c.true_negatives + c.false_positives);
        let f1_0 = f1(precision_0, recall_0);

        let support_1 = (c.true_positives + c.false_negatives) as f64;
        let support_0 = (c.true_negatives + c.false_positives) as f64;
        let support = support_0 + support_1;
        let weighted = |m0: f64, m1: f64| {
            if support == 0.0 { 0.0 } else { (m0 * support_0 + m1 * support_1) / support }
        };

        Self {
            precision: precision_1,
            recall: recall_1,
            f1: f1_1,
            macro_precision: (precision_0 + precision_1) / 2.0,
            macro_recall: (recall_0 + recall_1) / 2.0,
            macro_f1: (f1_0 + f1_1) / 2.0,
            weighted_precision: weighted(precision_0, precision_1),
            weighted_recall: weighted(recall_0, recall_1),
            weighted_f1: weighted(f1_0, f1_1),
        }
    }
}

/// How many detected anomalies carry the anomalous label
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionOverlap {
    /// Nodes labelled anomalous in the dataset
    pub labelled_anomalies: usize,

    /// Nodes flagged by the detector
    pub detected: usize,

    /// Flagged and labelled anomalous
    pub yes_count: usize,

    /// Flagged but labelled normal (or unlabelled)
    pub no_count: usize,

    pub yes_percentage: f64,
    pub no_percentage: f64,
}

impl DetectionOverlap {
    pub fn new(graph: &AttributedGraph, detected: &[NodeId]) -> Self {
        let labelled: HashSet<NodeId> = graph.anomalous_nodes().into_iter().collect();
        let yes_count = detected.iter().filter(|&&n| labelled.contains(&n)).count();
        let no_count = detected.len() - yes_count;
        let percentage = |count: usize| ratio(count, detected.len()) * 100.0;

        Self {
            labelled_anomalies: labelled.len(),
            detected: detected.len(),
            yes_count,
            no_count,
            yes_percentage: percentage(yes_count),
            no_percentage: percentage(no_count),
        }
    }
}
