//! Neighbourhood community dispersion score

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::community::CommunityLookup;
use crate::graph::{AttributedGraph, NodeId};

/// Score of a single node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub node: NodeId,
    pub score: f64,
}

/// Immutable table of anomaly scores, highest score first.
///
/// Nodes without any partitioned neighbour are absent. Among equal scores
/// the node visited later comes first: the table is built with a stable
/// ascending sort that is then reversed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScores {
    entries: Vec<AnomalyScore>,
}

/// Anomaly score of one node, `None` when no neighbour has a community.
///
/// Counts the node's neighbours per community (the node itself excluded),
/// divides every count by the largest one and sums the results. The score
/// lies in `[1, k]` for `k` neighbouring communities and equals 1 exactly
/// when all neighbours share a community.
pub fn node_score<P>(graph: &AttributedGraph, partition: &P, node: NodeId) -> Option<f64>
where
    P: CommunityLookup + ?Sized,
{
    // Counts in first-seen order so the summation order is fixed
    let mut counts: Vec<u32> = Vec::new();
    let mut slot: HashMap<P::Community, usize> = HashMap::new();

    for &neighbor in graph.neighbors(node as usize) {
        if neighbor == node {
            continue;
        }
        if let Some(community) = partition.community_of(neighbor) {
            let idx = *slot.entry(community).or_insert_with(|| {
                counts.push(0);
                counts.len() - 1
            });
            counts[idx] += 1;
        }
    }

    let max_count = *counts.iter().max()?;
    Some(counts.iter().map(|&c| c as f64 / max_count as f64).sum())
}

impl AnomalyScores {
    /// Score every node of `graph` against `partition`
    pub fn compute<P>(graph: &AttributedGraph, partition: &P) -> Self
    where
        P: CommunityLookup + ?Sized,
    {
        let entries = graph.nodes()
            .filter_map(|node| {
                node_score(graph, partition, node).map(|score| AnomalyScore { node, score })
            })
            .collect();

        Self::from_unsorted(entries)
    }

    /// Order scores descending: stable ascending sort, then reverse
    pub fn from_unsorted(mut entries: Vec<AnomalyScore>) -> Self {
        entries.sort_by(|a, b| a.score.total_cmp(&b.score));
        entries.reverse();
        Self { entries }
    }

    /// Full table, highest score first
    pub fn all(&self) -> &[AnomalyScore] {
        &self.entries
    }

    /// The first `limit` entries, or all of them for `None` or `Some(0)`
    pub fn scores(&self, limit: Option<usize>) -> &[AnomalyScore] {
        match limit {
            Some(k) if k > 0 => &self.entries[..k.min(self.entries.len())],
            _ => &self.entries,
        }
    }

    /// The `k` highest scoring nodes; the whole table if it is shorter
    pub fn top_anomalies(&self, k: usize) -> Vec<NodeId> {
        self.entries.iter()
            .take(k)
            .map(|e| e.node)
            .collect()
    }

    /// Nodes scoring strictly above `threshold`.
    ///
    /// Scans from the top and stops at the first score at or below the
    /// threshold.
    pub fn anomalies_above(&self, threshold: f64) -> Vec<NodeId> {
        self.entries.iter()
            .take_while(|e| e.score > threshold)
            .map(|e| e.node)
            .collect()
    }

    /// Score of a node, `None` if the node was not scored
    pub fn score_of(&self, node: NodeId) -> Option<f64> {
        self.entries.iter().find(|e| e.node == node).map(|e| e.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnomalyScore> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a AnomalyScores {
    type Item = &'a AnomalyScore;
    type IntoIter = std::slice::Iter<'a, AnomalyScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
