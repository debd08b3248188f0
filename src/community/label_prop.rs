//! Label propagation for community detection.
//!
//! Fast O(E) per sweep: every node adopts the most common label among its
//! neighbours, visiting nodes in random order. The run stops once every
//! node already carries one of its neighbourhood's majority labels.

use std::collections::HashMap;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use super::partition::{renumber, Partition};
use super::traits::CommunityDetection;
use crate::error::{Error, Result};
use crate::graph::{AttributedGraph, NodeId};

/// Label propagation community detection.
#[derive(Debug, Clone)]
pub struct LabelPropagation {
    /// Maximum sweeps.
    max_iter: usize,
    /// Random seed for visiting order and tie-breaking.
    seed: u64,
    /// Edge attribute used as vote weight, one vote per edge when absent.
    weight_attribute: Option<String>,
}

impl LabelPropagation {
    /// Create a new label propagation detector.
    pub fn new() -> Self {
        Self {
            max_iter: 100,
            seed: 42,
            weight_attribute: None,
        }
    }

    /// Set maximum sweeps.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Weight votes by the named edge attribute.
    pub fn with_weight_attribute(mut self, attribute: Option<String>) -> Self {
        self.weight_attribute = attribute;
        self
    }
}

impl Default for LabelPropagation {
    fn default() -> Self {
        Self::new()
    }
}

/// Labels with the highest vote, in first-seen order
fn majority_labels(graph: &UnGraph<NodeId, f64>, node: NodeIndex, labels: &[usize]) -> Vec<usize> {
    let mut votes: Vec<(usize, f64)> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();

    for edge in graph.edges(node) {
        let neighbor = if edge.source() == node { edge.target() } else { edge.source() };
        let label = labels[neighbor.index()];
        let idx = *slot.entry(label).or_insert_with(|| {
            votes.push((label, 0.0));
            votes.len() - 1
        });
        votes[idx].1 += *edge.weight();
    }

    let best = votes.iter().map(|&(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
    votes.into_iter()
        .filter(|&(_, v)| v == best)
        .map(|(label, _)| label)
        .collect()
}

impl CommunityDetection for LabelPropagation {
    fn name(&self) -> &'static str {
        "label_propagation"
    }

    fn detect(&self, graph: &AttributedGraph) -> Result<Partition> {
        let n = graph.node_count;
        if n == 0 {
            return Err(Error::EmptyGraph);
        }

        let mut native: UnGraph<NodeId, f64> = UnGraph::with_capacity(n, 0);
        for node in graph.nodes() {
            native.add_node(node);
        }
        for (a, b, w) in graph.weighted_edges(self.weight_attribute.as_deref()) {
            native.add_edge(NodeIndex::new(a), NodeIndex::new(b), w);
        }

        // Initialize: each node has its own label
        let mut labels: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n).collect();

        for sweep in 0..self.max_iter {
            order.shuffle(&mut rng);

            for &node in &order {
                let candidates = majority_labels(&native, NodeIndex::new(node), &labels);
                if candidates.is_empty() || candidates.contains(&labels[node]) {
                    continue;
                }
                labels[node] = candidates[rng.gen_range(0..candidates.len())];
            }

            // Converged once no node would change its label
            let converged = (0..n).all(|node| {
                let candidates = majority_labels(&native, NodeIndex::new(node), &labels);
                candidates.is_empty() || candidates.contains(&labels[node])
            });
            if converged {
                log::debug!("Label propagation converged after {} sweeps", sweep + 1);
                break;
            }
        }

        let (assignment, _) = renumber(&labels);
        let pairs = native.node_indices().map(|idx| (native[idx], assignment[idx.index()]));
        Partition::from_pairs(n, pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::CommunityLookup;
    use crate::graph::GraphBuilder;

    #[test]
    fn test_label_propagation_basic() {
        let mut builder = GraphBuilder::with_nodes(4);
        // Two disconnected edges
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(2, 3, 1.0).unwrap();
        let graph = builder.build().unwrap();

        let partition = LabelPropagation::new().with_seed(42).detect(&graph).unwrap();

        assert!(partition.is_total());
        assert_eq!(partition.community_of(0), partition.community_of(1));
        assert_eq!(partition.community_of(2), partition.community_of(3));
        assert_ne!(partition.community_of(0), partition.community_of(2));
    }

    #[test]
    fn test_label_propagation_is_seeded() {
        let mut builder = GraphBuilder::with_nodes(8);
        for &(a, b) in &[(0, 1), (1, 2), (2, 3), (3, 0), (4, 5), (5, 6), (6, 7), (7, 4), (3, 4)] {
            builder.add_edge(a, b, 1.0).unwrap();
        }
        let graph = builder.build().unwrap();

        let first = LabelPropagation::new().with_seed(7).detect(&graph).unwrap();
        let second = LabelPropagation::new().with_seed(7).detect(&graph).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_label_propagation_clique_agrees() {
        let mut builder = GraphBuilder::with_nodes(5);
        for a in 0..5 {
            for b in (a + 1)..5 {
                builder.add_edge(a, b, 1.0).unwrap();
            }
        }
        let graph = builder.build().unwrap();

        let partition = LabelPropagation::new().detect(&graph).unwrap();
        assert_eq!(partition.community_count(), 1);
    }

    #[test]
    fn test_label_propagation_isolated_node_keeps_label() {
        let mut builder = GraphBuilder::with_nodes(3);
        builder.add_edge(0, 1, 1.0).unwrap();
        let graph = builder.build().unwrap();

        let partition = LabelPropagation::new().detect(&graph).unwrap();
        assert!(partition.is_total());
        assert_ne!(partition.community_of(2), partition.community_of(0));
    }
}
