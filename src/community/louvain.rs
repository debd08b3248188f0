//! Louvain algorithm for community detection.
//!
//! Multi-level greedy modularity optimisation (Blondel et al. 2008):
//!
//! 1. **Local moving**: every node starts in its own community and is moved
//!    to the neighbouring community with the highest modularity gain until
//!    no move improves modularity.
//! 2. **Aggregation**: communities become nodes of a meta-graph, edges
//!    between communities are summed, internal edges become self-loops.
//! 3. Repeat on the meta-graph while modularity keeps improving.
//!
//! The resolution γ scales the null-model term; higher values produce more,
//! smaller communities.

use std::collections::BTreeMap;
use super::partition::{renumber, Partition};
use super::traits::CommunityDetection;
use crate::error::{Error, Result};
use crate::graph::AttributedGraph;

/// Louvain community detection algorithm.
#[derive(Debug, Clone)]
pub struct Louvain {
    /// Resolution parameter (gamma).
    resolution: f64,
    /// Edge attribute used as weight, unit weights when absent.
    weight_attribute: Option<String>,
    /// Maximum sweeps over the nodes per level.
    max_iter: usize,
    /// Maximum levels of aggregation.
    max_levels: usize,
    /// Minimum modularity improvement to continue.
    min_modularity_gain: f64,
}

impl Louvain {
    /// Create a new Louvain detector with default settings.
    pub fn new() -> Self {
        Self {
            resolution: 1.0,
            weight_attribute: None,
            max_iter: 100,
            max_levels: 10,
            min_modularity_gain: 1e-7,
        }
    }

    /// Set resolution parameter.
    ///
    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Weight edges by the named attribute.
    pub fn with_weight_attribute(mut self, attribute: Option<String>) -> Self {
        self.weight_attribute = attribute;
        self
    }

    /// Set maximum sweeps per level.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set maximum aggregation levels.
    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels;
        self
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Self::new()
    }
}

/// One level of the aggregation hierarchy
struct Level {
    n: usize,
    /// Adjacency without self-loops: node -> [(neighbour, weight)]
    adj: Vec<Vec<(usize, f64)>>,
    /// Internal weight carried by each node
    self_loops: Vec<f64>,
    /// Weighted degree, self-loops counted twice
    degrees: Vec<f64>,
    /// Total edge weight m
    m: f64,
}

impl Level {
    fn new(n: usize, edges: &[(usize, usize, f64)], self_loops: Vec<f64>) -> Self {
        let mut adj = vec![Vec::new(); n];
        let mut degrees = vec![0.0; n];
        for &(i, j, w) in edges {
            adj[i].push((j, w));
            adj[j].push((i, w));
            degrees[i] += w;
            degrees[j] += w;
        }
        for (i, &sl) in self_loops.iter().enumerate() {
            degrees[i] += 2.0 * sl;
        }
        let m = edges.iter().map(|&(_, _, w)| w).sum::<f64>() + self_loops.iter().sum::<f64>();

        Self { n, adj, self_loops, degrees, m }
    }

    /// Modularity of a partition given as renumbered community ids
    fn modularity(&self, communities: &[usize], resolution: f64) -> f64 {
        if self.m == 0.0 {
            return 0.0;
        }

        let k = communities.iter().copied().max().map_or(0, |c| c + 1);
        let mut internal = vec![0.0; k];
        let mut totals = vec![0.0; k];

        for i in 0..self.n {
            let ci = communities[i];
            totals[ci] += self.degrees[i];
            internal[ci] += self.self_loops[i];
            for &(j, w) in &self.adj[i] {
                if i < j && communities[j] == ci {
                    internal[ci] += w;
                }
            }
        }

        internal.iter()
            .zip(&totals)
            .map(|(&inside, &tot)| {
                inside / self.m - resolution * (tot / (2.0 * self.m)).powi(2)
            })
            .sum()
    }

    /// Phase 1: local moving. Returns (communities, improved).
    fn local_moving(&self, resolution: f64, max_iter: usize) -> (Vec<usize>, bool) {
        let mut communities: Vec<usize> = (0..self.n).collect();
        if self.m == 0.0 {
            return (communities, false);
        }

        let m = self.m;
        let mut totals = self.degrees.clone();
        let mut slot = vec![usize::MAX; self.n];
        let mut neighbor_comms: Vec<(usize, f64)> = Vec::new();
        let mut any_improved = false;

        for _sweep in 0..max_iter {
            let mut improved = false;

            for node in 0..self.n {
                let current = communities[node];
                let ki = self.degrees[node];

                // Edge weight from node to each neighbouring community, first seen first
                neighbor_comms.clear();
                for &(neighbor, w) in &self.adj[node] {
                    let c = communities[neighbor];
                    if slot[c] == usize::MAX {
                        slot[c] = neighbor_comms.len();
                        neighbor_comms.push((c, 0.0));
                    }
                    neighbor_comms[slot[c]].1 += w;
                }

                // Temporarily remove node from its community
                totals[current] -= ki;

                let current_in = match slot[current] {
                    usize::MAX => 0.0,
                    s => neighbor_comms[s].1,
                };
                let mut best = current;
                let mut best_gain = current_in / m - resolution * totals[current] * ki / (2.0 * m * m);

                for &(c, ki_in) in &neighbor_comms {
                    let gain = ki_in / m - resolution * totals[c] * ki / (2.0 * m * m);
                    if gain > best_gain + 1e-12 {
                        best_gain = gain;
                        best = c;
                    }
                }

                totals[best] += ki;
                for &(c, _) in &neighbor_comms {
                    slot[c] = usize::MAX;
                }

                if best != current {
                    communities[node] = best;
                    improved = true;
                    any_improved = true;
                }
            }

            if !improved {
                break;
            }
        }

        (communities, any_improved)
    }

    /// Phase 2: collapse each of the `k` communities into a single node.
    fn aggregate(&self, communities: &[usize], k: usize) -> Level {
        let mut self_loops = vec![0.0; k];
        for (i, &sl) in self.self_loops.iter().enumerate() {
            self_loops[communities[i]] += sl;
        }

        // Ordered map keeps the meta-graph, and thus tie-breaking, deterministic
        let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for i in 0..self.n {
            for &(j, w) in &self.adj[i] {
                if i >= j {
                    continue;
                }
                let (ci, cj) = (communities[i], communities[j]);
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    *weights.entry((ci.min(cj), ci.max(cj))).or_insert(0.0) += w;
                }
            }
        }

        let edges: Vec<(usize, usize, f64)> = weights.into_iter()
            .map(|((i, j), w)| (i, j, w))
            .collect();

        Level::new(k, &edges, self_loops)
    }
}

/// Reject weights modularity cannot handle
pub(crate) fn check_weights(edges: &[(usize, usize, f64)]) -> Result<()> {
    match edges.iter().find(|&&(_, _, w)| !w.is_finite() || w < 0.0) {
        Some(&(i, j, w)) => Err(Error::InvalidParameter {
            name: "weight",
            message: format!("edge ({}, {}) has weight {}, expected a finite non-negative value", i, j, w),
        }),
        None => Ok(()),
    }
}

impl CommunityDetection for Louvain {
    fn name(&self) -> &'static str {
        "louvain"
    }

    fn detect(&self, graph: &AttributedGraph) -> Result<Partition> {
        let n = graph.node_count;
        if n == 0 {
            return Err(Error::EmptyGraph);
        }

        let edges = graph.weighted_edges(self.weight_attribute.as_deref());
        check_weights(&edges)?;
        if edges.is_empty() {
            // No edges: each node is its own community
            return Ok(Partition::from_assignment((0..n).collect()));
        }

        let mut level = Level::new(n, &edges, vec![0.0; n]);

        // Original node -> node of the current level
        let mut membership: Vec<usize> = (0..n).collect();
        let mut modularity = level.modularity(&membership, self.resolution);

        for depth in 0..self.max_levels {
            let (communities, improved) = level.local_moving(self.resolution, self.max_iter);
            if !improved {
                break;
            }

            let (communities, k) = renumber(&communities);
            let modularity_now = level.modularity(&communities, self.resolution);
            if modularity_now - modularity < self.min_modularity_gain {
                break;
            }
            modularity = modularity_now;

            for m in membership.iter_mut() {
                *m = communities[*m];
            }
            log::debug!("Louvain level {}: {} communities, modularity {:.6}", depth, k, modularity);

            if k == level.n {
                break;
            }
            level = level.aggregate(&communities, k);
        }

        let (assignment, _) = renumber(&membership);
        Ok(Partition::from_assignment(assignment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::CommunityLookup;
    use crate::graph::GraphBuilder;

    fn two_triangles() -> AttributedGraph {
        let mut builder = GraphBuilder::with_nodes(6);
        for &(a, b) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            builder.add_edge(a, b, 1.0).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_louvain_triangle() {
        let mut builder = GraphBuilder::with_nodes(3);
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(1, 2, 1.0).unwrap();
        builder.add_edge(0, 2, 1.0).unwrap();
        let graph = builder.build().unwrap();

        let partition = Louvain::new().detect(&graph).unwrap();

        assert!(partition.is_total());
        assert_eq!(partition.community_count(), 1);
    }

    #[test]
    fn test_louvain_two_cliques() {
        let partition = Louvain::new().detect(&two_triangles()).unwrap();

        assert_eq!(partition.len(), 6);
        assert_eq!(partition.community_of(0), partition.community_of(1));
        assert_eq!(partition.community_of(1), partition.community_of(2));
        assert_eq!(partition.community_of(3), partition.community_of(4));
        assert_eq!(partition.community_of(4), partition.community_of(5));
        assert_ne!(partition.community_of(0), partition.community_of(3));
    }

    #[test]
    fn test_louvain_ids_are_consecutive() {
        let partition = Louvain::new().detect(&two_triangles()).unwrap();
        let ids: Vec<usize> = partition.communities().keys().copied().collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_louvain_empty_graph() {
        let graph = AttributedGraph::empty(0);
        assert!(matches!(Louvain::new().detect(&graph), Err(Error::EmptyGraph)));
    }

    #[test]
    fn test_louvain_disconnected() {
        let graph = AttributedGraph::empty(2);
        let partition = Louvain::new().detect(&graph).unwrap();

        assert!(partition.is_total());
        assert_ne!(partition.community_of(0), partition.community_of(1));
    }

    #[test]
    fn test_louvain_rejects_negative_weight() {
        let mut builder = GraphBuilder::with_nodes(2);
        builder.add_edge(0, 1, -1.0).unwrap();
        let graph = builder.build().unwrap();

        let louvain = Louvain::new().with_weight_attribute(Some("weight".to_string()));
        assert!(matches!(
            louvain.detect(&graph),
            Err(Error::InvalidParameter { name: "weight", .. })
        ));
    }

    #[test]
    fn test_louvain_heavy_bridge_follows_weights() {
        // Path 0-1-2-3 where the middle edge dominates
        let mut builder = GraphBuilder::with_nodes(4);
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(1, 2, 50.0).unwrap();
        builder.add_edge(2, 3, 1.0).unwrap();
        let graph = builder.build().unwrap();

        let partition = Louvain::new()
            .with_weight_attribute(Some("weight".to_string()))
            .detect(&graph)
            .unwrap();

        assert_eq!(partition.community_of(1), partition.community_of(2));
    }
}
