//! Leiden algorithm for community detection.
//!
//! Improves on Louvain by guaranteeing that every community is internally
//! connected (Traag, Waltman & van Eck 2019). Each round runs:
//!
//! 1. **Local moving** driven by a queue: a node that changes community
//!    puts its neighbours back on the queue.
//! 2. **Refinement**: every community is split into its connected
//!    components, so no community ever holds nodes without a path between
//!    them.
//!
//! The detector works on a `petgraph` undirected graph whose node weights
//! carry the original node ids; results are mapped back through them.

use std::collections::VecDeque;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use super::louvain::check_weights;
use super::partition::{renumber, Partition};
use super::traits::CommunityDetection;
use crate::error::{Error, Result};
use crate::graph::{AttributedGraph, NodeId};

/// Leiden community detection algorithm.
#[derive(Debug, Clone)]
pub struct Leiden {
    /// Resolution parameter (gamma). Higher = smaller communities.
    resolution: f64,
    /// Edge attribute used as weight, unit weights when absent.
    weight_attribute: Option<String>,
    /// Maximum move / refine rounds.
    max_iter: usize,
}

impl Leiden {
    /// Create a new Leiden detector.
    pub fn new() -> Self {
        Self {
            resolution: 1.0,
            weight_attribute: None,
            max_iter: 100,
        }
    }

    /// Set resolution parameter.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Weight edges by the named attribute.
    pub fn with_weight_attribute(mut self, attribute: Option<String>) -> Self {
        self.weight_attribute = attribute;
        self
    }

    /// Set maximum rounds.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Convert the graph into petgraph's vertex / edge representation.
    fn to_petgraph(&self, graph: &AttributedGraph) -> Result<UnGraph<NodeId, f64>> {
        let edges = graph.weighted_edges(self.weight_attribute.as_deref());
        check_weights(&edges)?;

        let mut native = UnGraph::with_capacity(graph.node_count, edges.len());
        let indices: Vec<NodeIndex> = graph.nodes().map(|node| native.add_node(node)).collect();
        for (a, b, w) in edges {
            native.add_edge(indices[a], indices[b], w);
        }
        Ok(native)
    }
}

impl Default for Leiden {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal graph representation for weighted operations.
struct WeightedGraph {
    n: usize,
    /// Adjacency: node -> [(neighbor, weight)]
    adj: Vec<Vec<(usize, f64)>>,
    /// Weighted degree of each node
    degrees: Vec<f64>,
    /// Total edge weight m
    m: f64,
}

impl WeightedGraph {
    fn from_petgraph(graph: &UnGraph<NodeId, f64>) -> Self {
        let n = graph.node_count();
        let mut adj = vec![Vec::new(); n];
        let mut degrees = vec![0.0; n];
        let mut m = 0.0;

        for edge in graph.edge_references() {
            let (i, j, w) = (edge.source().index(), edge.target().index(), *edge.weight());
            adj[i].push((j, w));
            adj[j].push((i, w));
            degrees[i] += w;
            degrees[j] += w;
            m += w;
        }

        Self { n, adj, degrees, m }
    }
}

/// Community assignment with cached statistics.
struct CommunityState {
    /// Community assignment for each node.
    assignment: Vec<usize>,
    /// Total weighted degree in each community.
    comm_total_weight: Vec<f64>,
}

impl CommunityState {
    fn new_singletons(degrees: &[f64]) -> Self {
        Self {
            assignment: (0..degrees.len()).collect(),
            comm_total_weight: degrees.to_vec(),
        }
    }

    fn move_node(&mut self, node: usize, to: usize, degree: f64) {
        let from = self.assignment[node];
        self.assignment[node] = to;
        self.comm_total_weight[from] -= degree;
        self.comm_total_weight[to] += degree;
    }

    /// Open a fresh, empty community
    fn new_community(&mut self) -> usize {
        self.comm_total_weight.push(0.0);
        self.comm_total_weight.len() - 1
    }
}

impl Leiden {
    /// Queue-driven local moving. Returns whether any node moved.
    fn local_moving_phase(&self, wg: &WeightedGraph, state: &mut CommunityState) -> bool {
        let m = wg.m;
        let mut improved = false;
        let mut queue: VecDeque<usize> = (0..wg.n).collect();
        let mut in_queue = vec![true; wg.n];
        let mut neighbor_comms: Vec<(usize, f64)> = Vec::new();

        while let Some(node) = queue.pop_front() {
            in_queue[node] = false;
            let current = state.assignment[node];
            let ki = wg.degrees[node];

            neighbor_comms.clear();
            for &(neighbor, w) in &wg.adj[node] {
                let c = state.assignment[neighbor];
                match neighbor_comms.iter_mut().find(|(comm, _)| *comm == c) {
                    Some(entry) => entry.1 += w,
                    None => neighbor_comms.push((c, w)),
                }
            }

            // Evaluate gains with the node taken out of its community
            state.comm_total_weight[current] -= ki;
            let gain = |ki_in: f64, comm: usize| {
                ki_in / m - self.resolution * state.comm_total_weight[comm] * ki / (2.0 * m * m)
            };

            let current_in = neighbor_comms.iter()
                .find(|(c, _)| *c == current)
                .map_or(0.0, |&(_, w)| w);
            let mut best = current;
            let mut best_gain = gain(current_in, current);
            for &(comm, ki_in) in &neighbor_comms {
                let g = gain(ki_in, comm);
                if g > best_gain + 1e-10 {
                    best_gain = g;
                    best = comm;
                }
            }
            state.comm_total_weight[current] += ki;

            if best != current {
                state.move_node(node, best, ki);
                improved = true;

                for &(neighbor, _) in &wg.adj[node] {
                    if !in_queue[neighbor] && state.assignment[neighbor] != best {
                        queue.push_back(neighbor);
                        in_queue[neighbor] = true;
                    }
                }
            }
        }

        improved
    }

    /// Split every community into its connected components.
    ///
    /// The component holding the community's lowest node keeps the id.
    fn refinement_phase(&self, wg: &WeightedGraph, state: &mut CommunityState) {
        let mut visited = vec![false; wg.n];
        let mut claimed = vec![false; state.comm_total_weight.len()];

        // Starts are visited in ascending order, so the first start seen for
        // a community is its lowest member
        for start in 0..wg.n {
            if visited[start] {
                continue;
            }

            let comm = state.assignment[start];
            let target = if !claimed[comm] {
                claimed[comm] = true;
                comm
            } else {
                state.new_community()
            };

            let mut queue = VecDeque::from([start]);
            visited[start] = true;
            while let Some(node) = queue.pop_front() {
                if target != comm {
                    state.move_node(node, target, wg.degrees[node]);
                }
                for &(neighbor, _) in &wg.adj[node] {
                    if !visited[neighbor] && state.assignment[neighbor] == comm {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }
}

impl CommunityDetection for Leiden {
    fn name(&self) -> &'static str {
        "leiden"
    }

    fn detect(&self, graph: &AttributedGraph) -> Result<Partition> {
        if graph.node_count == 0 {
            return Err(Error::EmptyGraph);
        }

        let native = self.to_petgraph(graph)?;
        let wg = WeightedGraph::from_petgraph(&native);
        let mut state = CommunityState::new_singletons(&wg.degrees);

        if wg.m > 0.0 {
            for round in 0..self.max_iter {
                if !self.local_moving_phase(&wg, &mut state) {
                    break;
                }
                self.refinement_phase(&wg, &mut state);
                log::debug!("Leiden round {} complete", round);
            }
        }

        // Map petgraph indices back onto the original node ids
        let (communities, _) = renumber(&state.assignment);
        let pairs = native.node_indices().map(|idx| (native[idx], communities[idx.index()]));
        Partition::from_pairs(graph.node_count, pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::community::CommunityLookup;
    use crate::graph::GraphBuilder;

    fn graph_from(n: usize, edges: &[(u32, u32)]) -> AttributedGraph {
        let mut builder = GraphBuilder::with_nodes(n);
        for &(a, b) in edges {
            builder.add_edge(a, b, 1.0).unwrap();
        }
        builder.build().unwrap()
    }

    /// Every community must induce a connected subgraph
    fn assert_connected_communities(graph: &AttributedGraph, partition: &Partition) {
        for (_, members) in partition.communities() {
            let set: HashSet<u32> = members.iter().copied().collect();
            let mut seen = HashSet::from([members[0]]);
            let mut stack = vec![members[0]];
            while let Some(node) = stack.pop() {
                for &n in graph.neighbors(node as usize) {
                    if set.contains(&n) && seen.insert(n) {
                        stack.push(n);
                    }
                }
            }
            assert_eq!(seen.len(), members.len(), "community {:?} is not connected", members);
        }
    }

    #[test]
    fn test_leiden_basic() {
        let graph = graph_from(3, &[(0, 1), (1, 2), (0, 2)]);
        let partition = Leiden::new().detect(&graph).unwrap();

        assert!(partition.is_total());
        assert_eq!(partition.community_count(), 1);
    }

    #[test]
    fn test_leiden_two_cliques() {
        let graph = graph_from(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)]);
        let partition = Leiden::new().detect(&graph).unwrap();

        assert_eq!(partition.community_of(0), partition.community_of(1));
        assert_eq!(partition.community_of(1), partition.community_of(2));
        assert_eq!(partition.community_of(3), partition.community_of(4));
        assert_eq!(partition.community_of(4), partition.community_of(5));
        assert_ne!(partition.community_of(0), partition.community_of(3));
    }

    #[test]
    fn test_leiden_separates_components() {
        let graph = graph_from(5, &[(0, 1), (1, 2), (3, 4)]);
        let partition = Leiden::new().detect(&graph).unwrap();

        assert_eq!(partition.community_of(3), partition.community_of(4));
        assert_ne!(partition.community_of(0), partition.community_of(3));
        assert_connected_communities(&graph, &partition);
    }

    #[test]
    fn test_leiden_isolated_nodes_get_own_community() {
        let graph = graph_from(4, &[(0, 1)]);
        let partition = Leiden::new().detect(&graph).unwrap();

        assert!(partition.is_total());
        assert_ne!(partition.community_of(2), partition.community_of(3));
        assert_ne!(partition.community_of(2), partition.community_of(0));
    }

    #[test]
    fn test_leiden_empty_graph() {
        let graph = AttributedGraph::empty(0);
        assert!(matches!(Leiden::new().detect(&graph), Err(Error::EmptyGraph)));
    }

    #[test]
    fn test_leiden_connectivity_guarantee() {
        let mut edges: Vec<(u32, u32)> = (0..15).map(|i| (i, i + 1)).collect();
        edges.push((0, 5));
        edges.push((10, 15));
        let graph = graph_from(20, &edges);

        for resolution in [0.1, 0.5, 1.0, 2.0] {
            let partition = Leiden::new().with_resolution(resolution).detect(&graph).unwrap();
            assert_eq!(partition.len(), 20);
            assert!(partition.is_total());
            assert_connected_communities(&graph, &partition);
        }
    }
}
