//! Two-level Infomap community detection.
//!
//! Infomap searches for the module assignment minimising the map equation,
//! the expected description length of a random walk on the network:
//!
//! ```text
//! L(M) = q log q - 2 Σ q_i log q_i - Σ p_a log p_a + Σ (q_i + p_i) log(q_i + p_i)
//! ```
//!
//! where `p_a` is the stationary flow through node `a`, `q_i` the flow
//! exiting module `i`, `p_i` the flow inside module `i` and `q = Σ q_i`.
//! For an undirected network the flow of a node is its share of the total
//! edge weight.
//!
//! The network is built from a link list: only nodes that take part in at
//! least one link are modelled. Nodes without links are missing from the
//! resulting partition.

use std::collections::{BTreeSet, HashMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use super::louvain::check_weights;
use super::partition::Partition;
use super::traits::CommunityDetection;
use crate::error::{Error, Result};
use crate::graph::{AttributedGraph, NodeId};

/// Minimum codelength improvement for a move to count
const MIN_IMPROVEMENT: f64 = 1e-10;

fn plogp(p: f64) -> f64 {
    if p > 0.0 { p * p.log2() } else { 0.0 }
}

/// Two-level Infomap detector.
#[derive(Debug, Clone)]
pub struct Infomap {
    /// Independent optimisation attempts; the shortest codelength wins.
    trials: usize,
    /// Maximum sweeps over the nodes per trial.
    max_iter: usize,
    seed: u64,
    /// Edge attribute used as link weight, unit weights when absent.
    weight_attribute: Option<String>,
}

impl Infomap {
    pub fn new() -> Self {
        Self {
            trials: 1,
            max_iter: 100,
            seed: 42,
            weight_attribute: None,
        }
    }

    /// Set number of trials.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Weight links by the named edge attribute.
    pub fn with_weight_attribute(mut self, attribute: Option<String>) -> Self {
        self.weight_attribute = attribute;
        self
    }
}

impl Default for Infomap {
    fn default() -> Self {
        Self::new()
    }
}

/// Undirected flow network over the physical nodes that appear in links
struct FlowNetwork {
    /// Local index -> original node id
    nodes: Vec<NodeId>,
    /// Local adjacency without self-links
    adj: Vec<Vec<(usize, f64)>>,
    /// Weighted degree of each node
    degrees: Vec<f64>,
    /// Twice the total link weight
    total: f64,
}

impl FlowNetwork {
    /// Build from a link list. Self-links register their node but carry no flow.
    fn from_links(links: &[(NodeId, NodeId, f64)]) -> Self {
        let nodes: Vec<NodeId> = links.iter()
            .flat_map(|&(a, b, _)| [a, b])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let local: HashMap<NodeId, usize> = nodes.iter()
            .enumerate()
            .map(|(i, &node)| (node, i))
            .collect();

        let mut adj = vec![Vec::new(); nodes.len()];
        let mut degrees = vec![0.0; nodes.len()];
        let mut total = 0.0;
        for &(a, b, w) in links {
            if a == b {
                continue;
            }
            let (i, j) = (local[&a], local[&b]);
            adj[i].push((j, w));
            adj[j].push((i, w));
            degrees[i] += w;
            degrees[j] += w;
            total += 2.0 * w;
        }

        Self { nodes, adj, degrees, total }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn node_flow(&self, node: usize) -> f64 {
        if self.total > 0.0 { self.degrees[node] / self.total } else { 0.0 }
    }

    /// Σ p_a log p_a, constant for a network
    fn node_flow_log(&self) -> f64 {
        (0..self.len()).map(|a| plogp(self.node_flow(a))).sum()
    }

    /// Codelength of putting every node into a single module
    fn one_module_codelength(&self) -> f64 {
        -self.node_flow_log()
    }
}

/// Module assignment with the aggregate terms of the map equation
struct ModuleState {
    module: Vec<usize>,
    /// Flow exiting each module
    exit: Vec<f64>,
    /// Flow inside each module
    flow: Vec<f64>,
    sum_exit: f64,
    sum_exit_log: f64,
    sum_exit_flow_log: f64,
    node_flow_log: f64,
}

impl ModuleState {
    fn singletons(network: &FlowNetwork) -> Self {
        let n = network.len();
        let flow: Vec<f64> = (0..n).map(|a| network.node_flow(a)).collect();
        // A lone node exits through every one of its links
        let exit = flow.clone();

        Self {
            module: (0..n).collect(),
            sum_exit: exit.iter().sum(),
            sum_exit_log: exit.iter().map(|&q| plogp(q)).sum(),
            sum_exit_flow_log: exit.iter().zip(&flow).map(|(&q, &p)| plogp(q + p)).sum(),
            node_flow_log: network.node_flow_log(),
            exit,
            flow,
        }
    }

    fn codelength(&self) -> f64 {
        plogp(self.sum_exit) - 2.0 * self.sum_exit_log - self.node_flow_log + self.sum_exit_flow_log
    }

    /// Exit and flow of modules `from` and `to` after moving `node`
    fn moved_terms(
        &self,
        network: &FlowNetwork,
        node: usize,
        to: usize,
        weight_from: f64,
        weight_to: f64,
    ) -> ((f64, f64), (f64, f64)) {
        let from = self.module[node];
        let p = network.node_flow(node);
        let d = network.degrees[node] / network.total;
        let (w_from, w_to) = (weight_from / network.total, weight_to / network.total);

        let exit_from = self.exit[from] - d + 2.0 * w_from;
        let exit_to = self.exit[to] + d - 2.0 * w_to;
        ((exit_from, self.flow[from] - p), (exit_to, self.flow[to] + p))
    }

    /// Change in codelength if `node` moved to module `to`
    fn delta(&self, network: &FlowNetwork, node: usize, to: usize, weight_from: f64, weight_to: f64) -> f64 {
        let from = self.module[node];
        let ((exit_from, flow_from), (exit_to, flow_to)) =
            self.moved_terms(network, node, to, weight_from, weight_to);

        let sum_exit = self.sum_exit - self.exit[from] - self.exit[to] + exit_from + exit_to;
        let sum_exit_log = self.sum_exit_log - plogp(self.exit[from]) - plogp(self.exit[to])
            + plogp(exit_from) + plogp(exit_to);
        let sum_exit_flow_log = self.sum_exit_flow_log
            - plogp(self.exit[from] + self.flow[from])
            - plogp(self.exit[to] + self.flow[to])
            + plogp(exit_from + flow_from)
            + plogp(exit_to + flow_to);

        let after = plogp(sum_exit) - 2.0 * sum_exit_log - self.node_flow_log + sum_exit_flow_log;
        after - self.codelength()
    }

    fn apply_move(&mut self, network: &FlowNetwork, node: usize, to: usize, weight_from: f64, weight_to: f64) {
        let from = self.module[node];
        let ((exit_from, flow_from), (exit_to, flow_to)) =
            self.moved_terms(network, node, to, weight_from, weight_to);

        self.sum_exit += exit_from + exit_to - self.exit[from] - self.exit[to];
        self.sum_exit_log += plogp(exit_from) + plogp(exit_to)
            - plogp(self.exit[from]) - plogp(self.exit[to]);
        self.sum_exit_flow_log += plogp(exit_from + flow_from) + plogp(exit_to + flow_to)
            - plogp(self.exit[from] + self.flow[from])
            - plogp(self.exit[to] + self.flow[to]);

        self.exit[from] = exit_from;
        self.flow[from] = flow_from;
        self.exit[to] = exit_to;
        self.flow[to] = flow_to;
        self.module[node] = to;
    }
}

impl Infomap {
    /// One greedy optimisation from singleton modules
    fn run_trial(&self, network: &FlowNetwork, rng: &mut StdRng) -> ModuleState {
        let mut state = ModuleState::singletons(network);
        let mut order: Vec<usize> = (0..network.len()).collect();
        let mut module_weights: Vec<(usize, f64)> = Vec::new();

        for _sweep in 0..self.max_iter {
            order.shuffle(rng);
            let mut moves = 0;

            for &node in &order {
                let current = state.module[node];

                module_weights.clear();
                for &(neighbor, w) in &network.adj[node] {
                    let m = state.module[neighbor];
                    match module_weights.iter_mut().find(|(module, _)| *module == m) {
                        Some(entry) => entry.1 += w,
                        None => module_weights.push((m, w)),
                    }
                }

                let weight_from = module_weights.iter()
                    .find(|(m, _)| *m == current)
                    .map_or(0.0, |&(_, w)| w);

                let mut best: Option<(usize, f64, f64)> = None;
                for &(target, weight_to) in &module_weights {
                    if target == current {
                        continue;
                    }
                    let delta = state.delta(network, node, target, weight_from, weight_to);
                    if delta < -MIN_IMPROVEMENT && best.map_or(true, |(_, d, _)| delta < d) {
                        best = Some((target, delta, weight_to));
                    }
                }

                if let Some((target, _, weight_to)) = best {
                    state.apply_move(network, node, target, weight_from, weight_to);
                    moves += 1;
                }
            }

            if moves == 0 {
                break;
            }
        }

        state
    }
}

impl CommunityDetection for Infomap {
    fn name(&self) -> &'static str {
        "infomap"
    }

    fn detect(&self, graph: &AttributedGraph) -> Result<Partition> {
        if graph.node_count == 0 {
            return Err(Error::EmptyGraph);
        }

        // Link list in the shape of `add_link(a, b, w)` calls
        let column = self.weight_attribute.as_deref().and_then(|name| graph.edge_attribute(name));
        let links: Vec<(NodeId, NodeId, f64)> = graph.edges()
            .map(|(a, b, pos)| (a, b, column.map_or(1.0, |c| c[pos])))
            .collect();
        let checked: Vec<(usize, usize, f64)> = links.iter()
            .map(|&(a, b, w)| (a as usize, b as usize, w))
            .collect();
        check_weights(&checked)?;

        let network = FlowNetwork::from_links(&links);
        if network.len() == 0 {
            log::warn!("Infomap: graph has no links, no node is assigned");
            return Ok(Partition::empty(graph.node_count));
        }

        let mut best: Option<(f64, Vec<usize>)> = None;
        for trial in 0..self.trials {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(trial as u64));
            let state = self.run_trial(&network, &mut rng);
            let codelength = state.codelength();
            log::debug!("Infomap trial {}: codelength {:.6} bits", trial, codelength);

            if best.as_ref().map_or(true, |(l, _)| codelength < *l - MIN_IMPROVEMENT) {
                best = Some((codelength, state.module));
            }
        }

        let (codelength, modules) = best.unwrap_or_else(|| (f64::INFINITY, (0..network.len()).collect()));
        let one_module = network.one_module_codelength();
        let modules = if one_module <= codelength + MIN_IMPROVEMENT {
            log::debug!("Infomap: one-module solution ({:.6} bits) is not beaten", one_module);
            vec![0; network.len()]
        } else {
            modules
        };

        // Module indices numbered by first appearance in node order
        let mut index: HashMap<usize, usize> = HashMap::new();
        let pairs: Vec<(NodeId, usize)> = network.nodes.iter()
            .zip(&modules)
            .map(|(&node, &module)| {
                let next = index.len();
                (node, *index.entry(module).or_insert(next))
            })
            .collect();

        Partition::from_pairs(graph.node_count, pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::CommunityLookup;
    use crate::graph::GraphBuilder;

    fn graph_from(n: usize, edges: &[(u32, u32)]) -> AttributedGraph {
        let mut builder = GraphBuilder::with_nodes(n);
        for &(a, b) in edges {
            builder.add_edge(a, b, 1.0).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_infomap_two_triangles() {
        let graph = graph_from(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)]);
        let partition = Infomap::new().detect(&graph).unwrap();

        assert!(partition.is_total());
        assert_eq!(partition.community_of(0), partition.community_of(1));
        assert_eq!(partition.community_of(1), partition.community_of(2));
        assert_eq!(partition.community_of(3), partition.community_of(4));
        assert_eq!(partition.community_of(4), partition.community_of(5));
        assert_ne!(partition.community_of(0), partition.community_of(3));
    }

    #[test]
    fn test_infomap_skips_nodes_without_links() {
        let graph = graph_from(4, &[(0, 1), (1, 2)]);
        let partition = Infomap::new().detect(&graph).unwrap();

        assert_eq!(partition.len(), 4);
        assert_eq!(partition.community_of(3), None);
        assert!(partition.community_of(0).is_some());
        assert!(!partition.is_total());
    }

    #[test]
    fn test_infomap_no_links() {
        let graph = AttributedGraph::empty(3);
        let partition = Infomap::new().detect(&graph).unwrap();
        assert_eq!(partition.assigned_count(), 0);
    }

    #[test]
    fn test_codelength_bookkeeping_matches_recomputation() {
        let graph = graph_from(5, &[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4)]);
        let links: Vec<(NodeId, NodeId, f64)> = graph.edges().map(|(a, b, _)| (a, b, 1.0)).collect();
        let network = FlowNetwork::from_links(&links);

        let mut state = ModuleState::singletons(&network);
        // Merge node 1 into node 0's module, weight from 1 to module 0 is 1
        state.apply_move(&network, 1, 0, 0.0, 1.0);

        // Recompute from scratch: module {0, 1} exits through 0-2 and 1-2
        let total = network.total;
        let exit_01 = 2.0 / total;
        let flow_01 = 4.0 / total;
        let singles = [2usize, 3, 4];
        let mut sum_exit = exit_01;
        let mut sum_exit_log = plogp(exit_01);
        let mut sum_exit_flow_log = plogp(exit_01 + flow_01);
        for &a in &singles {
            let p = network.node_flow(a);
            sum_exit += p;
            sum_exit_log += plogp(p);
            sum_exit_flow_log += plogp(2.0 * p);
        }
        let expected = plogp(sum_exit) - 2.0 * sum_exit_log - network.node_flow_log() + sum_exit_flow_log;

        assert!((state.codelength() - expected).abs() < 1e-12);
    }
}
