//! Memory-efficient undirected graph representation

use std::collections::HashMap;
use std::mem;
use ndarray::{Array2, ArrayView1};

/// Dense node index
pub type NodeId = u32;

/// Name of the edge attribute holding adjacency values
pub const WEIGHT_ATTRIBUTE: &str = "weight";

/// Store node metadata separately to improve cache locality during traversal
#[derive(Debug, Clone, Default)]
pub struct NodeMetadata {
    /// Ground truth per node: 0 = normal, 1 = anomalous
    pub labels: Option<Vec<u8>>,

    /// Numeric attribute vector per node (one row per node)
    pub attributes: Option<Array2<f64>>,
}

impl NodeMetadata {
    /// Calculate the memory usage of the metadata
    pub fn memory_usage(&self) -> usize {
        let labels = self.labels.as_ref()
            .map(|l| l.capacity() * mem::size_of::<u8>())
            .unwrap_or(0);
        let attributes = self.attributes.as_ref()
            .map(|a| a.len() * mem::size_of::<f64>())
            .unwrap_or(0);

        labels + attributes
    }
}

/// Compressed sparse representation of an undirected graph.
///
/// Every undirected edge `{a, b}` is stored twice, once in the adjacency
/// list of `a` and once in that of `b`; a self-loop is stored once.
/// Adjacency lists are sorted and free of duplicates.
#[derive(Debug, Clone)]
pub struct AttributedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// Offset array: index where each node's adjacency begins
    /// offsets[i] to offsets[i+1] defines the neighbour range for node i
    pub offsets: Vec<u32>,

    /// Concatenated adjacency lists
    pub edges: Vec<u32>,

    /// Edge attribute columns, each parallel to `edges`
    pub edge_attributes: HashMap<String, Vec<f64>>,

    /// Optional mapping from node indices to original string IDs
    pub node_ids: Option<Vec<String>>,

    /// Node labels and attribute vectors
    pub metadata: NodeMetadata,
}

impl AttributedGraph {
    /// Graph with `node_count` nodes and no edges
    pub fn empty(node_count: usize) -> Self {
        Self {
            node_count,
            offsets: vec![0; node_count + 1],
            edges: Vec::new(),
            edge_attributes: HashMap::new(),
            node_ids: None,
            metadata: NodeMetadata::default(),
        }
    }

    /// Iterate over node indices in native order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        0..self.node_count as NodeId
    }

    /// Neighbours of a node (includes the node itself if it has a self-loop)
    pub fn neighbors(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.edges[start..end]
    }

    /// Check if there's an edge between `a` and `b`
    pub fn has_edge(&self, a: usize, b: NodeId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Number of adjacency entries of a node
    pub fn degree(&self, node: usize) -> usize {
        (self.offsets[node + 1] - self.offsets[node]) as usize
    }

    /// Number of undirected edges, self-loops counted once
    pub fn edge_count(&self) -> usize {
        let self_loops = self.nodes()
            .filter(|&n| self.has_edge(n as usize, n))
            .count();
        (self.edges.len() + self_loops) / 2
    }

    /// Iterate over undirected edges as `(a, b, position)` with `a <= b`.
    ///
    /// `position` indexes the attribute columns.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, usize)> + '_ {
        self.nodes().flat_map(move |a| {
            let start = self.offsets[a as usize] as usize;
            self.neighbors(a as usize)
                .iter()
                .enumerate()
                .filter(move |(_, &b)| a <= b)
                .map(move |(i, &b)| (a, b, start + i))
        })
    }

    /// Attribute column by name
    pub fn edge_attribute(&self, name: &str) -> Option<&[f64]> {
        self.edge_attributes.get(name).map(|v| v.as_slice())
    }

    /// Undirected edges without self-loops, weighted by the named attribute.
    ///
    /// Edges fall back to weight 1.0 when no attribute is requested or the
    /// column does not exist.
    pub fn weighted_edges(&self, attribute: Option<&str>) -> Vec<(usize, usize, f64)> {
        let column = attribute.and_then(|name| self.edge_attribute(name));
        if let (Some(name), None) = (attribute, column) {
            log::warn!("Edge attribute '{}' not found, using unit weights", name);
        }

        self.edges()
            .filter(|&(a, b, _)| a != b)
            .map(|(a, b, pos)| {
                let w = column.map_or(1.0, |c| c[pos]);
                (a as usize, b as usize, w)
            })
            .collect()
    }

    /// Display name of a node
    pub fn node_name(&self, node: NodeId) -> String {
        self.node_ids.as_ref()
            .and_then(|ids| ids.get(node as usize).cloned())
            .unwrap_or_else(|| node.to_string())
    }

    /// Ground truth label of a node, if labels are loaded
    pub fn label(&self, node: NodeId) -> Option<u8> {
        self.metadata.labels.as_ref()
            .and_then(|labels| labels.get(node as usize).copied())
    }

    pub fn has_labels(&self) -> bool {
        self.metadata.labels.is_some()
    }

    /// Nodes labelled anomalous (label 1)
    pub fn anomalous_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|&n| self.label(n) == Some(1))
            .collect()
    }

    /// Attribute vector of a node, if attributes are loaded
    pub fn attributes(&self, node: NodeId) -> Option<ArrayView1<'_, f64>> {
        self.metadata.attributes.as_ref()
            .filter(|a| (node as usize) < a.nrows())
            .map(|a| a.row(node as usize))
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let edges = self.edges.capacity() * mem::size_of::<u32>();
        let attributes: usize = self.edge_attributes.values()
            .map(|c| c.capacity() * mem::size_of::<f64>())
            .sum();

        let ids = self.node_ids.as_ref()
            .map(|ids| ids.iter().map(|s| s.capacity()).sum::<usize>())
            .unwrap_or(0);

        base + offsets + edges + attributes + ids + self.metadata.memory_usage()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphBuilder;

    #[test]
    fn test_edges_are_symmetric() {
        let mut builder = GraphBuilder::with_nodes(3);
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(2, 1, 1.0).unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.neighbors(1), &[0, 2]);
        assert!(graph.has_edge(0, 1));
        assert!(graph.has_edge(1, 0));
        assert!(!graph.has_edge(0, 2));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_self_loop_counted_once() {
        let mut builder = GraphBuilder::with_nodes(2);
        builder.add_edge(0, 0, 1.0).unwrap();
        builder.add_edge(0, 1, 1.0).unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.neighbors(0), &[0, 1]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges().count(), 2);
        // Self-loops never reach community detection
        assert_eq!(graph.weighted_edges(None), vec![(0, 1, 1.0)]);
    }

    #[test]
    fn test_weighted_edges_fall_back_to_unit() {
        let mut builder = GraphBuilder::with_nodes(2);
        builder.add_edge(0, 1, 3.5).unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.weighted_edges(Some("weight")), vec![(0, 1, 3.5)]);
        assert_eq!(graph.weighted_edges(Some("missing")), vec![(0, 1, 1.0)]);
        assert_eq!(graph.weighted_edges(None), vec![(0, 1, 1.0)]);
    }
}
