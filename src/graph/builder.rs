//! Graph construction module

use std::collections::HashMap;
use ndarray::Array2;
use crate::error::{Error, Result};
use crate::graph::compressed::{AttributedGraph, NodeId, NodeMetadata, WEIGHT_ATTRIBUTE};

/// Builder for incrementally constructing an AttributedGraph
#[derive(Debug, Default)]
pub struct GraphBuilder {
    /// Number of nodes
    node_count: usize,

    /// Mapping from string IDs to node indices
    id_to_index: HashMap<String, NodeId>,

    /// Node string IDs (index as string for unnamed nodes)
    node_ids: Vec<String>,

    /// Whether any node was created by name
    named: bool,

    /// Undirected edge records as (low, high) endpoints
    records: Vec<(NodeId, NodeId)>,

    /// Record index for each endpoint pair, used to collapse duplicates
    record_index: HashMap<(NodeId, NodeId), usize>,

    /// Attribute columns parallel to `records`
    attributes: HashMap<String, Vec<Option<f64>>>,

    labels: Option<Vec<u8>>,

    node_attributes: Option<Array2<f64>>,
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            node_ids: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Create a builder holding `node_count` unnamed nodes
    pub fn with_nodes(node_count: usize) -> Self {
        let mut builder = Self::with_capacity(node_count);
        for _ in 0..node_count {
            builder.add_node();
        }
        builder
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Add an unnamed node
    pub fn add_node(&mut self) -> NodeId {
        let idx = self.node_count as NodeId;
        self.node_ids.push(idx.to_string());
        self.node_count += 1;
        idx
    }

    /// Get or create a node ID for the given string ID
    pub fn get_or_create_node(&mut self, id: &str) -> NodeId {
        if let Some(&idx) = self.id_to_index.get(id) {
            return idx;
        }

        // Create a new node
        let idx = self.node_count as NodeId;
        self.id_to_index.insert(id.to_string(), idx);
        self.node_ids.push(id.to_string());
        self.node_count += 1;
        self.named = true;

        idx
    }

    /// Add an undirected edge between existing nodes.
    ///
    /// Adding the same pair again overwrites its weight.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, weight: f64) -> Result<()> {
        for node in [a, b] {
            if node as usize >= self.node_count {
                return Err(Error::NodeOutOfRange {
                    node: node as u64,
                    node_count: self.node_count,
                });
            }
        }

        let record = self.record_for(a, b);
        self.set_attribute(record, WEIGHT_ATTRIBUTE, weight);
        Ok(())
    }

    /// Add an edge between nodes given by name, creating them as needed
    pub fn add_named_edge(&mut self, src_id: &str, dst_id: &str, weight: f64) {
        let a = self.get_or_create_node(src_id);
        let b = self.get_or_create_node(dst_id);
        let record = self.record_for(a, b);
        self.set_attribute(record, WEIGHT_ATTRIBUTE, weight);
    }

    /// Attach a named attribute to an existing edge
    pub fn add_edge_attribute(&mut self, a: NodeId, b: NodeId, name: &str, value: f64) -> Result<()> {
        let key = (a.min(b), a.max(b));
        let record = *self.record_index.get(&key).ok_or(Error::InvalidParameter {
            name: "edge",
            message: format!("no edge between {} and {}", a, b),
        })?;
        self.set_attribute(record, name, value);
        Ok(())
    }

    /// Set ground truth labels, one per node
    pub fn with_labels(mut self, labels: Vec<u8>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Set node attribute matrix, one row per node
    pub fn with_attributes(mut self, attributes: Array2<f64>) -> Self {
        self.node_attributes = Some(attributes);
        self
    }

    fn record_for(&mut self, a: NodeId, b: NodeId) -> usize {
        let key = (a.min(b), a.max(b));
        if let Some(&record) = self.record_index.get(&key) {
            return record;
        }

        let record = self.records.len();
        self.records.push(key);
        self.record_index.insert(key, record);
        for column in self.attributes.values_mut() {
            column.push(None);
        }
        record
    }

    fn set_attribute(&mut self, record: usize, name: &str, value: f64) {
        let len = self.records.len();
        let column = self.attributes
            .entry(name.to_string())
            .or_insert_with(|| vec![None; len]);
        column[record] = Some(value);
    }

    /// Build the compressed graph
    pub fn build(self) -> Result<AttributedGraph> {
        if let Some(labels) = &self.labels {
            if labels.len() != self.node_count {
                return Err(Error::LengthMismatch {
                    what: "label vector",
                    expected: self.node_count,
                    found: labels.len(),
                });
            }
        }
        if let Some(attributes) = &self.node_attributes {
            if attributes.nrows() != self.node_count {
                return Err(Error::LengthMismatch {
                    what: "attribute matrix",
                    expected: self.node_count,
                    found: attributes.nrows(),
                });
            }
        }

        // Adjacency lists hold (neighbour, record) pairs
        let mut adjacency_lists: Vec<Vec<(NodeId, usize)>> = vec![Vec::new(); self.node_count];
        for (record, &(a, b)) in self.records.iter().enumerate() {
            adjacency_lists[a as usize].push((b, record));
            if a != b {
                adjacency_lists[b as usize].push((a, record));
            }
        }

        // Create offsets array
        let mut offsets = Vec::with_capacity(self.node_count + 1);
        offsets.push(0);

        let mut offset = 0;
        for list in &mut adjacency_lists {
            // Sort for binary search efficiency
            list.sort_unstable_by_key(|&(dst, _)| dst);
            offset += list.len() as u32;
            offsets.push(offset);
        }

        let edges: Vec<u32> = adjacency_lists.iter()
            .flat_map(|list| list.iter().map(|&(dst, _)| dst))
            .collect();

        // Lay attribute columns out in adjacency order, missing values as 1.0
        let edge_attributes = self.attributes.into_iter()
            .map(|(name, column)| {
                let values = adjacency_lists.iter()
                    .flat_map(|list| list.iter().map(|&(_, record)| column[record].unwrap_or(1.0)))
                    .collect();
                (name, values)
            })
            .collect();

        let graph = AttributedGraph {
            node_count: self.node_count,
            offsets,
            edges,
            edge_attributes,
            node_ids: if self.named { Some(self.node_ids) } else { None },
            metadata: NodeMetadata {
                labels: self.labels,
                attributes: self.node_attributes,
            },
        };

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut builder = GraphBuilder::with_nodes(2);
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(1, 0, 4.0).unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_attribute("weight").unwrap(), &[4.0, 4.0]);
    }

    #[test]
    fn test_out_of_range_edge_rejected() {
        let mut builder = GraphBuilder::with_nodes(2);
        let err = builder.add_edge(0, 5, 1.0).unwrap_err();
        assert!(matches!(err, Error::NodeOutOfRange { node: 5, node_count: 2 }));
    }

    #[test]
    fn test_named_nodes() {
        let mut builder = GraphBuilder::with_capacity(4);
        builder.add_named_edge("alice", "bob", 1.0);
        builder.add_named_edge("bob", "carol", 1.0);
        let graph = builder.build().unwrap();

        assert_eq!(graph.node_count, 3);
        assert_eq!(graph.node_name(2), "carol");
        assert_eq!(graph.neighbors(1), &[0, 2]);
    }

    #[test]
    fn test_extra_edge_attribute_defaults() {
        let mut builder = GraphBuilder::with_nodes(3);
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(1, 2, 1.0).unwrap();
        builder.add_edge_attribute(0, 1, "trust", 0.25).unwrap();
        assert!(builder.add_edge_attribute(0, 2, "trust", 1.0).is_err());
        let graph = builder.build().unwrap();

        assert_eq!(
            graph.weighted_edges(Some("trust")),
            vec![(0, 1, 0.25), (1, 2, 1.0)]
        );
    }

    #[test]
    fn test_label_length_checked() {
        let builder = GraphBuilder::with_nodes(3).with_labels(vec![0, 1]);
        assert!(matches!(
            builder.build(),
            Err(Error::LengthMismatch { expected: 3, found: 2, .. })
        ));
    }
}
