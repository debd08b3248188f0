//! Descriptive statistics of a loaded graph

use serde::{Serialize, Deserialize};
use crate::graph::{algorithms, AttributedGraph};

/// Summary statistics shown before analysing a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_clustering: f64,

    /// Number of nodes per degree
    pub degree_histogram: Vec<usize>,

    /// Nodes labelled normal (0)
    pub normal_count: usize,

    /// Nodes labelled anomalous (1)
    pub anomalous_count: usize,
}

impl GraphStatistics {
    /// Compute all statistics for a graph
    pub fn compute(graph: &AttributedGraph) -> Self {
        let (normal_count, anomalous_count) = algorithms::label_distribution(graph);

        Self {
            node_count: graph.node_count,
            edge_count: graph.edge_count(),
            density: algorithms::density(graph),
            average_clustering: algorithms::average_clustering(graph),
            degree_histogram: algorithms::degree_histogram(graph),
            normal_count,
            anomalous_count,
        }
    }

    /// Write the statistics to the log
    pub fn log_summary(&self, dataset_name: &str) {
        log::info!("Statistics for {}", dataset_name);
        log::info!("Number of nodes: {}", self.node_count);
        log::info!("Number of edges: {}", self.edge_count);
        log::info!("Graph density: {}", self.density);
        log::info!("Average clustering coefficient: {}", self.average_clustering);
        log::info!(
            "Label distribution: {} normal, {} anomalous",
            self.normal_count, self.anomalous_count
        );
        log::debug!("Degree histogram: {:?}", self.degree_histogram);
    }
}
