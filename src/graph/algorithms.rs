//! Graph algorithms for descriptive statistics

use rayon::prelude::*;
use crate::graph::AttributedGraph;

/// Graphs below this size are processed sequentially
const PARALLEL_THRESHOLD: usize = 1000;

/// Neighbours of a node excluding itself
fn proper_neighbors(graph: &AttributedGraph, node: usize) -> impl Iterator<Item = u32> + '_ {
    graph.neighbors(node)
        .iter()
        .copied()
        .filter(move |&n| n as usize != node)
}

/// Edge density: 2m / (n (n - 1)), self-loops included in m
pub fn density(graph: &AttributedGraph) -> f64 {
    let n = graph.node_count;
    if n <= 1 {
        return 0.0;
    }

    2.0 * graph.edge_count() as f64 / (n * (n - 1)) as f64
}

/// Local clustering coefficient of a node.
///
/// Self-loops are ignored; nodes with fewer than two neighbours have
/// coefficient 0.
pub fn local_clustering(graph: &AttributedGraph, node: usize) -> f64 {
    let neighbors: Vec<u32> = proper_neighbors(graph, node).collect();
    let k = neighbors.len();
    if k < 2 {
        return 0.0;
    }

    // Each triangle through `node` is seen twice
    let mut links = 0usize;
    for &u in &neighbors {
        links += proper_neighbors(graph, u as usize)
            .filter(|&w| w as usize != node && neighbors.binary_search(&w).is_ok())
            .count();
    }

    links as f64 / (k * (k - 1)) as f64
}

/// Mean local clustering coefficient over all nodes
pub fn average_clustering(graph: &AttributedGraph) -> f64 {
    let n = graph.node_count;
    if n == 0 {
        return 0.0;
    }

    // Collect in node order so the sum is reproducible
    let coefficients: Vec<f64> = if n < PARALLEL_THRESHOLD {
        (0..n).map(|node| local_clustering(graph, node)).collect()
    } else {
        (0..n).into_par_iter().map(|node| local_clustering(graph, node)).collect()
    };

    coefficients.iter().sum::<f64>() / n as f64
}

/// Number of nodes per degree, indexed by degree.
///
/// A self-loop adds two to the degree of its node.
pub fn degree_histogram(graph: &AttributedGraph) -> Vec<usize> {
    let degrees: Vec<usize> = graph.nodes()
        .map(|node| {
            let node = node as usize;
            let self_loop = graph.has_edge(node, node as u32) as usize;
            graph.degree(node) + self_loop
        })
        .collect();

    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let mut histogram = vec![0; max_degree + 1];
    for degree in degrees {
        histogram[degree] += 1;
    }
    if graph.node_count == 0 {
        histogram.clear();
    }

    histogram
}

/// Count of (normal, anomalous) labelled nodes
pub fn label_distribution(graph: &AttributedGraph) -> (usize, usize) {
    graph.nodes().fold((0, 0), |(normal, anomalous), node| match graph.label(node) {
        Some(0) => (normal + 1, anomalous),
        Some(1) => (normal, anomalous + 1),
        _ => (normal, anomalous),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn triangle_with_tail() -> AttributedGraph {
        let mut builder = GraphBuilder::with_nodes(4);
        builder.add_edge(0, 1, 1.0).unwrap();
        builder.add_edge(1, 2, 1.0).unwrap();
        builder.add_edge(0, 2, 1.0).unwrap();
        builder.add_edge(2, 3, 1.0).unwrap();
        builder.with_labels(vec![0, 0, 1, 0]).build().unwrap()
    }

    #[test]
    fn test_density() {
        let graph = triangle_with_tail();
        assert!((density(&graph) - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(density(&AttributedGraph::empty(1)), 0.0);
    }

    #[test]
    fn test_clustering() {
        let graph = triangle_with_tail();
        assert_eq!(local_clustering(&graph, 0), 1.0);
        assert!((local_clustering(&graph, 2) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(local_clustering(&graph, 3), 0.0);

        let expected = (1.0 + 1.0 + 1.0 / 3.0 + 0.0) / 4.0;
        assert!((average_clustering(&graph) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_degree_histogram() {
        let graph = triangle_with_tail();
        assert_eq!(degree_histogram(&graph), vec![0, 1, 2, 1]);
        assert!(degree_histogram(&AttributedGraph::empty(0)).is_empty());
    }

    #[test]
    fn test_label_distribution() {
        let graph = triangle_with_tail();
        assert_eq!(label_distribution(&graph), (3, 1));
    }
}
