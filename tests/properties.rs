use std::collections::HashSet;
use proptest::prelude::*;
use cada_anomaly::anomaly::AnomalyScores;
use cada_anomaly::community::{CommunityLookup, Partition};
use cada_anomaly::graph::{AttributedGraph, GraphBuilder, NodeId};

/// Random graph plus a possibly partial partition over its nodes
fn graph_and_partition() -> impl Strategy<Value = (AttributedGraph, Partition)> {
    (1usize..30).prop_flat_map(|n| {
        let edges = proptest::collection::vec((0..n as u32, 0..n as u32), 0..(n * 3));
        let assignment = proptest::collection::vec(proptest::option::weighted(0.85, 0usize..5), n);
        (edges, assignment).prop_map(move |(edges, assignment)| {
            let mut builder = GraphBuilder::with_nodes(n);
            for (a, b) in edges {
                builder.add_edge(a, b, 1.0).unwrap();
            }
            let pairs = assignment
                .into_iter()
                .enumerate()
                .filter_map(|(node, c)| c.map(|c| (node as NodeId, c)));
            (builder.build().unwrap(), Partition::from_pairs(n, pairs).unwrap())
        })
    })
}

fn neighbour_communities(graph: &AttributedGraph, partition: &Partition, node: NodeId) -> usize {
    graph
        .neighbors(node as usize)
        .iter()
        .filter(|&&m| m != node)
        .filter_map(|&m| partition.community_of(m))
        .collect::<HashSet<_>>()
        .len()
}

proptest! {
    #[test]
    fn score_bounded_by_neighbour_communities((graph, partition) in graph_and_partition()) {
        let scores = AnomalyScores::compute(&graph, &partition);

        for node in graph.nodes() {
            let k = neighbour_communities(&graph, &partition, node);
            match scores.score_of(node) {
                None => prop_assert_eq!(k, 0),
                Some(score) => {
                    prop_assert!(score >= 1.0);
                    prop_assert!(score <= k as f64 + 1e-9);
                    prop_assert_eq!(score == 1.0, k == 1);
                }
            }
        }
    }

    #[test]
    fn table_is_non_increasing((graph, partition) in graph_and_partition()) {
        let scores = AnomalyScores::compute(&graph, &partition);
        for pair in scores.all().windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn top_k_is_prefix((graph, partition) in graph_and_partition(), k in 0usize..40) {
        let scores = AnomalyScores::compute(&graph, &partition);
        let top = scores.top_anomalies(k);
        let prefix: Vec<NodeId> = scores.all().iter().take(k).map(|e| e.node).collect();

        prop_assert_eq!(top.len(), k.min(scores.len()));
        prop_assert_eq!(top, prefix);
    }

    #[test]
    fn threshold_matches_filter((graph, partition) in graph_and_partition(), threshold in 0.5f64..4.0) {
        let scores = AnomalyScores::compute(&graph, &partition);
        let filtered: Vec<NodeId> = scores
            .all()
            .iter()
            .filter(|e| e.score > threshold)
            .map(|e| e.node)
            .collect();

        prop_assert_eq!(scores.anomalies_above(threshold), filtered);
    }

    #[test]
    fn relabelling_keeps_scores((graph, partition) in graph_and_partition(), shift in 1usize..100) {
        let relabelled = partition.relabel(|c| (4 - c) * 31 + shift);

        let before = AnomalyScores::compute(&graph, &partition);
        let after = AnomalyScores::compute(&graph, &relabelled);

        prop_assert_eq!(before, after);
    }
}
