//! GraphML export for external visualisation tools

use anyhow::Result;
use crate::community::Partition;
use crate::anomaly::AnomalyScores;
use crate::graph::AttributedGraph;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write the graph as GraphML with per-node `label`, `community` and `score`.
///
/// Data keys are omitted for nodes where the value is unknown: unlabelled
/// graphs, unassigned nodes and nodes without a score.
pub fn export_graphml(
    graph: &AttributedGraph,
    partition: &Partition,
    scores: &AnomalyScores,
    path: &Path,
) -> Result<()> {
    log::info!("Writing GraphML with {} nodes to {}", graph.node_count, path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);

    let score_of: HashMap<u32, f64> = scores.iter().map(|e| (e.node, e.score)).collect();

    // Write GraphML header
    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"name\" for=\"node\" attr.name=\"name\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"int\"/>")?;
    writeln!(file, "  <key id=\"community\" for=\"node\" attr.name=\"community\" attr.type=\"long\"/>")?;
    writeln!(file, "  <key id=\"score\" for=\"node\" attr.name=\"score\" attr.type=\"double\"/>")?;
    writeln!(file, "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"undirected\">")?;

    // Write nodes
    for node in graph.nodes() {
        writeln!(file, "    <node id=\"n{}\">", node)?;
        writeln!(file, "      <data key=\"name\">{}</data>", escape(&graph.node_name(node)))?;
        if let Some(label) = graph.label(node) {
            writeln!(file, "      <data key=\"label\">{}</data>", label)?;
        }
        if let Some(Some(community)) = partition.assignment().get(node as usize) {
            writeln!(file, "      <data key=\"community\">{}</data>", community)?;
        }
        if let Some(score) = score_of.get(&node) {
            writeln!(file, "      <data key=\"score\">{}</data>", score)?;
        }
        writeln!(file, "    </node>")?;
    }

    // Write edges, each undirected edge once
    let weights = graph.edge_attribute(crate::graph::WEIGHT_ATTRIBUTE);
    for (edge_id, (a, b, pos)) in graph.edges().enumerate() {
        let weight = weights.and_then(|w| w.get(pos)).copied().unwrap_or(1.0);
        writeln!(
            file,
            "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\">\n      <data key=\"weight\">{}</data>\n    </edge>",
            edge_id, a, b, weight
        )?;
    }

    // Write GraphML footer
    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;
    file.flush()?;

    Ok(())
}
