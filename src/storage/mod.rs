//! Results persistence module

use anyhow::Result;
use crate::anomaly::Cada;
use crate::community::CommunityLookup;
use crate::evaluation::DatasetEvaluation;
use crate::graph::{AttributedGraph, GraphStatistics, NodeId};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use serde_json::{json, to_string_pretty};

/// Which anomalies a scoring run reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// Scores strictly above the threshold
    Threshold(f64),
    /// The highest `k` scores
    TopK(usize),
}

impl Selection {
    pub fn select(&self, cada: &Cada) -> Vec<NodeId> {
        match *self {
            Selection::Threshold(threshold) => cada.scores().anomalies_above(threshold),
            Selection::TopK(k) => cada.scores().top_anomalies(k),
        }
    }
}

/// Save a scoring run to the specified directory
pub fn save_results(
    cada: &Cada,
    graph: &AttributedGraph,
    selection: Selection,
    output_dir: &str,
) -> Result<()> {
    log::info!("Saving {} scores to {}", cada.scores().len(), output_dir);

    // Ensure output directory exists
    fs::create_dir_all(output_dir)?;

    save_summary(cada, graph, selection, output_dir)?;
    save_scores(cada, graph, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

fn save_summary(
    cada: &Cada,
    graph: &AttributedGraph,
    selection: Selection,
    output_dir: &str,
) -> Result<()> {
    log::info!("Saving summary information");

    let path = Path::new(output_dir).join("summary.json");
    let mut file = File::create(path)?;

    let anomalies = selection.select(cada);
    let selection_json = match selection {
        Selection::Threshold(threshold) => json!({ "threshold": threshold }),
        Selection::TopK(k) => json!({ "top_k": k }),
    };

    let summary = json!({
        "graph_stats": GraphStatistics::compute(graph),
        "algorithm": cada.algorithm(),
        "community_stats": {
            "community_count": cada.partition().community_count(),
            "assigned_nodes": cada.partition().assigned_count(),
            "unassigned_nodes": graph.node_count.saturating_sub(cada.partition().assigned_count()),
        },
        "score_stats": {
            "scored_nodes": cada.scores().len(),
            "max_score": cada.scores().all().first().map(|e| e.score),
            "min_score": cada.scores().all().last().map(|e| e.score),
        },
        "selection": selection_json,
        "anomaly_count": anomalies.len(),
        "anomalies": anomalies.iter().map(|&n| graph.node_name(n)).collect::<Vec<_>>(),
    });

    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}

fn save_scores(cada: &Cada, graph: &AttributedGraph, output_dir: &str) -> Result<()> {
    log::info!("Saving score table");

    let path = Path::new(output_dir).join("scores.json");
    let mut file = File::create(path)?;

    let scores_json = json!({
        "scores": cada.scores().iter().map(|e| {
            json!({
                "node": e.node,
                "name": graph.node_name(e.node),
                "score": e.score,
                "community": cada.partition().community_of(e.node),
                "label": graph.label(e.node),
            })
        }).collect::<Vec<_>>()
    });

    file.write_all(to_string_pretty(&scores_json)?.as_bytes())?;

    Ok(())
}

/// Save dataset evaluations as `evaluation.json`
pub fn save_evaluation(evaluations: &[DatasetEvaluation], output_dir: &str) -> Result<()> {
    log::info!("Saving {} dataset evaluations to {}", evaluations.len(), output_dir);

    fs::create_dir_all(output_dir)?;

    let path = Path::new(output_dir).join("evaluation.json");
    let mut file = File::create(path)?;

    let evaluation_json = json!({ "datasets": evaluations });
    file.write_all(to_string_pretty(&evaluation_json)?.as_bytes())?;

    Ok(())
}
