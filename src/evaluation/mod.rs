//! Evaluation of anomaly scores against labelled benchmark datasets

pub mod metrics;

use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use statrs::statistics::Statistics;
use crate::anomaly::Cada;
use crate::config::{DatasetConfig, DetectionConfig, EvaluationConfig};
use crate::error::{Error, Result};
use crate::graph::{AttributedGraph, GraphStatistics, NodeId};

pub use metrics::{ClassificationMetrics, ConfusionCounts, DetectionOverlap};

/// Outcome of one detection + scoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run: usize,
    pub communities: usize,
    pub scored_nodes: usize,
    pub anomalies: Vec<NodeId>,
    pub counts: ConfusionCounts,
    pub metrics: ClassificationMetrics,
    pub overlap: DetectionOverlap,
}

/// Mean and sample standard deviation over runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
}

impl MetricSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let std_dev = if values.len() > 1 { values.iter().std_dev() } else { 0.0 };
        Self {
            mean: values.iter().mean(),
            std_dev,
        }
    }
}

/// Evaluation of one dataset over all runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEvaluation {
    pub dataset: String,
    pub algorithm: String,
    pub threshold: f64,
    pub statistics: GraphStatistics,
    pub runs: Vec<RunResult>,
    pub precision: MetricSummary,
    pub recall: MetricSummary,
    pub f1: MetricSummary,
    pub macro_f1: MetricSummary,
    pub weighted_f1: MetricSummary,
}

impl DatasetEvaluation {
    fn summarize<F>(runs: &[RunResult], metric: F) -> MetricSummary
    where
        F: Fn(&ClassificationMetrics) -> f64,
    {
        let values: Vec<f64> = runs.iter().map(|r| metric(&r.metrics)).collect();
        MetricSummary::from_values(&values)
    }

    /// Write the outcome to the log
    pub fn log_summary(&self) {
        if let Some(first) = self.runs.first() {
            let o = &first.overlap;
            log::info!("Number of anomalous labeled nodes in {}: {}", self.dataset, o.labelled_anomalies);
            log::info!("Yes count: {} ({:.2}%)", o.yes_count, o.yes_percentage);
            log::info!("No count: {} ({:.2}%)", o.no_count, o.no_percentage);
            log::debug!("Anomalies detected: {:?}", first.anomalies);
        }
        log::info!(
            "{} over {} runs: precision {:.4} ± {:.4}, recall {:.4} ± {:.4}, F1 {:.4} ± {:.4}",
            self.dataset,
            self.runs.len(),
            self.precision.mean, self.precision.std_dev,
            self.recall.mean, self.recall.std_dev,
            self.f1.mean, self.f1.std_dev,
        );
        log::info!(
            "{} macro F1 {:.4}, weighted F1 {:.4}",
            self.dataset, self.macro_f1.mean, self.weighted_f1.mean
        );
    }
}

/// Detect, score and compare with the labels once
pub fn evaluate_run(
    graph: &AttributedGraph,
    threshold: f64,
    detection: &DetectionConfig,
    run: usize,
) -> Result<RunResult> {
    let cada = Cada::run_seeded(graph, detection, run)?;
    let anomalies = cada.scores().anomalies_above(threshold);
    let counts = ConfusionCounts::from_predictions(graph, &anomalies);

    Ok(RunResult {
        run,
        communities: cada.partition().community_count(),
        scored_nodes: cada.scores().len(),
        metrics: ClassificationMetrics::from_counts(&counts),
        overlap: DetectionOverlap::new(graph, &anomalies),
        counts,
        anomalies,
    })
}

/// Evaluate a loaded dataset over `runs` independent runs.
///
/// Runs execute in parallel; results keep run order.
pub fn evaluate_dataset(
    graph: &AttributedGraph,
    dataset: &DatasetConfig,
    detection: &DetectionConfig,
    runs: usize,
) -> Result<DatasetEvaluation> {
    if !graph.has_labels() {
        return Err(Error::InvalidParameter {
            name: "labels",
            message: format!("dataset {} has no ground-truth labels", dataset.name),
        });
    }
    detection.validate()?;

    log::info!("Evaluating {} dataset...", dataset.name);
    let statistics = GraphStatistics::compute(graph);
    statistics.log_summary(&dataset.name);

    let results: Vec<RunResult> = (0..runs.max(1))
        .into_par_iter()
        .map(|run| evaluate_run(graph, dataset.threshold, detection, run))
        .collect::<Result<Vec<_>>>()?;

    let evaluation = DatasetEvaluation {
        dataset: dataset.name.clone(),
        algorithm: detection.algorithm.to_string(),
        threshold: dataset.threshold,
        statistics,
        precision: DatasetEvaluation::summarize(&results, |m| m.precision),
        recall: DatasetEvaluation::summarize(&results, |m| m.recall),
        f1: DatasetEvaluation::summarize(&results, |m| m.f1),
        macro_f1: DatasetEvaluation::summarize(&results, |m| m.macro_f1),
        weighted_f1: DatasetEvaluation::summarize(&results, |m| m.weighted_f1),
        runs: results,
    };
    evaluation.log_summary();

    Ok(evaluation)
}

/// Evaluate every configured dataset, loading each with `load`
pub fn evaluate_all<F>(config: &EvaluationConfig, mut load: F) -> Result<Vec<DatasetEvaluation>>
where
    F: FnMut(&DatasetConfig) -> Result<AttributedGraph>,
{
    config.validate()?;

    let mut evaluations = Vec::with_capacity(config.datasets.len());
    for dataset in &config.datasets {
        let graph = load(dataset)?;
        evaluations.push(evaluate_dataset(&graph, dataset, &config.detection, config.runs)?);
    }

    Ok(evaluations)
}
