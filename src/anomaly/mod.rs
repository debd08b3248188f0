//! Community-aware anomaly detection.
//!
//! A node whose neighbours all sit in one community is ordinary; a node whose
//! neighbours are spread over many communities bridges them and is flagged as
//! anomalous. [`AnomalyScores`] holds the per-node scores, [`Cada`] couples a
//! community detector with the scorer.

pub mod scorer;

use std::time::Instant;
use crate::community::{Algorithm, CommunityDetection, Partition};
use crate::config::DetectionConfig;
use crate::error::Result;
use crate::graph::AttributedGraph;

pub use scorer::{node_score, AnomalyScore, AnomalyScores};

/// Score every node of `graph` against `partition`
pub fn score(graph: &AttributedGraph, partition: &Partition) -> AnomalyScores {
    AnomalyScores::compute(graph, partition)
}

/// Result of detecting communities and scoring a graph against them
#[derive(Debug, Clone)]
pub struct Cada {
    algorithm: &'static str,
    partition: Partition,
    scores: AnomalyScores,
}

impl Cada {
    /// Detect communities with the configured algorithm and score the graph
    pub fn run(graph: &AttributedGraph, config: &DetectionConfig) -> Result<Self> {
        Self::run_seeded(graph, config, 0)
    }

    /// Same as [`Cada::run`] with the detector seed shifted by `run`
    pub fn run_seeded(graph: &AttributedGraph, config: &DetectionConfig, run: usize) -> Result<Self> {
        config.validate()?;
        let detector = config.algorithm.detector(&config.params(run));
        Self::with_detector(graph, detector.as_ref())
    }

    /// Score the graph against communities found by `detector`
    pub fn with_detector(graph: &AttributedGraph, detector: &dyn CommunityDetection) -> Result<Self> {
        let started = Instant::now();
        let partition = detector.detect(graph)?;
        log::info!(
            "{} found {} communities covering {} of {} nodes in {:.2?}",
            detector.name(),
            partition.community_count(),
            partition.assigned_count(),
            graph.node_count,
            started.elapsed()
        );
        if !partition.is_total() {
            log::debug!("{} nodes have no community", partition.len() - partition.assigned_count());
        }

        let scores = AnomalyScores::compute(graph, &partition);
        log::info!("Scored {} of {} nodes", scores.len(), graph.node_count);

        Ok(Self {
            algorithm: detector.name(),
            partition,
            scores,
        })
    }

    /// Name of the detector that produced the partition
    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    /// Parsed algorithm, when the detector is one of the built-in ones
    pub fn algorithm_kind(&self) -> Option<Algorithm> {
        self.algorithm.parse().ok()
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn scores(&self) -> &AnomalyScores {
        &self.scores
    }

    pub fn into_scores(self) -> AnomalyScores {
        self.scores
    }
}
