//! Community detection for anomaly scoring.
//!
//! The anomaly scorer only needs a node -> community lookup. Four
//! interchangeable detectors produce one, selected by [`Algorithm`]:
//!
//! - **Louvain**: greedy multi-level modularity maximisation with a
//!   resolution parameter.
//! - **Infomap**: two-level map-equation optimisation over the link list.
//!   Nodes without links are left unassigned.
//! - **Label propagation**: asynchronous majority voting until every node
//!   agrees with its neighbourhood.
//! - **Leiden**: Louvain-style moving plus refinement that keeps every
//!   community connected, run on a `petgraph` conversion of the graph.
//!
//! ## Resolution
//!
//! Modularity compares internal edge weight with the expectation of a random
//! graph with the same degrees, scaled by γ. Values above 1 split the graph
//! into more, smaller communities; values below 1 merge them.
//!
//! ## References
//!
//! - Blondel et al. (2008). "Fast unfolding of communities in large networks."
//! - Rosvall & Bergstrom (2008). "Maps of random walks on complex networks
//!   reveal community structure."
//! - Raghavan, Albert & Kumara (2007). "Near linear time algorithm to detect
//!   community structures in large-scale networks."
//! - Traag, Waltman, van Eck (2019). "From Louvain to Leiden: guaranteeing
//!   well-connected communities."

mod infomap;
mod label_prop;
mod leiden;
mod louvain;
mod partition;
mod traits;

use std::fmt;
use std::str::FromStr;
use itertools::Itertools;
use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};

pub use infomap::Infomap;
pub use label_prop::LabelPropagation;
pub use leiden::Leiden;
pub use louvain::Louvain;
pub use partition::{CommunityId, CommunityLookup, Partition};
pub use traits::CommunityDetection;

/// Community detection algorithm selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Algorithm {
    Louvain,
    Infomap,
    LabelPropagation,
    Leiden,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Louvain,
        Algorithm::Infomap,
        Algorithm::LabelPropagation,
        Algorithm::Leiden,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Louvain => "louvain",
            Algorithm::Infomap => "infomap",
            Algorithm::LabelPropagation => "label_propagation",
            Algorithm::Leiden => "leiden",
        }
    }

    /// Instantiate the detector for this algorithm
    pub fn detector(&self, params: &DetectionParams) -> Box<dyn CommunityDetection> {
        let weight = params.weight_attribute.clone();
        match self {
            Algorithm::Louvain => Box::new(
                Louvain::new()
                    .with_resolution(params.resolution)
                    .with_weight_attribute(weight)
                    .with_max_iter(params.max_iter),
            ),
            Algorithm::Infomap => Box::new(
                Infomap::new()
                    .with_seed(params.seed)
                    .with_trials(params.trials)
                    .with_max_iter(params.max_iter)
                    .with_weight_attribute(weight),
            ),
            Algorithm::LabelPropagation => Box::new(
                LabelPropagation::new()
                    .with_seed(params.seed)
                    .with_max_iter(params.max_iter)
                    .with_weight_attribute(weight),
            ),
            Algorithm::Leiden => Box::new(
                Leiden::new()
                    .with_resolution(params.resolution)
                    .with_weight_attribute(weight)
                    .with_max_iter(params.max_iter),
            ),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| Error::UnknownAlgorithm {
                name: name.to_string(),
                valid: Algorithm::ALL.iter().map(|a| a.as_str()).join(", "),
            })
    }
}

impl TryFrom<String> for Algorithm {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Tuning shared by the detectors; each uses the fields that apply to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Modularity resolution for Louvain and Leiden
    pub resolution: f64,

    /// Edge attribute used as weight
    pub weight_attribute: Option<String>,

    /// Seed for randomised detectors
    pub seed: u64,

    /// Iteration cap per phase
    pub max_iter: usize,

    /// Infomap optimisation attempts
    pub trials: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            weight_attribute: None,
            seed: 42,
            max_iter: 100,
            trials: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.as_str().parse::<Algorithm>().unwrap(), algorithm);
            assert_eq!(algorithm.detector(&DetectionParams::default()).name(), algorithm.as_str());
        }
        assert_eq!("Label-Propagation".parse::<Algorithm>().unwrap(), Algorithm::LabelPropagation);
    }

    #[test]
    fn test_unknown_algorithm_lists_valid_names() {
        let err = "walktrap".parse::<Algorithm>().unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, Error::UnknownAlgorithm { .. }));
        assert!(message.contains("walktrap"));
        assert!(message.contains("louvain, infomap, label_propagation, leiden"));
    }

    #[test]
    fn test_algorithm_deserializes_through_parser() {
        let algorithm: Algorithm = serde_json::from_str("\"leiden\"").unwrap();
        assert_eq!(algorithm, Algorithm::Leiden);
        assert!(serde_json::from_str::<Algorithm>("\"kmeans\"").is_err());
        assert_eq!(serde_json::to_string(&Algorithm::LabelPropagation).unwrap(), "\"label_propagation\"");
    }
}
