//! Graph representation and algorithms module

pub mod compressed;
pub mod builder;
pub mod algorithms;
pub mod stats;

pub use builder::GraphBuilder;
pub use compressed::{AttributedGraph, NodeId, NodeMetadata, WEIGHT_ATTRIBUTE};
pub use stats::GraphStatistics;
