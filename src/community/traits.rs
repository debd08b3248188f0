//! Community detection traits.

use crate::error::Result;
use crate::graph::AttributedGraph;
use super::partition::Partition;

/// A community detection procedure usable as a partition oracle.
///
/// Implementations may leave nodes unassigned; callers treat absence as
/// "no community" rather than an error.
pub trait CommunityDetection: Send + Sync {
    /// Short name as accepted on the command line.
    fn name(&self) -> &'static str;

    /// Partition the graph's nodes into communities.
    fn detect(&self, graph: &AttributedGraph) -> Result<Partition>;
}
