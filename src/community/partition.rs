//! Node to community assignments

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::graph::NodeId;

/// Community identifier produced by the detectors
pub type CommunityId = usize;

/// Anything that can answer "which community is this node in?".
///
/// Absence is a legal answer: some detectors do not model every node.
pub trait CommunityLookup {
    type Community: Hash + Eq + Clone;

    fn community_of(&self, node: NodeId) -> Option<Self::Community>;
}

/// Possibly partial assignment of nodes to communities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    assignment: Vec<Option<CommunityId>>,
}

impl Partition {
    /// Partition over `node_count` nodes with nothing assigned
    pub fn empty(node_count: usize) -> Self {
        Self { assignment: vec![None; node_count] }
    }

    /// Total partition, `assignment[node]` is the community of `node`
    pub fn from_assignment(assignment: Vec<CommunityId>) -> Self {
        Self {
            assignment: assignment.into_iter().map(Some).collect(),
        }
    }

    /// Partial partition from explicit (node, community) pairs
    pub fn from_pairs<I>(node_count: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, CommunityId)>,
    {
        let mut partition = Self::empty(node_count);
        for (node, community) in pairs {
            partition.assign(node, community)?;
        }
        Ok(partition)
    }

    pub fn assign(&mut self, node: NodeId, community: CommunityId) -> Result<()> {
        let node_count = self.assignment.len();
        let slot = self.assignment.get_mut(node as usize).ok_or(Error::NodeOutOfRange {
            node: node as u64,
            node_count,
        })?;
        *slot = Some(community);
        Ok(())
    }

    /// Number of nodes the partition covers (assigned or not)
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    pub fn assigned_count(&self) -> usize {
        self.assignment.iter().filter(|c| c.is_some()).count()
    }

    /// Every node has a community
    pub fn is_total(&self) -> bool {
        self.assignment.iter().all(Option::is_some)
    }

    pub fn community_count(&self) -> usize {
        self.communities().len()
    }

    /// Members of each community, ordered by community id
    pub fn communities(&self) -> BTreeMap<CommunityId, Vec<NodeId>> {
        let mut groups: BTreeMap<CommunityId, Vec<NodeId>> = BTreeMap::new();
        for (node, community) in self.assignment.iter().enumerate() {
            if let Some(c) = community {
                groups.entry(*c).or_default().push(node as NodeId);
            }
        }
        groups
    }

    /// Apply `f` to every community id
    pub fn relabel<F>(&self, f: F) -> Self
    where
        F: Fn(CommunityId) -> CommunityId,
    {
        Self {
            assignment: self.assignment.iter().map(|c| c.map(&f)).collect(),
        }
    }

    pub fn assignment(&self) -> &[Option<CommunityId>] {
        &self.assignment
    }
}

impl CommunityLookup for Partition {
    type Community = CommunityId;

    fn community_of(&self, node: NodeId) -> Option<CommunityId> {
        self.assignment.get(node as usize).copied().flatten()
    }
}

impl<C: Hash + Eq + Clone> CommunityLookup for HashMap<NodeId, C> {
    type Community = C;

    fn community_of(&self, node: NodeId) -> Option<C> {
        self.get(&node).cloned()
    }
}

/// Renumber community ids to 0..k in order of first appearance.
///
/// Returns the renumbered assignment and k.
pub(crate) fn renumber(assignment: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let renumbered = assignment.iter()
        .map(|&c| {
            let next = mapping.len();
            *mapping.entry(c).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_partition_lookup() {
        let partition = Partition::from_pairs(4, vec![(1, 7), (3, 2)]).unwrap();

        assert_eq!(partition.community_of(0), None);
        assert_eq!(partition.community_of(1), Some(7));
        assert_eq!(partition.community_of(99), None);
        assert_eq!(partition.assigned_count(), 2);
        assert!(!partition.is_total());
        assert_eq!(partition.community_count(), 2);
    }

    #[test]
    fn test_out_of_range_assignment() {
        assert!(Partition::from_pairs(2, vec![(2, 0)]).is_err());
    }

    #[test]
    fn test_communities_grouped() {
        let partition = Partition::from_assignment(vec![1, 0, 1, 2]);
        let groups = partition.communities();

        assert!(partition.is_total());
        assert_eq!(groups[&0], vec![1]);
        assert_eq!(groups[&1], vec![0, 2]);
        assert_eq!(groups[&2], vec![3]);
    }

    #[test]
    fn test_renumber_first_appearance() {
        let (renumbered, k) = renumber(&[5, 5, 2, 9, 2]);
        assert_eq!(renumbered, vec![0, 0, 1, 2, 1]);
        assert_eq!(k, 3);
    }
}
