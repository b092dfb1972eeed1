//! An ordered sequence of edges.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::EdgeId;

/// A path through the topology, as the edges traversed in order.
///
/// Paths produced by the traversal engine are grown one edge at a time, and
/// consecutive edges always share an endpoint. The empty path is the
/// "no path found" value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Path {
    edges: SmallVec<[EdgeId; 8]>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(edge: EdgeId) -> Self {
        let mut edges = SmallVec::new();
        edges.push(edge);
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn first(&self) -> Option<EdgeId> {
        self.edges.first().copied()
    }

    pub fn last(&self) -> Option<EdgeId> {
        self.edges.last().copied()
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        self.edges.contains(&edge)
    }

    pub fn push(&mut self, edge: EdgeId) {
        self.edges.push(edge);
    }

    /// A copy of this path extended by one edge.
    pub fn extended(&self, edge: EdgeId) -> Self {
        let mut next = self.clone();
        next.push(edge);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().copied()
    }
}

impl FromIterator<EdgeId> for Path {
    fn from_iter<I: IntoIterator<Item = EdgeId>>(iter: I) -> Self {
        Self { edges: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a EdgeId;
    type IntoIter = std::slice::Iter<'a, EdgeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}
