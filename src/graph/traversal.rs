//! Path enumeration and nearest-match search.
//!
//! Both searches grow paths edge by edge from a worklist and share one
//! visited-edge set across the *whole call*, not per candidate path. Once an
//! edge has been queued on behalf of any path, no later path may use it. For
//! `paths` this means the result is not the set of all simple paths: two
//! genuinely distinct routes that share an edge can only both appear if the
//! shared edge is a common prefix. Consumers (cost-based selection, the
//! report) operate on exactly this set.

use std::collections::VecDeque;

use hashbrown::HashSet;

use super::Graph;
use crate::model::{EdgeId, Path, Vertex, VertexId};

impl Graph {
    /// Paths from `src` to `dst`, as found by one depth-first sweep.
    ///
    /// Each edge incident to `src` seeds a single-edge path. A popped path
    /// whose last edge touches `dst` is emitted; otherwise it is extended by
    /// every not-yet-visited edge incident to either endpoint of its last
    /// edge. `src == dst` gets no special treatment.
    ///
    /// Returns an empty vector for an empty graph, an unknown or edgeless
    /// `src`, or when `dst` is unreachable.
    pub fn paths(&self, src: VertexId, dst: VertexId) -> Vec<Path> {
        let mut found = Vec::new();

        if self.vertices.is_empty() {
            debug_assert!(self.edges.is_empty() || self.edges.iter().all(|&e| !self[e].is_joined()));
            return found;
        }
        let Some(source) = self.vertex(src) else {
            return found;
        };

        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut worklist: VecDeque<Path> = VecDeque::new();

        for &e in source.incident() {
            worklist.push_front(Path::single(e));
            visited.insert(e);
        }

        while let Some(next) = worklist.pop_back() {
            let (u, v) = self.last_endpoints(&next);
            if u == dst || v == dst {
                found.push(next);
                continue;
            }
            for end in [u, v] {
                for &e in self[end].incident() {
                    if visited.insert(e) {
                        worklist.push_back(next.extended(e));
                    }
                }
            }
        }

        found
    }

    /// The nearest vertex (in breadth-first order from `src`) satisfying
    /// `pred`, with the path reaching it.
    ///
    /// For each popped path the last edge's `u` endpoint is tested before
    /// `v`; the first hit wins. `None` when the worklist runs dry.
    pub fn shortest_path<P>(&self, src: VertexId, pred: P) -> Option<(Path, VertexId)>
    where
        P: Fn(VertexId, &Vertex) -> bool,
    {
        let source = self.vertex(src)?;

        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut worklist: VecDeque<Path> = VecDeque::new();

        for &e in source.incident() {
            worklist.push_front(Path::single(e));
            visited.insert(e);
        }

        while let Some(next) = worklist.pop_back() {
            let (u, v) = self.last_endpoints(&next);
            if pred(u, &self[u]) {
                return Some((next, u));
            }
            if pred(v, &self[v]) {
                return Some((next, v));
            }
            for end in [u, v] {
                for &e in self[end].incident() {
                    if visited.insert(e) {
                        worklist.push_front(next.extended(e));
                    }
                }
            }
        }

        None
    }

    /// Endpoints of a worklist path's last edge. Worklist paths are never
    /// empty and only hold edges reached through incident sets, which are
    /// always joined.
    fn last_endpoints(&self, path: &Path) -> (VertexId, VertexId) {
        let last = path.last().expect("worklist paths are non-empty");
        self[last]
            .endpoints()
            .expect("incident edges are always joined")
    }
}
