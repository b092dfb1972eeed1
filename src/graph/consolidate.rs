//! Parallel NVLink consolidation.
//!
//! NVLink lanes are discovered one at a time, and from both ends. After
//! discovery each connected GPU pair may carry several single-lane edges;
//! they are folded into one edge whose lane count is the sum.

use tracing::debug;

use super::Graph;
use crate::model::{EdgeData, EdgeId, EdgeKind};

impl Graph {
    /// Merge parallel Nvlink edges until none remain. Returns the number of
    /// merges performed.
    ///
    /// Every merge erases an edge, which invalidates the scan, so the scan
    /// restarts from the beginning after each one.
    ///
    /// # Panics
    /// If two parallel Nvlink edges disagree on link version; that means the
    /// discovery data is inconsistent.
    pub fn consolidate_nvlinks(&mut self) -> usize {
        let mut merged = 0;
        while let Some((keep, absorb)) = self.find_parallel_nvlinks() {
            let EdgeData::Nvlink { version, lanes } = *self[absorb].data() else {
                unreachable!("find_parallel_nvlinks() only pairs Nvlink edges");
            };
            match self.edge_mut(keep).data_mut() {
                EdgeData::Nvlink { version: kept_version, lanes: kept_lanes } => {
                    assert_eq!(
                        *kept_version, version,
                        "parallel nvlinks {keep} and {absorb} disagree on version"
                    );
                    *kept_lanes += lanes;
                    debug!(keep = %keep, absorb = %absorb, lanes = *kept_lanes, "combined nvlinks");
                }
                _ => unreachable!("find_parallel_nvlinks() only pairs Nvlink edges"),
            }
            self.erase(absorb);
            merged += 1;
        }
        merged
    }

    /// First `(i, j)`, `i != j`, of joined Nvlink edges on the same vertex pair.
    fn find_parallel_nvlinks(&self) -> Option<(EdgeId, EdgeId)> {
        let nvlinks: Vec<EdgeId> = self
            .edges()
            .filter(|&e| self[e].kind() == EdgeKind::Nvlink && self[e].is_joined())
            .collect();
        nvlinks.iter().find_map(|&i| {
            nvlinks
                .iter()
                .find(|&&j| i != j && self.same_vertices(i, j))
                .map(|&j| (i, j))
        })
    }
}
