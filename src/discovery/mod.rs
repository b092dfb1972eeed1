//! Populating a graph from hardware descriptions.
//!
//! Discovery is the only phase that mutates a graph. Each source adds the
//! vertices and edges it knows about, using PCI addresses to find what
//! earlier sources already created.
//!
//! | Step | Function | Adds |
//! |------|----------|------|
//! | 1 | [`add_packages`] | CPU packages and the QPI/Xbus mesh between them |
//! | 2 | [`add_pci`] | Host bridges, PCI bridges and devices |
//! | 3 | [`add_gpus`] | Replaces PCI devices with GPUs |
//! | 4 | [`add_nvlinks`] | NVLink edges, then consolidates parallel lanes |
//!
//! Steps 1-2 belong to the host source, 3-4 to the GPU source. The GPU
//! source relies on the PCI devices the host source created, so sources run
//! in the order given to [`make_graph`].

pub mod gpu;
pub mod inventory;
pub mod packages;
pub mod pci;

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::Graph;
use crate::model::{QPI_GT, XBUS_GIB};
use crate::Result;

pub use gpu::{add_gpus, add_nvlinks, max_nvlinks, GpuInfo, NvLinkInfo};
pub use inventory::{GpuInventory, HostInventory, Inventory};
pub use packages::add_packages;
pub use pci::{add_pci, BusRange, PciObject};

// ============================================================================
// Methods
// ============================================================================

/// Set of discovery methods to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DiscoveryMethod(u8);

impl DiscoveryMethod {
    pub const NONE: Self = Self(0);
    /// CPU packages and the PCI tree.
    pub const HOST: Self = Self(1);
    /// GPUs and NVLinks.
    pub const GPU: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::HOST.0 | Self::GPU.0);

    /// True if every method in `other` is enabled. `NONE` is contained in
    /// nothing, so a source reporting `NONE` never runs.
    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DiscoveryMethod {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DiscoveryMethod {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Interconnect constants
// ============================================================================

/// Link parameters for the CPU package mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterconnectConfig {
    /// QPI links between each pair of x86 packages.
    pub qpi_links: i64,
    /// Per-link QPI transfer rate, in transfers per second.
    pub qpi_speed: i64,
    /// Xbus bandwidth between each pair of POWER packages, in bytes/s.
    pub xbus_bandwidth: i64,
}

impl Default for InterconnectConfig {
    fn default() -> Self {
        Self {
            qpi_links: 2,
            qpi_speed: 8 * QPI_GT,
            xbus_bandwidth: 64 * XBUS_GIB,
        }
    }
}

// ============================================================================
// Sources
// ============================================================================

/// A source of topology information.
pub trait Discovery {
    /// The method this source implements.
    fn method(&self) -> DiscoveryMethod;

    /// Add what this source knows to `graph`.
    fn discover(&mut self, graph: &mut Graph) -> Result<()>;
}

/// Build a graph by running every source whose method is enabled, in order.
///
/// Stops at the first failing source; the partially built graph is dropped.
pub fn make_graph(sources: &mut [&mut dyn Discovery], methods: DiscoveryMethod) -> Result<Graph> {
    let mut graph = Graph::new();
    for source in sources.iter_mut() {
        let method = source.method();
        if !methods.contains(method) {
            debug!(?method, "discovery method disabled, skipping source");
            continue;
        }
        source.discover(&mut graph)?;
    }
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "topology discovered"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vertex;

    struct Fixed {
        method: DiscoveryMethod,
        name: &'static str,
    }

    impl Discovery for Fixed {
        fn method(&self) -> DiscoveryMethod {
            self.method
        }

        fn discover(&mut self, graph: &mut Graph) -> Result<()> {
            graph.add_vertex(Vertex::unknown(self.name));
            Ok(())
        }
    }

    struct Failing;

    impl Discovery for Failing {
        fn method(&self) -> DiscoveryMethod {
            DiscoveryMethod::GPU
        }

        fn discover(&mut self, _graph: &mut Graph) -> Result<()> {
            Err(crate::Error::NotFound("gpu driver".into()))
        }
    }

    #[test]
    fn test_method_flags() {
        let both = DiscoveryMethod::HOST | DiscoveryMethod::GPU;
        assert_eq!(both, DiscoveryMethod::ALL);
        assert!(both.contains(DiscoveryMethod::HOST));
        assert!(!DiscoveryMethod::HOST.contains(DiscoveryMethod::GPU));
        assert!(!both.contains(DiscoveryMethod::NONE));
        assert!(DiscoveryMethod::NONE.is_empty());

        let mut m = DiscoveryMethod::NONE;
        m |= DiscoveryMethod::GPU;
        assert!(m.contains(DiscoveryMethod::GPU));
    }

    #[test]
    fn test_default_interconnect() {
        let config = InterconnectConfig::default();
        assert_eq!(config.qpi_links, 2);
        assert_eq!(config.qpi_speed, 8_000_000_000);
        assert_eq!(config.xbus_bandwidth, 64 << 30);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: InterconnectConfig = serde_json::from_str(r#"{"qpi_links": 3}"#).unwrap();
        assert_eq!(config.qpi_links, 3);
        assert_eq!(config.xbus_bandwidth, 64 << 30);
    }

    #[test]
    fn test_make_graph_runs_enabled_sources() {
        let mut host = Fixed { method: DiscoveryMethod::HOST, name: "host" };
        let mut gpu = Fixed { method: DiscoveryMethod::GPU, name: "gpu" };
        let mut sources: [&mut dyn Discovery; 2] = [&mut host, &mut gpu];

        let g = make_graph(&mut sources, DiscoveryMethod::HOST).unwrap();
        assert_eq!(g.vertex_count(), 1);

        let g = make_graph(&mut sources, DiscoveryMethod::ALL).unwrap();
        assert_eq!(g.vertex_count(), 2);

        let g = make_graph(&mut sources, DiscoveryMethod::NONE).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn test_make_graph_propagates_failure() {
        let mut host = Fixed { method: DiscoveryMethod::HOST, name: "host" };
        let mut failing = Failing;
        let mut sources: [&mut dyn Discovery; 2] = [&mut host, &mut failing];
        let err = make_graph(&mut sources, DiscoveryMethod::ALL).unwrap_err();
        assert!(matches!(err, crate::Error::NotFound(_)));
    }
}
