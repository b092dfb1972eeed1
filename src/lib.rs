//! # hwgraph: Machine Topology Graph
//!
//! An in-memory graph of a machine's compute and interconnect topology:
//! CPU packages, PCI bridges and devices, GPUs, NVLink bridges and switches
//! as vertices; PCI, NVLink, QPI and Xbus links as edges.
//!
//! ## Design Principles
//!
//! 1. **Handles, not pointers**: vertices and edges live in generational
//!    arenas owned by `Graph` and refer to each other by `VertexId`/`EdgeId`
//! 2. **Closed kinds**: device and link kinds are enums, matched exhaustively
//! 3. **Two phases**: discovery mutates (`&mut Graph`), queries read (`&Graph`)
//! 4. **Bugs panic, absence doesn't**: precondition violations panic; failed
//!    lookups return `None` or empty collections
//!
//! ## Quick Start
//!
//! ```rust
//! use hwgraph::{Edge, Graph, Vertex};
//!
//! let mut graph = Graph::new();
//! let cpu = graph.add_vertex(Vertex::unknown("cpu"));
//! let gpu = graph.add_vertex(Vertex::unknown("gpu"));
//! graph.connect(cpu, gpu, Edge::new_pci(15.75));
//!
//! let path = graph.widest_path(cpu, gpu);
//! assert_eq!(graph.path_bandwidth(&path), 15.75);
//! ```
//!
//! ## Discovery Sources
//!
//! | Source | Method | Description |
//! |--------|--------|-------------|
//! | `HostInventory` | `HOST` | CPU packages and the PCI tree |
//! | `GpuInventory` | `GPU` | GPUs and their NVLinks |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod graph;
pub mod export;
pub mod discovery;
pub mod report;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    CpuArch, CpuPackage, Edge, EdgeData, EdgeId, EdgeKind, Gpu, Path,
    PciAddress, PciBridge, PciDevice, Vertex, VertexData, VertexId, VertexKind,
};

// ============================================================================
// Re-exports: Graph
// ============================================================================

pub use graph::{Graph, NO_PATH_BANDWIDTH};

// ============================================================================
// Re-exports: Discovery and reporting
// ============================================================================

pub use discovery::{
    Discovery, DiscoveryMethod, GpuInventory, HostInventory,
    InterconnectConfig, Inventory, make_graph,
};
pub use report::{OutputFormat, ReportOptions, write_report};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid PCI address: {0}")]
    InvalidAddress(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected vertex: {0}")]
    UnexpectedVertex(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
