//! # Topology Model
//!
//! Plain data types for the topology graph: addresses, devices, links and
//! paths. These types cross every boundary: discovery ↔ graph ↔ export.
//!
//! Design rule: no graph state here. Vertices and edges only carry the
//! handles the graph store hands out; every mutation of endpoints or
//! incident sets goes through `Graph`.

pub mod address;
pub mod vertex;
pub mod edge;
pub mod path;

pub use address::PciAddress;
pub use vertex::{
    CpuArch, CpuPackage, Gpu, PciBridge, PciDevice,
    Vertex, VertexData, VertexId, VertexKind,
};
pub use edge::{
    Edge, EdgeData, EdgeId, EdgeKind,
    nvlink_lane_bandwidth, QPI_GT, XBUS_GIB,
};
pub use path::Path;
