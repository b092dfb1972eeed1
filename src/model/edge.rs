//! Edge (interconnect link) in the topology graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::VertexId;

/// One QPI gigatransfer per second.
pub const QPI_GT: i64 = 1_000_000_000;
/// One gibibyte.
pub const XBUS_GIB: i64 = 1 << 30;

/// Stable edge handle: arena slot index plus the slot's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl EdgeId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

/// Exactly one variant per link kind.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeData {
    #[default]
    Unknown,
    Qpi { links: i64, speed: i64 },
    Xbus { bandwidth: i64 },
    Pci { link_speed: f32, lanes: i64 },
    Nvlink { version: u32, lanes: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Unknown,
    Qpi,
    Xbus,
    Pci,
    Nvlink,
}

impl EdgeData {
    pub fn kind(&self) -> EdgeKind {
        match self {
            EdgeData::Unknown => EdgeKind::Unknown,
            EdgeData::Qpi { .. } => EdgeKind::Qpi,
            EdgeData::Xbus { .. } => EdgeKind::Xbus,
            EdgeData::Pci { .. } => EdgeKind::Pci,
            EdgeData::Nvlink { .. } => EdgeKind::Nvlink,
        }
    }
}

/// Per-lane NVLink rate, in the same unit as PCI link speed.
pub fn nvlink_lane_bandwidth(version: u32) -> f64 {
    match version {
        0 | 1 => 20.0,
        _ => 25.0,
    }
}

// ============================================================================
// Edge
// ============================================================================

/// A link between two devices.
///
/// Endpoints are unset at creation and assigned exactly once by
/// `Graph::join`; afterwards only the graph's replace operations move them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edge {
    data: EdgeData,
    pub(crate) endpoints: Option<(VertexId, VertexId)>,
    rank: Option<String>,
}

impl Edge {
    pub fn new(data: EdgeData) -> Self {
        Self { data, endpoints: None, rank: None }
    }

    pub fn unknown() -> Self {
        Self::new(EdgeData::Unknown)
    }

    pub fn new_pci(link_speed: f32) -> Self {
        Self::new(EdgeData::Pci { link_speed, lanes: 0 })
    }

    pub fn new_nvlink(version: u32, lanes: i64) -> Self {
        Self::new(EdgeData::Nvlink { version, lanes })
    }

    pub fn new_xbus(bandwidth: i64) -> Self {
        Self::new(EdgeData::Xbus { bandwidth })
    }

    pub fn new_qpi(links: i64, speed: i64) -> Self {
        Self::new(EdgeData::Qpi { links, speed })
    }

    /// Attach a DOT rank group, emitted after the edge line when rendering.
    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = Some(rank.into());
        self
    }

    pub fn data(&self) -> &EdgeData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut EdgeData {
        &mut self.data
    }

    pub fn kind(&self) -> EdgeKind {
        self.data.kind()
    }

    pub fn rank(&self) -> Option<&str> {
        self.rank.as_deref()
    }

    /// `(u, v)` once joined.
    pub fn endpoints(&self) -> Option<(VertexId, VertexId)> {
        self.endpoints
    }

    pub fn is_joined(&self) -> bool {
        self.endpoints.is_some()
    }

    pub fn has_vertex(&self, v: VertexId) -> bool {
        matches!(self.endpoints, Some((a, b)) if a == v || b == v)
    }

    /// The endpoint that is not `v`.
    ///
    /// # Panics
    /// On a self-edge, an unjoined edge, or if `v` is not an endpoint.
    pub fn other_vertex(&self, v: VertexId) -> VertexId {
        match self.endpoints {
            Some((a, b)) if a == v && b == v => panic!("other_vertex() on self-edge"),
            Some((a, b)) if a == v => b,
            Some((a, b)) if b == v => a,
            Some(_) => panic!("vertex {v} is not in edge"),
            None => panic!("other_vertex() on unjoined edge"),
        }
    }

    /// True if both edges connect the same unordered vertex pair.
    ///
    /// # Panics
    /// If either edge is unjoined.
    pub fn same_vertices(&self, other: &Edge) -> bool {
        let (u, v) = self.endpoints.expect("same_vertices() on unjoined edge");
        let (ou, ov) = other.endpoints.expect("same_vertices() on unjoined edge");
        (u == ou && v == ov) || (u == ov && v == ou)
    }

    /// Bandwidth, or `None` for links whose capacity is not known.
    pub fn try_bandwidth(&self) -> Option<f64> {
        match self.data {
            EdgeData::Qpi { links, speed } => Some(links as f64 * speed as f64),
            EdgeData::Xbus { bandwidth } => Some(bandwidth as f64),
            EdgeData::Pci { link_speed, .. } => Some(f64::from(link_speed)),
            EdgeData::Nvlink { version, lanes } => {
                Some(lanes as f64 * nvlink_lane_bandwidth(version))
            }
            EdgeData::Unknown => None,
        }
    }

    /// # Panics
    /// On an `Unknown` edge.
    pub fn bandwidth(&self) -> f64 {
        self.try_bandwidth()
            .unwrap_or_else(|| panic!("bandwidth() called on unknown edge"))
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data {
            EdgeData::Unknown => write!(f, "{{type: unknown}}"),
            EdgeData::Qpi { links, speed } => {
                write!(f, "{{type: qpi, links: {links}, speed: {speed}}}")
            }
            EdgeData::Xbus { bandwidth } => write!(f, "{{type: xbus, bandwidth: {bandwidth}}}"),
            EdgeData::Pci { link_speed, .. } => {
                write!(f, "{{type: pci, linkSpeed: {link_speed:.6}}}")
            }
            EdgeData::Nvlink { version, lanes } => {
                write!(f, "{{type: nvlink, lanes: {lanes},version: {version}}}")
            }
        }
    }
}
