//! PCI tree ingestion.
//!
//! The host enumerator reports the PCI hierarchy as a flat list in tree
//! pre-order, so every bridge appears before the devices behind it. A bridge
//! is identified downstream by its (domain, secondary bus), which is how
//! children find their parent.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::graph::Graph;
use crate::model::{Edge, PciAddress, PciDevice, Vertex, VertexData, VertexId};
use crate::{Error, Result};

/// The bus range a bridge exposes downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusRange {
    pub domain: u16,
    pub secondary_bus: u8,
    pub subordinate_bus: u8,
}

/// One node of the PCI tree.
///
/// ```json
/// { "type": "host_bridge", "address": "0000:00:00.0", "package": 0,
///   "downstream": { "domain": 0, "secondary_bus": 0, "subordinate_bus": 7 },
///   "link_speed": 15.75 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PciObject {
    /// Host-to-PCI bridge, attached to the CPU package given by index.
    HostBridge {
        #[serde(default)]
        name: Option<String>,
        address: PciAddress,
        downstream: BusRange,
        link_speed: f32,
        #[serde(default)]
        package: Option<u32>,
    },
    /// PCI-to-PCI bridge.
    Bridge {
        #[serde(default)]
        name: Option<String>,
        address: PciAddress,
        downstream: BusRange,
        link_speed: f32,
    },
    /// Endpoint device.
    Device {
        #[serde(default)]
        name: Option<String>,
        pci: PciDevice,
    },
}

impl PciObject {
    pub fn address(&self) -> PciAddress {
        match self {
            PciObject::HostBridge { address, .. } | PciObject::Bridge { address, .. } => *address,
            PciObject::Device { pci, .. } => pci.address,
        }
    }
}

/// True if a vertex for `object` is already in the graph. The enumerator
/// may enter the same subtree more than once.
fn already_added(graph: &Graph, object: &PciObject) -> bool {
    let address = object.address();
    graph.vertices().any(|id| match (object, graph[id].data()) {
        (PciObject::Device { .. }, _) => {
            graph[id].pci_device().is_some_and(|pci| pci.address == address)
        }
        (_, VertexData::PciBridge(bridge)) => bridge.address == address,
        _ => false,
    })
}

fn parent_bridge(graph: &Graph, address: &PciAddress) -> Result<VertexId> {
    graph
        .bridge_for_address(address)
        .ok_or_else(|| Error::NotFound(format!("no bridge owns bus of {address}")))
}

/// Add the PCI tree. Each node is joined to its parent with a PCI edge at
/// the node's link speed.
pub fn add_pci(graph: &mut Graph, objects: &[PciObject]) -> Result<()> {
    let mut added = 0;
    for object in objects {
        if already_added(graph, object) {
            debug!(address = %object.address(), "pci object seen before, skipping");
            continue;
        }

        match object {
            PciObject::HostBridge { name, address, downstream, link_speed, package } => {
                let upstream = match package {
                    Some(index) => Some(graph.package(*index).ok_or_else(|| {
                        Error::NotFound(format!("package {index} for host bridge {address}"))
                    })?),
                    None => None,
                };
                let hub = graph.add_vertex(Vertex::new_bridge(
                    name.as_deref(),
                    *address,
                    downstream.domain,
                    downstream.secondary_bus,
                    downstream.subordinate_bus,
                ));
                match upstream {
                    Some(pkg) => {
                        graph.connect(pkg, hub, Edge::new_pci(*link_speed));
                    }
                    None => warn!(%address, "host bridge has no package, left unattached"),
                }
                debug!(%address, "added host bridge");
            }
            PciObject::Bridge { name, address, downstream, link_speed } => {
                let parent = parent_bridge(graph, address)?;
                let bridge = graph.add_vertex(Vertex::new_bridge(
                    name.as_deref(),
                    *address,
                    downstream.domain,
                    downstream.secondary_bus,
                    downstream.subordinate_bus,
                ));
                graph.connect(parent, bridge, Edge::new_pci(*link_speed));
                debug!(%address, parent = %parent, "added pci bridge");
            }
            PciObject::Device { name, pci } => {
                let parent = parent_bridge(graph, &pci.address)?;
                let device = graph.add_vertex(Vertex::new(
                    name.as_deref().unwrap_or("anonymous pcidev"),
                    VertexData::PciDevice(*pci),
                ));
                graph.connect(parent, device, Edge::new_pci(pci.link_speed));
                debug!(address = %pci.address, parent = %parent, "added pci device");
            }
        }
        added += 1;
    }

    info!(objects = added, "added pci tree");
    Ok(())
}
