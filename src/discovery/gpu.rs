//! GPUs and NVLinks.
//!
//! GPUs are first seen by the host enumerator as plain PCI devices. The GPU
//! enumerator finds each one again by address and upgrades it in place, so
//! the PCI edges discovered earlier stay attached. NVLinks are then reported
//! lane by lane from every GPU, which means a GPU-GPU lane is reported from
//! both ends.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::graph::Graph;
use crate::model::{Edge, PciAddress, Vertex, VertexData, VertexId};
use crate::{Error, Result};

/// A GPU as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub address: PciAddress,
    pub cc_major: i32,
    pub cc_minor: i32,
}

/// One NVLink lane, seen from the local GPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvLinkInfo {
    /// Address of the GPU reporting the link.
    pub address: PciAddress,
    /// Link index on the local GPU.
    pub link: u32,
    /// Address of whatever is on the other end.
    pub remote: PciAddress,
    pub version: u32,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Number of NVLink ports a GPU of the given compute capability has.
pub fn max_nvlinks(cc_major: i32) -> u32 {
    match cc_major {
        ..6 => 0,
        6 => 4,
        _ => 6,
    }
}

fn pci_vertex(graph: &Graph, address: PciAddress) -> Result<VertexId> {
    graph
        .find_pci(&address.with_function_zero())
        .ok_or_else(|| Error::NotFound(format!("no pci device at {address}")))
}

/// Replace the PCI device at each GPU's address with a GPU vertex.
///
/// Returns the GPU vertices in input order.
pub fn add_gpus(graph: &mut Graph, gpus: &[GpuInfo]) -> Result<Vec<VertexId>> {
    let mut ids = Vec::with_capacity(gpus.len());
    for info in gpus {
        let local = pci_vertex(graph, info.address)?;
        let Some(&pci) = graph[local].pci_device() else {
            return Err(Error::UnexpectedVertex(format!(
                "{} at {} is not a pci device",
                graph[local].name(),
                info.address
            )));
        };
        let name = info.name.clone().unwrap_or_else(|| graph[local].name().to_string());
        let gpu = graph.create_vertex(Vertex::new_gpu(Some(name.as_str()), pci, info.cc_major, info.cc_minor));
        graph.replace_vertex(local, gpu);
        debug!(address = %info.address, %name, "replaced pci device with gpu");
        ids.push(gpu);
    }
    info!(gpus = ids.len(), "added gpus");
    Ok(ids)
}

/// Join GPUs to their NVLink peers, then merge parallel lanes.
///
/// Each reported lane becomes a one-lane edge. A GPU-GPU lane is joined only
/// from the side whose address orders first, so a lane reported from both
/// ends yields one edge.
pub fn add_nvlinks(graph: &mut Graph, links: &[NvLinkInfo]) -> Result<()> {
    let mut joined = 0;
    for info in links {
        if !info.active {
            warn!(address = %info.address, link = info.link, "nvlink not active");
            continue;
        }

        let local = pci_vertex(graph, info.address)?;
        let VertexData::Gpu(gpu) = graph[local].data() else {
            return Err(Error::UnexpectedVertex(format!(
                "nvlink reported by {}, which is not a gpu",
                graph[local].name()
            )));
        };
        let local_address = gpu.pci.address;
        if info.link >= max_nvlinks(gpu.cc_major) {
            warn!(
                address = %info.address,
                link = info.link,
                cc_major = gpu.cc_major,
                "link index beyond what this gpu supports, skipping"
            );
            continue;
        }

        let remote = pci_vertex(graph, info.remote)?;
        let edge = Edge::new_nvlink(info.version, 1);
        match graph[remote].data() {
            VertexData::Gpu(peer) => {
                if local_address < peer.pci.address {
                    graph.connect(local, remote, edge);
                    joined += 1;
                }
            }
            VertexData::NvLinkBridge(_) => {
                graph.connect(local, remote, edge);
                joined += 1;
            }
            VertexData::PciDevice(pci) => {
                let bridge = Vertex::new_nvlink_bridge(Some(graph[remote].name()), *pci);
                let bridge = graph.create_vertex(bridge);
                graph.replace_vertex(remote, bridge);
                debug!(address = %info.remote, "pci device is an nvlink bridge");
                graph.connect(local, bridge, edge);
                joined += 1;
            }
            VertexData::NvSwitch(_) => {
                return Err(Error::Unsupported(format!(
                    "nvlink from {} to nvswitch {}",
                    info.address, info.remote
                )));
            }
            VertexData::Unknown | VertexData::CpuPackage(_) | VertexData::PciBridge(_) => {
                return Err(Error::UnexpectedVertex(format!(
                    "nvlink endpoint {} at {} is not a device",
                    graph[remote].name(),
                    info.remote
                )));
            }
        }
    }

    let merged = graph.consolidate_nvlinks();
    info!(lanes = joined, merged, "added nvlinks");
    Ok(())
}
