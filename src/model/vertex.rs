//! Vertex (device) in the topology graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{EdgeId, PciAddress};

/// Stable vertex handle: arena slot index plus the slot's generation.
///
/// A handle outlives the vertex it names only as a stale value; the graph
/// detects it because the slot's generation has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl VertexId {
    /// Slot index. Unique among live vertices of one graph.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

// ============================================================================
// Kind-specific data
// ============================================================================

/// Instruction-set family of a CPU package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "arch", rename_all = "snake_case")]
pub enum CpuArch {
    X86 {
        vendor: String,
        family: i32,
        model_number: i32,
        stepping: i32,
    },
    Power {
        revision: i32,
    },
}

/// A CPU socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuPackage {
    /// Enumeration index of the package (0-based, as reported by the host).
    pub index: u32,
    pub model: String,
    #[serde(flatten)]
    pub arch: CpuArch,
}

impl CpuPackage {
    pub fn is_x86(&self) -> bool {
        matches!(self.arch, CpuArch::X86 { .. })
    }

    pub fn is_power(&self) -> bool {
        matches!(self.arch, CpuArch::Power { .. })
    }
}

/// A PCI bridge. The bridge "is" the downstream bus it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PciBridge {
    /// Upstream-side address of the bridge itself.
    pub address: PciAddress,
    pub downstream_domain: u16,
    pub secondary_bus: u8,
    pub subordinate_bus: u8,
}

impl PciBridge {
    /// True if `address` sits directly on this bridge's secondary bus.
    pub fn owns(&self, address: &PciAddress) -> bool {
        self.downstream_domain == address.domain && self.secondary_bus == address.bus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PciDevice {
    pub address: PciAddress,
    #[serde(default)]
    pub class_id: u16,
    #[serde(default)]
    pub vendor_id: u16,
    #[serde(default)]
    pub device_id: u16,
    #[serde(default)]
    pub subvendor_id: u16,
    #[serde(default)]
    pub subdevice_id: u16,
    #[serde(default)]
    pub revision: u8,
    pub link_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gpu {
    pub pci: PciDevice,
    /// Compute capability, major.minor.
    pub cc_major: i32,
    pub cc_minor: i32,
}

/// Exactly one variant per device kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum VertexData {
    #[default]
    Unknown,
    CpuPackage(CpuPackage),
    PciBridge(PciBridge),
    PciDevice(PciDevice),
    Gpu(Gpu),
    NvLinkBridge(PciDevice),
    NvSwitch(PciDevice),
}

/// Fieldless mirror of [`VertexData`], used for kind-filtered lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexKind {
    Unknown,
    CpuPackage,
    PciBridge,
    PciDevice,
    Gpu,
    NvLinkBridge,
    NvSwitch,
}

impl VertexData {
    pub fn kind(&self) -> VertexKind {
        match self {
            VertexData::Unknown => VertexKind::Unknown,
            VertexData::CpuPackage(_) => VertexKind::CpuPackage,
            VertexData::PciBridge(_) => VertexKind::PciBridge,
            VertexData::PciDevice(_) => VertexKind::PciDevice,
            VertexData::Gpu(_) => VertexKind::Gpu,
            VertexData::NvLinkBridge(_) => VertexKind::NvLinkBridge,
            VertexData::NvSwitch(_) => VertexKind::NvSwitch,
        }
    }
}

// ============================================================================
// Vertex
// ============================================================================

/// A device in the topology.
///
/// Constructed detached by one of the factory functions, then handed to the
/// graph (`Graph::add_vertex`, `Graph::create_vertex`). The incident edge set
/// is maintained exclusively by the graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vertex {
    name: String,
    data: VertexData,
    pub(crate) incident: SmallVec<[EdgeId; 4]>,
}

impl Vertex {
    pub fn new(name: impl Into<String>, data: VertexData) -> Self {
        Self { name: name.into(), data, incident: SmallVec::new() }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(name, VertexData::Unknown)
    }

    pub fn new_cpu_package(package: CpuPackage) -> Self {
        let name = if package.model.is_empty() {
            format!("package {}", package.index)
        } else {
            package.model.clone()
        };
        Self::new(name, VertexData::CpuPackage(package))
    }

    pub fn new_bridge(
        name: Option<&str>,
        address: PciAddress,
        downstream_domain: u16,
        secondary_bus: u8,
        subordinate_bus: u8,
    ) -> Self {
        Self::new(
            name.unwrap_or("anonymous bridge"),
            VertexData::PciBridge(PciBridge {
                address,
                downstream_domain,
                secondary_bus,
                subordinate_bus,
            }),
        )
    }

    pub fn new_pci_device(name: Option<&str>, address: PciAddress, link_speed: f32) -> Self {
        Self::new(
            name.unwrap_or("anonymous pcidev"),
            VertexData::PciDevice(PciDevice { address, link_speed, ..Default::default() }),
        )
    }

    pub fn new_gpu(name: Option<&str>, pci: PciDevice, cc_major: i32, cc_minor: i32) -> Self {
        Self::new(
            name.unwrap_or("anonymous gpu"),
            VertexData::Gpu(Gpu { pci, cc_major, cc_minor }),
        )
    }

    pub fn new_nvlink_bridge(name: Option<&str>, pci: PciDevice) -> Self {
        Self::new(name.unwrap_or("anonymous nvlink bridge"), VertexData::NvLinkBridge(pci))
    }

    pub fn new_nvswitch(name: Option<&str>, pci: PciDevice) -> Self {
        Self::new(name.unwrap_or("anonymous nvswitch"), VertexData::NvSwitch(pci))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &VertexData {
        &self.data
    }

    pub fn kind(&self) -> VertexKind {
        self.data.kind()
    }

    /// Edges touching this vertex, in attachment order.
    pub fn incident(&self) -> &[EdgeId] {
        &self.incident
    }

    /// The embedded PCI function, for every kind that is a PCI device.
    pub fn pci_device(&self) -> Option<&PciDevice> {
        match &self.data {
            VertexData::PciDevice(p)
            | VertexData::NvLinkBridge(p)
            | VertexData::NvSwitch(p) => Some(p),
            VertexData::Gpu(g) => Some(&g.pci),
            VertexData::Unknown | VertexData::CpuPackage(_) | VertexData::PciBridge(_) => None,
        }
    }

    pub fn is_pci_device(&self) -> bool {
        self.pci_device().is_some()
    }

    pub fn is_package(&self) -> bool {
        matches!(self.data, VertexData::CpuPackage(_))
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self.data, VertexData::Gpu(_))
    }

    pub(crate) fn attach(&mut self, e: EdgeId) {
        if !self.incident.contains(&e) {
            self.incident.push(e);
        }
    }

    pub(crate) fn detach(&mut self, e: EdgeId) {
        self.incident.retain(|x| *x != e);
    }
}

fn hex(v: u16) -> String {
    format!("{v:#x}")
}

impl fmt::Display for PciDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{addr: {}, classId: {}, vendorId: {}, deviceId: {}, subvendorId: {}, subdeviceId: {}, revision: {}, linkSpeed: {:.6}}}",
            self.address,
            hex(self.class_id),
            hex(self.vendor_id),
            hex(self.device_id),
            hex(self.subvendor_id),
            hex(self.subdevice_id),
            hex(self.revision.into()),
            self.link_speed,
        )
    }
}

impl fmt::Display for CpuPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arch {
            CpuArch::X86 { vendor, family, model_number, stepping } => write!(
                f,
                "{{idx: {}, model: {}, vendor: {}, modelNumber: {}, familyNumber: {}, stepping: {}}}",
                self.index, self.model, vendor, model_number, family, stepping
            ),
            CpuArch::Power { revision } => write!(
                f,
                "{{idx: {}, model: {}, revision: {}}}",
                self.index, self.model, revision
            ),
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{name: {}", self.name)?;
        match &self.data {
            VertexData::Unknown => write!(f, ", type: unknown")?,
            VertexData::CpuPackage(p) => {
                let arch = if p.is_x86() { "x86" } else { "ppc" };
                write!(f, ", type: {arch}, package: {p}")?
            }
            VertexData::PciBridge(b) => write!(
                f,
                ", type: bridge, addr={},dom={:04x},sec={:02x},sub={:02x}",
                b.address, b.downstream_domain, b.secondary_bus, b.subordinate_bus
            )?,
            VertexData::PciDevice(p) => write!(f, ", type: pcidev, pcidev: {p}")?,
            VertexData::Gpu(g) => write!(
                f,
                ", type: gpu, gpu: {{pci_dev: {}, cc: {}.{}}}",
                g.pci, g.cc_major, g.cc_minor
            )?,
            VertexData::NvLinkBridge(p) => write!(f, ", type: nvlinkbridge, pcidev: {p}")?,
            VertexData::NvSwitch(p) => write!(f, ", type: nvswitch, pcidev: {p}")?,
        }
        write!(f, "}}")
    }
}
