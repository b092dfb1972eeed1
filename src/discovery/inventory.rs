//! JSON hardware inventories.
//!
//! An [`Inventory`] holds everything the hardware enumerators would report,
//! so a topology can be rebuilt on a machine other than the one it was
//! captured on. Every section is optional.
//!
//! ```json
//! {
//!   "config":   { "xbus_bandwidth": 68719476736 },
//!   "packages": [ { "index": 0, "model": "POWER9", "arch": "power", "revision": 2 } ],
//!   "pci":      [ { "type": "host_bridge", ... }, { "type": "device", ... } ],
//!   "gpus":     [ { "address": "0004:04:00.0", "cc_major": 7, "cc_minor": 0 } ],
//!   "nvlinks":  [ { "address": "0004:04:00.0", "link": 0, "remote": "0004:05:00.0", "version": 2 } ]
//! }
//! ```

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::gpu::{add_gpus, add_nvlinks, GpuInfo, NvLinkInfo};
use super::packages::add_packages;
use super::pci::{add_pci, PciObject};
use super::{make_graph, Discovery, DiscoveryMethod, InterconnectConfig};
use crate::graph::Graph;
use crate::model::CpuPackage;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub config: InterconnectConfig,
    pub packages: Vec<CpuPackage>,
    pub pci: Vec<PciObject>,
    pub gpus: Vec<GpuInfo>,
    pub nvlinks: Vec<NvLinkInfo>,
}

impl Inventory {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Source for the host half: packages and the PCI tree.
    pub fn host(&self) -> HostInventory<'_> {
        HostInventory { inventory: self }
    }

    /// Source for the GPU half: GPUs and NVLinks.
    pub fn gpu(&self) -> GpuInventory<'_> {
        GpuInventory { inventory: self }
    }

    /// Build a graph from the selected halves, host first.
    pub fn build(&self, methods: DiscoveryMethod) -> Result<Graph> {
        let mut host = self.host();
        let mut gpu = self.gpu();
        let mut sources: [&mut dyn Discovery; 2] = [&mut host, &mut gpu];
        make_graph(&mut sources, methods)
    }
}

/// [`DiscoveryMethod::HOST`] source backed by an inventory.
#[derive(Debug, Clone, Copy)]
pub struct HostInventory<'a> {
    inventory: &'a Inventory,
}

impl Discovery for HostInventory<'_> {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::HOST
    }

    fn discover(&mut self, graph: &mut Graph) -> Result<()> {
        add_packages(graph, &self.inventory.packages, &self.inventory.config);
        add_pci(graph, &self.inventory.pci)
    }
}

/// [`DiscoveryMethod::GPU`] source backed by an inventory.
#[derive(Debug, Clone, Copy)]
pub struct GpuInventory<'a> {
    inventory: &'a Inventory,
}

impl Discovery for GpuInventory<'_> {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::GPU
    }

    fn discover(&mut self, graph: &mut Graph) -> Result<()> {
        add_gpus(graph, &self.inventory.gpus)?;
        add_nvlinks(graph, &self.inventory.nvlinks)
    }
}
