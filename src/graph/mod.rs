//! # Graph Store
//!
//! `Graph` is the sole owner of vertex and edge existence. Vertices and
//! edges live in two generational arenas; they refer to each other only by
//! handle (`VertexId`, `EdgeId`), so there are no ownership cycles and a
//! handle to an erased object is detected rather than dereferenced.
//!
//! ## Lifecycle
//!
//! | Step | Operation | Effect |
//! |------|-----------|--------|
//! | create | `create_vertex` / `create_edge` | allocated, detached, not a member |
//! | insert | `insert_vertex` / `insert_edge` | idempotent membership |
//! | join | `join(u, v, e)` | sets endpoints, registers back-references |
//! | erase | `erase(e)` | severs back-references, frees the slot |
//! | replace | `replace_edge` / `replace_vertex` | substitutes, keeps incident relationships |
//!
//! ## Invariants
//!
//! Every joined edge in the edge set has two endpoints that are both in the
//! vertex set, and each endpoint lists the edge in its incident set. Every
//! mutation below re-establishes this before returning.
//!
//! Preconditions (joining an already-joined edge, erasing a non-member,
//! resolving a stale handle through `Index`) are bugs in the caller and
//! panic. Failed lookups return `None` or an empty collection.

mod arena;
mod consolidate;
mod cost;
mod traversal;

pub use cost::NO_PATH_BANDWIDTH;

use std::collections::BTreeSet;
use std::ops::Index;

use tracing::{debug, trace};

use crate::model::*;
use arena::Arena;

/// In-memory topology graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertex_arena: Arena<VertexId, Vertex>,
    edge_arena: Arena<EdgeId, Edge>,
    /// Member vertices, in slot order.
    vertices: BTreeSet<VertexId>,
    /// Member edges, in slot order.
    edges: BTreeSet<EdgeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Creation and membership
    // ========================================================================

    /// Allocate a detached vertex. It is not a member until inserted or joined.
    pub fn create_vertex(&mut self, vertex: Vertex) -> VertexId {
        self.vertex_arena.insert(vertex)
    }

    /// Allocate a detached edge. Any endpoints it carries are discarded.
    pub fn create_edge(&mut self, mut edge: Edge) -> EdgeId {
        edge.endpoints = None;
        self.edge_arena.insert(edge)
    }

    /// Create a vertex and make it a member.
    pub fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = self.create_vertex(vertex);
        self.insert_vertex(id)
    }

    /// Make `id` a member. Inserting a member again is a no-op.
    ///
    /// # Panics
    /// If `id` does not name a live vertex.
    pub fn insert_vertex(&mut self, id: VertexId) -> VertexId {
        assert!(self.vertex_arena.contains(id), "insert_vertex(): stale vertex handle {id:?}");
        self.vertices.insert(id);
        id
    }

    /// Make `id` a member. Inserting a member again is a no-op.
    ///
    /// An edge inserted this way without being joined is a member with no
    /// endpoints; traversal cannot reach it and export skips it.
    ///
    /// # Panics
    /// If `id` does not name a live edge.
    pub fn insert_edge(&mut self, id: EdgeId) -> EdgeId {
        assert!(self.edge_arena.contains(id), "insert_edge(): stale edge handle {id:?}");
        self.edges.insert(id);
        id
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Attach `e` between `u` and `v`, inserting all three.
    ///
    /// # Panics
    /// If `e` is already connected, or any handle is stale.
    pub fn join(&mut self, u: VertexId, v: VertexId, e: EdgeId) -> EdgeId {
        self.insert_vertex(u);
        self.insert_vertex(v);
        let edge = self
            .edge_arena
            .get_mut(e)
            .unwrap_or_else(|| panic!("join(): stale edge handle {e:?}"));
        assert!(edge.endpoints.is_none(), "join(): edge is already connected");
        edge.endpoints = Some((u, v));

        self.vertex_mut(u).attach(e);
        self.vertex_mut(v).attach(e);
        self.edges.insert(e);
        trace!(edge = %e, u = %u, v = %v, "joined");
        e
    }

    /// Create `edge` and join it between `u` and `v`.
    pub fn connect(&mut self, u: VertexId, v: VertexId, edge: Edge) -> EdgeId {
        let e = self.create_edge(edge);
        self.join(u, v, e)
    }

    /// Remove `e` from the graph and from both endpoints' incident sets.
    ///
    /// Returns the detached edge data for reuse; the handle is dead afterwards.
    ///
    /// # Panics
    /// If `e` is not a member.
    pub fn erase(&mut self, e: EdgeId) -> Edge {
        assert!(self.edges.remove(&e), "erase(): edge {e:?} is not in the graph");
        let mut edge = self
            .edge_arena
            .remove(e)
            .unwrap_or_else(|| panic!("erase(): stale edge handle {e:?}"));
        if let Some((u, v)) = edge.endpoints.take() {
            self.vertex_mut(u).detach(e);
            self.vertex_mut(v).detach(e);
        }
        edge
    }

    /// Put `next` in place of `orig`: same endpoints, same incident
    /// registrations. `orig` is erased and its data returned.
    ///
    /// # Panics
    /// If `orig` is not a joined member or `next` is already connected.
    pub fn replace_edge(&mut self, orig: EdgeId, next: EdgeId) -> Edge {
        assert!(self.edges.contains(&orig), "replace_edge(): edge {orig:?} is not in the graph");
        let (u, v) = self[orig]
            .endpoints
            .expect("replace_edge(): original edge is not connected");

        let replacement = self
            .edge_arena
            .get_mut(next)
            .unwrap_or_else(|| panic!("replace_edge(): stale edge handle {next:?}"));
        assert!(replacement.endpoints.is_none(), "replace_edge(): replacement is already connected");
        replacement.endpoints = Some((u, v));

        self.vertex_mut(u).attach(next);
        self.vertex_mut(v).attach(next);
        self.edges.insert(next);
        debug!(orig = %orig, next = %next, "replaced edge");

        self.erase(orig)
    }

    /// Put `next` in place of `orig`: every edge that touched `orig` now
    /// touches `next`. `orig` is removed and its data returned.
    ///
    /// Used when a generic device is later recognized as a more specific
    /// kind, e.g. a bare PCI device that turns out to be a GPU.
    ///
    /// # Panics
    /// If `orig` is not a member or either handle is stale.
    pub fn replace_vertex(&mut self, orig: VertexId, next: VertexId) -> Vertex {
        assert!(self.vertices.contains(&orig), "replace_vertex(): vertex {orig:?} is not in the graph");
        assert!(self.vertex_arena.contains(next), "replace_vertex(): stale vertex handle {next:?}");
        assert_ne!(orig, next, "replace_vertex(): vertex replaced by itself");

        let incident: Vec<EdgeId> = self[orig].incident.to_vec();
        for &e in &incident {
            let edge = self
                .edge_arena
                .get_mut(e)
                .expect("incident edge must be live");
            if let Some((u, v)) = edge.endpoints.as_mut() {
                if *u == orig {
                    *u = next;
                }
                if *v == orig {
                    *v = next;
                }
            }
        }

        let replacement = self.vertex_mut(next);
        for &e in &incident {
            replacement.attach(e);
        }
        self.vertices.insert(next);

        self.vertices.remove(&orig);
        let mut removed = self
            .vertex_arena
            .remove(orig)
            .expect("member vertex must be live");
        removed.incident.clear();
        debug!(orig = %orig, next = %next, edges = incident.len(), "replaced vertex");
        removed
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_arena.get(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_arena.get(id)
    }

    fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        self.vertex_arena
            .get_mut(id)
            .unwrap_or_else(|| panic!("stale vertex handle {id:?}"))
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        self.edge_arena
            .get_mut(id)
            .unwrap_or_else(|| panic!("stale edge handle {id:?}"))
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains(&id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Member vertices, in slot order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().copied()
    }

    /// Member edges, in slot order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().copied()
    }

    /// Members of exactly `kind`.
    pub fn vertices_of(&self, kind: VertexKind) -> Vec<VertexId> {
        self.find_vertices(|v| v.kind() == kind)
    }

    pub fn find_vertices<P>(&self, pred: P) -> Vec<VertexId>
    where
        P: Fn(&Vertex) -> bool,
    {
        self.vertices().filter(|&id| pred(&self[id])).collect()
    }

    pub fn edges_of(&self, kind: EdgeKind) -> Vec<EdgeId> {
        self.edges().filter(|&id| self[id].kind() == kind).collect()
    }

    /// Edges touching `v`; empty for an unknown handle.
    pub fn incident_edges(&self, v: VertexId) -> &[EdgeId] {
        self.vertex(v).map(Vertex::incident).unwrap_or(&[])
    }

    pub fn endpoints(&self, e: EdgeId) -> Option<(VertexId, VertexId)> {
        self.edge(e).and_then(Edge::endpoints)
    }

    /// The endpoint of `e` that is not `v`.
    ///
    /// # Panics
    /// See [`Edge::other_vertex`].
    pub fn other_vertex(&self, e: EdgeId, v: VertexId) -> VertexId {
        self[e].other_vertex(v)
    }

    /// True if `a` and `b` connect the same unordered vertex pair.
    pub fn same_vertices(&self, a: EdgeId, b: EdgeId) -> bool {
        self[a].same_vertices(&self[b])
    }

    /// The CPU package with enumeration index `index`.
    pub fn package(&self, index: u32) -> Option<VertexId> {
        self.vertices().find(|&id| {
            matches!(self[id].data(), VertexData::CpuPackage(p) if p.index == index)
        })
    }

    /// The vertex at a PCI address.
    ///
    /// Devices (plain PCI devices, GPUs, NVLink bridges, NVSwitches) match on
    /// their full address and take priority. Failing that, a bridge matches
    /// when `address` is on its downstream domain and secondary bus, since a
    /// bridge stands for the bus it exposes.
    pub fn find_pci(&self, address: &PciAddress) -> Option<VertexId> {
        self.vertices()
            .find(|&id| {
                self[id]
                    .pci_device()
                    .is_some_and(|pci| pci.address == *address)
            })
            .or_else(|| self.bridge_for_address(address))
    }

    /// The bridge whose secondary bus `address` sits on.
    pub fn bridge_for_address(&self, address: &PciAddress) -> Option<VertexId> {
        self.vertices().find(|&id| {
            matches!(self[id].data(), VertexData::PciBridge(b) if b.owns(address))
        })
    }

    /// Check referential symmetry of the whole graph.
    ///
    /// # Panics
    /// On the first violation found.
    pub fn assert_invariants(&self) {
        for e in self.edges() {
            let Some((u, v)) = self[e].endpoints() else { continue };
            for end in [u, v] {
                assert!(self.contains_vertex(end), "edge {e} endpoint {end} is not a member");
                assert!(
                    self[end].incident().contains(&e),
                    "vertex {end} does not list incident edge {e}"
                );
            }
        }
        for v in self.vertices() {
            for &e in self[v].incident() {
                assert!(self.contains_edge(e), "vertex {v} lists non-member edge {e}");
                assert!(self[e].has_vertex(v), "edge {e} does not touch vertex {v}");
            }
        }
        debug_assert!(self.vertex_arena.len() >= self.vertices.len());
        debug_assert!(self.edge_arena.len() >= self.edges.len());
    }
}

impl Index<VertexId> for Graph {
    type Output = Vertex;

    fn index(&self, id: VertexId) -> &Vertex {
        self.vertex(id)
            .unwrap_or_else(|| panic!("stale vertex handle {id:?}"))
    }
}

impl Index<EdgeId> for Graph {
    type Output = Edge;

    fn index(&self, id: EdgeId) -> &Edge {
        self.edge(id)
            .unwrap_or_else(|| panic!("stale edge handle {id:?}"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pci(bus: u8) -> PciDevice {
        PciDevice {
            address: PciAddress::new(0, bus, 0, 0),
            link_speed: 15.75,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_vertex_is_idempotent() {
        let mut g = Graph::new();
        let v0 = g.create_vertex(Vertex::default());
        let v1 = g.create_vertex(Vertex::default());

        g.insert_vertex(v0);
        assert_eq!(g.vertex_count(), 1);
        g.insert_vertex(v0);
        assert_eq!(g.vertex_count(), 1);
        g.insert_vertex(v1);
        assert_eq!(g.vertex_count(), 2);
        assert!(g.contains_vertex(v0));
        assert!(g.contains_vertex(v1));
    }

    #[test]
    fn test_insert_edge_is_idempotent() {
        let mut g = Graph::new();
        let e0 = g.create_edge(Edge::default());
        let e1 = g.create_edge(Edge::default());

        g.insert_edge(e0);
        g.insert_edge(e0);
        assert_eq!(g.edge_count(), 1);
        g.insert_edge(e1);
        assert_eq!(g.edge_count(), 2);
        assert!(g.contains_edge(e0));
        assert!(g.contains_edge(e1));
    }

    #[test]
    fn test_created_objects_are_detached() {
        let mut g = Graph::new();
        let v = g.create_vertex(Vertex::default());
        let e = g.create_edge(Edge::default());
        assert!(!g.contains_vertex(v));
        assert!(!g.contains_edge(e));
        assert!(g.vertex(v).is_some());
        assert!(g.is_empty());
    }

    #[test]
    fn test_join() {
        let mut g = Graph::new();
        let src = g.create_vertex(Vertex::default());
        let dst = g.create_vertex(Vertex::default());
        let e = g.create_edge(Edge::default());

        g.join(src, dst, e);

        assert!(g.contains_edge(e));
        assert!(g.contains_vertex(src));
        assert!(g.contains_vertex(dst));
        assert_eq!(g.incident_edges(src), &[e]);
        assert_eq!(g.incident_edges(dst), &[e]);
        assert_eq!(g.endpoints(e), Some((src, dst)));
        g.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "already connected")]
    fn test_join_connected_edge_panics() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let e = g.connect(a, b, Edge::default());
        g.join(b, a, e);
    }

    #[test]
    fn test_self_edge_registers_once() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let e = g.connect(a, a, Edge::default());
        assert_eq!(g.incident_edges(a), &[e]);
        g.erase(e);
        assert!(g.incident_edges(a).is_empty());
    }

    #[test]
    fn test_erase_severs_back_references() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let keep = g.connect(a, b, Edge::new_pci(1.0));
        let gone = g.connect(a, b, Edge::new_pci(2.0));

        let removed = g.erase(gone);

        assert_eq!(removed.data(), &EdgeData::Pci { link_speed: 2.0, lanes: 0 });
        assert!(!removed.is_joined());
        assert!(!g.contains_edge(gone));
        assert!(g.edge(gone).is_none());
        assert_eq!(g.incident_edges(a), &[keep]);
        assert_eq!(g.incident_edges(b), &[keep]);
        g.assert_invariants();

        // The returned data can be reused.
        let again = g.connect(b, a, removed);
        assert_eq!(g.incident_edges(a), &[keep, again]);
    }

    #[test]
    #[should_panic(expected = "not in the graph")]
    fn test_erase_twice_panics() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let e = g.connect(a, b, Edge::default());
        g.erase(e);
        g.erase(e);
    }

    #[test]
    fn test_replace_edge() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let orig = g.connect(a, b, Edge::new_pci(4.0));
        let next = g.create_edge(Edge::new_nvlink(2, 1));

        let old = g.replace_edge(orig, next);

        assert_eq!(old.kind(), EdgeKind::Pci);
        assert!(!g.contains_edge(orig));
        assert!(g.contains_edge(next));
        assert_eq!(g.endpoints(next), Some((a, b)));
        assert_eq!(g.incident_edges(a), &[next]);
        assert_eq!(g.incident_edges(b), &[next]);
        g.assert_invariants();
    }

    #[test]
    fn test_replace_vertex_retargets_edges() {
        let mut g = Graph::new();
        let bridge = g.add_vertex(Vertex::new_bridge(None, PciAddress::new(0, 0, 1, 0), 0, 4, 4));
        let dev = g.add_vertex(Vertex::new_pci_device(Some("3D controller"), pci(4).address, 15.75));
        let other = g.add_vertex(Vertex::default());
        let up = g.connect(bridge, dev, Edge::new_pci(15.75));
        let side = g.connect(other, dev, Edge::unknown());

        let gpu = g.create_vertex(Vertex::new_gpu(Some("Tesla V100"), pci(4), 7, 0));
        let old = g.replace_vertex(dev, gpu);

        assert_eq!(old.name(), "3D controller");
        assert!(old.incident().is_empty());
        assert!(!g.contains_vertex(dev));
        assert!(g.vertex(dev).is_none());
        assert!(g.contains_vertex(gpu));
        assert_eq!(g.endpoints(up), Some((bridge, gpu)));
        assert_eq!(g.endpoints(side), Some((other, gpu)));
        assert_eq!(g.incident_edges(gpu), &[up, side]);
        assert_eq!(g.vertex_count(), 3);
        g.assert_invariants();
    }

    #[test]
    fn test_vertices_of_kind_and_predicate() {
        let mut g = Graph::new();
        let gpu = g.add_vertex(Vertex::new_gpu(None, pci(4), 7, 0));
        let dev = g.add_vertex(Vertex::new_pci_device(None, pci(5).address, 8.0));
        g.add_vertex(Vertex::default());

        assert_eq!(g.vertices_of(VertexKind::Gpu), vec![gpu]);
        assert_eq!(g.vertices_of(VertexKind::PciDevice), vec![dev]);
        assert!(g.vertices_of(VertexKind::NvSwitch).is_empty());
        assert_eq!(g.find_vertices(Vertex::is_pci_device), vec![gpu, dev]);
    }

    #[test]
    fn test_find_pci_prefers_devices_over_bridges() {
        let mut g = Graph::new();
        let bridge = g.add_vertex(Vertex::new_bridge(None, PciAddress::new(0, 0, 3, 0), 0, 4, 4));
        let dev = g.add_vertex(Vertex::new_pci_device(None, PciAddress::new(0, 4, 0, 0), 8.0));

        assert_eq!(g.find_pci(&PciAddress::new(0, 4, 0, 0)), Some(dev));
        // Nothing at 04:01.0 itself, so the bridge owning bus 4 answers.
        assert_eq!(g.find_pci(&PciAddress::new(0, 4, 1, 0)), Some(bridge));
        assert_eq!(g.find_pci(&PciAddress::new(0, 9, 0, 0)), None);
        assert_eq!(g.bridge_for_address(&PciAddress::new(0, 4, 0, 0)), Some(bridge));
        assert_eq!(g.bridge_for_address(&PciAddress::new(1, 4, 0, 0)), None);
    }

    #[test]
    fn test_package_lookup() {
        let mut g = Graph::new();
        let p1 = g.add_vertex(Vertex::new_cpu_package(CpuPackage {
            index: 1,
            model: "POWER9".into(),
            arch: CpuArch::Power { revision: 2 },
        }));
        assert_eq!(g.package(1), Some(p1));
        assert_eq!(g.package(0), None);
    }

    #[test]
    #[should_panic(expected = "stale vertex handle")]
    fn test_index_with_stale_handle_panics() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.create_vertex(Vertex::default());
        g.replace_vertex(a, b);
        let _ = &g[a];
    }
}
