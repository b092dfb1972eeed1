//! Graph export: DOT text and JSON snapshots.
//!
//! Both forms are pure functions of the current graph state; nothing is
//! mutated. Vertices are identified by their arena slot index, which is
//! unique and stable for as long as the graph is not mutated.
//!
//! ```text
//! graph {
//! 0 [ shape=record, label="Xeon" ];
//! 1 [ shape=record, label="Tesla V100" ];
//! 0 -- 1 [ label="{ pci | 15.750000 }" ];
//! }
//! ```

pub mod label;

use std::io::Write;

use serde::Serialize;

use crate::graph::Graph;
use crate::model::*;
use crate::Result;

pub use label::{DotField, DotLabel};

// ============================================================================
// DOT
// ============================================================================

/// Record label for a vertex.
pub fn vertex_label(vertex: &Vertex) -> DotLabel {
    match vertex.data() {
        VertexData::NvLinkBridge(_) => DotLabel::new("NvLink Bridge"),
        VertexData::Unknown
        | VertexData::CpuPackage(_)
        | VertexData::PciBridge(_)
        | VertexData::PciDevice(_)
        | VertexData::Gpu(_)
        | VertexData::NvSwitch(_) => DotLabel::new(vertex.name()),
    }
}

/// Record label for an edge.
pub fn edge_label(edge: &Edge) -> DotLabel {
    match *edge.data() {
        EdgeData::Nvlink { version, lanes } => DotLabel::new("nvlink")
            .with_field(lanes.to_string())
            .with_field(version.to_string()),
        EdgeData::Pci { link_speed, .. } => {
            DotLabel::new("pci").with_field(format!("{link_speed:.6}"))
        }
        EdgeData::Qpi { links, .. } => DotLabel::new("qpi").with_field(links.to_string()),
        EdgeData::Xbus { .. } => DotLabel::new("xbus"),
        EdgeData::Unknown => DotLabel::new("unknown"),
    }
}

/// Write the graph in DOT form.
///
/// One line per member vertex, then one per joined edge, each edge followed
/// by a `{rank=...}` line when it declares a rank group.
pub fn write_dot(graph: &Graph, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "graph {{")?;

    for id in graph.vertices() {
        writeln!(
            writer,
            "{} [ shape=record, label=\"{}\" ];",
            id,
            vertex_label(&graph[id])
        )?;
    }

    for id in graph.edges() {
        let edge = &graph[id];
        let Some((u, v)) = edge.endpoints() else { continue };
        writeln!(writer, "{u} -- {v} [ label=\"{}\" ];", edge_label(edge))?;
        if let Some(rank) = edge.rank() {
            writeln!(writer, "{{rank={rank}; {u}; {v}}};")?;
        }
    }

    write!(writer, "}}")?;
    Ok(())
}

/// The DOT form as a string.
pub fn to_dot(graph: &Graph) -> String {
    let mut buf = Vec::new();
    write_dot(graph, &mut buf).expect("writing to a Vec cannot fail");
    String::from_utf8(buf).expect("DOT output is UTF-8")
}

// ============================================================================
// JSON snapshot
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VertexRecord<'g> {
    pub id: u32,
    pub name: &'g str,
    #[serde(flatten)]
    pub data: &'g VertexData,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeRecord<'g> {
    pub id: u32,
    pub u: u32,
    pub v: u32,
    #[serde(flatten)]
    pub data: &'g EdgeData,
}

/// Serializable view of the graph's members. Unjoined edges are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot<'g> {
    pub vertices: Vec<VertexRecord<'g>>,
    pub edges: Vec<EdgeRecord<'g>>,
}

impl<'g> GraphSnapshot<'g> {
    pub fn of(graph: &'g Graph) -> Self {
        let vertices = graph
            .vertices()
            .map(|id| {
                let vertex = &graph[id];
                VertexRecord { id: id.index(), name: vertex.name(), data: vertex.data() }
            })
            .collect();
        let edges = graph
            .edges()
            .filter_map(|id| {
                let edge = &graph[id];
                let (u, v) = edge.endpoints()?;
                Some(EdgeRecord { id: id.index(), u: u.index(), v: v.index(), data: edge.data() })
            })
            .collect();
        Self { vertices, edges }
    }
}

/// Write the snapshot as pretty-printed JSON.
pub fn write_json(graph: &Graph, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &GraphSnapshot::of(graph))?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_graph() -> Graph {
        let mut g = Graph::new();
        let cpu = g.add_vertex(Vertex::new_cpu_package(CpuPackage {
            index: 0,
            model: "POWER9".into(),
            arch: CpuArch::Power { revision: 2 },
        }));
        let bridge = g.add_vertex(Vertex::new_nvlink_bridge(None, PciDevice::default()));
        let gpu = g.add_vertex(Vertex::new_gpu(Some("Tesla V100-SXM2-16GB"), PciDevice::default(), 7, 0));
        g.connect(cpu, bridge, Edge::new_pci(15.75));
        g.connect(gpu, bridge, Edge::new_nvlink(2, 3).with_rank("same"));
        g
    }

    #[test]
    fn test_dot_output() {
        let dot = to_dot(&small_graph());
        assert_eq!(
            dot,
            "graph {\n\
             0 [ shape=record, label=\"POWER9\" ];\n\
             1 [ shape=record, label=\"NvLink Bridge\" ];\n\
             2 [ shape=record, label=\"Tesla V100-SXM2-16GB\" ];\n\
             0 -- 1 [ label=\"{ pci | 15.750000 }\" ];\n\
             2 -- 1 [ label=\"{ nvlink | 3 | 2 }\" ];\n\
             {rank=same; 2; 1};\n\
             }"
        );
    }

    #[test]
    fn test_dot_is_pure() {
        let g = small_graph();
        let before = (g.vertex_count(), g.edge_count());
        assert_eq!(to_dot(&g), to_dot(&g));
        assert_eq!((g.vertex_count(), g.edge_count()), before);
    }

    #[test]
    fn test_empty_graph_dot() {
        assert_eq!(to_dot(&Graph::new()), "graph {\n}");
    }

    #[test]
    fn test_edge_labels() {
        assert_eq!(edge_label(&Edge::new_xbus(1)).to_string(), "xbus");
        assert_eq!(edge_label(&Edge::unknown()).to_string(), "unknown");
        assert_eq!(edge_label(&Edge::new_qpi(2, 8)).to_string(), "{ qpi | 2 }");
    }

    #[test]
    fn test_json_snapshot() {
        let g = small_graph();
        let mut buf = Vec::new();
        write_json(&g, &mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(json["vertices"].as_array().unwrap().len(), 3);
        assert_eq!(json["vertices"][0]["kind"], "cpu_package");
        assert_eq!(json["vertices"][0]["data"]["arch"], "power");
        assert_eq!(json["vertices"][2]["name"], "Tesla V100-SXM2-16GB");
        assert_eq!(json["edges"][1]["kind"], "nvlink");
        assert_eq!(json["edges"][1]["lanes"], 3);
        assert_eq!(json["edges"][1]["u"], 2);
        assert_eq!(json["edges"][1]["v"], 1);
    }
}
