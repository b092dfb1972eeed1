//! Human- and machine-readable topology reports.
//!
//! | Format | Output |
//! |--------|--------|
//! | `text` | Devices by kind, then the widest path from every CPU to every GPU |
//! | `dot`  | Graphviz DOT, see [`crate::export::write_dot`] |
//! | `json` | Vertex/edge snapshot, see [`crate::export::write_json`] |

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::export::{write_dot, write_json};
use crate::graph::{Graph, NO_PATH_BANDWIDTH};
use crate::model::{Path, VertexId, VertexKind};
use crate::{Error, Result};

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Dot,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "dot" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::Unsupported(format!("output format '{other}'"))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Dot => "dot",
            OutputFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Text only: list the widest CPU-to-GPU paths.
    pub bandwidth_paths: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { format: OutputFormat::Text, bandwidth_paths: true }
    }
}

// ============================================================================
// Report
// ============================================================================

pub fn write_report(graph: &Graph, options: &ReportOptions, writer: &mut dyn Write) -> Result<()> {
    match options.format {
        OutputFormat::Text => write_text(graph, options, writer),
        OutputFormat::Dot => {
            write_dot(graph, writer)?;
            writeln!(writer)?;
            Ok(())
        }
        OutputFormat::Json => write_json(graph, writer),
    }
}

const SECTIONS: [(&str, VertexKind); 4] = [
    ("CPU packages", VertexKind::CpuPackage),
    ("GPUs", VertexKind::Gpu),
    ("NVLink bridges", VertexKind::NvLinkBridge),
    ("PCI devices", VertexKind::PciDevice),
];

fn write_text(graph: &Graph, options: &ReportOptions, writer: &mut dyn Write) -> Result<()> {
    for (title, kind) in SECTIONS {
        writeln!(writer, "{title}:")?;
        for id in graph.vertices_of(kind) {
            writeln!(writer, "{}", graph[id])?;
        }
    }

    let cpus = graph.vertices_of(VertexKind::CpuPackage);
    let gpus = graph.vertices_of(VertexKind::Gpu);
    if !options.bandwidth_paths || cpus.is_empty() || gpus.is_empty() {
        return Ok(());
    }

    writeln!(writer, "Widest CPU-GPU paths:")?;
    for &cpu in &cpus {
        for &gpu in &gpus {
            let path = graph.widest_path(cpu, gpu);
            write_path(graph, cpu, gpu, &path, writer)?;
        }
    }
    Ok(())
}

fn write_path(
    graph: &Graph,
    src: VertexId,
    dst: VertexId,
    path: &Path,
    writer: &mut dyn Write,
) -> Result<()> {
    let (from, to) = (graph[src].name(), graph[dst].name());
    if path.is_empty() {
        writeln!(writer, "{from} -> {to}: no path")?;
        return Ok(());
    }

    let bandwidth = graph.known_path_bandwidth(path);
    if bandwidth == NO_PATH_BANDWIDTH {
        writeln!(writer, "{from} -> {to}: unknown bandwidth, {} hops", path.len())?;
    } else {
        writeln!(writer, "{from} -> {to}: {bandwidth:.2}, {} hops", path.len())?;
    }

    let mut at = src;
    for e in path.iter() {
        let next = graph.other_vertex(e, at);
        writeln!(writer, "  {} -- {} {}", graph[at].name(), graph[next].name(), graph[e])?;
        at = next;
    }
    Ok(())
}
