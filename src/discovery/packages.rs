//! CPU packages and the inter-socket mesh.

use tracing::{info, warn};

use super::InterconnectConfig;
use crate::graph::Graph;
use crate::model::{CpuArch, CpuPackage, Edge, Vertex, VertexId};

/// Intel family 6, model 0x4f (Broadwell-EP/EX): the x86 parts whose QPI
/// parameters are known.
fn has_known_qpi(package: &CpuPackage) -> bool {
    matches!(package.arch, CpuArch::X86 { family: 6, model_number: 0x4f, .. })
}

/// The link from `a` to `b`, or `None` for a mixed-architecture pair.
///
/// An x86 link is QPI when the source package `a` has known QPI parameters.
fn package_link(a: &CpuPackage, b: &CpuPackage, config: &InterconnectConfig) -> Option<Edge> {
    match (&a.arch, &b.arch) {
        (CpuArch::X86 { .. }, CpuArch::X86 { .. }) => {
            if has_known_qpi(a) {
                Some(Edge::new_qpi(config.qpi_links, config.qpi_speed))
            } else {
                Some(Edge::unknown())
            }
        }
        (CpuArch::Power { .. }, CpuArch::Power { .. }) => {
            Some(Edge::new_xbus(config.xbus_bandwidth))
        }
        _ => None,
    }
}

/// Add one vertex per package and join every ordered pair of packages, so
/// each pair ends up with one link in each direction.
///
/// Returns the package vertices in input order.
pub fn add_packages(
    graph: &mut Graph,
    packages: &[CpuPackage],
    config: &InterconnectConfig,
) -> Vec<VertexId> {
    let ids: Vec<VertexId> = packages
        .iter()
        .map(|p| graph.add_vertex(Vertex::new_cpu_package(p.clone())))
        .collect();

    let mut links = 0;
    for i in 0..packages.len() {
        for j in 0..packages.len() {
            if i == j {
                continue;
            }
            match package_link(&packages[i], &packages[j], config) {
                Some(edge) => {
                    graph.connect(ids[i], ids[j], edge);
                    links += 1;
                }
                None => warn!(
                    a = packages[i].index,
                    b = packages[j].index,
                    "packages of different architectures, not linked"
                ),
            }
        }
    }

    info!(packages = ids.len(), links, "added cpu packages");
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeData, EdgeKind};

    fn x86(index: u32, model_number: i32) -> CpuPackage {
        CpuPackage {
            index,
            model: format!("Xeon {index}"),
            arch: CpuArch::X86 {
                vendor: "GenuineIntel".into(),
                family: 6,
                model_number,
                stepping: 1,
            },
        }
    }

    fn power(index: u32) -> CpuPackage {
        CpuPackage {
            index,
            model: "POWER9".into(),
            arch: CpuArch::Power { revision: 2 },
        }
    }

    #[test]
    fn test_mesh_has_one_edge_per_direction() {
        let mut g = Graph::new();
        let packages: Vec<_> = (0..4).map(power).collect();
        let ids = add_packages(&mut g, &packages, &InterconnectConfig::default());

        assert_eq!(ids.len(), 4);
        assert_eq!(g.edge_count(), 4 * 3);
        for &id in &ids {
            assert_eq!(g.incident_edges(id).len(), 6);
        }
        g.assert_invariants();
    }

    #[test]
    fn test_two_packages_have_two_direct_paths() {
        let mut g = Graph::new();
        let ids = add_packages(&mut g, &[power(0), power(1)], &InterconnectConfig::default());
        let paths = g.paths(ids[0], ids[1]);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.len() == 1));
    }

    #[test]
    fn test_power_pairs_use_xbus() {
        let mut g = Graph::new();
        let config = InterconnectConfig { xbus_bandwidth: 42, ..Default::default() };
        add_packages(&mut g, &[power(0), power(1)], &config);

        let xbus = g.edges_of(EdgeKind::Xbus);
        assert_eq!(xbus.len(), 2);
        assert_eq!(g[xbus[0]].data(), &EdgeData::Xbus { bandwidth: 42 });
    }

    #[test]
    fn test_broadwell_pairs_use_qpi() {
        let mut g = Graph::new();
        add_packages(&mut g, &[x86(0, 0x4f), x86(1, 0x4f)], &InterconnectConfig::default());

        let qpi = g.edges_of(EdgeKind::Qpi);
        assert_eq!(qpi.len(), 2);
        assert_eq!(g[qpi[0]].bandwidth(), 2.0 * 8.0 * 1e9);
    }

    #[test]
    fn test_qpi_follows_the_source_package() {
        let mut g = Graph::new();
        let ids = add_packages(&mut g, &[x86(0, 0x55), x86(1, 0x4f)], &InterconnectConfig::default());

        let unknown = g.edges_of(EdgeKind::Unknown);
        let qpi = g.edges_of(EdgeKind::Qpi);
        assert_eq!((unknown.len(), qpi.len()), (1, 1));
        assert_eq!(g.endpoints(unknown[0]), Some((ids[0], ids[1])));
        assert_eq!(g.endpoints(qpi[0]), Some((ids[1], ids[0])));
    }

    #[test]
    fn test_mixed_architectures_are_not_linked() {
        let mut g = Graph::new();
        add_packages(&mut g, &[x86(0, 0x4f), power(1)], &InterconnectConfig::default());
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_single_package() {
        let mut g = Graph::new();
        let ids = add_packages(&mut g, &[power(0)], &InterconnectConfig::default());
        assert_eq!(g.package(0), Some(ids[0]));
        assert_eq!(g.edge_count(), 0);
    }
}
