//! Cost-based path selection.

use super::Graph;
use crate::model::{Path, VertexId};

/// Bandwidth reported for the empty path. Callers must filter it out rather
/// than read it as a zero-capacity path.
pub const NO_PATH_BANDWIDTH: f64 = -1.0;

impl Graph {
    /// Bottleneck bandwidth: the minimum edge bandwidth along `path`.
    ///
    /// # Panics
    /// If the path crosses an edge of unknown bandwidth.
    pub fn path_bandwidth(&self, path: &Path) -> f64 {
        path.iter()
            .map(|e| self[e].bandwidth())
            .reduce(f64::min)
            .unwrap_or(NO_PATH_BANDWIDTH)
    }

    /// Like [`Graph::path_bandwidth`], but a path crossing any edge of
    /// unknown bandwidth scores [`NO_PATH_BANDWIDTH`] instead of panicking.
    pub fn known_path_bandwidth(&self, path: &Path) -> f64 {
        path.iter()
            .map(|e| self[e].try_bandwidth())
            .try_fold(None::<f64>, |acc, bw| {
                bw.map(|bw| Some(acc.map_or(bw, |acc| acc.min(bw))))
            })
            .flatten()
            .unwrap_or(NO_PATH_BANDWIDTH)
    }

    /// The path from `src` to `dst` with the smallest `cost`; the first one
    /// found wins ties. Empty if there is no path.
    pub fn min_path<C>(&self, src: VertexId, dst: VertexId, cost: C) -> Path
    where
        C: Fn(&Path) -> f64,
    {
        select(self.paths(src, dst), cost, |candidate, best| candidate < best)
    }

    /// The path from `src` to `dst` with the largest `cost`; the first one
    /// found wins ties. Empty if there is no path.
    pub fn max_path<C>(&self, src: VertexId, dst: VertexId, cost: C) -> Path
    where
        C: Fn(&Path) -> f64,
    {
        select(self.paths(src, dst), cost, |candidate, best| candidate > best)
    }

    /// The path with the highest bottleneck bandwidth. Paths through links
    /// of unknown bandwidth lose to any path with a known one.
    pub fn widest_path(&self, src: VertexId, dst: VertexId) -> Path {
        self.max_path(src, dst, |p| self.known_path_bandwidth(p))
    }
}

/// Stable extremal selection: a later candidate replaces the incumbent only
/// if it is strictly better.
fn select<C, B>(paths: Vec<Path>, cost: C, better: B) -> Path
where
    C: Fn(&Path) -> f64,
    B: Fn(f64, f64) -> bool,
{
    let mut best: Option<(Path, f64)> = None;
    for path in paths {
        let score = cost(&path);
        match &best {
            Some((_, incumbent)) if !better(score, *incumbent) => {}
            _ => best = Some((path, score)),
        }
    }
    best.map(|(path, _)| path).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeId, Vertex, XBUS_GIB};

    #[test]
    fn test_empty_path_bandwidth_is_sentinel() {
        let g = Graph::new();
        assert_eq!(g.path_bandwidth(&Path::new()), NO_PATH_BANDWIDTH);
        assert_eq!(g.known_path_bandwidth(&Path::new()), NO_PATH_BANDWIDTH);
    }

    #[test]
    fn test_path_bandwidth_is_bottleneck() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let c = g.add_vertex(Vertex::default());
        let wide = g.connect(a, b, Edge::new_xbus(10));
        let narrow = g.connect(b, c, Edge::new_xbus(3));

        let path: Path = [wide, narrow].into_iter().collect();
        assert_eq!(g.path_bandwidth(&path), 3.0);
    }

    #[test]
    fn test_known_bandwidth_with_unknown_edge() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let c = g.add_vertex(Vertex::default());
        let known = g.connect(a, b, Edge::new_xbus(10));
        let unknown = g.connect(b, c, Edge::unknown());

        assert_eq!(g.known_path_bandwidth(&Path::single(known)), 10.0);
        let path: Path = [known, unknown].into_iter().collect();
        assert_eq!(g.known_path_bandwidth(&path), NO_PATH_BANDWIDTH);
    }

    #[test]
    #[should_panic(expected = "unknown edge")]
    fn test_path_bandwidth_panics_on_unknown_edge() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let e = g.connect(a, b, Edge::unknown());
        g.path_bandwidth(&Path::single(e));
    }

    /// a–b direct over a slow link, and a–c–b over fast links.
    fn two_routes() -> (Graph, VertexId, VertexId, EdgeId, [EdgeId; 2]) {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::unknown("a"));
        let b = g.add_vertex(Vertex::unknown("b"));
        let c = g.add_vertex(Vertex::unknown("c"));
        let slow = g.connect(a, b, Edge::new_xbus(XBUS_GIB));
        let ac = g.connect(a, c, Edge::new_xbus(64 * XBUS_GIB));
        let cb = g.connect(c, b, Edge::new_xbus(32 * XBUS_GIB));
        (g, a, b, slow, [ac, cb])
    }

    #[test]
    fn test_min_and_max_path() {
        let (g, a, b, slow, fast) = two_routes();

        let widest = g.max_path(a, b, |p| g.path_bandwidth(p));
        assert_eq!(widest.edges(), &fast);
        assert_eq!(g.widest_path(a, b), widest);

        let narrowest = g.min_path(a, b, |p| g.path_bandwidth(p));
        assert_eq!(narrowest.edges(), &[slow]);

        let fewest_hops = g.min_path(a, b, |p| p.len() as f64);
        assert_eq!(fewest_hops.edges(), &[slow]);
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        let first = g.connect(a, b, Edge::new_xbus(5));
        g.connect(a, b, Edge::new_xbus(5));

        assert_eq!(g.paths(a, b)[0].edges(), &[first]);
        assert_eq!(g.max_path(a, b, |p| g.path_bandwidth(p)).edges(), &[first]);
        assert_eq!(g.min_path(a, b, |p| g.path_bandwidth(p)).edges(), &[first]);
    }

    #[test]
    fn test_no_path_is_empty() {
        let mut g = Graph::new();
        let a = g.add_vertex(Vertex::default());
        let b = g.add_vertex(Vertex::default());
        assert!(g.max_path(a, b, |p| g.path_bandwidth(p)).is_empty());
        assert!(g.min_path(a, b, |p| g.path_bandwidth(p)).is_empty());
    }
}
