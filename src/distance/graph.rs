//! Symmetric weighted distance graph with Dijkstra shortest paths.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::error::{Result, RoutingError};
use crate::models::Location;

/// Distances closer than this are treated as ties.
const EPS: f64 = 1e-9;

/// A symmetric, immutable graph of road distances between named locations.
///
/// The self-distance of every location is implicitly zero. Lookups on a
/// location absent from the graph fail with
/// [`RoutingError::UnknownLocation`] rather than returning zero.
///
/// # Examples
///
/// ```
/// use u_delivery::distance::DistanceGraph;
/// use u_delivery::models::Location;
///
/// let hub = Location::new("Hub");
/// let a = Location::new("A");
/// let b = Location::new("B");
/// let graph = DistanceGraph::from_edges([
///     (hub.clone(), a.clone(), 4.0),
///     (hub.clone(), b.clone(), 3.0),
///     (a.clone(), b.clone(), 2.0),
/// ])
/// .unwrap();
///
/// assert_eq!(graph.distance(&a, &hub).unwrap(), 4.0);
/// assert_eq!(graph.shortest_path(&hub, &b).unwrap(), vec![hub.clone(), b.clone()]);
/// assert_eq!(graph.shortest_distance(&hub, &b).unwrap(), 3.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DistanceGraph {
    adjacency: BTreeMap<Location, BTreeMap<Location, f64>>,
}

impl DistanceGraph {
    /// Builds a graph from undirected `(a, b, distance)` edges.
    ///
    /// Distances must be finite and positive. The same pair may appear more
    /// than once (in either direction) only with the same distance.
    pub fn from_edges(edges: impl IntoIterator<Item = (Location, Location, f64)>) -> Result<Self> {
        let mut graph = Self::default();
        for (a, b, d) in edges {
            graph.insert_edge(a, b, d)?;
        }
        Ok(graph)
    }

    /// Builds a graph from a distance table with one row per location.
    ///
    /// Cell `rows[i][j]` is the distance between `locations[i]` and
    /// `locations[j]`. Both lower-triangular and full square tables are
    /// accepted: the diagonal is ignored, blank (`None`) cells add no edge,
    /// and a cell given in both halves must agree with its mirror.
    pub fn from_matrix(locations: &[Location], rows: &[Vec<Option<f64>>]) -> Result<Self> {
        let mut graph = Self::default();
        for loc in locations {
            graph.adjacency.entry(loc.clone()).or_default();
        }
        for (i, row) in rows.iter().enumerate().take(locations.len()) {
            for (j, cell) in row.iter().enumerate().take(locations.len()) {
                if i == j {
                    continue;
                }
                if let Some(d) = cell {
                    graph.insert_edge(locations[i].clone(), locations[j].clone(), *d)?;
                }
            }
        }
        Ok(graph)
    }

    /// Adds a location with no edges.
    pub fn with_location(mut self, location: Location) -> Self {
        self.adjacency.entry(location).or_default();
        self
    }

    fn insert_edge(&mut self, a: Location, b: Location, d: f64) -> Result<()> {
        if a == b {
            if d != 0.0 {
                return Err(RoutingError::InvalidDistance {
                    from: a,
                    to: b,
                    distance: d,
                });
            }
            self.adjacency.entry(a).or_default();
            return Ok(());
        }
        if !d.is_finite() || d <= 0.0 {
            return Err(RoutingError::InvalidDistance {
                from: a,
                to: b,
                distance: d,
            });
        }
        if let Some(&existing) = self.adjacency.get(&a).and_then(|n| n.get(&b)) {
            if (existing - d).abs() > EPS {
                return Err(RoutingError::AsymmetricDistance {
                    from: a,
                    to: b,
                    first: existing,
                    second: d,
                });
            }
            return Ok(());
        }
        self.adjacency.entry(a.clone()).or_default().insert(b.clone(), d);
        self.adjacency.entry(b).or_default().insert(a, d);
        Ok(())
    }

    /// Returns `true` if the location is a node of this graph.
    pub fn contains(&self, location: &Location) -> bool {
        self.adjacency.contains_key(location)
    }

    /// All locations, in name order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.adjacency.keys()
    }

    /// Number of locations.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns `true` if the graph has no locations.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    fn require(&self, location: &Location) -> Result<&BTreeMap<Location, f64>> {
        self.adjacency
            .get(location)
            .ok_or_else(|| RoutingError::UnknownLocation(location.clone()))
    }

    /// Returns the stored direct distance between two locations.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownLocation`] if either end is absent, and
    /// [`RoutingError::NoDirectEdge`] if both exist but no distance was given
    /// between them.
    pub fn distance(&self, a: &Location, b: &Location) -> Result<f64> {
        let neighbors = self.require(a)?;
        self.require(b)?;
        if a == b {
            return Ok(0.0);
        }
        neighbors.get(b).copied().ok_or_else(|| RoutingError::NoDirectEdge {
            from: a.clone(),
            to: b.clone(),
        })
    }

    /// Computes the minimum-distance path from `start` to `end`, inclusive.
    ///
    /// Equal-distance paths are resolved in favor of fewer hops, then of the
    /// predecessor that sorts first by name.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownLocation`] for an absent endpoint and
    /// [`RoutingError::Unreachable`] if no path connects the two.
    pub fn shortest_path(&self, start: &Location, end: &Location) -> Result<Vec<Location>> {
        self.dijkstra(start, end).map(|(_, path)| path)
    }

    /// Total distance along [`shortest_path`](Self::shortest_path).
    pub fn shortest_distance(&self, start: &Location, end: &Location) -> Result<f64> {
        self.dijkstra(start, end).map(|(d, _)| d)
    }

    /// Returns the candidate closest to `from` by shortest distance.
    ///
    /// Ties go to the candidate that sorts first by name. Returns `Ok(None)`
    /// if `candidates` is empty.
    pub fn nearest_neighbor<'c>(
        &self,
        from: &Location,
        candidates: &'c [Location],
    ) -> Result<Option<&'c Location>> {
        let mut best: Option<(&Location, f64)> = None;
        for c in candidates {
            let d = self.shortest_distance(from, c)?;
            let closer = match best {
                None => true,
                Some((b, bd)) => d < bd - EPS || ((d - bd).abs() <= EPS && c < b),
            };
            if closer {
                best = Some((c, d));
            }
        }
        Ok(best.map(|(c, _)| c))
    }

    /// Returns `true` if every stored distance matches its mirror within `tol`.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.adjacency.iter().all(|(a, neighbors)| {
            neighbors.iter().all(|(b, d)| {
                self.adjacency
                    .get(b)
                    .and_then(|n| n.get(a))
                    .is_some_and(|back| (back - d).abs() <= tol)
            })
        })
    }

    fn dijkstra(&self, start: &Location, end: &Location) -> Result<(f64, Vec<Location>)> {
        self.require(start)?;
        self.require(end)?;

        // Best known (distance, hops, predecessor) per node.
        let mut best: BTreeMap<&Location, Label<'_>> = BTreeMap::new();
        let mut settled: BTreeSet<&Location> = BTreeSet::new();
        let mut frontier = BinaryHeap::new();

        let (start_key, _) = self
            .adjacency
            .get_key_value(start)
            .ok_or_else(|| RoutingError::UnknownLocation(start.clone()))?;
        best.insert(start_key, Label { dist: 0.0, hops: 0, prev: None });
        frontier.push(Frontier { dist: 0.0, hops: 0, node: start_key });

        while let Some(Frontier { dist, hops, node }) = frontier.pop() {
            if settled.contains(node) {
                continue;
            }
            // Stale entry: a better label was pushed after this one.
            if let Some(label) = best.get(node) {
                if dist > label.dist + EPS || (dist >= label.dist - EPS && hops > label.hops) {
                    continue;
                }
            }
            settled.insert(node);
            if node == end {
                break;
            }

            for (next, w) in &self.adjacency[node] {
                if settled.contains(next) {
                    continue;
                }
                let cand = Label { dist: dist + w, hops: hops + 1, prev: Some(node) };
                let improves = best.get(next).is_none_or(|cur| cand.beats(cur));
                if improves {
                    best.insert(next, cand);
                    frontier.push(Frontier { dist: cand.dist, hops: cand.hops, node: next });
                }
            }
        }

        let total = match best.get(end) {
            Some(label) if settled.contains(end) => label.dist,
            _ => {
                return Err(RoutingError::Unreachable {
                    from: start.clone(),
                    to: end.clone(),
                })
            }
        };

        let mut path = vec![end.clone()];
        let mut cursor = end;
        while let Some(prev) = best.get(cursor).and_then(|l| l.prev) {
            path.push(prev.clone());
            cursor = prev;
        }
        path.reverse();
        Ok((total, path))
    }
}

#[derive(Debug, Clone, Copy)]
struct Label<'a> {
    dist: f64,
    hops: usize,
    prev: Option<&'a Location>,
}

impl Label<'_> {
    fn beats(&self, other: &Label<'_>) -> bool {
        if self.dist < other.dist - EPS {
            return true;
        }
        if self.dist > other.dist + EPS {
            return false;
        }
        match self.hops.cmp(&other.hops) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => match (self.prev, other.prev) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
        }
    }
}

/// Min-heap entry ordered by (distance, hops, name).
#[derive(Debug)]
struct Frontier<'a> {
    dist: f64,
    hops: usize,
    node: &'a Location,
}

impl Ord for Frontier<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| other.node.cmp(self.node))
    }
}

impl PartialOrd for Frontier<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn loc(s: &str) -> Location {
        Location::new(s)
    }

    fn triangle() -> DistanceGraph {
        DistanceGraph::from_edges([
            (loc("Hub"), loc("A"), 4.0),
            (loc("Hub"), loc("B"), 3.0),
            (loc("A"), loc("B"), 2.0),
        ])
        .expect("valid edges")
    }

    #[test]
    fn test_distance_symmetric() {
        let g = triangle();
        assert_eq!(g.distance(&loc("A"), &loc("Hub")).expect("edge"), 4.0);
        assert_eq!(g.distance(&loc("Hub"), &loc("A")).expect("edge"), 4.0);
        assert_eq!(g.distance(&loc("A"), &loc("A")).expect("self"), 0.0);
        assert!(g.is_symmetric(1e-10));
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn test_unknown_location() {
        let g = triangle();
        assert_eq!(
            g.distance(&loc("Hub"), &loc("Z")),
            Err(RoutingError::UnknownLocation(loc("Z")))
        );
        assert!(matches!(
            g.shortest_path(&loc("Z"), &loc("A")),
            Err(RoutingError::UnknownLocation(_))
        ));
    }

    #[test]
    fn test_triangle_paths() {
        let g = triangle();
        assert_eq!(g.shortest_path(&loc("Hub"), &loc("B")).expect("path"), vec![loc("Hub"), loc("B")]);
        assert_eq!(g.shortest_distance(&loc("Hub"), &loc("B")).expect("path"), 3.0);
        assert!(g.shortest_distance(&loc("A"), &loc("B")).expect("path") <= 2.0);
        assert_eq!(g.shortest_path(&loc("A"), &loc("A")).expect("path"), vec![loc("A")]);
    }

    #[test]
    fn test_detour_shorter_than_direct() {
        let g = DistanceGraph::from_edges([
            (loc("Hub"), loc("A"), 10.0),
            (loc("Hub"), loc("B"), 3.0),
            (loc("B"), loc("A"), 2.0),
        ])
        .expect("valid edges");
        assert_eq!(
            g.shortest_path(&loc("Hub"), &loc("A")).expect("path"),
            vec![loc("Hub"), loc("B"), loc("A")]
        );
        assert_eq!(g.shortest_distance(&loc("Hub"), &loc("A")).expect("path"), 5.0);
        assert_eq!(g.distance(&loc("Hub"), &loc("A")).expect("edge"), 10.0);
    }

    #[test]
    fn test_tie_prefers_fewer_hops() {
        // Hub→C direct is 4, Hub→A→C is also 4.
        let g = DistanceGraph::from_edges([
            (loc("Hub"), loc("A"), 2.0),
            (loc("A"), loc("C"), 2.0),
            (loc("Hub"), loc("C"), 4.0),
        ])
        .expect("valid edges");
        assert_eq!(g.shortest_path(&loc("Hub"), &loc("C")).expect("path"), vec![loc("Hub"), loc("C")]);
    }

    #[test]
    fn test_tie_prefers_name_order() {
        // Two equal two-hop paths through A and B.
        let g = DistanceGraph::from_edges([
            (loc("Hub"), loc("B"), 1.0),
            (loc("B"), loc("Z"), 1.0),
            (loc("Hub"), loc("A"), 1.0),
            (loc("A"), loc("Z"), 1.0),
        ])
        .expect("valid edges");
        assert_eq!(
            g.shortest_path(&loc("Hub"), &loc("Z")).expect("path"),
            vec![loc("Hub"), loc("A"), loc("Z")]
        );
    }

    #[test]
    fn test_unreachable() {
        let g = triangle().with_location(loc("Island"));
        assert!(g.contains(&loc("Island")));
        assert_eq!(
            g.shortest_path(&loc("Hub"), &loc("Island")),
            Err(RoutingError::Unreachable {
                from: loc("Hub"),
                to: loc("Island"),
            })
        );
        assert!(matches!(
            g.distance(&loc("Hub"), &loc("Island")),
            Err(RoutingError::NoDirectEdge { .. })
        ));
    }

    #[test]
    fn test_invalid_and_asymmetric_edges() {
        assert!(matches!(
            DistanceGraph::from_edges([(loc("A"), loc("B"), 0.0)]),
            Err(RoutingError::InvalidDistance { .. })
        ));
        assert!(matches!(
            DistanceGraph::from_edges([(loc("A"), loc("B"), f64::NAN)]),
            Err(RoutingError::InvalidDistance { .. })
        ));
        assert!(matches!(
            DistanceGraph::from_edges([(loc("A"), loc("B"), 2.0), (loc("B"), loc("A"), 3.0)]),
            Err(RoutingError::AsymmetricDistance { .. })
        ));
        assert!(DistanceGraph::from_edges([(loc("A"), loc("B"), 2.0), (loc("B"), loc("A"), 2.0)]).is_ok());
    }

    #[test]
    fn test_from_lower_triangular_matrix() {
        let locs = vec![loc("Hub"), loc("A"), loc("B")];
        let rows = vec![
            vec![Some(0.0)],
            vec![Some(4.0), Some(0.0)],
            vec![Some(3.0), Some(2.0), Some(0.0)],
        ];
        let g = DistanceGraph::from_matrix(&locs, &rows).expect("valid table");
        assert_eq!(g.distance(&loc("Hub"), &loc("B")).expect("edge"), 3.0);
        assert_eq!(g.distance(&loc("B"), &loc("A")).expect("edge"), 2.0);
    }

    #[test]
    fn test_from_square_matrix_with_blanks() {
        let locs = vec![loc("Hub"), loc("A"), loc("B")];
        let rows = vec![
            vec![Some(0.0), Some(4.0), None],
            vec![Some(4.0), Some(0.0), Some(2.0)],
            vec![None, Some(2.0), Some(0.0)],
        ];
        let g = DistanceGraph::from_matrix(&locs, &rows).expect("valid table");
        assert!(matches!(
            g.distance(&loc("Hub"), &loc("B")),
            Err(RoutingError::NoDirectEdge { .. })
        ));
        assert_eq!(g.shortest_distance(&loc("Hub"), &loc("B")).expect("path"), 6.0);
    }

    #[test]
    fn test_nearest_neighbor() {
        let g = triangle();
        let cands = vec![loc("A"), loc("B")];
        assert_eq!(g.nearest_neighbor(&loc("Hub"), &cands).expect("known"), Some(&loc("B")));
        assert_eq!(g.nearest_neighbor(&loc("Hub"), &[]).expect("known"), None);
    }

    fn complete_graph(weights: &[f64]) -> (DistanceGraph, Vec<Location>) {
        // Smallest n with n*(n-1)/2 <= weights.len().
        let mut n = 2;
        while (n + 1) * n / 2 <= weights.len() {
            n += 1;
        }
        let locs: Vec<Location> = (0..n).map(|i| loc(&format!("L{i}"))).collect();
        let mut edges = Vec::new();
        let mut k = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                edges.push((locs[i].clone(), locs[j].clone(), weights[k]));
                k += 1;
            }
        }
        (DistanceGraph::from_edges(edges).expect("positive weights"), locs)
    }

    proptest! {
        #[test]
        fn prop_shortest_never_exceeds_direct(weights in prop::collection::vec(0.5f64..50.0, 1..36)) {
            let (g, locs) = complete_graph(&weights);
            for a in &locs {
                for b in &locs {
                    let direct = g.distance(a, b).expect("complete graph");
                    prop_assert_eq!(direct, g.distance(b, a).expect("complete graph"));
                    let shortest = g.shortest_distance(a, b).expect("connected");
                    prop_assert!(shortest <= direct + 1e-9);
                }
            }
        }

        #[test]
        fn prop_path_weight_matches_distance(weights in prop::collection::vec(0.5f64..50.0, 1..36)) {
            let (g, locs) = complete_graph(&weights);
            let start = &locs[0];
            for end in &locs {
                let path = g.shortest_path(start, end).expect("connected");
                prop_assert_eq!(path.first(), Some(start));
                prop_assert_eq!(path.last(), Some(end));
                let summed: f64 = path
                    .windows(2)
                    .map(|w| g.distance(&w[0], &w[1]).expect("path edges exist"))
                    .sum();
                let shortest = g.shortest_distance(start, end).expect("connected");
                prop_assert!((summed - shortest).abs() < 1e-6);
            }
        }
    }
}
