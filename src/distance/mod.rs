//! Road distances between delivery locations.
//!
//! Provides a symmetric distance graph answering direct-distance and
//! Dijkstra shortest-path queries.

mod graph;

pub use graph::DistanceGraph;
