//! # u-delivery
//!
//! Same-day delivery fleet simulation: shortest-path distances over a road
//! graph, deadline-aware truck loading under package constraints, and
//! time-stepped replay of the resulting routes.
//!
//! ## Modules
//!
//! - [`models`] — Domain types (Location, Package, ConstraintSet, Truck, Route)
//! - [`distance`] — Undirected distance graph with Dijkstra shortest paths
//! - [`loading`] — Greedy nearest-neighbor loader with capacity and grouping rules
//! - [`simulation`] — Pure status and mileage derivation at a query time
//! - [`fleet`] — Fleet state tying the graph, packages, and trucks together
//! - [`config`] — Fleet-wide settings
//! - [`error`] — Error type shared by every module

pub mod config;
pub mod distance;
pub mod error;
pub mod fleet;
pub mod loading;
pub mod models;
pub mod simulation;

pub use error::{Result, RoutingError};
pub use fleet::FleetState;
