//! Constraint-aware truck loading.
//!
//! Turns an unordered package registry into one ordered route per truck,
//! honoring capacity, required trucks, earliest-load times and co-delivery
//! groups, with deadline-at-risk packages pulled forward.

mod loader;
mod units;

pub use loader::{LoadPlan, RouteLoader, Unassignable};
