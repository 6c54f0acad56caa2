//! Domain model types for the delivery fleet.
//!
//! Provides the core abstractions: canonical locations, packages with
//! deadlines and note-derived constraints, trucks with capacity and speed,
//! and routes as ordered sequences of stops.

mod constraint;
mod location;
mod package;
mod route;
mod truck;

pub use constraint::ConstraintSet;
pub use location::Location;
pub use package::{Deadline, Package, PackageId, PackageRecord, PackageStatus};
pub use route::{Route, Stop};
pub use truck::{Truck, TruckId};
