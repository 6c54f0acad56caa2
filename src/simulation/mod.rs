//! Time-stepped delivery replay.
//!
//! Turns committed truck routes into per-stop arrival times and answers
//! "where is every package at time T" and "how far has each truck driven
//! by time T" without mutating the routes.

mod clock;
mod simulator;

pub(crate) use clock::{advance, end_of_day, minutes_between, travel_minutes};
pub use simulator::{DeliverySimulator, PackageSnapshot, StatusReport, TruckSchedule};
