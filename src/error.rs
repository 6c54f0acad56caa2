//! Error kinds raised by the routing engine.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::{Location, PackageId, TruckId};

/// The loading rule a package could not satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadRule {
    /// No eligible truck had room left for the package (or its whole group).
    Capacity,
    /// The required truck does not exist in the fleet.
    RequiredTruck,
    /// Members of one co-delivery group require different trucks.
    ConflictingRequiredTrucks,
    /// No truck leaves the hub at or after the package's earliest load time.
    NoLoadBefore,
}

impl fmt::Display for LoadRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadRule::Capacity => "truck capacity",
            LoadRule::RequiredTruck => "required truck",
            LoadRule::ConflictingRequiredTrucks => "conflicting required trucks in group",
            LoadRule::NoLoadBefore => "no load before",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the distance graph, the loader, and the fleet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    #[error("unknown location: {0}")]
    UnknownLocation(Location),

    #[error("no path from {from} to {to}")]
    Unreachable { from: Location, to: Location },

    #[error("no direct distance stored between {from} and {to}")]
    NoDirectEdge { from: Location, to: Location },

    #[error("invalid distance {distance} between {from} and {to}")]
    InvalidDistance {
        from: Location,
        to: Location,
        distance: f64,
    },

    #[error("distance between {from} and {to} given as both {first} and {second}")]
    AsymmetricDistance {
        from: Location,
        to: Location,
        first: f64,
        second: f64,
    },

    #[error("package {package_id} cannot be loaded: {rule}")]
    UnassignablePackage { package_id: PackageId, rule: LoadRule },

    #[error("no computed routes cover {at}; run compute_routes first")]
    StaleRouteQuery { at: NaiveTime },

    #[error("unknown package: {0}")]
    UnknownPackage(PackageId),

    #[error("unknown truck: {0}")]
    UnknownTruck(TruckId),

    #[error("duplicate package id: {0}")]
    DuplicatePackage(PackageId),

    #[error("duplicate truck id: {0}")]
    DuplicateTruck(TruckId),

    #[error("truck {truck} has invalid speed {speed} mph")]
    InvalidSpeed { truck: TruckId, speed: f64 },

    #[cfg(feature = "json")]
    #[error("invalid fleet configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = RoutingError::UnassignablePackage {
            package_id: 14,
            rule: LoadRule::Capacity,
        };
        assert_eq!(err.to_string(), "package 14 cannot be loaded: truck capacity");

        let err = RoutingError::UnknownLocation(Location::new("410 S State St"));
        assert_eq!(err.to_string(), "unknown location: 410 S State St");
    }

    #[test]
    fn test_invalid_speed_message() {
        let err = RoutingError::InvalidSpeed { truck: 3, speed: 0.0 };
        assert_eq!(err.to_string(), "truck 3 has invalid speed 0 mph");
    }

    #[test]
    fn test_stale_query_message() {
        let at = NaiveTime::from_hms_opt(9, 5, 0).expect("valid");
        let err = RoutingError::StaleRouteQuery { at };
        assert!(err.to_string().contains("09:05:00"));
    }
}
