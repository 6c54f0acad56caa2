//! Package, deadline, and delivery status types.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{ConstraintSet, Location, TruckId};

/// Unique package identifier.
pub type PackageId = u32;

/// Latest acceptable delivery time for a package.
///
/// Every timed deadline orders before [`Deadline::EndOfDay`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use u_delivery::models::Deadline;
///
/// let by = Deadline::By(NaiveTime::from_hms_opt(10, 30, 0).unwrap());
/// assert!(by.is_met_by(NaiveTime::from_hms_opt(10, 20, 0).unwrap()));
/// assert!(!by.is_met_by(NaiveTime::from_hms_opt(10, 31, 0).unwrap()));
/// assert!(by < Deadline::EndOfDay);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Deadline {
    /// No specific time; anything delivered during the day is on time.
    #[default]
    EndOfDay,
    /// Must be delivered at or before the given time of day.
    By(NaiveTime),
}

impl Deadline {
    /// The deadline time, or `None` for end of day.
    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            Deadline::EndOfDay => None,
            Deadline::By(t) => Some(*t),
        }
    }

    /// Returns `true` for a timed deadline.
    pub fn is_timed(&self) -> bool {
        matches!(self, Deadline::By(_))
    }

    /// Returns `true` if arriving at `arrival` meets this deadline.
    pub fn is_met_by(&self, arrival: NaiveTime) -> bool {
        match self {
            Deadline::EndOfDay => true,
            Deadline::By(t) => arrival <= *t,
        }
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Deadline::EndOfDay, Deadline::EndOfDay) => Ordering::Equal,
            (Deadline::EndOfDay, Deadline::By(_)) => Ordering::Greater,
            (Deadline::By(_), Deadline::EndOfDay) => Ordering::Less,
            (Deadline::By(a), Deadline::By(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deadline::EndOfDay => f.write_str("EOD"),
            Deadline::By(t) => write!(f, "{}", t.format("%H:%M")),
        }
    }
}

/// Where a package is in its delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PackageStatus {
    /// Waiting at the hub (unassigned, or its truck has not left yet).
    #[default]
    AtHub,
    /// On a truck that has left the hub but not reached the package's stop.
    EnRoute,
    /// Dropped off at its destination.
    Delivered,
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageStatus::AtHub => "at hub",
            PackageStatus::EnRoute => "en route",
            PackageStatus::Delivered => "delivered",
        };
        f.write_str(s)
    }
}

/// An already-parsed manifest row handed to the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package id.
    pub id: PackageId,
    /// Destination, in the same canonical form as the distance graph.
    pub location: Location,
    /// Delivery deadline.
    #[serde(default)]
    pub deadline: Deadline,
    /// Weight in kilograms.
    pub weight: f64,
    /// Note-derived loading constraints.
    #[serde(default)]
    pub constraints: ConstraintSet,
}

/// A package tracked by the fleet.
///
/// Identity, destination, deadline, weight and constraints come from the
/// manifest. Status, truck assignment and delivery time are written only by
/// the fleet when it commits a routing plan or a simulated status.
///
/// # Examples
///
/// ```
/// use u_delivery::models::{Deadline, Location, Package, PackageStatus};
///
/// let p = Package::new(1, Location::new("195 W Oakland Ave"), Deadline::EndOfDay, 21.0);
/// assert_eq!(p.id(), 1);
/// assert_eq!(p.status(), PackageStatus::AtHub);
/// assert!(p.assigned_truck().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    id: PackageId,
    location: Location,
    deadline: Deadline,
    weight: f64,
    constraints: ConstraintSet,
    status: PackageStatus,
    assigned_truck: Option<TruckId>,
    delivered_at: Option<NaiveTime>,
}

impl Package {
    /// Creates a package at the hub with no constraints.
    pub fn new(id: PackageId, location: Location, deadline: Deadline, weight: f64) -> Self {
        Self {
            id,
            location,
            deadline,
            weight,
            constraints: ConstraintSet::default(),
            status: PackageStatus::AtHub,
            assigned_truck: None,
            delivered_at: None,
        }
    }

    /// Sets the loading constraints.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Package id.
    pub fn id(&self) -> PackageId {
        self.id
    }

    /// Destination.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Delivery deadline.
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Weight in kilograms.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Loading constraints.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Last committed status.
    pub fn status(&self) -> PackageStatus {
        self.status
    }

    /// Truck the current plan put this package on.
    pub fn assigned_truck(&self) -> Option<TruckId> {
        self.assigned_truck
    }

    /// Committed delivery time, once delivered.
    pub fn delivered_at(&self) -> Option<NaiveTime> {
        self.delivered_at
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Drops `must_accompany` links to packages `keep` rejects.
    pub(crate) fn retain_companions(&mut self, keep: impl FnMut(&PackageId) -> bool) {
        self.constraints.retain_accompany(keep);
    }

    pub(crate) fn set_assigned_truck(&mut self, truck: Option<TruckId>) {
        self.assigned_truck = truck;
    }

    pub(crate) fn set_delivery_state(&mut self, status: PackageStatus, delivered_at: Option<NaiveTime>) {
        self.status = status;
        self.delivered_at = delivered_at;
    }
}

impl From<PackageRecord> for Package {
    fn from(record: PackageRecord) -> Self {
        Package::new(record.id, record.location, record.deadline, record.weight)
            .with_constraints(record.constraints)
    }
}
