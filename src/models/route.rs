//! Route and stop types.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{Location, PackageId};

/// A single stop within a truck's route.
///
/// `leg_distance` is the shortest-path distance driven from the previous
/// stop (or the hub, for the first stop) to reach this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Where the truck stops.
    pub location: Location,
    /// Packages dropped off here, in load order.
    pub package_ids: Vec<PackageId>,
    /// Miles driven to get here from the previous stop.
    pub leg_distance: f64,
}

/// An ordered sequence of stops driven by one truck, starting at the hub.
///
/// # Examples
///
/// ```
/// use u_delivery::models::{Location, Route, Stop};
///
/// let mut route = Route::new();
/// route.push_stop(Stop {
///     location: Location::new("A"),
///     package_ids: vec![1, 2],
///     leg_distance: 4.0,
/// });
/// route.set_return_distance(Some(4.0));
/// assert_eq!(route.len(), 1);
/// assert_eq!(route.total_distance(), 8.0);
/// assert_eq!(route.package_ids(), vec![1, 2]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    stops: Vec<Stop>,
    return_distance: Option<f64>,
    #[serde(default)]
    departure: Option<NaiveTime>,
}

impl Route {
    /// Creates an empty route.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stop to the end of this route.
    pub fn push_stop(&mut self, stop: Stop) {
        self.stops.push(stop);
    }

    /// Sets the distance of the final leg back to the hub.
    pub fn set_return_distance(&mut self, distance: Option<f64>) {
        self.return_distance = distance;
    }

    /// Pins the time this route leaves the hub, overriding the truck's
    /// default departure.
    pub fn set_departure(&mut self, departure: Option<NaiveTime>) {
        self.departure = departure;
    }

    /// Time this route leaves the hub, if pinned.
    pub fn departure(&self) -> Option<NaiveTime> {
        self.departure
    }

    /// Ordered stops.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Distance of the leg back to the hub, if the truck returns.
    pub fn return_distance(&self) -> Option<f64> {
        self.return_distance
    }

    /// Number of stops.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Returns `true` if the route has no stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// All package ids carried, in delivery order.
    pub fn package_ids(&self) -> Vec<PackageId> {
        self.stops
            .iter()
            .flat_map(|s| s.package_ids.iter().copied())
            .collect()
    }

    /// Number of packages carried.
    pub fn num_packages(&self) -> usize {
        self.stops.iter().map(|s| s.package_ids.len()).sum()
    }

    /// Index of the stop delivering `package_id`.
    pub fn stop_of(&self, package_id: PackageId) -> Option<usize> {
        self.stops
            .iter()
            .position(|s| s.package_ids.contains(&package_id))
    }

    /// Total miles, including the return leg.
    pub fn total_distance(&self) -> f64 {
        self.stops.iter().map(|s| s.leg_distance).sum::<f64>()
            + self.return_distance.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(name: &str, ids: &[PackageId], leg: f64) -> Stop {
        Stop {
            location: Location::new(name),
            package_ids: ids.to_vec(),
            leg_distance: leg,
        }
    }

    #[test]
    fn test_route_empty() {
        let r = Route::new();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.total_distance(), 0.0);
        assert_eq!(r.num_packages(), 0);
        assert!(r.departure().is_none());
    }

    #[test]
    fn test_route_totals() {
        let mut r = Route::new();
        r.push_stop(stop("A", &[5, 3], 2.5));
        r.push_stop(stop("B", &[7], 1.5));
        assert_eq!(r.package_ids(), vec![5, 3, 7]);
        assert_eq!(r.num_packages(), 3);
        assert!((r.total_distance() - 4.0).abs() < 1e-10);

        r.set_return_distance(Some(3.0));
        assert!((r.total_distance() - 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_stop_of() {
        let mut r = Route::new();
        r.push_stop(stop("A", &[1], 1.0));
        r.push_stop(stop("B", &[2, 4], 1.0));
        assert_eq!(r.stop_of(4), Some(1));
        assert_eq!(r.stop_of(1), Some(0));
        assert_eq!(r.stop_of(9), None);
    }
}
