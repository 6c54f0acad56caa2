//! Truck type with capacity, speed and departure time.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::Route;

/// Unique truck identifier.
pub type TruckId = u32;

/// A delivery truck.
///
/// The route is `None` until the fleet commits a routing plan, and is
/// replaced wholesale on every recomputation.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use u_delivery::models::Truck;
///
/// let t = Truck::new(1, 16, 18.0);
/// assert_eq!(t.id(), 1);
/// assert_eq!(t.capacity(), 16);
/// assert_eq!(t.departure(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
/// assert!(t.route().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    id: TruckId,
    capacity: usize,
    speed_mph: f64,
    departure: NaiveTime,
    route: Option<Route>,
}

impl Truck {
    /// Creates a truck leaving the hub at 08:00.
    pub fn new(id: TruckId, capacity: usize, speed_mph: f64) -> Self {
        Self {
            id,
            capacity,
            speed_mph,
            departure: crate::config::default_departure(),
            route: None,
        }
    }

    /// Sets the time the truck leaves the hub.
    pub fn with_departure(mut self, departure: NaiveTime) -> Self {
        self.departure = departure;
        self
    }

    /// Truck id.
    pub fn id(&self) -> TruckId {
        self.id
    }

    /// Maximum number of packages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Average speed in miles per hour.
    pub fn speed_mph(&self) -> f64 {
        self.speed_mph
    }

    /// Time the truck leaves the hub.
    pub fn departure(&self) -> NaiveTime {
        self.departure
    }

    /// Committed route, if any.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub(crate) fn set_route(&mut self, route: Option<Route>) {
        self.route = route;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truck_builder() {
        let late = NaiveTime::from_hms_opt(9, 5, 0).expect("valid");
        let t = Truck::new(2, 10, 25.0).with_departure(late);
        assert_eq!(t.id(), 2);
        assert_eq!(t.capacity(), 10);
        assert_eq!(t.speed_mph(), 25.0);
        assert_eq!(t.departure(), late);
    }

    #[test]
    fn test_route_replaced() {
        let mut t = Truck::new(1, 16, 18.0);
        t.set_route(Some(Route::new()));
        assert!(t.route().is_some());
        t.set_route(None);
        assert!(t.route().is_none());
    }
}
