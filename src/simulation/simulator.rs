//! Pure, time-indexed replay of committed truck routes.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::config::FleetConfig;
use crate::models::{PackageId, PackageStatus, Truck, TruckId};

use super::clock::{advance, travel_minutes};

/// Timing of one truck's route: departure, per-stop arrivals, and return.
#[derive(Debug, Clone, PartialEq)]
pub struct TruckSchedule {
    /// Truck this schedule belongs to.
    pub truck_id: TruckId,
    /// Time the truck leaves the hub.
    pub departure: NaiveTime,
    /// Arrival time at each stop, in route order.
    pub arrivals: Vec<NaiveTime>,
    /// Time the truck is back at the hub, if it returns.
    pub returned_at: Option<NaiveTime>,
}

/// A package's derived state at a query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSnapshot {
    /// Derived status.
    pub status: PackageStatus,
    /// Truck carrying the package, if assigned.
    pub truck: Option<TruckId>,
    /// Arrival time at the package's stop, once delivered.
    pub delivered_at: Option<NaiveTime>,
}

/// Status of every package at one query time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    at: NaiveTime,
    packages: BTreeMap<PackageId, PackageSnapshot>,
}

impl StatusReport {
    /// Query time this report describes.
    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// Snapshot of one package.
    pub fn get(&self, id: PackageId) -> Option<&PackageSnapshot> {
        self.packages.get(&id)
    }

    /// Status of one package.
    pub fn status(&self, id: PackageId) -> Option<PackageStatus> {
        self.packages.get(&id).map(|s| s.status)
    }

    /// All snapshots in package id order.
    pub fn iter(&self) -> impl Iterator<Item = (&PackageId, &PackageSnapshot)> {
        self.packages.iter()
    }

    pub(crate) fn insert(&mut self, id: PackageId, snapshot: PackageSnapshot) {
        self.packages.insert(id, snapshot);
    }

    /// Number of packages with the given status.
    pub fn count(&self, status: PackageStatus) -> usize {
        self.packages.values().filter(|s| s.status == status).count()
    }

    /// Number of packages in the report.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns `true` if the report holds no packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Derives package status and truck mileage from fixed routes.
///
/// Every query is a pure function of the routes and the query time: nothing
/// is stored between calls, so queries may be repeated or issued out of
/// chronological order.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use u_delivery::config::FleetConfig;
/// use u_delivery::models::{PackageStatus, Truck};
/// use u_delivery::simulation::DeliverySimulator;
///
/// let config = FleetConfig::default();
/// let sim = DeliverySimulator::new(&config);
/// let trucks = vec![Truck::new(1, 16, 18.0)];
///
/// // Without a route, every package is still at the hub.
/// let report = sim.status_at(&trucks, [1, 2], NaiveTime::from_hms_opt(12, 0, 0).unwrap());
/// assert_eq!(report.status(1), Some(PackageStatus::AtHub));
/// assert_eq!(sim.mileage_at(&trucks[0], NaiveTime::from_hms_opt(12, 0, 0).unwrap()), 0.0);
/// ```
pub struct DeliverySimulator<'a> {
    config: &'a FleetConfig,
}

impl<'a> DeliverySimulator<'a> {
    /// Creates a simulator using the fleet's service time.
    pub fn new(config: &'a FleetConfig) -> Self {
        Self { config }
    }

    /// Computes the timing of a truck's route.
    ///
    /// The route's pinned departure, if any, takes precedence over the
    /// truck's. Returns `None` if the truck has no route.
    pub fn schedule(&self, truck: &Truck) -> Option<TruckSchedule> {
        let route = truck.route()?;
        let departure = route.departure().unwrap_or(truck.departure());
        let mut clock = departure;
        let mut arrivals = Vec::with_capacity(route.len());

        for stop in route.stops() {
            let arrival = advance(clock, travel_minutes(stop.leg_distance, truck.speed_mph()));
            arrivals.push(arrival);
            clock = advance(arrival, self.config.service_minutes);
        }

        let returned_at = route
            .return_distance()
            .map(|d| advance(clock, travel_minutes(d, truck.speed_mph())));

        Some(TruckSchedule {
            truck_id: truck.id(),
            departure,
            arrivals,
            returned_at,
        })
    }

    /// Derives the status of each listed package at `at`.
    ///
    /// Packages on no route are reported [`PackageStatus::AtHub`].
    pub fn status_at(
        &self,
        trucks: &[Truck],
        package_ids: impl IntoIterator<Item = PackageId>,
        at: NaiveTime,
    ) -> StatusReport {
        // package -> (truck, departure, arrival at its stop)
        let mut placed: BTreeMap<PackageId, (TruckId, NaiveTime, NaiveTime)> = BTreeMap::new();
        for truck in trucks {
            let (Some(route), Some(schedule)) = (truck.route(), self.schedule(truck)) else {
                continue;
            };
            for (stop, arrival) in route.stops().iter().zip(&schedule.arrivals) {
                for &id in &stop.package_ids {
                    placed.insert(id, (truck.id(), schedule.departure, *arrival));
                }
            }
        }

        let packages = package_ids
            .into_iter()
            .map(|id| {
                let snapshot = match placed.get(&id) {
                    None => PackageSnapshot {
                        status: PackageStatus::AtHub,
                        truck: None,
                        delivered_at: None,
                    },
                    Some(&(truck, departure, arrival)) => {
                        let (status, delivered_at) = if at >= arrival {
                            (PackageStatus::Delivered, Some(arrival))
                        } else if at >= departure {
                            (PackageStatus::EnRoute, None)
                        } else {
                            (PackageStatus::AtHub, None)
                        };
                        PackageSnapshot {
                            status,
                            truck: Some(truck),
                            delivered_at,
                        }
                    }
                };
                (id, snapshot)
            })
            .collect();

        StatusReport { at, packages }
    }

    /// Miles a truck has completed by `at`.
    ///
    /// Only legs whose arrival time has been reached count, including the
    /// final leg back to the hub.
    pub fn mileage_at(&self, truck: &Truck, at: NaiveTime) -> f64 {
        let (Some(route), Some(schedule)) = (truck.route(), self.schedule(truck)) else {
            return 0.0;
        };
        let mut miles: f64 = route
            .stops()
            .iter()
            .zip(&schedule.arrivals)
            .take_while(|(_, &arrival)| arrival <= at)
            .map(|(stop, _)| stop.leg_distance)
            .sum();
        if let (Some(d), Some(back)) = (route.return_distance(), schedule.returned_at) {
            if back <= at {
                miles += d;
            }
        }
        miles
    }

    /// Total miles of a truck's route once it is fully driven.
    pub fn total_mileage(&self, truck: &Truck) -> f64 {
        truck.route().map_or(0.0, |r| r.total_distance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Route, Stop};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid")
    }

    fn stop(name: &str, ids: &[PackageId], leg: f64) -> Stop {
        Stop {
            location: Location::new(name),
            package_ids: ids.to_vec(),
            leg_distance: leg,
        }
    }

    /// 18 mph truck leaving 08:00: A at 08:20 (6 mi), B at 10:20 (36 mi more),
    /// back at hub 11:00 (12 mi).
    fn routed_truck() -> Truck {
        let mut route = Route::new();
        route.push_stop(stop("A", &[1, 2], 6.0));
        route.push_stop(stop("B", &[3], 36.0));
        route.set_return_distance(Some(12.0));
        let mut truck = Truck::new(1, 16, 18.0);
        truck.set_route(Some(route));
        truck
    }

    #[test]
    fn test_schedule() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let schedule = sim.schedule(&routed_truck()).expect("routed");
        assert_eq!(schedule.departure, t(8, 0));
        assert_eq!(schedule.arrivals, vec![t(8, 20), t(10, 20)]);
        assert_eq!(schedule.returned_at, Some(t(11, 0)));
        assert!(sim.schedule(&Truck::new(2, 16, 18.0)).is_none());
    }

    #[test]
    fn test_schedule_with_service_time() {
        let config = FleetConfig::default().with_service_minutes(5.0);
        let sim = DeliverySimulator::new(&config);
        let schedule = sim.schedule(&routed_truck()).expect("routed");
        assert_eq!(schedule.arrivals, vec![t(8, 20), t(10, 25)]);
        assert_eq!(schedule.returned_at, Some(t(11, 10)));
    }

    #[test]
    fn test_schedule_uses_route_departure() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let mut truck = routed_truck();
        let mut route = truck.route().cloned().expect("routed");
        route.set_departure(Some(t(9, 0)));
        truck.set_route(Some(route));
        let schedule = sim.schedule(&truck).expect("routed");
        assert_eq!(schedule.departure, t(9, 0));
        assert_eq!(schedule.arrivals, vec![t(9, 20), t(11, 20)]);
        assert_eq!(sim.mileage_at(&truck, t(10, 0)), 6.0);
    }

    #[test]
    fn test_status_transitions() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let trucks = vec![routed_truck()];

        let early = sim.status_at(&trucks, [3], t(7, 0));
        assert_eq!(early.status(3), Some(PackageStatus::AtHub));
        assert_eq!(early.get(3).and_then(|s| s.truck), Some(1));

        let before = sim.status_at(&trucks, [3], t(10, 15));
        assert_eq!(before.status(3), Some(PackageStatus::EnRoute));
        assert!(before.get(3).and_then(|s| s.delivered_at).is_none());

        let after = sim.status_at(&trucks, [3], t(10, 25));
        assert_eq!(after.status(3), Some(PackageStatus::Delivered));
        assert_eq!(after.get(3).and_then(|s| s.delivered_at), Some(t(10, 20)));

        let exact = sim.status_at(&trucks, [3], t(10, 20));
        assert_eq!(exact.status(3), Some(PackageStatus::Delivered));
    }

    #[test]
    fn test_status_unassigned_and_counts() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let trucks = vec![routed_truck()];
        let report = sim.status_at(&trucks, [1, 2, 3, 99], t(9, 0));
        assert_eq!(report.len(), 4);
        assert_eq!(report.at(), t(9, 0));
        assert_eq!(report.count(PackageStatus::Delivered), 2);
        assert_eq!(report.count(PackageStatus::EnRoute), 1);
        assert_eq!(report.count(PackageStatus::AtHub), 1);
        assert!(report.get(99).and_then(|s| s.truck).is_none());
    }

    #[test]
    fn test_query_out_of_order_is_idempotent() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let trucks = vec![routed_truck()];
        let late = sim.status_at(&trucks, [1, 2, 3], t(12, 0));
        let early = sim.status_at(&trucks, [1, 2, 3], t(8, 10));
        assert_eq!(sim.status_at(&trucks, [1, 2, 3], t(12, 0)), late);
        assert_eq!(sim.status_at(&trucks, [1, 2, 3], t(8, 10)), early);
    }

    #[test]
    fn test_mileage_counts_completed_legs() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let truck = routed_truck();
        assert_eq!(sim.mileage_at(&truck, t(7, 0)), 0.0);
        assert_eq!(sim.mileage_at(&truck, t(8, 19)), 0.0);
        assert_eq!(sim.mileage_at(&truck, t(8, 20)), 6.0);
        assert_eq!(sim.mileage_at(&truck, t(10, 59)), 42.0);
        assert_eq!(sim.mileage_at(&truck, t(11, 0)), 54.0);
        assert_eq!(sim.total_mileage(&truck), 54.0);
    }

    #[test]
    fn test_mileage_without_route() {
        let config = FleetConfig::default();
        let sim = DeliverySimulator::new(&config);
        let truck = Truck::new(3, 16, 18.0);
        assert_eq!(sim.mileage_at(&truck, t(17, 0)), 0.0);
        assert_eq!(sim.total_mileage(&truck), 0.0);
    }
}
