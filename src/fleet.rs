//! Fleet aggregate: owns the graph, packages and trucks, and orchestrates
//! loading and simulation.
//!
//! # Address corrections
//!
//! A correction splits the day at its effective time. The plan in force is
//! archived and keeps answering queries before that time. Packages it had
//! already delivered by then stay delivered: the next recompute plans only
//! the rest, with every route leaving the hub no earlier than the split.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveTime;
use tracing::{info, warn};

use crate::config::FleetConfig;
use crate::distance::DistanceGraph;
use crate::error::{Result, RoutingError};
use crate::loading::{LoadPlan, RouteLoader, Unassignable};
use crate::models::{Location, Package, PackageId, PackageRecord, PackageStatus, Truck, TruckId};
use crate::simulation::{DeliverySimulator, PackageSnapshot, StatusReport};

/// Packages finished under an earlier plan, frozen at their delivery.
type Delivered = BTreeMap<PackageId, PackageSnapshot>;

/// Routes that were current until an address correction took effect.
#[derive(Debug, Clone)]
struct ArchivedPlan {
    trucks: Vec<Truck>,
    valid_until: NaiveTime,
    delivered: Delivered,
}

/// The plan answering a query: how many archived plans precede it, its
/// trucks, and the packages delivered before it started.
struct PlanView<'a> {
    preceding: usize,
    trucks: &'a [Truck],
    delivered: &'a Delivered,
}

/// The delivery fleet: distance graph, package registry, and trucks.
///
/// All mutation goes through `&mut self` methods, and each one builds its
/// result before touching stored state, so a failed call leaves the fleet
/// exactly as it was.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use u_delivery::config::FleetConfig;
/// use u_delivery::fleet::FleetState;
/// use u_delivery::models::{Deadline, Location, PackageRecord, PackageStatus, ConstraintSet};
///
/// let hub = Location::new("Hub");
/// let graph = FleetState::build_graph([(hub.clone(), Location::new("A"), 6.0)]).unwrap();
/// let config = FleetConfig::new(hub);
/// let trucks = config.fleet(1);
/// let mut fleet = FleetState::new(graph, trucks, config).unwrap();
///
/// fleet
///     .load_packages([PackageRecord {
///         id: 1,
///         location: Location::new("A"),
///         deadline: Deadline::EndOfDay,
///         weight: 5.0,
///         constraints: ConstraintSet::new(),
///     }])
///     .unwrap();
/// fleet.compute_routes().unwrap();
///
/// // 6 miles at 18 mph: delivered at 08:20.
/// let report = fleet.query_status_at(NaiveTime::from_hms_opt(8, 30, 0).unwrap()).unwrap();
/// assert_eq!(report.status(1), Some(PackageStatus::Delivered));
/// assert_eq!(fleet.truck_mileage_at(1, NaiveTime::from_hms_opt(8, 30, 0).unwrap()).unwrap(), 6.0);
/// ```
#[derive(Debug, Clone)]
pub struct FleetState {
    graph: DistanceGraph,
    config: FleetConfig,
    packages: BTreeMap<PackageId, Package>,
    trucks: Vec<Truck>,
    needs_routing: bool,
    archive: Vec<ArchivedPlan>,
    delivered: Delivered,
    late: Vec<PackageId>,
}

impl FleetState {
    /// Creates a fleet with no packages.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownLocation`] if the hub is not in the graph,
    /// [`RoutingError::DuplicateTruck`] if two trucks share an id, and
    /// [`RoutingError::InvalidSpeed`] for a speed that is not finite and
    /// positive.
    pub fn new(graph: DistanceGraph, trucks: Vec<Truck>, config: FleetConfig) -> Result<Self> {
        if !graph.contains(&config.hub) {
            return Err(RoutingError::UnknownLocation(config.hub.clone()));
        }
        let mut seen = BTreeSet::new();
        for truck in &trucks {
            if !seen.insert(truck.id()) {
                return Err(RoutingError::DuplicateTruck(truck.id()));
            }
            let speed = truck.speed_mph();
            if !speed.is_finite() || speed <= 0.0 {
                return Err(RoutingError::InvalidSpeed {
                    truck: truck.id(),
                    speed,
                });
            }
        }
        Ok(Self {
            graph,
            config,
            packages: BTreeMap::new(),
            trucks,
            needs_routing: true,
            archive: Vec::new(),
            delivered: BTreeMap::new(),
            late: Vec::new(),
        })
    }

    /// Builds the distance graph from undirected edges.
    pub fn build_graph(edges: impl IntoIterator<Item = (Location, Location, f64)>) -> Result<DistanceGraph> {
        DistanceGraph::from_edges(edges)
    }

    /// Adds manifest records to the registry.
    ///
    /// Either every record is added or none is. Adding packages discards
    /// any computed routes.
    ///
    /// # Errors
    ///
    /// [`RoutingError::DuplicatePackage`], [`RoutingError::UnknownLocation`]
    /// for a destination missing from the graph, and
    /// [`RoutingError::UnknownPackage`] for a `must_accompany` id that is in
    /// neither the registry nor the batch.
    pub fn load_packages(&mut self, records: impl IntoIterator<Item = PackageRecord>) -> Result<()> {
        let mut staged: BTreeMap<PackageId, Package> = BTreeMap::new();
        for record in records {
            if self.packages.contains_key(&record.id) || staged.contains_key(&record.id) {
                return Err(RoutingError::DuplicatePackage(record.id));
            }
            if !self.graph.contains(&record.location) {
                return Err(RoutingError::UnknownLocation(record.location));
            }
            staged.insert(record.id, Package::from(record));
        }
        for package in staged.values() {
            for other in package.constraints().must_accompany() {
                if !self.packages.contains_key(other) && !staged.contains_key(other) {
                    return Err(RoutingError::UnknownPackage(*other));
                }
            }
        }

        info!(count = staged.len(), "loaded packages");
        self.packages.append(&mut staged);
        self.reset_routes();
        Ok(())
    }

    fn reset_routes(&mut self) {
        for truck in &mut self.trucks {
            truck.set_route(None);
        }
        for package in self.packages.values_mut() {
            package.set_assigned_truck(None);
        }
        self.archive.clear();
        self.delivered.clear();
        self.late.clear();
        self.needs_routing = true;
    }

    /// Assigns every outstanding package to a truck and replaces all routes.
    ///
    /// After an address correction, packages delivered before it took effect
    /// are left out, and routes leave the hub no earlier than the correction.
    ///
    /// # Errors
    ///
    /// Any loader error, including [`RoutingError::UnassignablePackage`].
    /// On error the previous routes remain in place.
    pub fn compute_routes(&mut self) -> Result<()> {
        let (packages, trucks) = self.outstanding();
        let plan = RouteLoader::new(&self.graph, &self.config).load(&packages, &trucks)?;
        self.commit(plan);
        Ok(())
    }

    /// Like [`compute_routes`](Self::compute_routes), but commits a partial
    /// plan and returns the packages left at the hub.
    pub fn compute_routes_partial(&mut self) -> Result<Vec<Unassignable>> {
        let (packages, trucks) = self.outstanding();
        let plan = RouteLoader::new(&self.graph, &self.config).load_partial(&packages, &trucks)?;
        let unassigned = plan.unassigned().to_vec();
        if !unassigned.is_empty() {
            warn!(count = unassigned.len(), "committing partial plan");
        }
        self.commit(plan);
        Ok(unassigned)
    }

    /// Packages still to deliver, and trucks held at the hub until the
    /// current plan takes over.
    fn outstanding(&self) -> (BTreeMap<PackageId, Package>, Vec<Truck>) {
        let packages = self
            .packages
            .iter()
            .filter(|(id, _)| !self.delivered.contains_key(*id))
            .map(|(&id, package)| {
                let mut package = package.clone();
                package.retain_companions(|other| !self.delivered.contains_key(other));
                (id, package)
            })
            .collect();

        let from = self.current_valid_from();
        let trucks = self
            .trucks
            .iter()
            .map(|t| {
                let departure = t.departure().max(from);
                t.clone().with_departure(departure)
            })
            .collect();
        (packages, trucks)
    }

    fn commit(&mut self, plan: LoadPlan) {
        let assignments = plan.assignments().clone();
        let miles = plan.total_distance();
        self.late = plan.late_packages().to_vec();
        let mut routes = plan.into_routes();
        for truck in &mut self.trucks {
            truck.set_route(routes.remove(&truck.id()));
        }
        for (id, package) in &mut self.packages {
            let truck = assignments
                .get(id)
                .copied()
                .or_else(|| self.delivered.get(id).and_then(|s| s.truck));
            package.set_assigned_truck(truck);
        }
        self.needs_routing = false;
        info!(trucks = self.trucks.len(), miles, "committed routes");
    }

    /// Packages the current plan delivers after their deadline.
    pub fn late_packages(&self) -> &[PackageId] {
        &self.late
    }

    /// First instant the current plan answers for.
    fn current_valid_from(&self) -> NaiveTime {
        self.archive
            .last()
            .map_or(NaiveTime::MIN, |plan| plan.valid_until)
    }

    /// The plan covering `at`, failing if that is the current plan and it
    /// is stale.
    fn plan_at(&self, at: NaiveTime) -> Result<PlanView<'_>> {
        let mut from = NaiveTime::MIN;
        for (i, plan) in self.archive.iter().enumerate() {
            if at >= from && at < plan.valid_until {
                return Ok(PlanView {
                    preceding: i,
                    trucks: &plan.trucks,
                    delivered: &plan.delivered,
                });
            }
            from = plan.valid_until;
        }
        if self.needs_routing {
            return Err(RoutingError::StaleRouteQuery { at });
        }
        Ok(PlanView {
            preceding: self.archive.len(),
            trucks: &self.trucks,
            delivered: &self.delivered,
        })
    }

    /// Miles a truck drove under the first `plans` archived plans.
    fn archived_miles(&self, plans: usize, truck_id: TruckId) -> f64 {
        let sim = DeliverySimulator::new(&self.config);
        self.archive[..plans]
            .iter()
            .filter_map(|plan| {
                let truck = plan.trucks.iter().find(|t| t.id() == truck_id)?;
                Some(sim.mileage_at(truck, plan.valid_until))
            })
            .sum()
    }

    /// Derives every package's status at `at` without changing the fleet.
    ///
    /// # Errors
    ///
    /// [`RoutingError::StaleRouteQuery`] if no computed plan covers `at`.
    pub fn query_status_at(&self, at: NaiveTime) -> Result<StatusReport> {
        let view = self.plan_at(at)?;
        let sim = DeliverySimulator::new(&self.config);
        let pending = self
            .packages
            .keys()
            .copied()
            .filter(|id| !view.delivered.contains_key(id));
        let mut report = sim.status_at(view.trucks, pending, at);
        for (&id, &snapshot) in view.delivered {
            report.insert(id, snapshot);
        }
        Ok(report)
    }

    /// Miles a truck has completed by `at`, across every plan it drove.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownTruck`], or [`RoutingError::StaleRouteQuery`]
    /// if the truck has no route in the plan covering `at`.
    pub fn truck_mileage_at(&self, truck_id: TruckId, at: NaiveTime) -> Result<f64> {
        if self.truck(truck_id).is_none() {
            return Err(RoutingError::UnknownTruck(truck_id));
        }
        let view = self.plan_at(at)?;
        let truck = view
            .trucks
            .iter()
            .find(|t| t.id() == truck_id)
            .filter(|t| t.route().is_some())
            .ok_or(RoutingError::StaleRouteQuery { at })?;
        let sim = DeliverySimulator::new(&self.config);
        Ok(self.archived_miles(view.preceding, truck_id) + sim.mileage_at(truck, at))
    }

    /// Miles completed by the whole fleet by `at`.
    pub fn fleet_mileage_at(&self, at: NaiveTime) -> Result<f64> {
        let view = self.plan_at(at)?;
        let sim = DeliverySimulator::new(&self.config);
        Ok(view
            .trucks
            .iter()
            .map(|t| self.archived_miles(view.preceding, t.id()) + sim.mileage_at(t, at))
            .sum())
    }

    /// Miles driven once every route of the current plan is finished.
    pub fn total_mileage(&self) -> Result<f64> {
        if self.needs_routing {
            return Err(RoutingError::StaleRouteQuery {
                at: crate::simulation::end_of_day(),
            });
        }
        let sim = DeliverySimulator::new(&self.config);
        Ok(self
            .trucks
            .iter()
            .map(|t| self.archived_miles(self.archive.len(), t.id()) + sim.total_mileage(t))
            .sum())
    }

    /// Records a corrected destination for a package, effective at
    /// `effective_at`.
    ///
    /// If the package rides on a routed truck, the current plan is archived
    /// to answer queries before `effective_at`, and that truck's route is
    /// dropped. Queries from `effective_at` on fail with
    /// [`RoutingError::StaleRouteQuery`] until routes are recomputed.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownPackage`] or [`RoutingError::UnknownLocation`].
    pub fn correct_package_address(
        &mut self,
        id: PackageId,
        location: Location,
        effective_at: NaiveTime,
    ) -> Result<()> {
        if !self.graph.contains(&location) {
            return Err(RoutingError::UnknownLocation(location));
        }
        let truck_id = self
            .packages
            .get(&id)
            .ok_or(RoutingError::UnknownPackage(id))?
            .assigned_truck();

        // Corrections never reach back before the current plan took over.
        let effective_at = effective_at.max(self.current_valid_from());

        if let Some(truck_id) = truck_id {
            if !self.needs_routing {
                self.archive_current(effective_at);
            }
            if let Some(truck) = self.trucks.iter_mut().find(|t| t.id() == truck_id) {
                truck.set_route(None);
            }
            self.needs_routing = true;
        }

        // The corrected package alone may leave the delivered state.
        self.delivered.remove(&id);
        if let Some(package) = self.packages.get_mut(&id) {
            info!(package = id, from = %package.location(), to = %location, at = %effective_at, "corrected address");
            package.set_location(location);
            package.set_assigned_truck(None);
            package.set_delivery_state(PackageStatus::AtHub, None);
        }
        Ok(())
    }

    /// Moves the current plan into the archive, freezing the packages it
    /// delivered by `until`.
    fn archive_current(&mut self, until: NaiveTime) {
        let sim = DeliverySimulator::new(&self.config);
        let pending = self
            .packages
            .keys()
            .copied()
            .filter(|id| !self.delivered.contains_key(id));
        let report = sim.status_at(&self.trucks, pending, until);
        self.archive.push(ArchivedPlan {
            trucks: self.trucks.clone(),
            valid_until: until,
            delivered: self.delivered.clone(),
        });
        for (&id, snapshot) in report.iter() {
            if snapshot.status == PackageStatus::Delivered {
                self.delivered.insert(id, *snapshot);
            }
        }
    }

    /// Writes the status derived at `at` into the package registry.
    pub fn commit_status_at(&mut self, at: NaiveTime) -> Result<()> {
        let report = self.query_status_at(at)?;
        for (id, snapshot) in report.iter() {
            if let Some(package) = self.packages.get_mut(id) {
                package.set_delivery_state(snapshot.status, snapshot.delivered_at);
            }
        }
        Ok(())
    }

    /// Looks up a package.
    pub fn package(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(&id)
    }

    /// All packages, by id.
    pub fn packages(&self) -> &BTreeMap<PackageId, Package> {
        &self.packages
    }

    /// Looks up a truck.
    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.trucks.iter().find(|t| t.id() == id)
    }

    /// All trucks.
    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    /// The distance graph.
    pub fn graph(&self) -> &DistanceGraph {
        &self.graph
    }

    /// Fleet configuration.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }
}
