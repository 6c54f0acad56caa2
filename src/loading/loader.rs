//! Deadline-aware nearest-neighbor truck loading.
//!
//! # Algorithm
//!
//! Packages are first grouped into units (co-delivery groups, or single
//! packages). Trucks are then filled one at a time in departure order. Each
//! truck starts at the hub and repeatedly takes the loadable unit with the
//! smallest key:
//!
//! ```text
//! (tier, distance from current position, lowest package id)
//! tier 0: a timed deadline the projected arrival is within the risk window of
//! tier 1: a timed deadline with slack to spare
//! tier 2: end of day
//! ```
//!
//! A unit is loadable when the truck satisfies its required-truck and
//! earliest-load constraints and has room for it. Room is counted after
//! reserving space for units that no later truck could take. After each new
//! stop, other single-location units bound for the same address are swept
//! onto it while room remains.
//!
//! # Complexity
//!
//! O(u² · s) shortest-path lookups per truck, where u = units and s = stops;
//! leg distances are cached per run.
//!
//! This is a heuristic: deadlines are met on a best-effort basis.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::FleetConfig;
use crate::distance::DistanceGraph;
use crate::error::{LoadRule, Result, RoutingError};
use crate::models::{Location, Package, PackageId, Route, Stop, Truck, TruckId};
use crate::simulation::{advance, minutes_between, travel_minutes, DeliverySimulator};

use super::units::{build_units, Unit};

/// A package the loader could not place, and the rule that blocked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unassignable {
    /// Package left at the hub.
    pub package_id: PackageId,
    /// Rule it could not satisfy.
    pub rule: LoadRule,
}

/// The result of one loader run: a route per truck plus what was left over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPlan {
    routes: BTreeMap<TruckId, Route>,
    assignments: BTreeMap<PackageId, TruckId>,
    unassigned: Vec<Unassignable>,
    late: Vec<PackageId>,
}

impl LoadPlan {
    /// Route planned for a truck. Every truck gets one, possibly empty.
    pub fn route(&self, truck_id: TruckId) -> Option<&Route> {
        self.routes.get(&truck_id)
    }

    /// All routes keyed by truck.
    pub fn routes(&self) -> &BTreeMap<TruckId, Route> {
        &self.routes
    }

    /// Truck a package was placed on.
    pub fn truck_of(&self, package_id: PackageId) -> Option<TruckId> {
        self.assignments.get(&package_id).copied()
    }

    /// Package → truck assignments.
    pub fn assignments(&self) -> &BTreeMap<PackageId, TruckId> {
        &self.assignments
    }

    /// Packages that could not be placed, ascending by id.
    pub fn unassigned(&self) -> &[Unassignable] {
        &self.unassigned
    }

    /// Placed packages whose planned arrival misses their deadline.
    pub fn late_packages(&self) -> &[PackageId] {
        &self.late
    }

    /// Returns `true` if every package was placed.
    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }

    /// Planned miles across all trucks.
    pub fn total_distance(&self) -> f64 {
        self.routes.values().map(Route::total_distance).sum()
    }

    pub(crate) fn into_routes(self) -> BTreeMap<TruckId, Route> {
        self.routes
    }
}

/// Shortest-path leg distances, memoized for one loader run.
struct Legs<'g> {
    graph: &'g DistanceGraph,
    cache: BTreeMap<(Location, Location), f64>,
}

impl<'g> Legs<'g> {
    fn new(graph: &'g DistanceGraph) -> Self {
        Self {
            graph,
            cache: BTreeMap::new(),
        }
    }

    fn get(&mut self, a: &Location, b: &Location) -> Result<f64> {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        if let Some(&d) = self.cache.get(&key) {
            return Ok(d);
        }
        let d = self.graph.shortest_distance(a, b)?;
        self.cache.insert(key, d);
        Ok(d)
    }
}

/// A truck's route under construction.
struct Build<'t> {
    truck: &'t Truck,
    position: usize,
    stops: Vec<Stop>,
    current: Location,
    clock: NaiveTime,
    loaded: usize,
}

impl Build<'_> {
    fn room(&self) -> usize {
        self.truck.capacity().saturating_sub(self.loaded)
    }

    fn stop_index(&self, location: &Location) -> Option<usize> {
        self.stops.iter().position(|s| &s.location == location)
    }
}

/// Assigns packages to trucks and orders each truck's stops.
///
/// The loader only reads its inputs; committing a plan is up to the caller.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use u_delivery::config::FleetConfig;
/// use u_delivery::distance::DistanceGraph;
/// use u_delivery::loading::RouteLoader;
/// use u_delivery::models::{Deadline, Location, Package};
///
/// let hub = Location::new("Hub");
/// let graph = DistanceGraph::from_edges([
///     (hub.clone(), Location::new("A"), 4.0),
///     (hub.clone(), Location::new("B"), 3.0),
///     (Location::new("A"), Location::new("B"), 2.0),
/// ])
/// .unwrap();
/// let config = FleetConfig::new(hub);
/// let trucks = config.fleet(1);
///
/// let packages: BTreeMap<_, _> = [
///     Package::new(1, Location::new("A"), Deadline::EndOfDay, 1.0),
///     Package::new(2, Location::new("B"), Deadline::EndOfDay, 1.0),
/// ]
/// .into_iter()
/// .map(|p| (p.id(), p))
/// .collect();
///
/// let plan = RouteLoader::new(&graph, &config).load(&packages, &trucks).unwrap();
/// let route = plan.route(1).unwrap();
/// // Nearest first: B (3 mi), then A (2 mi), then back to the hub (4 mi).
/// assert_eq!(route.package_ids(), vec![2, 1]);
/// assert_eq!(route.total_distance(), 9.0);
/// ```
pub struct RouteLoader<'a> {
    graph: &'a DistanceGraph,
    config: &'a FleetConfig,
}

impl<'a> RouteLoader<'a> {
    /// Creates a loader over the given graph and configuration.
    pub fn new(graph: &'a DistanceGraph, config: &'a FleetConfig) -> Self {
        Self { graph, config }
    }

    /// Places every package, failing if any cannot be placed.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnassignablePackage`] naming the lowest-id package
    /// left over, plus every error of [`load_partial`](Self::load_partial).
    pub fn load(&self, packages: &BTreeMap<PackageId, Package>, trucks: &[Truck]) -> Result<LoadPlan> {
        let plan = self.load_partial(packages, trucks)?;
        match plan.unassigned.first() {
            Some(u) => Err(RoutingError::UnassignablePackage {
                package_id: u.package_id,
                rule: u.rule,
            }),
            None => Ok(plan),
        }
    }

    /// Places as many packages as possible and reports the rest.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownLocation`] if the hub or a destination is not
    /// in the graph, [`RoutingError::UnknownPackage`] for a dangling
    /// `must_accompany` id, and [`RoutingError::Unreachable`] if a needed
    /// leg has no path.
    pub fn load_partial(
        &self,
        packages: &BTreeMap<PackageId, Package>,
        trucks: &[Truck],
    ) -> Result<LoadPlan> {
        let hub = &self.config.hub;
        if !self.graph.contains(hub) {
            return Err(RoutingError::UnknownLocation(hub.clone()));
        }
        if let Some(p) = packages.values().find(|p| !self.graph.contains(p.location())) {
            return Err(RoutingError::UnknownLocation(p.location().clone()));
        }

        let units = build_units(packages)?;
        let mut order: Vec<&Truck> = trucks.iter().collect();
        order.sort_by_key(|t| (t.departure(), t.id()));

        let last_eligible: Vec<Option<usize>> = units
            .iter()
            .map(|u| order.iter().rposition(|t| eligible(u, t)))
            .collect();

        let mut legs = Legs::new(self.graph);
        let mut assigned = vec![false; units.len()];
        let mut plan = LoadPlan::default();

        for (position, truck) in order.iter().enumerate() {
            let mut build = Build {
                truck: *truck,
                position,
                stops: Vec::new(),
                current: hub.clone(),
                clock: truck.departure(),
                loaded: 0,
            };

            while let Some(u) =
                self.select(&units, &assigned, &last_eligible, &build, &mut legs)?
            {
                assigned[u] = true;
                build.loaded += units[u].size();
                debug!(
                    truck = truck.id(),
                    packages = ?units[u].members,
                    loaded = build.loaded,
                    "loaded unit"
                );
                self.place(&units, u, &mut assigned, &last_eligible, &mut build, &mut legs)?;
            }

            let mut route = Route::new();
            let return_distance = if self.config.return_to_hub && !build.stops.is_empty() {
                Some(legs.get(&build.current, hub)?)
            } else {
                None
            };
            for stop in build.stops {
                for &id in &stop.package_ids {
                    plan.assignments.insert(id, truck.id());
                }
                route.push_stop(stop);
            }
            route.set_return_distance(return_distance);
            route.set_departure(Some(truck.departure()));
            plan.routes.insert(truck.id(), route);
        }

        for (u, unit) in units.iter().enumerate() {
            if assigned[u] {
                continue;
            }
            let rule = blocking_rule(unit, trucks);
            plan.unassigned.extend(unit.members.iter().map(|&package_id| Unassignable {
                package_id,
                rule,
            }));
        }
        plan.unassigned.sort_by_key(|u| u.package_id);
        if !plan.unassigned.is_empty() {
            warn!(count = plan.unassigned.len(), "packages left unassigned");
        }

        plan.late = self.late_packages(packages, trucks, &plan.routes);
        Ok(plan)
    }

    /// Picks the next unit for the truck under construction.
    fn select(
        &self,
        units: &[Unit],
        assigned: &[bool],
        last_eligible: &[Option<usize>],
        build: &Build<'_>,
        legs: &mut Legs<'_>,
    ) -> Result<Option<usize>> {
        let reserved = reserved_size(units, assigned, last_eligible, build.position);
        let mut best: Option<(usize, u8, f64)> = None;

        for (u, unit) in units.iter().enumerate() {
            if assigned[u] || !eligible(unit, build.truck) {
                continue;
            }
            if !fits(unit, last_eligible[u] == Some(build.position), reserved, build.room()) {
                continue;
            }

            let mut dist = f64::INFINITY;
            for dest in &unit.destinations {
                if build.stop_index(dest).is_none() {
                    dist = dist.min(legs.get(&build.current, dest)?);
                }
            }
            if dist.is_infinite() {
                // Every destination is already a stop.
                dist = 0.0;
            }

            let tier = self.tier(unit, build, dist);
            let better = match best {
                None => true,
                Some((b, bt, bd)) => tier
                    .cmp(&bt)
                    .then_with(|| dist.total_cmp(&bd))
                    .then_with(|| unit.first_id().cmp(&units[b].first_id()))
                    == Ordering::Less,
            };
            if better {
                best = Some((u, tier, dist));
            }
        }
        Ok(best.map(|(u, _, _)| u))
    }

    fn tier(&self, unit: &Unit, build: &Build<'_>, dist: f64) -> u8 {
        match unit.deadline.time() {
            None => 2,
            Some(deadline) => {
                let arrival = advance(build.clock, travel_minutes(dist, build.truck.speed_mph()));
                if minutes_between(arrival, deadline) <= self.config.risk_window_minutes {
                    0
                } else {
                    1
                }
            }
        }
    }

    /// Appends a chosen unit's packages to the route, visiting new
    /// destinations nearest-first.
    fn place(
        &self,
        units: &[Unit],
        u: usize,
        assigned: &mut [bool],
        last_eligible: &[Option<usize>],
        build: &mut Build<'_>,
        legs: &mut Legs<'_>,
    ) -> Result<()> {
        let unit = &units[u];
        let mut pending: Vec<&Location> = Vec::new();
        for dest in &unit.destinations {
            if build.stop_index(dest).is_none() {
                pending.push(dest);
            }
        }

        while !pending.is_empty() {
            let mut next = 0;
            let mut next_d = legs.get(&build.current, pending[0])?;
            for (i, dest) in pending.iter().enumerate().skip(1) {
                let d = legs.get(&build.current, dest)?;
                if d < next_d {
                    next = i;
                    next_d = d;
                }
            }
            let dest = pending.remove(next);
            let arrival = advance(build.clock, travel_minutes(next_d, build.truck.speed_mph()));
            build.clock = advance(arrival, self.config.service_minutes);
            build.current = dest.clone();
            build.stops.push(Stop {
                location: dest.clone(),
                package_ids: Vec::new(),
                leg_distance: next_d,
            });
            debug!(truck = build.truck.id(), stop = %dest, miles = next_d, "added stop");
        }

        for (&id, dest) in unit.members.iter().zip(&unit.member_locations) {
            if let Some(i) = build.stop_index(dest) {
                build.stops[i].package_ids.push(id);
            }
        }

        // Sweep up single-address units bound for this unit's stops.
        for stop_loc in unit.destinations.iter() {
            for (v, other) in units.iter().enumerate() {
                if assigned[v] || other.single_destination() != Some(stop_loc) {
                    continue;
                }
                if !eligible(other, build.truck) {
                    continue;
                }
                let reserved = reserved_size(units, assigned, last_eligible, build.position);
                if !fits(other, last_eligible[v] == Some(build.position), reserved, build.room()) {
                    continue;
                }
                assigned[v] = true;
                build.loaded += other.size();
                if let Some(i) = build.stop_index(stop_loc) {
                    build.stops[i].package_ids.extend(other.members.iter().copied());
                }
                debug!(truck = build.truck.id(), packages = ?other.members, "swept onto stop");
            }
        }
        Ok(())
    }

    fn late_packages(
        &self,
        packages: &BTreeMap<PackageId, Package>,
        trucks: &[Truck],
        routes: &BTreeMap<TruckId, Route>,
    ) -> Vec<PackageId> {
        let sim = DeliverySimulator::new(self.config);
        let mut late = Vec::new();
        for truck in trucks {
            let Some(route) = routes.get(&truck.id()) else {
                continue;
            };
            let mut planned = truck.clone();
            planned.set_route(Some(route.clone()));
            let Some(schedule) = sim.schedule(&planned) else {
                continue;
            };
            for (stop, arrival) in route.stops().iter().zip(&schedule.arrivals) {
                for id in &stop.package_ids {
                    if let Some(p) = packages.get(id) {
                        if !p.deadline().is_met_by(*arrival) {
                            warn!(package = id, deadline = %p.deadline(), arrival = %arrival, "planned arrival misses deadline");
                            late.push(*id);
                        }
                    }
                }
            }
        }
        late.sort_unstable();
        late
    }
}

fn eligible(unit: &Unit, truck: &Truck) -> bool {
    !unit.conflicting_trucks
        && unit.required_truck.is_none_or(|id| id == truck.id())
        && unit.no_load_before.is_none_or(|t| truck.departure() >= t)
        && unit.size() <= truck.capacity()
}

fn fits(unit: &Unit, is_reserved: bool, reserved: usize, room: usize) -> bool {
    if is_reserved {
        unit.size() <= room
    } else {
        unit.size() + reserved <= room
    }
}

/// Total size of unplaced units that no later truck could take.
fn reserved_size(units: &[Unit], assigned: &[bool], last_eligible: &[Option<usize>], position: usize) -> usize {
    units
        .iter()
        .enumerate()
        .filter(|&(u, _)| !assigned[u] && last_eligible[u] == Some(position))
        .map(|(_, unit)| unit.size())
        .sum()
}

fn blocking_rule(unit: &Unit, trucks: &[Truck]) -> LoadRule {
    if unit.conflicting_trucks {
        return LoadRule::ConflictingRequiredTrucks;
    }
    let candidates: Vec<&Truck> = trucks
        .iter()
        .filter(|t| unit.required_truck.is_none_or(|id| id == t.id()))
        .collect();
    if candidates.is_empty() {
        return LoadRule::RequiredTruck;
    }
    let late_enough = candidates
        .iter()
        .any(|t| unit.no_load_before.is_none_or(|nlb| t.departure() >= nlb));
    if !late_enough {
        return LoadRule::NoLoadBefore;
    }
    LoadRule::Capacity
}
