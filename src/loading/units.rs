//! Co-delivery grouping of packages into atomically loaded units.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveTime;

use crate::error::{Result, RoutingError};
use crate::models::{Deadline, Location, Package, PackageId, TruckId};

/// Packages that must ride the same truck, with their merged constraints.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Unit {
    /// Member ids, ascending.
    pub members: Vec<PackageId>,
    /// Destination of each member, parallel to `members`.
    pub member_locations: Vec<Location>,
    /// Truck every member requires, if any.
    pub required_truck: Option<TruckId>,
    /// Members disagree on their required truck.
    pub conflicting_trucks: bool,
    /// Latest earliest-load time among the members.
    pub no_load_before: Option<NaiveTime>,
    /// Earliest member deadline.
    pub deadline: Deadline,
    /// Distinct member destinations.
    pub destinations: BTreeSet<Location>,
}

impl Unit {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn first_id(&self) -> PackageId {
        self.members[0]
    }

    /// The single destination shared by every member, if there is one.
    pub fn single_destination(&self) -> Option<&Location> {
        if self.destinations.len() == 1 {
            self.destinations.iter().next()
        } else {
            None
        }
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index becomes the root so grouping is order-stable.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// Groups packages into units over the symmetric, transitive closure of
/// their `must_accompany` sets.
///
/// Units are returned ordered by their lowest member id.
///
/// # Errors
///
/// [`RoutingError::UnknownPackage`] if a `must_accompany` id is not in the
/// registry.
pub(crate) fn build_units(packages: &BTreeMap<PackageId, Package>) -> Result<Vec<Unit>> {
    let index: BTreeMap<PackageId, usize> =
        packages.keys().enumerate().map(|(i, &id)| (id, i)).collect();
    let mut sets = DisjointSet::new(packages.len());

    for (&id, package) in packages {
        for other in package.constraints().must_accompany() {
            let j = *index
                .get(other)
                .ok_or(RoutingError::UnknownPackage(*other))?;
            sets.union(index[&id], j);
        }
    }

    let mut groups: BTreeMap<usize, Vec<&Package>> = BTreeMap::new();
    for (&id, package) in packages {
        let root = sets.find(index[&id]);
        groups.entry(root).or_default().push(package);
    }

    let mut units: Vec<Unit> = groups.into_values().map(merge).collect();
    units.sort_by_key(Unit::first_id);
    Ok(units)
}

fn merge(mut members: Vec<&Package>) -> Unit {
    members.sort_by_key(|p| p.id());
    let mut required: BTreeSet<TruckId> = BTreeSet::new();
    let mut no_load_before = None;
    let mut deadline = Deadline::EndOfDay;
    let mut destinations = BTreeSet::new();

    for p in &members {
        let c = p.constraints();
        required.extend(c.required_truck());
        no_load_before = no_load_before.max(c.no_load_before());
        deadline = deadline.min(p.deadline());
        destinations.insert(p.location().clone());
    }

    Unit {
        members: members.iter().map(|p| p.id()).collect(),
        member_locations: members.iter().map(|p| p.location().clone()).collect(),
        required_truck: required.iter().next().copied(),
        conflicting_trucks: required.len() > 1,
        no_load_before,
        deadline,
        destinations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConstraintSet;

    fn pkg(id: PackageId, loc: &str, constraints: ConstraintSet) -> Package {
        Package::new(id, Location::new(loc), Deadline::EndOfDay, 1.0).with_constraints(constraints)
    }

    fn registry(packages: Vec<Package>) -> BTreeMap<PackageId, Package> {
        packages.into_iter().map(|p| (p.id(), p)).collect()
    }

    #[test]
    fn test_singletons() {
        let reg = registry(vec![pkg(2, "A", ConstraintSet::new()), pkg(1, "B", ConstraintSet::new())]);
        let units = build_units(&reg).expect("valid");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].members, vec![1]);
        assert_eq!(units[1].single_destination(), Some(&Location::new("A")));
    }

    #[test]
    fn test_one_sided_grouping_is_closed() {
        // 13 names 15 and 19; 19 names 14. Neither 14 nor 15 names anyone.
        let reg = registry(vec![
            pkg(13, "A", ConstraintSet::new().with_accompany([15, 19])),
            pkg(14, "B", ConstraintSet::new()),
            pkg(15, "A", ConstraintSet::new()),
            pkg(19, "C", ConstraintSet::new().with_accompany([14])),
            pkg(20, "D", ConstraintSet::new()),
        ]);
        let units = build_units(&reg).expect("valid");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].members, vec![13, 14, 15, 19]);
        assert_eq!(units[0].destinations.len(), 3);
        assert!(units[0].single_destination().is_none());
        assert_eq!(units[1].members, vec![20]);
    }

    #[test]
    fn test_merged_constraints() {
        let nine = NaiveTime::from_hms_opt(9, 5, 0).expect("valid");
        let ten = NaiveTime::from_hms_opt(10, 30, 0).expect("valid");
        let reg = registry(vec![
            pkg(1, "A", ConstraintSet::new().with_accompany([2]).with_required_truck(2)),
            Package::new(2, Location::new("A"), Deadline::By(ten), 1.0)
                .with_constraints(ConstraintSet::new().with_no_load_before(nine)),
        ]);
        let units = build_units(&reg).expect("valid");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].required_truck, Some(2));
        assert!(!units[0].conflicting_trucks);
        assert_eq!(units[0].no_load_before, Some(nine));
        assert_eq!(units[0].deadline, Deadline::By(ten));
    }

    #[test]
    fn test_conflicting_required_trucks() {
        let reg = registry(vec![
            pkg(1, "A", ConstraintSet::new().with_accompany([2]).with_required_truck(1)),
            pkg(2, "B", ConstraintSet::new().with_required_truck(2)),
        ]);
        let units = build_units(&reg).expect("valid");
        assert!(units[0].conflicting_trucks);
    }

    #[test]
    fn test_unknown_companion() {
        let reg = registry(vec![pkg(1, "A", ConstraintSet::new().with_accompany([7]))]);
        assert_eq!(build_units(&reg), Err(RoutingError::UnknownPackage(7)));
    }
}
