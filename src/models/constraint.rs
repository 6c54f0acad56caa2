//! Structured loading constraints attached to packages.

use std::collections::BTreeSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{PackageId, TruckId};

/// Per-package loading constraints.
///
/// Produced by whatever reads the package notes; the engine only consumes
/// the structured form. Every field is optional and the default set places
/// no restriction on the package.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use u_delivery::models::ConstraintSet;
///
/// let delayed = ConstraintSet::new()
///     .with_no_load_before(NaiveTime::from_hms_opt(9, 5, 0).unwrap());
/// assert!(delayed.no_load_before().is_some());
/// assert!(delayed.required_truck().is_none());
///
/// let grouped = ConstraintSet::new().with_accompany([13, 15]);
/// assert!(grouped.must_accompany().contains(&13));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSet {
    no_load_before: Option<NaiveTime>,
    required_truck: Option<TruckId>,
    must_accompany: BTreeSet<PackageId>,
}

impl ConstraintSet {
    /// An empty constraint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The package may not leave the hub before `time`.
    pub fn with_no_load_before(mut self, time: NaiveTime) -> Self {
        self.no_load_before = Some(time);
        self
    }

    /// The package may only ride on `truck`.
    pub fn with_required_truck(mut self, truck: TruckId) -> Self {
        self.required_truck = Some(truck);
        self
    }

    /// The package must ship on the same truck as every id in `ids`.
    pub fn with_accompany(mut self, ids: impl IntoIterator<Item = PackageId>) -> Self {
        self.must_accompany.extend(ids);
        self
    }

    /// Earliest time the package may leave the hub.
    pub fn no_load_before(&self) -> Option<NaiveTime> {
        self.no_load_before
    }

    /// Truck the package is restricted to.
    pub fn required_truck(&self) -> Option<TruckId> {
        self.required_truck
    }

    /// Packages that must travel with this one.
    pub fn must_accompany(&self) -> &BTreeSet<PackageId> {
        &self.must_accompany
    }

    pub(crate) fn retain_accompany(&mut self, keep: impl FnMut(&PackageId) -> bool) {
        self.must_accompany.retain(keep);
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.no_load_before.is_none()
            && self.required_truck.is_none()
            && self.must_accompany.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let c = ConstraintSet::new();
        assert!(c.is_empty());
        assert!(c.must_accompany().is_empty());
    }

    #[test]
    fn test_builder() {
        let t = NaiveTime::from_hms_opt(9, 5, 0).expect("valid");
        let c = ConstraintSet::new()
            .with_no_load_before(t)
            .with_required_truck(2)
            .with_accompany([13, 15])
            .with_accompany([19]);
        assert_eq!(c.no_load_before(), Some(t));
        assert_eq!(c.required_truck(), Some(2));
        assert_eq!(c.must_accompany().iter().copied().collect::<Vec<_>>(), vec![13, 15, 19]);
        assert!(!c.is_empty());
    }

    #[test]
    fn test_retain_accompany() {
        let mut c = ConstraintSet::new().with_accompany([13, 15, 19]);
        c.retain_accompany(|id| *id != 15);
        assert_eq!(c.must_accompany().iter().copied().collect::<Vec<_>>(), vec![13, 19]);
    }

    #[test]
    fn test_deserialize_partial() {
        let c: ConstraintSet =
            serde_json::from_str(r#"{"required_truck": 2}"#).expect("valid json");
        assert_eq!(c.required_truck(), Some(2));
        assert!(c.no_load_before().is_none());
    }
}
