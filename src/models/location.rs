//! Canonical location keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A delivery location, keyed by its normalized address string.
///
/// Normalization trims the input and collapses every run of whitespace
/// (including embedded newlines) into a single space, so keys coming from
/// differently formatted manifests and distance tables compare equal.
///
/// # Examples
///
/// ```
/// use u_delivery::models::Location;
///
/// let a = Location::new("  1060 Dalton Ave  S ");
/// let b = Location::new("1060 Dalton Ave S");
/// assert_eq!(a, b);
///
/// let full = Location::from_parts("195 W Oakland Ave", "Salt Lake City", "UT", "84115");
/// assert_eq!(full.as_str(), "195 W Oakland Ave, Salt Lake City, UT 84115");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Location(String);

impl Location {
    /// Creates a location from a raw key, normalizing whitespace.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    /// Builds the canonical `"street, city, state zip"` key.
    pub fn from_parts(street: &str, city: &str, state: &str, zip: &str) -> Self {
        Self::new(format!(
            "{}, {}, {} {}",
            normalize(street),
            normalize(city),
            normalize(state),
            normalize(zip)
        ))
    }

    /// The normalized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Location {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Location {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}
