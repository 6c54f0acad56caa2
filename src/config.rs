//! Fleet-wide simulation settings.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::{Location, Truck, TruckId};

pub(crate) fn default_departure() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
}

/// Configuration shared by the loader, the simulator and the fleet.
///
/// Every field has a default, so a partial JSON document (or none at all)
/// yields a usable configuration.
///
/// # Examples
///
/// ```
/// use u_delivery::config::FleetConfig;
/// use u_delivery::models::Location;
///
/// let config = FleetConfig::new(Location::new("Western Governors University"))
///     .with_service_minutes(2.0)
///     .with_return_to_hub(false);
/// assert_eq!(config.default_speed_mph, 18.0);
///
/// let trucks = config.fleet(3);
/// assert_eq!(trucks.len(), 3);
/// assert_eq!(trucks[2].id(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Depot every truck starts from.
    pub hub: Location,
    /// Default time trucks leave the hub.
    pub departure: NaiveTime,
    /// Minutes spent at each stop before driving on.
    pub service_minutes: f64,
    /// A timed deadline whose projected arrival is within this many minutes
    /// of it is loaded ahead of everything else.
    pub risk_window_minutes: f64,
    /// Whether trucks drive back to the hub after the last stop.
    pub return_to_hub: bool,
    /// Speed given to trucks built by [`FleetConfig::fleet`].
    pub default_speed_mph: f64,
    /// Capacity given to trucks built by [`FleetConfig::fleet`].
    pub default_capacity: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            hub: Location::new("Hub"),
            departure: default_departure(),
            service_minutes: 0.0,
            risk_window_minutes: 60.0,
            return_to_hub: true,
            default_speed_mph: 18.0,
            default_capacity: 16,
        }
    }
}

impl FleetConfig {
    /// Default configuration with the given hub.
    pub fn new(hub: Location) -> Self {
        Self {
            hub,
            ..Self::default()
        }
    }

    /// Sets the default departure time.
    pub fn with_departure(mut self, departure: NaiveTime) -> Self {
        self.departure = departure;
        self
    }

    /// Sets the per-stop service time.
    pub fn with_service_minutes(mut self, minutes: f64) -> Self {
        self.service_minutes = minutes;
        self
    }

    /// Sets the deadline risk window.
    pub fn with_risk_window_minutes(mut self, minutes: f64) -> Self {
        self.risk_window_minutes = minutes;
        self
    }

    /// Sets whether trucks return to the hub.
    pub fn with_return_to_hub(mut self, return_to_hub: bool) -> Self {
        self.return_to_hub = return_to_hub;
        self
    }

    /// Sets the default truck speed.
    pub fn with_default_speed_mph(mut self, speed: f64) -> Self {
        self.default_speed_mph = speed;
        self
    }

    /// Sets the default truck capacity.
    pub fn with_default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Builds `count` identical trucks with ids `1..=count`.
    pub fn fleet(&self, count: u32) -> Vec<Truck> {
        (1..=count as TruckId)
            .map(|id| {
                Truck::new(id, self.default_capacity, self.default_speed_mph)
                    .with_departure(self.departure)
            })
            .collect()
    }

    /// Parses a configuration from JSON; absent fields take their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::error::RoutingError::Config(e.to_string()))
    }
}
