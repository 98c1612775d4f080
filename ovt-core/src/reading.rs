//! Canonical telemetry reading
//!
//! Defines the flat `TelemetryReading` record that every source produces.
//! Field names serialize in camelCase because that is the exact shape the
//! downstream gauge/chart renderers consume; the wire names are the one
//! compatibility contract this crate has to honor.

use crate::units::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// One complete telemetry sample, produced fresh on every tick.
///
/// Timestamp is epoch milliseconds (the renderers' `Date.now()` convention).
/// All other fields are scalar sensor values in the units the dashboard
/// displays: °C, kPa, percent points, volts, g/s, RPM and km/h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    /// Capture time, epoch milliseconds
    pub timestamp: u64,

    /// Engine speed
    pub rpm: Rpm,

    /// Vehicle speed
    pub speed: KilometersPerHour,

    /// Coolant temperature
    pub coolant: Celsius,

    /// Intake air temperature
    pub intake: Celsius,

    /// Ambient air temperature
    pub ambient: Celsius,

    /// Manifold absolute pressure
    pub manifold_pressure: Kilopascals,

    /// Barometric pressure
    pub baro_pressure: Kilopascals,

    /// Fuel rail pressure
    pub fuel_pressure: Kilopascals,

    /// Fuel tank level
    pub fuel_level: Percent,

    /// Short-term fuel trim (signed)
    pub short_term_fuel_trim: Percent,

    /// Long-term fuel trim (signed)
    pub long_term_fuel_trim: Percent,

    /// Battery / charging voltage
    pub battery_voltage: Volts,

    /// Calculated engine load
    pub engine_load: Percent,

    /// Throttle position
    pub throttle_position: Percent,

    /// Mass air flow rate
    pub maf: GramsPerSecond,
}

/// Specifies which reading fields to include in serialized output
///
/// Used by the streaming endpoint to reduce payload size when a client only
/// renders a few channels.
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all fields
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of field names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            fields,
            include_all: false,
        }
    }

    /// Check if a field should be included
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    /// Check if all fields should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FieldMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl TelemetryReading {
    /// Serialize this reading respecting the given field mask
    ///
    /// If mask is None or includes all fields, serialize everything.
    /// `timestamp` is always included so clients can order samples.
    pub fn to_json_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(m) if !m.is_all() => m,
            _ => return serde_json::to_string(self),
        };

        let value = serde_json::to_value(self)?;
        let mut map = match value {
            serde_json::Value::Object(map) => map,
            other => return serde_json::to_string(&other),
        };

        map.retain(|key, _| key == "timestamp" || mask.includes(key));
        serde_json::to_string(&map)
    }
}
