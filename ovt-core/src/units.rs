//! Type-safe wrappers for physical units
//!
//! Newtype wrappers around f64 to prevent unit confusion between the
//! simulator, the bridge normalization, and the wire model.
//!
//! All unit types serialize with 4 decimal places to reduce JSON payload size.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Revolutions per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round4")] pub f64);

/// Kilometers per hour (the dashboard's speed unit)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round4")] pub f64);

/// Celsius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round4")] pub f64);

/// Kilopascals (manifold, barometric and fuel pressure)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kilopascals(#[serde(serialize_with = "round4")] pub f64);

/// Percent, 0 to 100 scale
///
/// Fuel trims are percentages too but may legitimately be negative, so the
/// raw tuple constructor is left open; use [`Percent::clamped`] for fields
/// that the wire contract bounds to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round4")] pub f64);

impl Percent {
    /// Create a percentage clamped to [0.0, 100.0]
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    /// Get as a fraction (0.0 to 1.0)
    pub fn as_fraction(&self) -> f64 {
        self.0 / 100.0
    }
}

/// Volts (battery / charging system)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volts(#[serde(serialize_with = "round4")] pub f64);

/// Grams per second (mass air flow)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GramsPerSecond(#[serde(serialize_with = "round4")] pub f64);
