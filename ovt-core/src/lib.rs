//! OpenVehicleTelemetry Core Library
//!
//! This crate provides the canonical telemetry reading model, the source
//! trait implemented by data providers (live OBD bridge, simulator), and
//! the value-smoothing helpers shared by consumers.

pub mod reading;
pub mod smoothing;
pub mod source;
pub mod units;

pub use reading::{FieldMask, TelemetryReading};
pub use source::TelemetrySource;
