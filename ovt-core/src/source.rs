//! Telemetry source trait definition

use crate::reading::TelemetryReading;
use anyhow::Result;

/// Trait for telemetry data sources
///
/// Each source is responsible for:
/// - Detecting whether its data provider is currently reachable
/// - Acquiring sensor values (live bridge poll, simulation step)
/// - Producing readings in the canonical TelemetryReading shape
pub trait TelemetrySource: Send + Sync {
    /// Stable identifier for this source (e.g. "bridge", "simulator")
    fn key(&self) -> &str;

    /// Human-readable name (e.g. "OBD Bridge", "Causal Simulator")
    fn name(&self) -> &str;

    /// Check if the data provider is currently available
    ///
    /// This should be a lightweight check (e.g. TCP connect probe); it runs
    /// on every detection cycle.
    fn detect(&self) -> bool;

    /// Start producing readings
    ///
    /// Called when this source is selected. Initialize clocks, connections
    /// or background polling here.
    fn start(&mut self) -> Result<()>;

    /// Stop producing readings and release resources
    fn stop(&mut self) -> Result<()>;

    /// Read the next telemetry reading
    ///
    /// Returns:
    /// - `Ok(Some(reading))` if a new reading is available
    /// - `Ok(None)` if no new data (non-blocking)
    /// - `Err(_)` if an error occurred
    ///
    /// Must not block; the manager calls this on its frame interval.
    fn read(&mut self) -> Result<Option<TelemetryReading>>;

    /// Get whether the source is currently active
    fn is_active(&self) -> bool;
}
