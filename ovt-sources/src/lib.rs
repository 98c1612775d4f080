//! Telemetry sources for OpenVehicleTelemetry

pub mod bridge;
pub mod sim;

pub use bridge::ObdBridgeSource;
pub use sim::{CausalSimulator, SimulatorConfig, SimulatorSource};
