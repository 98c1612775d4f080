//! Exponential value smoothing
//!
//! Polled sensor values arrive as discrete jumps; gauges look stable when
//! each channel eases toward the newest sample instead of snapping to it.
//! The per-channel coefficients mirror the dashboard's animation engine:
//! fast channels (rpm, speed) take large steps, slow channels (temperature)
//! take small ones.

use crate::reading::TelemetryReading;
use crate::units::*;

/// First-order exponential smoother: `value += (target - value) * alpha`
///
/// The first update passes the target through unchanged so a freshly
/// created smoother does not ramp up from zero.
#[derive(Debug, Clone)]
pub struct ExpSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl ExpSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    /// Feed a new target value, returning the smoothed output
    pub fn update(&mut self, target: f64) -> f64 {
        let next = match self.value {
            Some(current) => current + (target - current) * self.alpha,
            None => target,
        };
        self.value = Some(next);
        next
    }

    /// Last smoothed output, if any sample has been fed
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Forget accumulated state (e.g. after a source switch)
    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Smoothing coefficients per channel group
const RPM_ALPHA: f64 = 0.15;
const SPEED_ALPHA: f64 = 0.15;
const BATTERY_ALPHA: f64 = 0.3;
const TEMP_ALPHA: f64 = 0.1;

/// Applies per-channel smoothing to the gauge-critical reading fields
///
/// Only rpm, speed, battery voltage and the two engine-bay temperatures are
/// smoothed; everything else passes through untouched.
#[derive(Debug, Clone)]
pub struct ReadingSmoother {
    rpm: ExpSmoother,
    speed: ExpSmoother,
    battery: ExpSmoother,
    coolant: ExpSmoother,
    intake: ExpSmoother,
}

impl ReadingSmoother {
    pub fn new() -> Self {
        Self {
            rpm: ExpSmoother::new(RPM_ALPHA),
            speed: ExpSmoother::new(SPEED_ALPHA),
            battery: ExpSmoother::new(BATTERY_ALPHA),
            coolant: ExpSmoother::new(TEMP_ALPHA),
            intake: ExpSmoother::new(TEMP_ALPHA),
        }
    }

    /// Produce a smoothed copy of the reading
    pub fn smooth(&mut self, reading: &TelemetryReading) -> TelemetryReading {
        let mut out = reading.clone();
        out.rpm = Rpm(self.rpm.update(reading.rpm.0));
        out.speed = KilometersPerHour(self.speed.update(reading.speed.0));
        out.battery_voltage = Volts(self.battery.update(reading.battery_voltage.0));
        out.coolant = Celsius(self.coolant.update(reading.coolant.0));
        out.intake = Celsius(self.intake.update(reading.intake.0));
        out
    }

    /// Forget accumulated state on all channels
    pub fn reset(&mut self) {
        self.rpm.reset();
        self.speed.reset();
        self.battery.reset();
        self.coolant.reset();
        self.intake.reset();
    }
}

impl Default for ReadingSmoother {
    fn default() -> Self {
        Self::new()
    }
}
