//! Causal telemetry simulator
//!
//! Fallback source that fabricates plausible OBD readings when no live
//! gateway is reachable. Instead of jittering every field independently, a
//! small physical state vector advances once per tick with first-order
//! inertia: infrequent discrete throttle decisions set a target rpm, rpm
//! chases the target, speed lags rpm, and load follows how hard rpm is
//! chasing. Charts therefore show correlated motion instead of noise.

use anyhow::Result;
use ovt_core::{reading::TelemetryReading, source::TelemetrySource, units::*};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

/// Thermostat set point; the coolant model switches regime here
const THERMOSTAT_C: f64 = 90.0;

/// Tunable time constants of the physical model
///
/// Defaults reproduce the dashboard's stock behavior; the response rates are
/// per-second gains of the first-order approach, not hardcoded laws.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Gain of the rpm approach toward target rpm (1/s)
    pub rpm_response_rate: f64,
    /// Gain of the speed approach toward its rpm-derived target (1/s)
    pub speed_response_rate: f64,
    /// Cold-engine coolant warmup rate (°C/s)
    pub warmup_rate: f64,
    /// Per-tick probability of redrawing the driver-intent target rpm
    pub intent_probability: f64,
    /// Lower bound of the target rpm range (idle)
    pub idle_rpm: f64,
    /// Upper bound of the target rpm range
    pub max_target_rpm: f64,
    /// Delta-time clamp (s); protects the model after long pauses
    pub max_dt_secs: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            rpm_response_rate: 2.0,
            speed_response_rate: 0.5,
            warmup_rate: 2.0,
            intent_probability: 0.02,
            idle_rpm: 800.0,
            max_target_rpm: 3800.0,
            max_dt_secs: 1.0,
        }
    }
}

/// The simulator's physical state vector
///
/// Owned exclusively by one [`CausalSimulator`] and mutated only by its
/// update step. Public so a model can be seeded mid-trajectory and replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsState {
    /// Current engine speed
    pub rpm: f64,
    /// Driver-intent set point
    pub target_rpm: f64,
    /// Vehicle speed, lags rpm
    pub speed: f64,
    /// Coolant temperature (°C)
    pub coolant: f64,
    /// Tank level (%); the current model does not drain it
    pub fuel_level: f64,
    /// Derived engine load (%)
    pub load: f64,
    /// Wall clock of the previous tick, None until the first tick
    pub last_update_ms: Option<u64>,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            rpm: 800.0,
            target_rpm: 800.0,
            speed: 0.0,
            coolant: 20.0,
            fuel_level: 65.0,
            load: 20.0,
            last_update_ms: None,
        }
    }
}

/// First-order causal model producing one internally-consistent reading per
/// tick
///
/// `tick` takes the current time explicitly and never reads a wall clock,
/// so trajectories are replayable; randomness (driver intent, fuel-trim and
/// battery noise) comes from a seedable RNG with a fixed draw order, so two
/// instances with the same seed and timestamps produce identical readings.
pub struct CausalSimulator {
    config: SimulatorConfig,
    state: PhysicsState,
    rng: StdRng,
}

impl CausalSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: PhysicsState::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic construction for reproducible runs
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            state: PhysicsState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Resume from an explicit state (replay, tests)
    pub fn with_state(config: SimulatorConfig, state: PhysicsState, seed: u64) -> Self {
        Self {
            config,
            state,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &PhysicsState {
        &self.state
    }

    /// Override the driver-intent set point
    pub fn set_target_rpm(&mut self, rpm: f64) {
        self.state.target_rpm = rpm;
    }

    /// Advance the model to `now_ms` and produce a reading
    ///
    /// Step order matters: later steps read values updated by earlier ones.
    /// Total over its numeric domain; the first tick only stamps the clock
    /// (dt = 0).
    pub fn tick(&mut self, now_ms: u64) -> TelemetryReading {
        let dt = match self.state.last_update_ms {
            Some(prev) => {
                let dt = now_ms.saturating_sub(prev) as f64 / 1000.0;
                dt.min(self.config.max_dt_secs)
            }
            None => 0.0,
        };
        self.state.last_update_ms = Some(now_ms);

        // Driver intent: infrequent discrete throttle decisions
        if self.rng.gen::<f64>() < self.config.intent_probability {
            let span = self.config.max_target_rpm - self.config.idle_rpm;
            self.state.target_rpm = self.config.idle_rpm + self.rng.gen::<f64>() * span;
        }

        // Engine inertia: first-order approach to the target
        let rpm_error = self.state.target_rpm - self.state.rpm;
        self.state.rpm += rpm_error * self.config.rpm_response_rate * dt;

        // Fixed-gear proxy: 2000 rpm maps to 60 km/h; vehicle mass makes
        // speed lag the engine
        let target_speed = self.state.rpm / 2000.0 * 60.0;
        self.state.speed += (target_speed - self.state.speed) * self.config.speed_response_rate * dt;

        // Thermal model: linear warmup until the thermostat, then a small
        // oscillation around it. The regime switch at 90 °C is a hard
        // transition, checked against the pre-update value.
        if self.state.coolant < THERMOSTAT_C {
            self.state.coolant += self.config.warmup_rate * dt;
        } else {
            self.state.coolant = THERMOSTAT_C + (now_ms as f64 / 5000.0).sin() * 2.0;
        }

        // Load spikes while rpm chases a distant target; display clamp below
        self.state.load = 20.0 + rpm_error.abs() / 100.0;

        TelemetryReading {
            timestamp: now_ms,
            rpm: Rpm(self.state.rpm.max(0.0)),
            speed: KilometersPerHour(self.state.speed.max(0.0)),
            coolant: Celsius(self.state.coolant),
            intake: Celsius(30.0 + (now_ms as f64 / 10000.0).sin() * 2.0),
            ambient: Celsius(22.0),
            manifold_pressure: Kilopascals(30.0 + self.state.rpm / 100.0),
            baro_pressure: Kilopascals(101.0),
            fuel_pressure: Kilopascals(350.0),
            fuel_level: Percent::clamped(self.state.fuel_level),
            short_term_fuel_trim: Percent(self.rng.gen::<f64>() * 4.0 - 2.0),
            long_term_fuel_trim: Percent(1.5),
            battery_voltage: Volts(13.8 + self.rng.gen::<f64>() * 0.2),
            engine_load: Percent::clamped(self.state.load),
            throttle_position: Percent(((self.state.rpm - 800.0) / 30.0).min(100.0)),
            maf: GramsPerSecond(self.state.rpm / 100.0),
        }
    }
}

// =============================================================================
// SimulatorSource
// =============================================================================

/// Adapts [`CausalSimulator`] to the source trait with a monotonic clock
pub struct SimulatorSource {
    sim: CausalSimulator,
    active: bool,
    start_time: Option<Instant>,
}

impl SimulatorSource {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            sim: CausalSimulator::new(config),
            active: false,
            start_time: None,
        }
    }

    /// Seeded variant for reproducible demo data
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            sim: CausalSimulator::with_seed(config, seed),
            active: false,
            start_time: None,
        }
    }
}

impl Default for SimulatorSource {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl TelemetrySource for SimulatorSource {
    fn key(&self) -> &str {
        "simulator"
    }

    fn name(&self) -> &str {
        "Causal Simulator"
    }

    fn detect(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<()> {
        self.active = true;
        self.start_time = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.active = false;
        self.start_time = None;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<TelemetryReading>> {
        if !self.active {
            return Ok(None);
        }

        let now_ms = self
            .start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        Ok(Some(self.sim.tick(now_ms)))
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
