//! Environment-driven server configuration
//!
//! Everything tunable reads from `OVT_*` variables; invalid values log a
//! warning and fall back to the default rather than aborting startup.

use std::str::FromStr;
use tracing::warn;

/// Runtime configuration for the server and its source manager
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port (`OVT_PORT`)
    pub port: u16,
    /// Live gateway endpoint, e.g. `http://192.168.4.1/data`
    /// (`OVT_BRIDGE_URL`); the bridge source is only registered when set
    pub bridge_url: Option<String>,
    /// Bridge poll cadence in milliseconds (`OVT_BRIDGE_POLL_MS`)
    pub bridge_poll_ms: u64,
    /// Manager frame cadence in milliseconds (`OVT_FRAME_MS`)
    pub frame_ms: u64,
    /// Smooth gauge-critical channels before publishing (`OVT_SMOOTHING`)
    pub smoothing: bool,
    /// Seed for reproducible simulator output (`OVT_SIM_SEED`)
    pub sim_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9100,
            bridge_url: None,
            bridge_poll_ms: 200,
            frame_ms: 100,
            smoothing: false,
            sim_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("OVT_PORT", defaults.port),
            bridge_url: std::env::var("OVT_BRIDGE_URL").ok().filter(|s| !s.is_empty()),
            bridge_poll_ms: env_parse("OVT_BRIDGE_POLL_MS", defaults.bridge_poll_ms),
            frame_ms: env_parse("OVT_FRAME_MS", defaults.frame_ms),
            smoothing: env_flag("OVT_SMOOTHING"),
            sim_seed: env_opt_parse("OVT_SIM_SEED"),
        }
    }
}

fn env_parse<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{}={:?} is not valid, using default {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_opt_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{}={:?} is not valid, ignoring", name, raw);
            None
        }
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes") | Ok("on")
    )
}
