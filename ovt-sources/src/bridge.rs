//! Live OBD bridge source
//!
//! Polls the vehicle gateway's HTTP `/data` endpoint (flat JSON with
//! snake_case keys, as emitted by the CAN firmware) and normalizes it into
//! the canonical reading. Key aliases and defaults match what the dashboard
//! renderers tolerate; a payload without an `rpm` key is treated as "no
//! data" so the manager can fall back to the simulator.
//!
//! A failed fetch is logged and the bridge marks itself disconnected;
//! there is no retry or backoff policy.

use anyhow::Result;
use ovt_core::{reading::TelemetryReading, source::TelemetrySource, units::*};
use serde_json::Value;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timeout for the detection probe; detect() runs on every detection cycle
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Timeout for a single poll request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no rpm key")]
    MissingRpm,
}

/// Polls before declaring a freshly started bridge dead
const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// Source that polls a local HTTP endpoint for live OBD-II readings
pub struct ObdBridgeSource {
    url: String,
    poll_interval: Duration,
    active: bool,
    started_at: Option<std::time::Instant>,
    connected: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<TelemetryReading>>>,
    cancel: Option<CancellationToken>,
}

impl ObdBridgeSource {
    pub fn new(url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            url: url.into(),
            poll_interval,
            active: false,
            started_at: None,
            connected: Arc::new(AtomicBool::new(false)),
            latest: Arc::new(Mutex::new(None)),
            cancel: None,
        }
    }
}

impl TelemetrySource for ObdBridgeSource {
    fn key(&self) -> &str {
        "bridge"
    }

    fn name(&self) -> &str {
        "OBD Bridge"
    }

    /// Availability check
    ///
    /// While running, the gateway must actually be yielding readings: a
    /// reachable endpoint that returns no data loses preference so the
    /// manager can fall back to the simulator. Before the first poll
    /// completes a short grace period applies. When idle, a cheap TCP
    /// connect probe against the gateway's host:port decides.
    fn detect(&self) -> bool {
        if self.active {
            let in_grace = self
                .started_at
                .map(|t| t.elapsed() < STARTUP_GRACE)
                .unwrap_or(false);
            return self.connected.load(Ordering::Relaxed) || in_grace;
        }

        let url = match reqwest::Url::parse(&self.url) {
            Ok(url) => url,
            Err(_) => return false,
        };
        let host = match url.host_str() {
            Some(host) => host,
            None => return false,
        };
        let port = url.port_or_known_default().unwrap_or(80);

        let mut addrs = match (host, port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(_) => return false,
        };
        addrs
            .next()
            .map(|addr| TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok())
            .unwrap_or(false)
    }

    /// Spawn the background poll task. Must be called from within a tokio
    /// runtime.
    fn start(&mut self) -> Result<()> {
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        self.active = true;
        self.started_at = Some(std::time::Instant::now());

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let url = self.url.clone();
        let poll_interval = self.poll_interval;
        let connected = self.connected.clone();
        let latest = self.latest.clone();

        tokio::spawn(async move {
            info!("OBD bridge polling {} every {:?}", url, poll_interval);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }

                match fetch_once(&client, &url).await {
                    Ok(reading) => {
                        connected.store(true, Ordering::Relaxed);
                        *latest.lock().unwrap() = Some(reading);
                    }
                    Err(e) => {
                        // Warn once per outage, then drop to debug
                        if connected.swap(false, Ordering::Relaxed) {
                            warn!("OBD bridge disconnected: {}", e);
                        } else {
                            debug!("OBD bridge still unreachable: {}", e);
                        }
                    }
                }
            }

            debug!("OBD bridge poll task ended");
        });

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.active = false;
        self.started_at = None;
        self.connected.store(false, Ordering::Relaxed);
        *self.latest.lock().unwrap() = None;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<TelemetryReading>> {
        if !self.active {
            return Ok(None);
        }
        Ok(self.latest.lock().unwrap().take())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// One GET + normalize round trip
async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<TelemetryReading, BridgeError> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let value: Value = serde_json::from_str(&body)?;

    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    normalize_wire(&value, now_ms).ok_or(BridgeError::MissingRpm)
}

/// First numeric value among the given keys
fn pick(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| value.get(k).and_then(Value::as_f64))
}

/// Normalize a gateway payload into the canonical reading
///
/// Key aliases cover both the firmware's snake_case names and the generic
/// spellings some gateways use. Fields the gateway omits get the renderers'
/// defaults. Returns None when the payload carries no `rpm` at all, which
/// the caller treats as "bridge present but no data".
pub fn normalize_wire(value: &Value, fallback_ts: u64) -> Option<TelemetryReading> {
    let rpm = pick(value, &["rpm"])?;

    let timestamp = pick(value, &["timestamp"])
        .map(|t| t as u64)
        .unwrap_or(fallback_ts);

    Some(TelemetryReading {
        timestamp,
        rpm: Rpm(rpm),
        speed: KilometersPerHour(pick(value, &["speed"]).unwrap_or(0.0)),
        coolant: Celsius(pick(value, &["temp_coolant", "coolant"]).unwrap_or(0.0)),
        intake: Celsius(pick(value, &["temp_intake", "intake_temp", "intake"]).unwrap_or(0.0)),
        ambient: Celsius(pick(value, &["temp_ambient", "ambient_temp", "ambient"]).unwrap_or(25.0)),
        manifold_pressure: Kilopascals(pick(value, &["press_intake", "map"]).unwrap_or(100.0)),
        baro_pressure: Kilopascals(pick(value, &["press_baro", "baro"]).unwrap_or(101.0)),
        fuel_pressure: Kilopascals(pick(value, &["fuel_press", "fuel_pressure"]).unwrap_or(300.0)),
        fuel_level: Percent(pick(value, &["fuel_lvl", "fuel_level"]).unwrap_or(50.0)),
        short_term_fuel_trim: Percent(pick(value, &["fuel_trim_s", "stft"]).unwrap_or(0.0)),
        long_term_fuel_trim: Percent(pick(value, &["fuel_trim_l", "ltft"]).unwrap_or(0.0)),
        battery_voltage: Volts(pick(value, &["batt", "battery", "voltage"]).unwrap_or(12.0)),
        engine_load: Percent(pick(value, &["load"]).unwrap_or(0.0)),
        throttle_position: Percent(pick(value, &["throttle"]).unwrap_or(0.0)),
        maf: GramsPerSecond(pick(value, &["maf"]).unwrap_or(0.0)),
    })
}
