//! Application state management

use chrono::{DateTime, Utc};
use ovt_core::{reading::TelemetryReading, source::TelemetrySource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// All registered sources, in preference order (bridge before simulator)
    pub sources: Arc<RwLock<Vec<Box<dyn TelemetrySource>>>>,

    /// Name of the currently active source
    pub active_source: Arc<RwLock<Option<String>>>,

    /// Broadcast channel for telemetry readings
    /// Multiple consumers can subscribe to receive readings
    pub telemetry_tx: broadcast::Sender<TelemetryReading>,

    /// Most recent published reading, served by GET /data
    pub latest: Arc<RwLock<Option<TelemetryReading>>>,

    /// Total readings published since startup
    pub samples: Arc<AtomicU64>,

    /// Startup time, for the status endpoint's uptime
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new() -> Self {
        // Broadcast capacity of 100 readings; slow subscribers lag rather
        // than block the manager
        let (telemetry_tx, _) = broadcast::channel(100);

        Self {
            sources: Arc::new(RwLock::new(Vec::new())),
            active_source: Arc::new(RwLock::new(None)),
            telemetry_tx,
            latest: Arc::new(RwLock::new(None)),
            samples: Arc::new(AtomicU64::new(0)),
            started_at: Utc::now(),
        }
    }

    /// Register a source; registration order is preference order
    pub async fn register_source(&self, source: Box<dyn TelemetrySource>) {
        let mut sources = self.sources.write().await;
        sources.push(source);
    }

    /// Subscribe to published readings
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryReading> {
        self.telemetry_tx.subscribe()
    }

    /// Publish a reading: stamp the latest slot, bump counters, broadcast
    pub async fn publish(&self, reading: TelemetryReading) {
        {
            let mut latest = self.latest.write().await;
            *latest = Some(reading.clone());
        }
        self.samples.fetch_add(1, Ordering::Relaxed);
        // Ignore error if no receivers (they'll get the next reading)
        let _ = self.telemetry_tx.send(reading);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
