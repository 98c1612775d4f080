//! Source lifecycle manager
//!
//! This module handles:
//! - Registering the configured sources (live bridge, simulator)
//! - Polling sources for availability and switching between them
//! - Reading a frame from the active source on a fixed interval
//! - Publishing readings to subscribers (optionally smoothed)
//!
//! Sources are preferred in registration order: the bridge is registered
//! first, so live data wins whenever the gateway is reachable, and the
//! manager switches back the moment it reappears.

use crate::config::ServerConfig;
use crate::state::AppState;
use anyhow::Result;
use ovt_core::smoothing::ReadingSmoother;
use ovt_sources::{ObdBridgeSource, SimulatorConfig, SimulatorSource};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

const DETECTION_INTERVAL: Duration = Duration::from_secs(1);

/// Main manager loop
pub async fn run(state: AppState, config: ServerConfig) {
    // Register sources in preference order
    if let Some(url) = &config.bridge_url {
        let poll = Duration::from_millis(config.bridge_poll_ms);
        state
            .register_source(Box::new(ObdBridgeSource::new(url.clone(), poll)))
            .await;
    }
    let simulator = match config.sim_seed {
        Some(seed) => SimulatorSource::with_seed(SimulatorConfig::default(), seed),
        None => SimulatorSource::new(SimulatorConfig::default()),
    };
    state.register_source(Box::new(simulator)).await;

    info!("Source manager started");

    let frame_interval = Duration::from_millis(config.frame_ms.max(1));
    let mut smoother = config.smoothing.then(ReadingSmoother::new);
    let mut last_detection: Option<Instant> = None;

    loop {
        // Check which source should be active
        if let Err(e) = detection_cycle(&state, &mut last_detection, smoother.as_mut()).await {
            error!("Error in detection cycle: {}", e);
        }

        // Read a frame from the active source
        if let Err(e) = frame_cycle(&state, smoother.as_mut()).await {
            error!("Error reading frame: {}", e);
        }

        sleep(frame_interval).await;
    }
}

/// Pick the preferred available source, preempting a lower-priority one
async fn detection_cycle(
    state: &AppState,
    last_check: &mut Option<Instant>,
    smoother: Option<&mut ReadingSmoother>,
) -> Result<()> {
    // Rate limit detection checks to once per second
    if let Some(last) = last_check {
        if last.elapsed() < DETECTION_INTERVAL {
            return Ok(());
        }
    }
    *last_check = Some(Instant::now());

    let mut sources = state.sources.write().await;
    let mut active = state.active_source.write().await;

    let preferred = sources.iter().position(|s| s.detect());
    let current = active
        .as_ref()
        .and_then(|name| sources.iter().position(|s| s.name() == name));

    if preferred == current {
        return Ok(());
    }

    if let Some(idx) = current {
        let source = &mut sources[idx];
        info!("Stopping source {}", source.name());
        if let Err(e) = source.stop() {
            error!("Error stopping source {}: {}", source.name(), e);
        }
        *active = None;
        if let Some(smoother) = smoother {
            smoother.reset();
        }
    }

    if let Some(idx) = preferred {
        let source = &mut sources[idx];
        match source.start() {
            Ok(_) => {
                info!("Source {} started", source.name());
                *active = Some(source.name().to_string());
            }
            Err(e) => {
                error!("Failed to start source {}: {}", source.name(), e);
            }
        }
    }

    Ok(())
}

/// Read one frame from the active source and publish it
async fn frame_cycle(state: &AppState, smoother: Option<&mut ReadingSmoother>) -> Result<()> {
    let active_name = {
        let active = state.active_source.read().await;
        active.clone()
    };

    let Some(active_name) = active_name else {
        return Ok(());
    };

    let reading = {
        let mut sources = state.sources.write().await;
        match sources.iter_mut().find(|s| s.name() == active_name) {
            Some(source) => match source.read() {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("Error reading from {}: {}", active_name, e);
                    None
                }
            },
            None => None,
        }
    };

    if let Some(reading) = reading {
        let reading = match smoother {
            Some(smoother) => smoother.smooth(&reading),
            None => reading,
        };
        state.publish(reading).await;
    }

    Ok(())
}
