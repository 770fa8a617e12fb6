//! Scheduler loop.
//!
//! Runs a scan immediately, then on a fixed interval until shutdown.
//! Runs are serialized: the loop awaits each scan before the next tick
//! can fire, and ticks missed during a long scan are skipped rather
//! than queued.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::engine::scanner::ScanOrchestrator;
use crate::heartbeat::{HeartbeatGate, TASK_MARKET_SCAN};
use crate::platforms::MarketSource;

/// Shortest accepted scan interval; tokio's interval asserts a
/// non-zero period.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Scheduler {
    source: Arc<dyn MarketSource>,
    orchestrator: Arc<ScanOrchestrator>,
    gate: Arc<HeartbeatGate>,
    market_limit: usize,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn MarketSource>,
        orchestrator: Arc<ScanOrchestrator>,
        gate: Arc<HeartbeatGate>,
        market_limit: usize,
        interval: Duration,
    ) -> Self {
        let interval = if interval < MIN_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Scan interval too short, clamping to 1s"
            );
            MIN_INTERVAL
        } else {
            interval
        };
        Self {
            source,
            orchestrator,
            gate,
            market_limit,
            interval,
        }
    }

    /// Run a single scan: fetch, analyze, alert, mark the heartbeat.
    pub async fn scan_once(&self) -> Result<usize> {
        info!(source = self.source.name(), limit = self.market_limit, "Starting scan");

        let markets = self.source.fetch_active(self.market_limit).await?;
        if markets.is_empty() {
            info!("No active markets found");
            self.gate.mark_done(TASK_MARKET_SCAN)?;
            return Ok(0);
        }

        let alerts_sent = self.orchestrator.run(&markets).await;
        self.gate.mark_done(TASK_MARKET_SCAN)?;

        info!(alerts_sent, markets = markets.len(), "Scan complete");
        Ok(alerts_sent)
    }

    /// Run scans until the shutdown future resolves.
    ///
    /// The first scan starts immediately. A failed scan is logged and
    /// the loop keeps going; only shutdown stops it.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.scan_once().await {
                        error!(error = %e, "Scan failed");
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, scheduler stopping");
                    break;
                }
            }
        }
    }
}
