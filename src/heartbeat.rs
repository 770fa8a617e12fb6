//! Heartbeat tracking.
//!
//! Records when periodic tasks last ran and gates re-runs behind a
//! minimum interval. State is a task-name to timestamp map persisted
//! as JSON, same single-writer discipline as the portfolio ledger.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::alerts::PeerNetwork;

/// Minimum hours between Moltbook heartbeat checks.
pub const MOLTBOOK_CHECK_MIN_HOURS: f64 = 4.0;

/// Task name recorded after each market scan.
pub const TASK_MARKET_SCAN: &str = "market_scan";

/// Task name recorded after each Moltbook heartbeat.
pub const TASK_MOLTBOOK_CHECK: &str = "moltbook_check";

/// Last-run info for a single task.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub last_run: DateTime<Utc>,
    pub hours_ago: f64,
}

pub struct HeartbeatGate {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HeartbeatGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Hours since the task last completed. Never-run tasks report
    /// infinite elapsed time, so they are always due.
    pub fn hours_since(&self, task: &str) -> f64 {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let state = Self::load(&self.path);
        match state.get(task) {
            Some(last) => (Utc::now() - *last).num_seconds() as f64 / 3600.0,
            None => f64::INFINITY,
        }
    }

    /// Whether at least `min_hours` have passed since the task last ran.
    pub fn due(&self, task: &str, min_hours: f64) -> bool {
        self.hours_since(task) >= min_hours
    }

    /// Record that the task completed now. Overwrites any previous
    /// timestamp for the task.
    pub fn mark_done(&self, task: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = Self::load(&self.path);
        state.insert(task.to_string(), Utc::now());
        self.save(&state)
    }

    /// Last-run summary for all known tasks.
    pub fn summary(&self) -> Vec<(String, TaskStatus)> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let state = Self::load(&self.path);
        let now = Utc::now();
        let mut entries: Vec<(String, TaskStatus)> = state
            .into_iter()
            .map(|(task, last_run)| {
                let hours_ago = (now - last_run).num_seconds() as f64 / 3600.0;
                (task, TaskStatus { last_run, hours_ago })
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn load(path: &Path) -> HashMap<String, DateTime<Utc>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt heartbeat file, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn save(&self, state: &HashMap<String, DateTime<Utc>>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create heartbeat directory: {}", parent.display())
                })?;
            }
        }
        let json =
            serde_json::to_string_pretty(state).context("Failed to serialize heartbeat state")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write heartbeat file: {}", self.path.display()))
    }
}

/// Run the Moltbook heartbeat if it is due.
///
/// Checks agent status, DM activity, and the feed. Every sub-check is
/// best-effort: failures are logged and do not block the others or the
/// final mark_done.
pub async fn run_peer_heartbeat(gate: &HeartbeatGate, network: &dyn PeerNetwork) -> Result<()> {
    let hours = gate.hours_since(TASK_MOLTBOOK_CHECK);
    if hours < MOLTBOOK_CHECK_MIN_HOURS {
        info!(
            next_in_hours = MOLTBOOK_CHECK_MIN_HOURS - hours,
            "Moltbook check not due"
        );
        return Ok(());
    }

    info!("Running Moltbook heartbeat");

    match network.check_status().await {
        Ok(status) => info!(status = status.status.as_deref().unwrap_or("unknown"), "Moltbook status"),
        Err(e) => warn!(error = %e, "Moltbook status check failed"),
    }

    match network.check_dm_activity().await {
        Ok(activity) if activity.has_activity => {
            info!(summary = activity.summary.as_deref().unwrap_or(""), "DM activity")
        }
        Ok(_) => info!("No new DMs"),
        Err(e) => warn!(error = %e, "DM check failed"),
    }

    match network.fetch_feed(5).await {
        Ok(posts) => info!(count = posts.len(), "Fetched Moltbook feed"),
        Err(e) => warn!(error = %e, "Feed fetch failed"),
    }

    gate.mark_done(TASK_MOLTBOOK_CHECK)?;
    info!("Moltbook heartbeat complete");
    Ok(())
}
