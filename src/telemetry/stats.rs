//! Pipeline counters and tick latency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Soft real-time budget for one full tick, in milliseconds.
pub const FRAME_BUDGET_MS: f64 = 50.0;

/// Recent ticks kept for mean, spread and p95 (one minute at 60 Hz).
pub const LATENCY_WINDOW: usize = 3600;

/// Counters for one pipeline session.
#[derive(Debug)]
pub struct PipelineStats {
    /// Ticks processed
    ticks: AtomicU64,
    /// Committed gesture changes, both hands
    gesture_changes: AtomicU64,
    grabs: AtomicU64,
    releases: AtomicU64,
    menu_selections: AtomicU64,
    /// Hand ticks that fell back to "no gesture" because of bad input
    degraded_ticks: AtomicU64,
    tracking_losses: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            gesture_changes: AtomicU64::new(0),
            grabs: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            menu_selections: AtomicU64::new(0),
            degraded_ticks: AtomicU64::new(0),
            tracking_losses: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gesture_change(&self) {
        self.gesture_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_grab(&self) {
        self.grabs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_menu_selection(&self) {
        self.menu_selections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded(&self) {
        self.degraded_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tracking_lost(&self) {
        self.tracking_losses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            gesture_changes: self.gesture_changes.load(Ordering::Relaxed),
            grabs: self.grabs.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            menu_selections: self.menu_selections.load(Ordering::Relaxed),
            degraded_ticks: self.degraded_ticks.load(Ordering::Relaxed),
            tracking_losses: self.tracking_losses.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Ticks processed: {}\n\
             - Gesture changes: {}\n\
             - Grabs / releases: {} / {}\n\
             - Menu selections: {}\n\
             - Degraded hand ticks: {}\n\
             - Tracking losses: {}\n\
             - Session duration: {} seconds",
            stats.ticks,
            stats.gesture_changes,
            stats.grabs,
            stats.releases,
            stats.menu_selections,
            stats.degraded_ticks,
            stats.tracking_losses,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.gesture_changes.store(0, Ordering::Relaxed);
        self.grabs.store(0, Ordering::Relaxed);
        self.releases.store(0, Ordering::Relaxed);
        self.menu_selections.store(0, Ordering::Relaxed);
        self.degraded_ticks.store(0, Ordering::Relaxed);
        self.tracking_losses.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of pipeline statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub gesture_changes: u64,
    pub grabs: u64,
    pub releases: u64,
    pub menu_selections: u64,
    pub degraded_ticks: u64,
    pub tracking_losses: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedStats = Arc<PipelineStats>;

/// Create a new shared statistics block.
pub fn create_shared_stats() -> SharedStats {
    Arc::new(PipelineStats::new())
}

/// Collects per-tick processing times.
///
/// Mean, spread and p95 cover the most recent `window` ticks. The tick
/// count, the maximum and the over-budget count cover the whole session.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples_ms: VecDeque<f64>,
    window: usize,
    budget_ms: f64,
    total: usize,
    over_budget: usize,
    max_ms: f64,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(FRAME_BUDGET_MS)
    }
}

impl LatencyTracker {
    pub fn new(budget_ms: f64) -> Self {
        Self::with_window(budget_ms, LATENCY_WINDOW)
    }

    pub fn with_window(budget_ms: f64, window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples_ms: VecDeque::with_capacity(window),
            window,
            budget_ms,
            total: 0,
            over_budget: 0,
            max_ms: 0.0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.record_ms(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_ms(&mut self, ms: f64) {
        if self.samples_ms.len() == self.window {
            self.samples_ms.pop_front();
        }
        self.samples_ms.push_back(ms);

        self.total += 1;
        if ms > self.budget_ms {
            self.over_budget += 1;
        }
        if self.total == 1 || ms > self.max_ms {
            self.max_ms = ms;
        }
    }

    /// Samples currently in the window.
    pub fn len(&self) -> usize {
        self.samples_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ms.is_empty()
    }

    pub fn summary(&self) -> LatencySummary {
        let sampled = self.samples_ms.len();
        if sampled == 0 {
            return LatencySummary {
                budget_ms: self.budget_ms,
                ..LatencySummary::default()
            };
        }

        let mean_ms = self.samples_ms.iter().mean();
        let std_dev_ms = if sampled > 1 {
            self.samples_ms.iter().std_dev()
        } else {
            0.0
        };
        let window: Vec<f64> = self.samples_ms.iter().copied().collect();
        let p95_ms = Data::new(window).percentile(95);

        LatencySummary {
            count: self.total,
            sampled,
            mean_ms,
            std_dev_ms,
            p95_ms,
            max_ms: self.max_ms,
            budget_ms: self.budget_ms,
            over_budget: self.over_budget,
        }
    }
}

/// Tick latency summary in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Ticks recorded over the session
    pub count: usize,
    /// Ticks behind the mean, spread and p95
    #[serde(default)]
    pub sampled: usize,
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    pub budget_ms: f64,
    /// Ticks slower than the budget
    pub over_budget: usize,
}

impl LatencySummary {
    pub fn within_budget(&self) -> bool {
        self.over_budget == 0
    }
}
