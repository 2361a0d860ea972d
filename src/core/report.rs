//! Session report export.
//!
//! A report is a JSON document describing one pipeline run: who produced it,
//! when, with which settings, every event with its tick, and the final
//! counters and latency summary.

use crate::config::Config;
use crate::core::pipeline::PipelineEvent;
use crate::telemetry::stats::{LatencySummary, StatsSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "hand-gesture-agent";

/// Producer metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// An event together with the tick that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub tick: u64,
    /// Tracking time in seconds
    pub time_secs: f64,
    pub event: PipelineEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    /// Wall-clock start of recording (RFC3339)
    pub started_at_utc: String,
    /// Wall-clock time the report was built (RFC3339)
    pub computed_at_utc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_label: Option<String>,
    pub config: Config,
    pub ticks: u64,
    /// Tracking time covered, in seconds
    pub duration_secs: f64,
    pub events: Vec<RecordedEvent>,
    pub stats: StatsSnapshot,
    pub latency: LatencySummary,
}

impl SessionReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Accumulates events during a run and builds the [`SessionReport`].
pub struct ReportBuilder {
    instance_id: Uuid,
    session_label: Option<String>,
    started_at: DateTime<Utc>,
    events: Vec<RecordedEvent>,
    ticks: u64,
    last_time_secs: f64,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            session_label: None,
            started_at: Utc::now(),
            events: Vec::new(),
            ticks: 0,
            last_time_secs: 0.0,
        }
    }

    pub fn with_session_label(mut self, label: impl Into<String>) -> Self {
        self.session_label = Some(label.into());
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Record the events of one tick.
    pub fn record_tick(&mut self, time_secs: f64, events: &[PipelineEvent]) {
        let tick = self.ticks;
        self.events.extend(events.iter().cloned().map(|event| RecordedEvent {
            tick,
            time_secs,
            event,
        }));
        self.ticks += 1;
        self.last_time_secs = time_secs;
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn build(
        &self,
        config: &Config,
        stats: StatsSnapshot,
        latency: LatencySummary,
    ) -> SessionReport {
        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
            },
            started_at_utc: self.started_at.to_rfc3339(),
            computed_at_utc: Utc::now().to_rfc3339(),
            session_label: self.session_label.clone(),
            config: config.clone(),
            ticks: self.ticks,
            duration_secs: self.last_time_secs,
            events: self.events.clone(),
            stats,
            latency,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
