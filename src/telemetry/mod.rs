//! Runtime statistics for the gesture pipeline.
//!
//! Counters are lock-free so a monitoring thread can read them while the
//! tick loop runs.

pub mod stats;

pub use stats::{
    create_shared_stats, LatencySummary, LatencyTracker, PipelineStats, SharedStats, StatsSnapshot,
    FRAME_BUDGET_MS, LATENCY_WINDOW,
};
