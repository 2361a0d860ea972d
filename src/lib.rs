//! Hand Gesture Agent - gesture recognition and hand interaction for XR.
//!
//! This library turns a per-frame stream of 21-joint hand poses into stable,
//! discrete gestures and uses them to grab, throw, rotate and scale virtual
//! objects and to drive a radial menu.
//!
//! # Guarantees
//!
//! - **Invariant features**: moving or uniformly resizing a hand never changes its features
//! - **Stable gestures**: majority vote and dwell time filter classifier flicker
//! - **No failed ticks**: bad input degrades to "no gesture" instead of an error
//! - **Exclusive grabs**: an object is held by at most one hand at a time
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Gesture Pipeline                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌────────────┐   ┌───────────┐  │
//! │  │ Tracking  │──▶│ Features  │──▶│ Classifier │──▶│ Smoothing │  │
//! │  │ (21 pts)  │   │ (31 vals) │   │  (model)   │   │ (vote +   │  │
//! │  └───────────┘   └───────────┘   └────────────┘   │  dwell)   │  │
//! │                                                   └─────┬─────┘  │
//! │                                     gesture events      │        │
//! │                          ┌──────────────────────────────┤        │
//! │                          ▼                              ▼        │
//! │                   ┌─────────────┐               ┌─────────────┐  │
//! │                   │ Interaction │               │    Menu     │  │
//! │                   │ grab/scale  │               │   radial    │  │
//! │                   └─────────────┘               └─────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use hand_gesture_agent::{config::Config, core, tracking};
//!
//! let config = Config::default();
//! let labels = config.labels.clone();
//! let model = core::TemplateModel::from_reference_poses(&labels);
//! let classifier = core::ClassifierAdapter::new(Box::new(model), labels);
//! let mut pipeline = core::GesturePipeline::new(&config, classifier);
//!
//! let script = tracking::parse_script("pinch:0.5").unwrap();
//! let tracker = tracking::ScriptedTracker::new(Vec::new(), script, config.tick_rate_hz);
//! for frame in tracker {
//!     for event in pipeline.tick(&frame) {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod config;
pub mod core;
pub mod telemetry;
pub mod tracking;

// Re-export key types at crate root for convenience
pub use crate::config::{Config, ConfigError};
pub use crate::core::{
    ClassifierAdapter, GestureLabel, GesturePipeline, InteractableObject, PipelineEvent,
    TemplateModel,
};
pub use telemetry::{PipelineStats, SharedStats};
pub use tracking::{HandPose, Handedness, TrackingFrame};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
