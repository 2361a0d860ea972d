//! Core gesture processing.
//!
//! This module contains:
//! - Feature extraction from hand joints
//! - Classifier glue around the gesture model
//! - Temporal smoothing into stable gesture events
//! - Object interaction and radial menu state machines
//! - The per-tick pipeline and session reports

pub mod classifier;
pub mod features;
pub mod interaction;
pub mod labels;
pub mod menu;
pub mod pipeline;
pub mod report;
pub mod smoothing;

// Re-export commonly used types
pub use classifier::{
    ClassificationResult, ClassifierAdapter, GestureModel, ModelError, OutputMode, TemplateModel,
};
pub use features::{extract_features, FeatureError, FeatureExtractor, FeatureVector, FEATURE_COUNT};
pub use interaction::{InteractableObject, InteractionStateMachine, ObjectId, TwoHandScaleSession};
pub use labels::{GestureLabel, LabelMap};
pub use menu::{MenuItem, MenuNavigator};
pub use pipeline::{GesturePipeline, PipelineEvent};
pub use report::{ReportBuilder, SessionReport, PRODUCER_NAME, REPORT_VERSION};
pub use smoothing::{GestureChanged, TemporalSmoother};
