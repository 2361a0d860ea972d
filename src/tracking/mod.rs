//! Hand tracking input.
//!
//! Real trackers live outside this crate; they hand over one
//! [`TrackingFrame`] per tick. The simulated tracker produces the same
//! frames from gesture scripts.

pub mod simulated;
pub mod types;

pub use simulated::{
    parse_script, synthetic_pose, ScriptStep, ScriptedTracker, SimulatedTracker, StepPose,
    TrackerError,
};
pub use types::{HandFrame, HandPose, Handedness, TrackingFrame, JOINT_COUNT};
