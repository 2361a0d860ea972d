//! Hand pose types delivered by the tracking collaborator.
//!
//! A pose is read-only to the gesture core: it is produced once per tick per
//! hand and never mutated downstream.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Number of tracked joints per hand.
pub const JOINT_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Joint chains (base, mid, distal, tip) for thumb, index, middle, ring, pinky.
pub const FINGERS: [[usize; 4]; 5] = [
    [THUMB_CMC, THUMB_MCP, THUMB_IP, THUMB_TIP],
    [INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP],
    [MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP],
    [RING_MCP, RING_PIP, RING_DIP, RING_TIP],
    [PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP],
];

/// Fingertip joints in finger order.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Joints averaged to find the palm centre.
const PALM_JOINTS: [usize; 6] = [WRIST, THUMB_CMC, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];

/// Squared length below which a projected roll reference is unusable.
const ROLL_REFERENCE_EPSILON: f32 = 1e-8;

/// Which hand. Doubles as the hand identifier in output events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub const BOTH: [Handedness; 2] = [Handedness::Left, Handedness::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// The other hand.
    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Array slot used by per-hand state tables.
    pub fn slot(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tick of tracking data for a single hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandPose {
    /// Joint positions in meters. Well-formed poses carry exactly 21.
    pub joints: Vec<Vec3>,
    /// Which hand this is
    pub handedness: Handedness,
    /// Whether the tracker currently sees the hand
    pub is_tracked: bool,
    /// Tracker confidence in [0, 1]
    pub tracking_confidence: f32,
}

impl HandPose {
    pub fn new(joints: Vec<Vec3>, handedness: Handedness) -> Self {
        Self {
            joints,
            handedness,
            is_tracked: true,
            tracking_confidence: 1.0,
        }
    }

    /// A pose for a hand the tracker has lost.
    pub fn untracked(handedness: Handedness) -> Self {
        Self {
            joints: Vec::new(),
            handedness,
            is_tracked: false,
            tracking_confidence: 0.0,
        }
    }

    /// Whether the joint count matches the 21-joint layout.
    pub fn is_well_formed(&self) -> bool {
        self.joints.len() == JOINT_COUNT
    }

    /// Translate every joint by `delta`.
    pub fn translated(&self, delta: Vec3) -> Self {
        Self {
            joints: self.joints.iter().map(|j| *j + delta).collect(),
            ..self.clone()
        }
    }

    /// Position/orientation of the hand, derived from the palm joints.
    ///
    /// Returns `None` for malformed poses.
    pub fn frame(&self) -> Option<HandFrame> {
        if !self.is_well_formed() {
            return None;
        }
        Some(HandFrame::from_joints(&self.joints, self.handedness))
    }
}

/// Rigid pose of the hand: palm centre plus an orthonormal basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandFrame {
    pub position: Vec3,
    pub rotation: Quat,
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl HandFrame {
    /// A frame at `position` with world-aligned axes.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            right: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::Z,
        }
    }

    /// A frame at `position` oriented by `rotation`.
    pub fn with_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
            forward: rotation * Vec3::Z,
        }
    }

    fn from_joints(joints: &[Vec3], handedness: Handedness) -> Self {
        let position =
            PALM_JOINTS.iter().map(|&i| joints[i]).sum::<Vec3>() / PALM_JOINTS.len() as f32;

        let forward = (joints[MIDDLE_MCP] - joints[WRIST]).normalize_or_zero();
        let across = match handedness {
            Handedness::Right => joints[PINKY_MCP] - joints[INDEX_MCP],
            Handedness::Left => joints[INDEX_MCP] - joints[PINKY_MCP],
        };
        let up = forward.cross(across).normalize_or_zero();

        // Collapsed palm: keep the position, fall back to world axes.
        if forward == Vec3::ZERO || up == Vec3::ZERO {
            return Self::at(position);
        }

        let right = up.cross(forward);
        let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize();
        Self {
            position,
            rotation,
            right,
            up,
            forward,
        }
    }

    /// Signed roll about `forward` since a frame whose right axis was
    /// `previous_right`, in radians.
    ///
    /// The old axis is projected onto the plane normal to the current
    /// forward axis, so the result stays small for small hand motions in any
    /// pointing direction. Returns 0 when the old axis is parallel to
    /// forward.
    pub fn roll_since(&self, previous_right: Vec3) -> f32 {
        let reference = previous_right - self.forward * previous_right.dot(self.forward);
        if reference.length_squared() < ROLL_REFERENCE_EPSILON {
            return 0.0;
        }
        let sin = self.forward.dot(reference.cross(self.right));
        let cos = reference.dot(self.right);
        sin.atan2(cos)
    }
}

/// Both hands' poses for one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingFrame {
    /// Seconds since tracking started
    pub timestamp: f64,
    /// Seconds since the previous frame
    pub dt: f32,
    pub left: HandPose,
    pub right: HandPose,
}

impl TrackingFrame {
    pub fn new(timestamp: f64, dt: f32, left: HandPose, right: HandPose) -> Self {
        Self {
            timestamp,
            dt,
            left,
            right,
        }
    }

    pub fn pose(&self, hand: Handedness) -> &HandPose {
        match hand {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }
}
