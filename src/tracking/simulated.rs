//! Simulated hand tracking.
//!
//! Stands in for camera/SDK tracking so the pipeline can run without
//! hardware. [`synthetic_pose`] builds a plausible 21-joint hand for each
//! gesture; [`ScriptedTracker`] plays per-hand gesture scripts tick by tick;
//! [`SimulatedTracker`] streams those frames from a background thread.

use crate::core::labels::GestureLabel;
use crate::tracking::types::{
    HandPose, Handedness, TrackingFrame, FINGERS, INDEX_TIP, JOINT_COUNT, THUMB_CMC, THUMB_IP,
    THUMB_MCP, THUMB_TIP, WRIST,
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use glam::{Quat, Vec3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Wrist to middle-finger base, in meters, for a unit-scale hand.
const PALM_LENGTH_M: f32 = 0.09;

/// Finger base joints in palm units (right hand; +X is the pinky side).
const BASES: [Vec3; 5] = [
    Vec3::new(-0.35, 0.0, 0.2),
    Vec3::new(-0.25, 0.0, 0.95),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.22, 0.0, 0.95),
    Vec3::new(0.42, 0.0, 0.85),
];

/// Phalanx lengths in palm units (base→mid, mid→distal, distal→tip).
const PHALANGES: [[f32; 3]; 5] = [
    [0.4, 0.33, 0.27],
    [0.45, 0.27, 0.2],
    [0.5, 0.3, 0.22],
    [0.47, 0.28, 0.2],
    [0.36, 0.22, 0.18],
];

/// Sideways splay of each finger around the palm normal, radians.
const SPLAY: [f32; 5] = [-0.8, -0.1, 0.0, 0.08, 0.16];

const EXTENDED: [f32; 3] = [0.05, 0.05, 0.05];
const CURLED: [f32; 3] = [1.4, 1.5, 1.1];
const HALF_CURLED: [f32; 3] = [0.55, 0.6, 0.4];
const THUMB_TUCKED: [f32; 3] = [0.9, 0.8, 0.6];

/// Build a synthetic hand showing `label`.
///
/// `origin` is the wrist position and `scale` multiplies a 9 cm palm.
pub fn synthetic_pose(
    label: GestureLabel,
    handedness: Handedness,
    origin: Vec3,
    scale: f32,
) -> HandPose {
    let curls: [[f32; 3]; 5] = match label {
        GestureLabel::OpenHand => [EXTENDED; 5],
        GestureLabel::Fist => [THUMB_TUCKED, CURLED, CURLED, CURLED, CURLED],
        GestureLabel::Pinch => [EXTENDED, HALF_CURLED, CURLED, CURLED, CURLED],
        GestureLabel::Point => [THUMB_TUCKED, EXTENDED, CURLED, CURLED, CURLED],
        GestureLabel::ThumbsUp => [EXTENDED, CURLED, CURLED, CURLED, CURLED],
    };

    let mut joints = vec![Vec3::ZERO; JOINT_COUNT];
    joints[WRIST] = Vec3::ZERO;
    for (finger, chain) in FINGERS.iter().enumerate() {
        let points = finger_chain(finger, curls[finger]);
        for (joint, point) in chain.iter().zip(points.iter()) {
            joints[*joint] = *point;
        }
    }

    if label == GestureLabel::Pinch {
        close_thumb_on_index(&mut joints);
    }

    let joints = joints
        .into_iter()
        .map(|j| {
            let j = match handedness {
                Handedness::Right => j,
                Handedness::Left => Vec3::new(-j.x, j.y, j.z),
            };
            origin + j * PALM_LENGTH_M * scale
        })
        .collect();

    HandPose::new(joints, handedness)
}

/// Base, mid, distal and tip of one finger, curling toward the palm (-Y).
fn finger_chain(finger: usize, curl: [f32; 3]) -> [Vec3; 4] {
    let start = Quat::from_rotation_y(SPLAY[finger]) * Vec3::Z;
    let axis = start.cross(Vec3::NEG_Y).normalize();

    let mut points = [BASES[finger]; 4];
    let mut bend = 0.0;
    for k in 0..3 {
        bend += curl[k];
        let dir = Quat::from_axis_angle(axis, bend) * start;
        points[k + 1] = points[k] + dir * PHALANGES[finger][k];
    }
    points
}

/// Bring the thumb tip onto the index tip, bowing the thumb outward.
fn close_thumb_on_index(joints: &mut [Vec3]) {
    let cmc = joints[THUMB_CMC];
    let tip = joints[INDEX_TIP] + Vec3::new(-0.03, -0.02, 0.0);
    let span = tip - cmc;
    let bow = Vec3::new(-0.12, -0.1, 0.0);
    joints[THUMB_MCP] = cmc + span * 0.4 + bow;
    joints[THUMB_IP] = cmc + span * 0.72 + bow * 0.5;
    joints[THUMB_TIP] = tip;
}

/// What a hand shows during one script step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepPose {
    Gesture(GestureLabel),
    /// The tracker loses the hand.
    Lost,
}

/// One step of a hand script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub pose: StepPose,
    pub duration_secs: f32,
    /// Hand velocity during the step, m/s
    pub velocity: Vec3,
}

impl ScriptStep {
    pub fn new(label: GestureLabel, duration_secs: f32) -> Self {
        Self {
            pose: StepPose::Gesture(label),
            duration_secs,
            velocity: Vec3::ZERO,
        }
    }

    pub fn lost(duration_secs: f32) -> Self {
        Self {
            pose: StepPose::Lost,
            duration_secs,
            velocity: Vec3::ZERO,
        }
    }

    pub fn moving(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Parse a script such as `open_hand:0.5,pinch:1.0:0.1/0/0,lost:0.3`.
///
/// Each step is `gesture:seconds[:vx/vy/vz]`; `lost` drops tracking.
pub fn parse_script(script: &str) -> Result<Vec<ScriptStep>, String> {
    let mut steps = Vec::new();
    for raw in script.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(format!("bad step '{raw}', expected gesture:seconds[:vx/vy/vz]"));
        }

        let pose = if parts[0].eq_ignore_ascii_case("lost") {
            StepPose::Lost
        } else {
            StepPose::Gesture(
                GestureLabel::parse(parts[0])
                    .ok_or_else(|| format!("unknown gesture '{}'", parts[0]))?,
            )
        };

        let duration_secs: f32 = parts[1]
            .parse()
            .map_err(|_| format!("bad duration '{}'", parts[1]))?;
        if !(duration_secs > 0.0) {
            return Err(format!("duration must be positive in '{raw}'"));
        }

        let velocity = match parts.get(2) {
            Some(v) => {
                let comps: Result<Vec<f32>, _> = v.split('/').map(str::parse::<f32>).collect();
                match comps.as_deref() {
                    Ok([x, y, z]) => Vec3::new(*x, *y, *z),
                    _ => return Err(format!("bad velocity '{v}', expected vx/vy/vz")),
                }
            }
            None => Vec3::ZERO,
        };

        steps.push(ScriptStep {
            pose,
            duration_secs,
            velocity,
        });
    }
    Ok(steps)
}

/// Playback state for one hand.
#[derive(Debug, Clone)]
struct HandScript {
    hand: Handedness,
    steps: Vec<ScriptStep>,
    step: usize,
    elapsed_in_step: f32,
    wrist: Vec3,
}

impl HandScript {
    fn new(hand: Handedness, steps: Vec<ScriptStep>, wrist: Vec3) -> Self {
        Self {
            hand,
            steps,
            step: 0,
            elapsed_in_step: 0.0,
            wrist,
        }
    }

    fn finished(&self) -> bool {
        self.step >= self.steps.len()
    }

    /// Pose for this tick, then advance by `dt`.
    fn advance(&mut self, dt: f32) -> HandPose {
        let Some(step) = self.steps.get(self.step).copied() else {
            return HandPose::untracked(self.hand);
        };

        self.wrist += step.velocity * dt;
        let pose = match step.pose {
            StepPose::Gesture(label) => synthetic_pose(label, self.hand, self.wrist, 1.0),
            StepPose::Lost => HandPose::untracked(self.hand),
        };

        self.elapsed_in_step += dt;
        if self.elapsed_in_step >= step.duration_secs - dt * 0.5 {
            self.step += 1;
            self.elapsed_in_step = 0.0;
        }
        pose
    }
}

/// Deterministic, fixed-rate playback of both hands' scripts.
#[derive(Debug, Clone)]
pub struct ScriptedTracker {
    left: HandScript,
    right: HandScript,
    dt: f32,
    tick: u64,
}

impl ScriptedTracker {
    /// Default wrist positions, in meters.
    pub const LEFT_HOME: Vec3 = Vec3::new(-0.2, 1.2, 0.3);
    pub const RIGHT_HOME: Vec3 = Vec3::new(0.2, 1.2, 0.3);

    pub fn new(left: Vec<ScriptStep>, right: Vec<ScriptStep>, tick_rate_hz: f32) -> Self {
        Self {
            left: HandScript::new(Handedness::Left, left, Self::LEFT_HOME),
            right: HandScript::new(Handedness::Right, right, Self::RIGHT_HOME),
            dt: 1.0 / tick_rate_hz,
            tick: 0,
        }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn is_finished(&self) -> bool {
        self.left.finished() && self.right.finished()
    }

    /// The next frame, or `None` once both scripts are exhausted.
    pub fn next_frame(&mut self) -> Option<TrackingFrame> {
        if self.is_finished() {
            return None;
        }
        let timestamp = self.tick as f64 * self.dt as f64;
        self.tick += 1;
        let left = self.left.advance(self.dt);
        let right = self.right.advance(self.dt);
        Some(TrackingFrame::new(timestamp, self.dt, left, right))
    }
}

impl Iterator for ScriptedTracker {
    type Item = TrackingFrame;

    fn next(&mut self) -> Option<TrackingFrame> {
        self.next_frame()
    }
}

/// Tracker errors.
#[derive(Debug)]
pub enum TrackerError {
    AlreadyRunning,
    /// The script was already played to the end.
    Exhausted,
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::AlreadyRunning => write!(f, "Tracker is already running"),
            TrackerError::Exhausted => write!(f, "Tracker script has already been played"),
        }
    }
}

impl std::error::Error for TrackerError {}

/// Streams a [`ScriptedTracker`] in real time from a background thread.
pub struct SimulatedTracker {
    script: Option<ScriptedTracker>,
    sender: Sender<TrackingFrame>,
    receiver: Receiver<TrackingFrame>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedTracker {
    pub fn new(script: ScriptedTracker) -> Self {
        let (sender, receiver) = bounded(1_024);
        Self {
            script: Some(script),
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start streaming frames at the script's tick rate.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(TrackerError::AlreadyRunning);
        }
        let Some(mut script) = self.script.take() else {
            return Err(TrackerError::Exhausted);
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let sender = self.sender.clone();
        let period = Duration::from_secs_f32(script.dt());

        self.handle = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let Some(frame) = script.next_frame() else {
                    break;
                };
                // A full queue drops the frame rather than stalling the worker.
                if let Err(SendTimeoutError::Disconnected(_)) = sender.send_timeout(frame, period) {
                    break;
                }
                thread::sleep(period);
            }
            running.store(false, Ordering::SeqCst);
        }));
        Ok(())
    }

    /// Stop streaming and wait for the worker to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Receiver<TrackingFrame> {
        &self.receiver
    }

    pub fn try_recv(&self) -> Option<TrackingFrame> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for SimulatedTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
