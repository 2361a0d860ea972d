//! Grab, release, throw, rotate and two-hand scale of interactable objects.
//!
//! Objects live in an [`ObjectStore`] owned by the state machine and are
//! referred to by [`ObjectId`]. Each hand is either idle or holding exactly
//! one object, and a held object records which hand holds it. Both sides of
//! that link are only written here, so they always agree.

use crate::config::InteractionConfig;
use crate::core::labels::GestureLabel;
use crate::tracking::types::{HandFrame, Handedness};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Inter-hand distances below this cannot anchor a scale session.
const MIN_BASELINE_DISTANCE: f32 = 1e-4;

/// Handle into an [`ObjectStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// A manipulable object in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractableObject {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Desired state of the host's physics simulation for this object
    pub physics_enabled: bool,
    /// Outgoing velocity handed to physics on release
    pub velocity: Vec3,
    grabbed_by: Option<Handedness>,
    grab_offset: Vec3,
    rotation_offset: Quat,
    /// Follow velocity over the most recent update
    follow_velocity: Vec3,
    /// Follow velocity over the update before that, used for throws
    throw_velocity: Vec3,
}

impl InteractableObject {
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            physics_enabled: true,
            velocity: Vec3::ZERO,
            grabbed_by: None,
            grab_offset: Vec3::ZERO,
            rotation_offset: Quat::IDENTITY,
            follow_velocity: Vec3::ZERO,
            throw_velocity: Vec3::ZERO,
        }
    }

    /// The hand currently holding this object.
    pub fn grabbed_by(&self) -> Option<Handedness> {
        self.grabbed_by
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed_by.is_some()
    }

    /// Offset from the hand in the hand's local space, fixed at grab time.
    pub fn grab_offset(&self) -> Vec3 {
        self.grab_offset
    }

    /// Velocity a release would hand to physics, before the throw multiplier.
    pub fn throw_velocity(&self) -> Vec3 {
        self.throw_velocity
    }
}

/// Arena of interactable objects. Ids stay valid until removed and are
/// never reused.
#[derive(Debug, Default)]
pub struct ObjectStore {
    slots: Vec<Option<InteractableObject>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: InteractableObject) -> ObjectId {
        self.slots.push(Some(object));
        ObjectId(self.slots.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&InteractableObject> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut InteractableObject> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    fn take(&mut self, id: ObjectId) -> Option<InteractableObject> {
        self.slots.get_mut(id.0).and_then(|slot| slot.take())
    }

    /// Live objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &InteractableObject)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|o| (ObjectId(i), o)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A successful grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grab {
    pub hand: Handedness,
    pub object: ObjectId,
}

/// A release, with the velocity handed to physics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub hand: Handedness,
    pub object: ObjectId,
    pub velocity: Vec3,
}

/// Result of routing a committed gesture to the interaction logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Grabbed(Grab),
    Released(Release),
}

/// Active two-hand scaling, captured on the rising edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoHandScaleSession {
    pub object: ObjectId,
    pub baseline_distance: f32,
    /// Recorded but not applied: the per-tick scale is the distance ratio alone.
    pub baseline_scale: Vec3,
}

/// Start or end of a scale session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleEdge {
    Started(TwoHandScaleSession),
    Ended(TwoHandScaleSession),
}

/// Per-hand input to the continuous update.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandInput {
    /// Hand pose this tick, `None` when unavailable
    pub frame: Option<HandFrame>,
    /// Committed gesture after this tick's smoothing
    pub gesture: Option<GestureLabel>,
}

/// Grab/release/rotate/scale state for both hands.
#[derive(Debug)]
pub struct InteractionStateMachine {
    config: InteractionConfig,
    objects: ObjectStore,
    holding: [Option<ObjectId>; 2],
    previous_right: [Option<Vec3>; 2],
    scale_session: Option<TwoHandScaleSession>,
}

impl InteractionStateMachine {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            objects: ObjectStore::new(),
            holding: [None, None],
            previous_right: [None, None],
            scale_session: None,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn add_object(&mut self, object: InteractableObject) -> ObjectId {
        self.objects.insert(object)
    }

    /// Remove an object, letting go of it first if it is held.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<InteractableObject> {
        for slot in self.holding.iter_mut() {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        if self.scale_session.map(|s| s.object) == Some(id) {
            self.scale_session = None;
        }
        let mut object = self.objects.take(id)?;
        object.grabbed_by = None;
        object.physics_enabled = true;
        Some(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<&InteractableObject> {
        self.objects.get(id)
    }

    /// Mutable access for the host, e.g. to write back physics results.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut InteractableObject> {
        self.objects.get_mut(id)
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// The object `hand` is holding.
    pub fn held_by(&self, hand: Handedness) -> Option<ObjectId> {
        self.holding[hand.slot()]
    }

    pub fn scale_session(&self) -> Option<&TwoHandScaleSession> {
        self.scale_session.as_ref()
    }

    /// Whether every hand slot and every object's grabbed-by agree.
    pub fn is_consistent(&self) -> bool {
        let slots_ok = Handedness::BOTH.iter().all(|hand| match self.holding[hand.slot()] {
            Some(id) => self
                .objects
                .get(id)
                .map(|o| o.grabbed_by == Some(*hand))
                .unwrap_or(false),
            None => true,
        });
        let objects_ok = self.objects.iter().all(|(id, o)| match o.grabbed_by {
            Some(hand) => self.holding[hand.slot()] == Some(id),
            None => true,
        });
        slots_ok && objects_ok
    }

    /// Route a committed gesture change for `hand`.
    ///
    /// A pinch grabs while idle; any other gesture (including none) releases
    /// with a throw while holding.
    pub fn on_gesture(
        &mut self,
        hand: Handedness,
        gesture: Option<GestureLabel>,
        frame: Option<&HandFrame>,
    ) -> Option<GestureOutcome> {
        match (gesture, self.holding[hand.slot()]) {
            (Some(GestureLabel::Pinch), None) => {
                let frame = frame?;
                self.try_grab(hand, frame).map(GestureOutcome::Grabbed)
            }
            (Some(GestureLabel::Pinch), Some(_)) => None,
            (_, Some(_)) => self.release(hand, true).map(GestureOutcome::Released),
            (_, None) => None,
        }
    }

    /// Grab the nearest free object within range of the hand.
    pub fn try_grab(&mut self, hand: Handedness, frame: &HandFrame) -> Option<Grab> {
        if self.holding[hand.slot()].is_some() {
            return None;
        }

        let mut best: Option<(ObjectId, f32)> = None;
        for (id, object) in self.objects.iter() {
            if object.is_grabbed() {
                continue;
            }
            let distance = object.position.distance(frame.position);
            if distance > self.config.grab_range {
                continue;
            }
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((id, distance));
            }
        }
        let (id, distance) = best?;

        let inverse = frame.rotation.inverse();
        let object = self.objects.get_mut(id)?;
        object.grabbed_by = Some(hand);
        object.grab_offset = inverse * (object.position - frame.position);
        object.rotation_offset = inverse * object.rotation;
        object.physics_enabled = false;
        object.velocity = Vec3::ZERO;
        object.follow_velocity = Vec3::ZERO;
        object.throw_velocity = Vec3::ZERO;
        self.holding[hand.slot()] = Some(id);

        info!("{hand} hand grabbed {id} ({}) at {distance:.3} m", object.name);
        Some(Grab { hand, object: id })
    }

    /// Let go of the held object.
    ///
    /// With `throw` the object leaves with the velocity it followed the hand
    /// at over the last completed tick, times the throw multiplier. Otherwise
    /// it leaves at rest.
    pub fn release(&mut self, hand: Handedness, throw: bool) -> Option<Release> {
        // A scale session on this object ends on the next update.
        let id = self.holding[hand.slot()].take()?;
        let multiplier = self.config.throw_multiplier;
        let object = self.objects.get_mut(id)?;
        let velocity = if throw {
            object.throw_velocity * multiplier
        } else {
            Vec3::ZERO
        };
        object.grabbed_by = None;
        object.physics_enabled = true;
        object.velocity = velocity;

        info!(
            "{hand} hand released {id} ({}) with velocity ({:.2}, {:.2}, {:.2})",
            object.name, velocity.x, velocity.y, velocity.z
        );
        Some(Release {
            hand,
            object: id,
            velocity,
        })
    }

    /// Forced release after the tracker lost `hand`. No throw.
    pub fn on_tracking_lost(&mut self, hand: Handedness) -> Option<Release> {
        self.previous_right[hand.slot()] = None;
        self.release(hand, false)
    }

    /// Per-tick continuous update: scale session edges, rigid follow,
    /// rotation follow and wrist roll.
    ///
    /// `dt` is the tick length in seconds and drives the follow velocity.
    pub fn update(&mut self, hands: &[HandInput; 2], dt: f32) -> Option<ScaleEdge> {
        let edge = self.update_scale_session(hands);

        for hand in Handedness::BOTH {
            let input = &hands[hand.slot()];
            let previous_right = std::mem::replace(
                &mut self.previous_right[hand.slot()],
                input.frame.map(|f| f.right),
            );

            let Some(id) = self.holding[hand.slot()] else {
                continue;
            };
            let scaling = self.scale_session.map(|s| s.object) == Some(id);
            let sensitivity = self.config.rotation_sensitivity;
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            object.throw_velocity = object.follow_velocity;

            let Some(frame) = input.frame else {
                object.follow_velocity = Vec3::ZERO;
                continue;
            };
            let before = object.position;
            object.position = frame.position + frame.rotation * object.grab_offset;
            object.follow_velocity = if dt > 0.0 {
                (object.position - before) / dt
            } else {
                Vec3::ZERO
            };

            if scaling {
                continue;
            }
            object.rotation = (frame.rotation * object.rotation_offset).normalize();

            if let Some(previous) = previous_right {
                let delta = frame.roll_since(previous);
                if delta != 0.0 {
                    let twist = Quat::from_axis_angle(frame.forward, delta * sensitivity);
                    object.rotation = (twist * object.rotation).normalize();
                    object.rotation_offset = frame.rotation.inverse() * object.rotation;
                }
            }
        }

        if let Some(session) = self.scale_session {
            if let Some(distance) = inter_hand_distance(hands) {
                let ratio = (distance / session.baseline_distance)
                    .clamp(self.config.min_scale, self.config.max_scale);
                if let Some(object) = self.objects.get_mut(session.object) {
                    object.scale = Vec3::splat(ratio);
                }
            }
        }

        edge
    }

    fn update_scale_session(&mut self, hands: &[HandInput; 2]) -> Option<ScaleEdge> {
        let both_pinching = hands
            .iter()
            .all(|h| h.gesture == Some(GestureLabel::Pinch));
        let held = Handedness::BOTH
            .iter()
            .find_map(|hand| self.holding[hand.slot()]);

        match (self.scale_session, both_pinching, held) {
            (None, true, Some(id)) => {
                let baseline_distance = inter_hand_distance(hands)?;
                if baseline_distance < MIN_BASELINE_DISTANCE {
                    return None;
                }
                let baseline_scale = self.objects.get(id)?.scale;
                let session = TwoHandScaleSession {
                    object: id,
                    baseline_distance,
                    baseline_scale,
                };
                self.scale_session = Some(session);
                debug!("Scale session started on {id}, baseline {baseline_distance:.3} m");
                Some(ScaleEdge::Started(session))
            }
            (Some(session), true, Some(_))
                if self.holding.contains(&Some(session.object)) =>
            {
                None
            }
            (Some(session), _, _) => {
                self.scale_session = None;
                debug!("Scale session ended on {}", session.object);
                Some(ScaleEdge::Ended(session))
            }
            (None, _, _) => None,
        }
    }
}

fn inter_hand_distance(hands: &[HandInput; 2]) -> Option<f32> {
    let left = hands[Handedness::Left.slot()].frame?;
    let right = hands[Handedness::Right.slot()].frame?;
    Some(left.position.distance(right.position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> InteractionStateMachine {
        InteractionStateMachine::new(InteractionConfig {
            grab_range: 0.5,
            throw_multiplier: 1.0,
            rotation_sensitivity: 1.0,
            min_scale: 0.5,
            max_scale: 3.0,
        })
    }

    fn input(position: Vec3, gesture: Option<GestureLabel>) -> HandInput {
        HandInput {
            frame: Some(HandFrame::at(position)),
            gesture,
        }
    }

    fn idle() -> HandInput {
        HandInput::default()
    }

    #[test]
    fn test_grab_picks_nearest_free_object() {
        let mut m = machine();
        let far = m.add_object(InteractableObject::new("far", Vec3::new(0.4, 0.0, 0.0)));
        let near = m.add_object(InteractableObject::new("near", Vec3::new(0.1, 0.0, 0.0)));
        m.add_object(InteractableObject::new("out", Vec3::new(2.0, 0.0, 0.0)));

        let grab = m.try_grab(Handedness::Right, &HandFrame::at(Vec3::ZERO)).unwrap();
        assert_eq!(grab.object, near);
        assert_eq!(m.held_by(Handedness::Right), Some(near));
        assert_eq!(m.object(near).unwrap().grabbed_by(), Some(Handedness::Right));
        assert!(!m.object(near).unwrap().physics_enabled);
        assert!(m.object(far).unwrap().physics_enabled);
        assert!(m.is_consistent());
    }

    #[test]
    fn test_nothing_in_range() {
        let mut m = machine();
        m.add_object(InteractableObject::new("cube", Vec3::new(0.0, 0.0, 0.6)));
        assert!(m.try_grab(Handedness::Left, &HandFrame::at(Vec3::ZERO)).is_none());
        assert_eq!(m.held_by(Handedness::Left), None);
    }

    #[test]
    fn test_grab_exclusivity() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::new(0.0, 0.0, 0.1)));
        let frame = HandFrame::at(Vec3::ZERO);

        assert!(m.try_grab(Handedness::Left, &frame).is_some());
        assert!(m.try_grab(Handedness::Right, &frame).is_none());
        assert_eq!(m.object(cube).unwrap().grabbed_by(), Some(Handedness::Left));
        assert_eq!(m.held_by(Handedness::Right), None);
        assert!(m.is_consistent());

        // Once released, the other hand may take it.
        m.release(Handedness::Left, true);
        assert!(m.try_grab(Handedness::Right, &frame).is_some());
        assert!(m.is_consistent());
    }

    #[test]
    fn test_throw_uses_motion_of_previous_tick() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::new(0.3, 0.0, 0.0)));
        let dt = 1.0 / 60.0;
        let pinch = Some(GestureLabel::Pinch);

        let outcome = m.on_gesture(Handedness::Right, pinch, Some(&HandFrame::at(Vec3::ZERO)));
        assert!(matches!(outcome, Some(GestureOutcome::Grabbed(_))));

        // The hand moves 0.1 m in one tick while still pinching.
        m.update(&[idle(), input(Vec3::new(0.1, 0.0, 0.0), pinch)], dt);
        assert!((m.object(cube).unwrap().position - Vec3::new(0.4, 0.0, 0.0)).length() < 1e-6);

        // Next tick it holds still and the fist commits.
        let fist = [idle(), input(Vec3::new(0.1, 0.0, 0.0), Some(GestureLabel::Fist))];
        m.update(&fist, dt);
        let outcome = m.on_gesture(
            Handedness::Right,
            Some(GestureLabel::Fist),
            fist[1].frame.as_ref(),
        );
        let Some(GestureOutcome::Released(release)) = outcome else {
            panic!("expected release, got {outcome:?}");
        };
        assert!((release.velocity - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-3);
        let cube = m.object(cube).unwrap();
        assert!(cube.physics_enabled);
        assert!(!cube.is_grabbed());
        assert_eq!(cube.velocity, release.velocity);
    }

    #[test]
    fn test_throw_applies_multiplier() {
        let mut m = InteractionStateMachine::new(InteractionConfig {
            throw_multiplier: 1.5,
            ..machine().config().clone()
        });
        m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        m.try_grab(Handedness::Left, &HandFrame::at(Vec3::ZERO));
        let pinch = Some(GestureLabel::Pinch);
        m.update(&[input(Vec3::new(0.0, 0.02, 0.0), pinch), idle()], 0.01);
        m.update(&[input(Vec3::new(0.0, 0.02, 0.0), pinch), idle()], 0.01);

        let release = m.release(Handedness::Left, true).unwrap();
        assert!((release.velocity - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_none_gesture_releases() {
        let mut m = machine();
        m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        m.try_grab(Handedness::Left, &HandFrame::at(Vec3::ZERO));
        let outcome = m.on_gesture(Handedness::Left, None, None);
        assert!(matches!(outcome, Some(GestureOutcome::Released(_))));
    }

    #[test]
    fn test_tracking_loss_releases_at_rest() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        m.try_grab(Handedness::Left, &HandFrame::at(Vec3::ZERO));
        m.update(
            &[input(Vec3::new(0.2, 0.0, 0.0), Some(GestureLabel::Pinch)), idle()],
            1.0 / 60.0,
        );

        let release = m.on_tracking_lost(Handedness::Left).unwrap();
        assert_eq!(release.velocity, Vec3::ZERO);
        assert_eq!(m.held_by(Handedness::Left), None);
        assert!(m.object(cube).unwrap().physics_enabled);
        assert!(m.on_tracking_lost(Handedness::Left).is_none());
    }

    #[test]
    fn test_rigid_follow_respects_rotation() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::new(0.0, 0.0, 0.1)));
        m.try_grab(Handedness::Right, &HandFrame::at(Vec3::ZERO));

        // Yaw the hand 90 degrees: the offset along +Z swings to +X.
        let yaw = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let hands = [
            idle(),
            HandInput {
                frame: Some(HandFrame::with_rotation(Vec3::ZERO, yaw)),
                gesture: Some(GestureLabel::Pinch),
            },
        ];
        m.update(&hands, 1.0 / 60.0);
        let object = m.object(cube).unwrap();
        assert!((object.position - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-5);
        assert!(object.rotation.angle_between(yaw) < 1e-4);
    }

    #[test]
    fn test_wrist_roll_adds_incremental_rotation() {
        let mut m = InteractionStateMachine::new(InteractionConfig {
            rotation_sensitivity: 2.0,
            ..machine().config().clone()
        });
        let cube = m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        let level = HandInput {
            frame: Some(HandFrame::at(Vec3::ZERO)),
            gesture: Some(GestureLabel::Pinch),
        };
        m.update(&[idle(), level], 1.0 / 60.0);
        m.try_grab(Handedness::Right, &HandFrame::at(Vec3::ZERO));

        let roll = 0.1f32;
        let rolled = HandInput {
            frame: Some(HandFrame::with_rotation(Vec3::ZERO, Quat::from_rotation_z(-roll))),
            gesture: Some(GestureLabel::Pinch),
        };
        let measured = rolled.frame.unwrap().roll_since(Vec3::X);
        assert!((measured + roll).abs() < 1e-4);

        m.update(&[idle(), rolled], 1.0 / 60.0);
        // Rigid follow contributes the hand roll; wrist roll adds sensitivity times it again.
        let angle = m.object(cube).unwrap().rotation.angle_between(Quat::IDENTITY);
        assert!((angle - roll * 3.0).abs() < 1e-3, "angle {angle}");

        // Holding still afterwards adds nothing further.
        m.update(&[idle(), rolled], 1.0 / 60.0);
        let again = m.object(cube).unwrap().rotation.angle_between(Quat::IDENTITY);
        assert!((again - angle).abs() < 1e-4);
    }

    #[test]
    fn test_wrist_roll_stable_when_pointing_up() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        let pinch = Some(GestureLabel::Pinch);
        let up = Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        let frame_a = HandFrame::with_rotation(Vec3::ZERO, Quat::from_rotation_x(0.01) * up);
        let frame_b = HandFrame::with_rotation(Vec3::ZERO, Quat::from_rotation_z(0.01) * up);

        let hand_a = HandInput {
            frame: Some(frame_a),
            gesture: pinch,
        };
        let hand_b = HandInput {
            frame: Some(frame_b),
            gesture: pinch,
        };

        m.update(&[idle(), hand_a], 1.0 / 60.0);
        m.try_grab(Handedness::Right, &frame_a);
        m.update(&[idle(), hand_b], 1.0 / 60.0);

        // The hand turned by about 0.014 rad, so the object may not spin further.
        let hand_turn = frame_b.rotation.angle_between(frame_a.rotation);
        let object_turn = m.object(cube).unwrap().rotation.angle_between(Quat::IDENTITY);
        assert!(hand_turn < 0.02);
        assert!(object_turn < 0.05, "object turned {object_turn} rad");
    }

    #[test]
    fn test_two_hand_scale_session() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::new(0.2, 0.0, 0.0)));
        m.object_mut(cube).unwrap().scale = Vec3::splat(1.7);
        m.try_grab(Handedness::Right, &HandFrame::at(Vec3::new(0.2, 0.0, 0.0)));

        let pinch = Some(GestureLabel::Pinch);
        let edge = m.update(
            &[input(Vec3::new(-0.2, 0.0, 0.0), pinch), input(Vec3::new(0.2, 0.0, 0.0), pinch)],
            1.0 / 60.0,
        );
        let Some(ScaleEdge::Started(session)) = edge else {
            panic!("expected session start, got {edge:?}");
        };
        assert!((session.baseline_distance - 0.4).abs() < 1e-5);
        assert_eq!(session.baseline_scale, Vec3::splat(1.7));
        // Ratio alone is written, the captured baseline scale is not reapplied.
        assert!((m.object(cube).unwrap().scale - Vec3::ONE).length() < 1e-5);

        let edge = m.update(
            &[input(Vec3::new(-0.4, 0.0, 0.0), pinch), input(Vec3::new(0.4, 0.0, 0.0), pinch)],
            1.0 / 60.0,
        );
        assert!(edge.is_none());
        assert!((m.object(cube).unwrap().scale - Vec3::splat(2.0)).length() < 1e-5);

        // Far apart: clamped to max.
        m.update(
            &[input(Vec3::new(-5.0, 0.0, 0.0), pinch), input(Vec3::new(5.0, 0.0, 0.0), pinch)],
            1.0 / 60.0,
        );
        assert!((m.object(cube).unwrap().scale - Vec3::splat(3.0)).length() < 1e-5);

        // Together: clamped to min.
        m.update(
            &[input(Vec3::new(-0.01, 0.0, 0.0), pinch), input(Vec3::new(0.01, 0.0, 0.0), pinch)],
            1.0 / 60.0,
        );
        assert!((m.object(cube).unwrap().scale - Vec3::splat(0.5)).length() < 1e-5);

        // Left hand opens: falling edge, scale is left where it was.
        let edge = m.update(
            &[
                input(Vec3::new(-0.4, 0.0, 0.0), Some(GestureLabel::OpenHand)),
                input(Vec3::new(0.4, 0.0, 0.0), pinch),
            ],
            1.0 / 60.0,
        );
        assert!(matches!(edge, Some(ScaleEdge::Ended(_))));
        assert!(m.scale_session().is_none());
        assert!((m.object(cube).unwrap().scale - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_no_scale_session_without_held_object() {
        let mut m = machine();
        let pinch = Some(GestureLabel::Pinch);
        let edge = m.update(
            &[input(Vec3::new(-0.2, 0.0, 0.0), pinch), input(Vec3::new(0.2, 0.0, 0.0), pinch)],
            1.0 / 60.0,
        );
        assert!(edge.is_none());
        assert!(m.scale_session().is_none());
    }

    #[test]
    fn test_scaling_suppresses_rotation_follow() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        m.try_grab(Handedness::Right, &HandFrame::at(Vec3::ZERO));
        let pinch = Some(GestureLabel::Pinch);
        m.update(&[input(Vec3::new(-0.3, 0.0, 0.0), pinch), input(Vec3::ZERO, pinch)], 0.01);
        assert!(m.scale_session().is_some());

        let yaw = Quat::from_rotation_y(1.0);
        let right = HandInput {
            frame: Some(HandFrame::with_rotation(Vec3::new(0.05, 0.0, 0.0), yaw)),
            gesture: pinch,
        };
        m.update(&[input(Vec3::new(-0.3, 0.0, 0.0), pinch), right], 0.01);
        let object = m.object(cube).unwrap();
        assert_eq!(object.rotation, Quat::IDENTITY);
        assert!((object.position - Vec3::new(0.05, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_remove_held_object_clears_link() {
        let mut m = machine();
        let cube = m.add_object(InteractableObject::new("cube", Vec3::ZERO));
        m.try_grab(Handedness::Left, &HandFrame::at(Vec3::ZERO));
        let removed = m.remove_object(cube).unwrap();
        assert!(!removed.is_grabbed());
        assert_eq!(m.held_by(Handedness::Left), None);
        assert!(m.object(cube).is_none());
        assert!(m.is_consistent());
        assert!(m.objects().is_empty());
    }
}
