//! The per-tick gesture pipeline.
//!
//! One call to [`GesturePipeline::tick`] processes both hands in a fixed order:
//!
//! 1. features, classification and smoothing for the left and right hand
//! 2. forced release for hands the tracker lost
//! 3. continuous object update (scale session edges, follow, wrist roll)
//! 4. committed gesture changes routed to interaction and the menu
//! 5. menu hover and auto-hide
//!
//! Both hands are committed before any object is touched, so two-hand logic
//! always sees the current tick's gestures. A tick never fails: every bad
//! input degrades to "no gesture" for that hand.

use crate::config::Config;
use crate::core::classifier::{ClassificationResult, ClassifierAdapter};
use crate::core::features::FeatureExtractor;
use crate::core::interaction::{
    GestureOutcome, HandInput, InteractableObject, InteractionStateMachine, ObjectId, ScaleEdge,
};
use crate::core::labels::GestureLabel;
use crate::core::menu::{MenuEvent, MenuNavigator};
use crate::core::smoothing::{GestureChanged, GestureListener, TemporalSmoother};
use crate::telemetry::stats::{create_shared_stats, LatencyTracker, SharedStats};
use crate::tracking::types::{HandFrame, Handedness, TrackingFrame};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Everything the pipeline reports to its host, in tick order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    GestureChanged {
        hand: Handedness,
        label: Option<GestureLabel>,
        previous: Option<GestureLabel>,
        confidence: f32,
    },
    ObjectGrabbed {
        hand: Handedness,
        object: ObjectId,
    },
    ObjectReleased {
        hand: Handedness,
        object: ObjectId,
        velocity: Vec3,
    },
    ScaleSessionStarted {
        object: ObjectId,
        baseline_distance: f32,
    },
    ScaleSessionEnded {
        object: ObjectId,
    },
    MenuShown,
    MenuHidden,
    MenuHoverChanged {
        index: Option<usize>,
    },
    MenuItemSelected {
        index: usize,
        item_id: String,
    },
    ModelUnavailable {
        reason: String,
    },
    TrackingLost {
        hand: Handedness,
    },
}

impl From<GestureChanged> for PipelineEvent {
    fn from(change: GestureChanged) -> Self {
        PipelineEvent::GestureChanged {
            hand: change.hand,
            label: change.label,
            previous: change.previous,
            confidence: change.confidence,
        }
    }
}

impl From<GestureOutcome> for PipelineEvent {
    fn from(outcome: GestureOutcome) -> Self {
        match outcome {
            GestureOutcome::Grabbed(grab) => PipelineEvent::ObjectGrabbed {
                hand: grab.hand,
                object: grab.object,
            },
            GestureOutcome::Released(release) => PipelineEvent::ObjectReleased {
                hand: release.hand,
                object: release.object,
                velocity: release.velocity,
            },
        }
    }
}

impl From<ScaleEdge> for PipelineEvent {
    fn from(edge: ScaleEdge) -> Self {
        match edge {
            ScaleEdge::Started(session) => PipelineEvent::ScaleSessionStarted {
                object: session.object,
                baseline_distance: session.baseline_distance,
            },
            ScaleEdge::Ended(session) => PipelineEvent::ScaleSessionEnded {
                object: session.object,
            },
        }
    }
}

impl From<MenuEvent> for PipelineEvent {
    fn from(event: MenuEvent) -> Self {
        match event {
            MenuEvent::Shown => PipelineEvent::MenuShown,
            MenuEvent::Hidden => PipelineEvent::MenuHidden,
            MenuEvent::HoverChanged { index } => PipelineEvent::MenuHoverChanged { index },
            MenuEvent::Selected { index, id } => PipelineEvent::MenuItemSelected {
                index,
                item_id: id,
            },
        }
    }
}

/// Feature extraction, classification, smoothing, interaction and menu for
/// both hands.
pub struct GesturePipeline {
    extractor: FeatureExtractor,
    classifier: ClassifierAdapter,
    smoother: TemporalSmoother,
    interaction: InteractionStateMachine,
    menu: MenuNavigator,
    menu_hand: Handedness,
    was_tracked: [bool; 2],
    stats: SharedStats,
    latency: LatencyTracker,
}

impl GesturePipeline {
    pub fn new(config: &Config, classifier: ClassifierAdapter) -> Self {
        Self {
            extractor: FeatureExtractor::default(),
            smoother: TemporalSmoother::new(
                config.smoothing.clone(),
                classifier.labels().clone(),
            ),
            classifier,
            interaction: InteractionStateMachine::new(config.interaction.clone()),
            menu: MenuNavigator::new(config.menu.clone()),
            menu_hand: config.menu.hand,
            was_tracked: [false, false],
            stats: create_shared_stats(),
            latency: LatencyTracker::default(),
        }
    }

    /// Replace the menu, e.g. with items that carry callbacks.
    pub fn with_menu(mut self, menu: MenuNavigator) -> Self {
        self.menu = menu;
        self
    }

    /// Share counters with another owner.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn add_object(&mut self, object: InteractableObject) -> ObjectId {
        self.interaction.add_object(object)
    }

    pub fn interaction(&self) -> &InteractionStateMachine {
        &self.interaction
    }

    pub fn interaction_mut(&mut self) -> &mut InteractionStateMachine {
        &mut self.interaction
    }

    pub fn menu(&self) -> &MenuNavigator {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut MenuNavigator {
        &mut self.menu
    }

    pub fn smoother(&self) -> &TemporalSmoother {
        &self.smoother
    }

    /// Register a synchronous gesture-change listener.
    pub fn subscribe(&mut self, listener: GestureListener) {
        self.smoother.subscribe(listener);
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    /// Committed gesture for `hand`.
    pub fn gesture(&self, hand: Handedness) -> Option<GestureLabel> {
        self.smoother.committed(hand)
    }

    /// Process one tick of tracking data and return its events in order.
    pub fn tick(&mut self, frame: &TrackingFrame) -> Vec<PipelineEvent> {
        let started = Instant::now();
        let now = frame.timestamp;
        let mut events = Vec::new();

        if let Some(reason) = self.classifier.take_unavailable_notice() {
            events.push(PipelineEvent::ModelUnavailable { reason });
        }

        // Both hands commit before anything acts on the result.
        let mut frames: [Option<HandFrame>; 2] = [None, None];
        let mut changes: Vec<GestureChanged> = Vec::new();
        for hand in Handedness::BOTH {
            let result = self.classify_hand(frame, hand, &mut frames);
            if let Some(change) = self.smoother.update(hand, result, now) {
                self.stats.record_gesture_change();
                events.push(change.into());
                changes.push(change);
            }
        }

        for hand in Handedness::BOTH {
            let tracked = frame.pose(hand).is_tracked;
            if !tracked && self.was_tracked[hand.slot()] {
                self.stats.record_tracking_lost();
                events.push(PipelineEvent::TrackingLost { hand });
            }
            if !tracked {
                if let Some(release) = self.interaction.on_tracking_lost(hand) {
                    self.stats.record_release();
                    events.push(GestureOutcome::Released(release).into());
                }
            }
            self.was_tracked[hand.slot()] = tracked;
        }

        let inputs = [
            HandInput {
                frame: frames[Handedness::Left.slot()],
                gesture: self.smoother.committed(Handedness::Left),
            },
            HandInput {
                frame: frames[Handedness::Right.slot()],
                gesture: self.smoother.committed(Handedness::Right),
            },
        ];
        if let Some(edge) = self.interaction.update(&inputs, frame.dt) {
            events.push(edge.into());
        }

        for change in &changes {
            let hand_frame = frames[change.hand.slot()];
            let outcome = self
                .interaction
                .on_gesture(change.hand, change.label, hand_frame.as_ref());
            if let Some(outcome) = outcome {
                match outcome {
                    GestureOutcome::Grabbed(_) => self.stats.record_grab(),
                    GestureOutcome::Released(_) => self.stats.record_release(),
                }
                events.push(outcome.into());
            }
            if change.hand == self.menu_hand {
                if let Some(event) = self.menu.on_gesture(change.label, now) {
                    if matches!(event, MenuEvent::Selected { .. }) {
                        self.stats.record_menu_selection();
                    }
                    events.push(event.into());
                }
            }
        }

        let forward = frames[self.menu_hand.slot()].map(|f| f.forward);
        if let Some(event) = self.menu.update(forward, now) {
            events.push(event.into());
        }

        self.stats.record_tick();
        self.latency.record(started.elapsed());
        if !events.is_empty() {
            debug!("Tick at {now:.3}s produced {} events", events.len());
        }
        events
    }

    fn classify_hand(
        &mut self,
        frame: &TrackingFrame,
        hand: Handedness,
        frames: &mut [Option<HandFrame>; 2],
    ) -> ClassificationResult {
        let pose = frame.pose(hand);
        if !pose.is_tracked {
            return ClassificationResult::none();
        }

        match self.extractor.extract(&pose.joints) {
            Ok(extraction) => {
                if extraction.degenerate_scale {
                    self.stats.record_degraded();
                }
                frames[hand.slot()] = pose.frame();
                self.classifier.classify(&extraction.features)
            }
            Err(e) => {
                warn!("{hand} hand: {e}");
                self.stats.record_degraded();
                ClassificationResult::none()
            }
        }
    }
}
