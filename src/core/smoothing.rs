//! Temporal smoothing of per-tick classifications.
//!
//! Raw classifier output flickers. Each hand keeps a short window of raw
//! class indices and commits a new label only after it survives two
//! debounce layers:
//!
//! 1. a majority vote over the last `window_size` raw indices, and
//! 2. a dwell time during which the voted candidate must stay pending.
//!
//! Confidence below the threshold bypasses both and commits "no gesture"
//! on the same tick.

use crate::config::SmoothingConfig;
use crate::core::classifier::ClassificationResult;
use crate::core::labels::{label_name, GestureLabel, LabelMap};
use crate::tracking::types::Handedness;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Fired when a hand's committed label changes value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureChanged {
    pub hand: Handedness,
    pub label: Option<GestureLabel>,
    pub previous: Option<GestureLabel>,
    pub confidence: f32,
}

/// Synchronous listener for committed gesture changes.
pub type GestureListener = Box<dyn FnMut(&GestureChanged) + Send>;

/// Most frequent index in `history`.
///
/// Ties go to the label that reached the winning count first when the
/// window is scanned oldest to newest.
pub fn majority_vote(history: &VecDeque<usize>) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for index in history {
        match counts.iter_mut().find(|(i, _)| i == index) {
            Some((_, n)) => *n += 1,
            None => counts.push((*index, 1)),
        }
    }
    let max = counts.iter().map(|(_, n)| *n).max()?;

    let mut running: Vec<(usize, usize)> = Vec::new();
    for index in history {
        let n = match running.iter_mut().find(|(i, _)| i == index) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                running.push((*index, 1));
                1
            }
        };
        if n == max {
            return Some(*index);
        }
    }
    None
}

/// Smoothing state for one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedGestureState {
    pub committed: Option<GestureLabel>,
    pub confidence: f32,
    /// Candidate waiting out the dwell time, with the time it first appeared
    pub pending: Option<(Option<GestureLabel>, f64)>,
    pub history: VecDeque<usize>,
}

impl SmoothedGestureState {
    fn new(window_size: usize) -> Self {
        Self {
            committed: None,
            confidence: 0.0,
            pending: None,
            history: VecDeque::with_capacity(window_size),
        }
    }
}

/// Per-hand hysteresis over raw classifications.
pub struct TemporalSmoother {
    config: SmoothingConfig,
    labels: LabelMap,
    hands: [SmoothedGestureState; 2],
    listeners: Vec<GestureListener>,
}

impl TemporalSmoother {
    pub fn new(config: SmoothingConfig, labels: LabelMap) -> Self {
        let window = config.window_size.max(1);
        Self {
            config,
            labels,
            hands: [
                SmoothedGestureState::new(window),
                SmoothedGestureState::new(window),
            ],
            listeners: Vec::new(),
        }
    }

    /// Register a listener called synchronously on every committed change.
    pub fn subscribe(&mut self, listener: GestureListener) {
        self.listeners.push(listener);
    }

    pub fn state(&self, hand: Handedness) -> &SmoothedGestureState {
        &self.hands[hand.slot()]
    }

    /// Committed label for `hand`.
    pub fn committed(&self, hand: Handedness) -> Option<GestureLabel> {
        self.hands[hand.slot()].committed
    }

    /// Feed one raw classification observed at `now` (seconds).
    ///
    /// Returns the change event if the committed label changed this tick.
    pub fn update(
        &mut self,
        hand: Handedness,
        result: ClassificationResult,
        now: f64,
    ) -> Option<GestureChanged> {
        let window = self.config.window_size.max(1);
        let state = &mut self.hands[hand.slot()];
        let previous = state.committed;

        let voted = result.index.map(|raw| {
            state.history.push_back(raw);
            while state.history.len() > window {
                state.history.pop_front();
            }
            if self.config.majority_vote {
                majority_vote(&state.history).unwrap_or(raw)
            } else {
                raw
            }
        });

        match voted {
            Some(index) if result.confidence >= self.config.confidence_threshold => {
                let candidate = self.labels.label(index);
                if candidate == state.committed {
                    state.confidence = result.confidence;
                    state.pending = None;
                } else {
                    match state.pending {
                        Some((pending, since)) if pending == candidate => {
                            if now - since >= self.config.dwell_time_secs {
                                state.committed = candidate;
                                state.confidence = result.confidence;
                                state.pending = None;
                            }
                        }
                        _ => state.pending = Some((candidate, now)),
                    }
                }
            }
            // Low confidence or unusable result: "none" right away, no dwell.
            _ => {
                state.committed = None;
                state.confidence = result.confidence;
                state.pending = None;
            }
        }

        if state.committed == previous {
            return None;
        }

        let event = GestureChanged {
            hand,
            label: state.committed,
            previous,
            confidence: state.confidence,
        };
        debug!(
            "Gesture committed on {}: {} -> {} ({:.2})",
            hand,
            label_name(previous),
            label_name(event.label),
            event.confidence
        );
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
        Some(event)
    }

    /// Forget all state for `hand`.
    pub fn reset(&mut self, hand: Handedness) {
        self.hands[hand.slot()] = SmoothedGestureState::new(self.config.window_size.max(1));
    }
}
