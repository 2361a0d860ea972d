//! Radial menu driven by one hand.
//!
//! `open_hand` toggles the menu, `fist` dismisses it and `thumbs_up`
//! selects the hovered item. While visible, the hand's pointing direction
//! picks one of N equal angular segments.

use crate::config::MenuConfig;
use crate::core::labels::GestureLabel;
use glam::Vec3;
use std::fmt;
use tracing::{debug, info};

/// Projections shorter than this have no meaningful angle.
const PROJECTION_EPSILON: f32 = 1e-6;

/// Selection callback.
pub type MenuCallback = Box<dyn FnMut() + Send>;

/// One selectable menu entry.
pub struct MenuItem {
    pub id: String,
    pub label: String,
    callback: Option<MenuCallback>,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: MenuCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Visible state changes produced by the navigator.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuEvent {
    Shown,
    Hidden,
    HoverChanged { index: Option<usize> },
    Selected { index: usize, id: String },
}

/// Orthonormal in-plane axes for a plane normal.
fn plane_axes(normal: Vec3) -> (Vec3, Vec3, Vec3) {
    let normal = normal.normalize_or_zero();
    let mut right = Vec3::Y.cross(normal);
    if right.length_squared() < PROJECTION_EPSILON {
        right = Vec3::X;
    }
    let right = right.normalize();
    let up = normal.cross(right).normalize();
    (right, up, normal)
}

/// Angle of `direction` projected onto the plane, degrees in [0, 360),
/// counter-clockwise from `right`.
pub fn projected_angle(direction: Vec3, right: Vec3, up: Vec3, normal: Vec3) -> Option<f32> {
    let projected = direction - normal * direction.dot(normal);
    if projected.length_squared() < PROJECTION_EPSILON {
        return None;
    }
    let angle = projected.dot(up).atan2(projected.dot(right)).to_degrees();
    Some(angle.rem_euclid(360.0))
}

/// Segment index for an angle in degrees.
pub fn segment_index(angle_degrees: f32, item_count: usize) -> Option<usize> {
    if item_count == 0 || !angle_degrees.is_finite() {
        return None;
    }
    let segment = 360.0 / item_count as f32;
    let index = (angle_degrees.rem_euclid(360.0) / segment).floor() as usize;
    Some(index.min(item_count - 1))
}

/// Radial menu state machine.
#[derive(Debug)]
pub struct MenuNavigator {
    config: MenuConfig,
    items: Vec<MenuItem>,
    visible: bool,
    hovered: Option<usize>,
    hide_at: Option<f64>,
    right: Vec3,
    up: Vec3,
    normal: Vec3,
}

impl MenuNavigator {
    /// A menu with `config.item_count` placeholder items.
    pub fn new(config: MenuConfig) -> Self {
        let items = (0..config.item_count.max(1))
            .map(|i| MenuItem::new(format!("item_{i}"), format!("Item {}", i + 1)))
            .collect();
        Self::with_items(config, items)
    }

    pub fn with_items(config: MenuConfig, items: Vec<MenuItem>) -> Self {
        let (right, up, normal) = plane_axes(config.plane_normal);
        Self {
            config,
            items,
            visible: false,
            hovered: None,
            hide_at: None,
            right,
            up,
            normal,
        }
    }

    /// Attach a callback to item `index`. Returns false if out of range.
    pub fn set_callback(&mut self, index: usize, callback: MenuCallback) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.callback = Some(callback);
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Deadline of a scheduled hide, if a selection is pending.
    pub fn pending_hide(&self) -> Option<f64> {
        self.hide_at
    }

    /// Layout positions of the items around `center`, one per segment middle.
    pub fn item_positions(&self, center: Vec3) -> Vec<Vec3> {
        let count = self.items.len().max(1) as f32;
        (0..self.items.len())
            .map(|i| {
                let angle = ((i as f32 + 0.5) * 360.0 / count).to_radians();
                center + (self.right * angle.cos() + self.up * angle.sin()) * self.config.radius
            })
            .collect()
    }

    pub fn show(&mut self) -> Option<MenuEvent> {
        if self.visible {
            return None;
        }
        self.visible = true;
        self.hovered = None;
        self.hide_at = None;
        debug!("Menu shown");
        Some(MenuEvent::Shown)
    }

    pub fn hide(&mut self) -> Option<MenuEvent> {
        if !self.visible {
            return None;
        }
        self.visible = false;
        self.hovered = None;
        self.hide_at = None;
        debug!("Menu hidden");
        Some(MenuEvent::Hidden)
    }

    /// React to a committed gesture of the menu hand.
    pub fn on_gesture(&mut self, gesture: Option<GestureLabel>, now: f64) -> Option<MenuEvent> {
        match gesture {
            Some(GestureLabel::OpenHand) => {
                if self.visible {
                    self.hide()
                } else {
                    self.show()
                }
            }
            Some(GestureLabel::Fist) => self.hide(),
            Some(GestureLabel::ThumbsUp) => self.select(now),
            _ => None,
        }
    }

    /// Commit the hovered item, then schedule the auto-hide.
    pub fn select(&mut self, now: f64) -> Option<MenuEvent> {
        if !self.visible || self.hide_at.is_some() {
            return None;
        }
        let index = self.hovered?;
        let item = self.items.get_mut(index)?;
        if let Some(callback) = item.callback.as_mut() {
            callback();
        }
        self.hide_at = Some(now + self.config.auto_hide_secs);
        info!("Menu item {} ({}) selected", item.id, item.label);
        Some(MenuEvent::Selected {
            index,
            id: item.id.clone(),
        })
    }

    /// Per-tick update: auto-hide, then hover from the pointing direction.
    pub fn update(&mut self, forward: Option<Vec3>, now: f64) -> Option<MenuEvent> {
        if !self.visible {
            return None;
        }
        if let Some(deadline) = self.hide_at {
            if now >= deadline {
                return self.hide();
            }
        }

        let hovered = forward
            .and_then(|f| projected_angle(f, self.right, self.up, self.normal))
            .and_then(|angle| segment_index(angle, self.items.len()));
        self.set_hover(hovered)
    }

    /// Set hover from an angle already measured in the menu plane.
    pub fn hover_angle(&mut self, angle_degrees: f32) -> Option<MenuEvent> {
        if !self.visible {
            return None;
        }
        let hovered = segment_index(angle_degrees, self.items.len());
        self.set_hover(hovered)
    }

    fn set_hover(&mut self, hovered: Option<usize>) -> Option<MenuEvent> {
        if hovered == self.hovered {
            return None;
        }
        self.hovered = hovered;
        debug!("Menu hover -> {:?}", hovered);
        Some(MenuEvent::HoverChanged { index: hovered })
    }
}
