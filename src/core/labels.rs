//! Gesture labels and the class-index bijection used by the model.

use serde::{Deserialize, Serialize};

/// A recognised hand pose.
///
/// "No gesture" is represented as `Option::<GestureLabel>::None` throughout
/// the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    OpenHand,
    Fist,
    Pinch,
    Point,
    ThumbsUp,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; 5] = [
        GestureLabel::OpenHand,
        GestureLabel::Fist,
        GestureLabel::Pinch,
        GestureLabel::Point,
        GestureLabel::ThumbsUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenHand => "open_hand",
            Self::Fist => "fist",
            Self::Pinch => "pinch",
            Self::Point => "point",
            Self::ThumbsUp => "thumbs_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open_hand" | "open-hand" | "open" => Some(Self::OpenHand),
            "fist" => Some(Self::Fist),
            "pinch" => Some(Self::Pinch),
            "point" => Some(Self::Point),
            "thumbs_up" | "thumbs-up" | "thumbsup" => Some(Self::ThumbsUp),
            _ => None,
        }
    }
}

impl std::fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display helper for an optional label ("none" when absent).
pub fn label_name(label: Option<GestureLabel>) -> &'static str {
    label.map(|l| l.as_str()).unwrap_or("none")
}

/// Ordered class list of the model: class index `i` means `labels[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GestureLabel>", into = "Vec<GestureLabel>")]
pub struct LabelMap {
    labels: Vec<GestureLabel>,
}

impl LabelMap {
    /// Build a map from the model's class order. Duplicates are rejected.
    pub fn new(labels: Vec<GestureLabel>) -> Option<Self> {
        let mut seen = Vec::with_capacity(labels.len());
        for label in &labels {
            if seen.contains(label) {
                return None;
            }
            seen.push(*label);
        }
        if labels.is_empty() {
            return None;
        }
        Some(Self { labels })
    }

    /// Number of model classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index; out-of-range indices mean "no gesture".
    pub fn label(&self, index: usize) -> Option<GestureLabel> {
        self.labels.get(index).copied()
    }

    /// Class index for a label, if the model knows it.
    pub fn index_of(&self, label: GestureLabel) -> Option<usize> {
        self.labels.iter().position(|l| *l == label)
    }

    pub fn labels(&self) -> &[GestureLabel] {
        &self.labels
    }
}

impl TryFrom<Vec<GestureLabel>> for LabelMap {
    type Error = String;

    fn try_from(labels: Vec<GestureLabel>) -> Result<Self, Self::Error> {
        Self::new(labels).ok_or_else(|| "labels must be non-empty and unique".to_string())
    }
}

impl From<LabelMap> for Vec<GestureLabel> {
    fn from(map: LabelMap) -> Self {
        map.labels
    }
}

impl Default for LabelMap {
    /// Class order used when the classifier was trained.
    fn default() -> Self {
        Self {
            labels: GestureLabel::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_matches_training() {
        let map = LabelMap::default();
        assert_eq!(map.label(0), Some(GestureLabel::OpenHand));
        assert_eq!(map.label(2), Some(GestureLabel::Pinch));
        assert_eq!(map.label(4), Some(GestureLabel::ThumbsUp));
        assert_eq!(map.label(5), None);
    }

    #[test]
    fn test_bijection() {
        let map = LabelMap::default();
        for (i, label) in map.labels().iter().enumerate() {
            assert_eq!(map.index_of(*label), Some(i));
        }
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(LabelMap::new(vec![GestureLabel::Fist, GestureLabel::Fist]).is_none());
        assert!(LabelMap::new(Vec::new()).is_none());
    }

    #[test]
    fn test_parse_and_serde_names() {
        assert_eq!(GestureLabel::parse("thumbs-up"), Some(GestureLabel::ThumbsUp));
        assert_eq!(GestureLabel::parse("wave"), None);
        let json = serde_json::to_string(&GestureLabel::OpenHand).unwrap();
        assert_eq!(json, "\"open_hand\"");
        assert_eq!(label_name(None), "none");
    }

    #[test]
    fn test_label_map_serde_validates() {
        let map: LabelMap = serde_json::from_str(r#"["fist", "pinch"]"#).unwrap();
        assert_eq!(map.index_of(GestureLabel::Pinch), Some(1));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"["fist","pinch"]"#);
        assert!(serde_json::from_str::<LabelMap>(r#"["fist", "fist"]"#).is_err());
        assert!(serde_json::from_str::<LabelMap>("[]").is_err());
    }
}
