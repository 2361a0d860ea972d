//! Feature extraction from hand joints.
//!
//! Turns 21 joint positions into 31 values that do not change when the hand
//! is moved or uniformly resized:
//!
//! | Range | Count | Meaning |
//! |---|---|---|
//! | 0..20 | 20 | bone lengths, 4 per finger (wrist→base, base→mid, mid→distal, distal→tip) |
//! | 20..25 | 5 | fingertip to wrist distances |
//! | 25..30 | 5 | bend angle at each finger's middle joint (radians) |
//! | 30 | 1 | thumb tip to index tip distance |

use crate::tracking::types::{
    FINGERS, FINGERTIPS, INDEX_TIP, JOINT_COUNT, MIDDLE_MCP, THUMB_TIP, WRIST,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Length of every feature vector.
pub const FEATURE_COUNT: usize = 31;

/// Palm sizes below this are treated as degenerate.
pub const PALM_EPSILON: f32 = 1e-6;

/// Vectors shorter than this have no defined bend angle.
const ANGLE_EPSILON: f32 = 1e-6;

/// Fixed-length, scale- and translation-invariant hand descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(#[serde(with = "feature_array")] [f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    pub fn from_array(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn inter_joint(&self) -> &[f32] {
        &self.0[0..20]
    }

    pub fn fingertip(&self) -> &[f32] {
        &self.0[20..25]
    }

    pub fn angles(&self) -> &[f32] {
        &self.0[25..30]
    }

    pub fn pinch(&self) -> f32 {
        self.0[30]
    }

    /// Largest absolute component difference.
    pub fn max_abs_diff(&self, other: &FeatureVector) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }
}

/// Feature extraction errors.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    InvalidInputShape { expected: usize, actual: usize },
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::InvalidInputShape { expected, actual } => {
                write!(f, "Invalid input shape: expected {expected} joints, got {actual}")
            }
        }
    }
}

impl std::error::Error for FeatureError {}

/// Result of a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    pub features: FeatureVector,
    /// Palm size was near zero and 1.0 was substituted.
    pub degenerate_scale: bool,
}

/// Extract features with the default palm epsilon.
pub fn extract_features(joints: &[Vec3]) -> Result<Extraction, FeatureError> {
    FeatureExtractor::default().extract(joints)
}

/// Pure joints → features transform.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    palm_epsilon: f32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            palm_epsilon: PALM_EPSILON,
        }
    }
}

impl FeatureExtractor {
    pub fn new(palm_epsilon: f32) -> Self {
        Self { palm_epsilon }
    }

    /// Extract the 31 features from exactly 21 joints.
    pub fn extract(&self, joints: &[Vec3]) -> Result<Extraction, FeatureError> {
        if joints.len() != JOINT_COUNT {
            return Err(FeatureError::InvalidInputShape {
                expected: JOINT_COUNT,
                actual: joints.len(),
            });
        }

        let (normalized, degenerate_scale) = self.normalize(joints);
        if degenerate_scale {
            warn!("Degenerate palm size, using unit scale");
        }

        let mut out = [0.0f32; FEATURE_COUNT];
        let mut k = 0;

        for finger in FINGERS.iter() {
            let mut prev = WRIST;
            for &joint in finger.iter() {
                out[k] = normalized[prev].distance(normalized[joint]);
                prev = joint;
                k += 1;
            }
        }

        for &tip in FINGERTIPS.iter() {
            out[k] = normalized[tip].distance(normalized[WRIST]);
            k += 1;
        }

        for finger in FINGERS.iter() {
            out[k] = bend_angle(
                normalized[finger[0]],
                normalized[finger[1]],
                normalized[finger[2]],
            );
            k += 1;
        }

        out[k] = normalized[THUMB_TIP].distance(normalized[INDEX_TIP]);

        Ok(Extraction {
            features: FeatureVector(out),
            degenerate_scale,
        })
    }

    /// Extract, degrading to an all-zero vector on malformed input.
    pub fn extract_or_zero(&self, joints: &[Vec3]) -> (FeatureVector, Option<FeatureError>) {
        match self.extract(joints) {
            Ok(extraction) => (extraction.features, None),
            Err(e) => (FeatureVector::zeros(), Some(e)),
        }
    }

    /// Translate the wrist to the origin and divide by palm size.
    ///
    /// Returns the normalised joints and whether the palm size was degenerate.
    /// Callers check the joint count first.
    fn normalize(&self, joints: &[Vec3]) -> (Vec<Vec3>, bool) {
        let wrist = joints[WRIST];
        let translated: Vec<Vec3> = joints.iter().map(|j| *j - wrist).collect();

        let palm_size = translated[MIDDLE_MCP].length();
        let (scale, degenerate) = if palm_size < self.palm_epsilon {
            (1.0, true)
        } else {
            (palm_size, false)
        };

        (translated.into_iter().map(|j| j / scale).collect(), degenerate)
    }
}

/// Angle at `mid` between the directions to `base` and `distal`.
fn bend_angle(base: Vec3, mid: Vec3, distal: Vec3) -> f32 {
    let v1 = base - mid;
    let v2 = distal - mid;
    let n1 = v1.length();
    let n2 = v2.length();
    if n1 < ANGLE_EPSILON || n2 < ANGLE_EPSILON {
        return 0.0;
    }
    (v1.dot(v2) / (n1 * n2)).clamp(-1.0, 1.0).acos()
}

/// Serde for `[f32; 31]` as a plain sequence.
mod feature_array {
    use super::FEATURE_COUNT;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(values: &[f32; FEATURE_COUNT], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        values.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[f32; FEATURE_COUNT], D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<f32>::deserialize(deserializer)?;
        let len = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected {FEATURE_COUNT} features, got {len}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, irregular 21-joint hand.
    fn sample_joints() -> Vec<Vec3> {
        (0..JOINT_COUNT)
            .map(|i| {
                let t = i as f32;
                Vec3::new(
                    0.3 + (t * 0.37).sin() * 0.05,
                    1.1 + (t * 0.71).cos() * 0.06,
                    -0.4 + t * 0.004,
                )
            })
            .collect()
    }

    #[test]
    fn test_length_is_fixed() {
        let extraction = extract_features(&sample_joints()).unwrap();
        assert_eq!(extraction.features.len(), FEATURE_COUNT);
        assert_eq!(extraction.features.as_slice().len(), 31);
        assert!(!extraction.degenerate_scale);
    }

    #[test]
    fn test_wrist_maps_to_origin() {
        let extractor = FeatureExtractor::default();
        let (normalized, _) = extractor.normalize(&sample_joints());
        assert_eq!(normalized[WRIST], Vec3::ZERO);
        assert!((normalized[MIDDLE_MCP].length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_scale_invariance() {
        let joints = sample_joints();
        let base = extract_features(&joints).unwrap().features;

        for c in [0.01f32, 0.5, 3.0, 250.0] {
            let scaled: Vec<Vec3> = joints.iter().map(|j| *j * c).collect();
            let features = extract_features(&scaled).unwrap().features;
            assert!(
                base.max_abs_diff(&features) < 1e-3,
                "scale {c} changed features by {}",
                base.max_abs_diff(&features)
            );
        }
    }

    #[test]
    fn test_translation_invariance() {
        let joints = sample_joints();
        let base = extract_features(&joints).unwrap().features;
        let moved: Vec<Vec3> = joints.iter().map(|j| *j + Vec3::new(5.0, -2.0, 7.5)).collect();
        let features = extract_features(&moved).unwrap().features;
        assert!(base.max_abs_diff(&features) < 1e-3);
    }

    #[test]
    fn test_wrong_joint_count() {
        let joints = vec![Vec3::ONE; 20];
        let err = extract_features(&joints).unwrap_err();
        assert_eq!(
            err,
            FeatureError::InvalidInputShape {
                expected: 21,
                actual: 20
            }
        );

        let (features, error) = FeatureExtractor::default().extract_or_zero(&joints);
        assert!(error.is_some());
        assert!(features.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_degenerate_palm_falls_back() {
        let joints = vec![Vec3::new(1.0, 1.0, 1.0); JOINT_COUNT];
        let extraction = extract_features(&joints).unwrap();
        assert!(extraction.degenerate_scale);
        // Collapsed joints: every distance and angle is zero.
        assert!(extraction.features.as_slice().iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_straight_finger_angle_is_pi() {
        let angle = bend_angle(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        assert!((angle - std::f32::consts::PI).abs() < 1e-3);

        let right = bend_angle(Vec3::X, Vec3::ZERO, Vec3::Y);
        assert!((right - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_pinch_is_last_feature() {
        let mut joints = sample_joints();
        joints[THUMB_TIP] = joints[INDEX_TIP];
        let features = extract_features(&joints).unwrap().features;
        assert!(features.pinch().abs() < 1e-6);
    }

    #[test]
    fn test_serde_roundtrip_rejects_wrong_length() {
        let json = serde_json::to_string(&[0.5f32; 30]).unwrap();
        assert!(serde_json::from_str::<FeatureVector>(&json).is_err());
    }
}
