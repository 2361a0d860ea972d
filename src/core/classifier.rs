//! Classifier glue around an externally trained gesture model.
//!
//! The model itself is a black box behind [`GestureModel`]: it receives the
//! 31 features (a `[1, 31]` tensor) and answers either with a single
//! class-index scalar or with one probability per class. The adapter turns
//! whatever comes back into a [`ClassificationResult`] and never fails a tick.

use crate::core::features::{extract_features, FeatureVector, FEATURE_COUNT};
use crate::core::labels::LabelMap;
use crate::tracking::simulated::synthetic_pose;
use crate::tracking::types::Handedness;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Model errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The model could not be loaded or initialised.
    Unavailable(String),
    /// Output matched neither the scalar nor the probability contract.
    UnexpectedOutputShape { expected_classes: usize, actual_len: usize },
    /// A scalar output named a class the label map does not have.
    ClassIndexOutOfRange { index: usize, classes: usize },
    /// The model failed while running.
    Inference(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Unavailable(e) => write!(f, "Model unavailable: {e}"),
            ModelError::UnexpectedOutputShape {
                expected_classes,
                actual_len,
            } => write!(
                f,
                "Unexpected model output: expected 1 or {expected_classes} values, got {actual_len}"
            ),
            ModelError::ClassIndexOutOfRange { index, classes } => {
                write!(f, "Class index {index} out of range for {classes} classes")
            }
            ModelError::Inference(e) => write!(f, "Inference error: {e}"),
        }
    }
}

impl std::error::Error for ModelError {}

/// A trained gesture model.
pub trait GestureModel: Send {
    /// Run inference on one feature row and return the raw output tensor.
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, ModelError>;
}

/// Per-tick classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Class index, or `None` when no usable classification exists this tick
    pub index: Option<usize>,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(index: usize, confidence: f32) -> Self {
        Self {
            index: Some(index),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Zero-confidence "no gesture" result.
    pub fn none() -> Self {
        Self {
            index: None,
            confidence: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.index.is_some()
    }
}

/// Interpret a raw model output for `classes` classes.
///
/// * one value: a class index below `classes`, confidence 1.0
/// * `classes` values: probabilities, argmax wins (first maximum on ties)
pub fn interpret_output(output: &[f32], classes: usize) -> Result<(usize, f32), ModelError> {
    let shape_error = || ModelError::UnexpectedOutputShape {
        expected_classes: classes,
        actual_len: output.len(),
    };

    if output.len() == 1 {
        let raw = output[0];
        if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 {
            return Err(shape_error());
        }
        let index = raw as usize;
        if index >= classes {
            return Err(ModelError::ClassIndexOutOfRange { index, classes });
        }
        return Ok((index, 1.0));
    }

    if output.len() == classes && classes > 0 {
        let mut best = 0;
        for (i, p) in output.iter().enumerate() {
            if *p > output[best] {
                best = i;
            }
        }
        let confidence = output[best];
        if !confidence.is_finite() {
            return Err(shape_error());
        }
        return Ok((best, confidence.clamp(0.0, 1.0)));
    }

    Err(shape_error())
}

/// Wraps a [`GestureModel`] and degrades every failure to "no gesture".
pub struct ClassifierAdapter {
    model: Option<Box<dyn GestureModel>>,
    labels: LabelMap,
    unavailable: Option<String>,
    unavailable_reported: bool,
}

impl ClassifierAdapter {
    pub fn new(model: Box<dyn GestureModel>, labels: LabelMap) -> Self {
        Self {
            model: Some(model),
            labels,
            unavailable: None,
            unavailable_reported: false,
        }
    }

    /// Build from a model loader result. A failed load leaves the adapter in
    /// the terminal "unavailable" state.
    pub fn from_load(model: Result<Box<dyn GestureModel>, ModelError>, labels: LabelMap) -> Self {
        match model {
            Ok(model) => Self::new(model, labels),
            Err(ModelError::Unavailable(reason)) => Self::unavailable(reason, labels),
            Err(e) => Self::unavailable(e.to_string(), labels),
        }
    }

    /// An adapter whose model failed to initialise.
    pub fn unavailable(reason: impl Into<String>, labels: LabelMap) -> Self {
        Self {
            model: None,
            labels,
            unavailable: Some(reason.into()),
            unavailable_reported: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// The unavailability reason, returned only on the first call.
    pub fn take_unavailable_notice(&mut self) -> Option<String> {
        if self.unavailable_reported {
            return None;
        }
        let reason = self.unavailable.clone()?;
        self.unavailable_reported = true;
        warn!("Gesture model unavailable: {reason}");
        Some(reason)
    }

    /// Classify one feature vector.
    pub fn classify(&self, features: &FeatureVector) -> ClassificationResult {
        let Some(model) = self.model.as_ref() else {
            return ClassificationResult::none();
        };

        let output = match model.predict(features.as_slice()) {
            Ok(output) => output,
            Err(e) => {
                warn!("Classifier failed: {e}");
                return ClassificationResult::none();
            }
        };

        match interpret_output(&output, self.labels.len()) {
            Ok((index, confidence)) => ClassificationResult::new(index, confidence),
            Err(e) => {
                warn!("{e}");
                ClassificationResult::none()
            }
        }
    }
}

/// How a [`TemplateModel`] reports its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Probabilities,
    ClassIndex,
}

/// Nearest-template model: one reference feature vector per class.
///
/// Probabilities are a softmax over negative squared distances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateModel {
    pub templates: Vec<FeatureVector>,
    #[serde(default = "default_output_mode")]
    pub output: OutputMode,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_output_mode() -> OutputMode {
    OutputMode::Probabilities
}

fn default_temperature() -> f32 {
    0.1
}

impl TemplateModel {
    pub fn new(templates: Vec<FeatureVector>) -> Self {
        Self {
            templates,
            output: default_output_mode(),
            temperature: default_temperature(),
        }
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Templates from the canonical synthetic pose of every label, in class order.
    pub fn from_reference_poses(labels: &LabelMap) -> Self {
        let templates = labels
            .labels()
            .iter()
            .map(|label| {
                let pose = synthetic_pose(*label, Handedness::Right, Vec3::ZERO, 1.0);
                extract_features(&pose.joints)
                    .map(|e| e.features)
                    .unwrap_or_else(|_| FeatureVector::zeros())
            })
            .collect();
        Self::new(templates)
    }

    pub fn from_json(json: &str, labels: &LabelMap) -> Result<Self, ModelError> {
        let model: TemplateModel =
            serde_json::from_str(json).map_err(|e| ModelError::Unavailable(e.to_string()))?;
        if model.templates.len() != labels.len() {
            return Err(ModelError::Unavailable(format!(
                "model has {} templates but {} labels are configured",
                model.templates.len(),
                labels.len()
            )));
        }
        if model.temperature <= 0.0 {
            return Err(ModelError::Unavailable("temperature must be positive".into()));
        }
        Ok(model)
    }

    pub fn load(path: &Path, labels: &LabelMap) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&content, labels)
    }
}

impl GestureModel for TemplateModel {
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, ModelError> {
        if input.len() != FEATURE_COUNT {
            return Err(ModelError::Inference(format!(
                "expected {FEATURE_COUNT} inputs, got {}",
                input.len()
            )));
        }
        if self.templates.is_empty() {
            return Err(ModelError::Inference("no templates".into()));
        }

        let distances: Vec<f32> = self
            .templates
            .iter()
            .map(|t| {
                t.as_slice()
                    .iter()
                    .zip(input)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum()
            })
            .collect();

        match self.output {
            OutputMode::ClassIndex => {
                let mut best = 0;
                for (i, d) in distances.iter().enumerate() {
                    if *d < distances[best] {
                        best = i;
                    }
                }
                Ok(vec![best as f32])
            }
            OutputMode::Probabilities => {
                let min = distances.iter().cloned().fold(f32::INFINITY, f32::min);
                let weights: Vec<f32> = distances
                    .iter()
                    .map(|d| (-(d - min) / self.temperature).exp())
                    .collect();
                let total: f32 = weights.iter().sum();
                Ok(weights.into_iter().map(|w| w / total).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::labels::GestureLabel;

    struct FixedModel(Result<Vec<f32>, ModelError>);

    impl GestureModel for FixedModel {
        fn predict(&self, _input: &[f32]) -> Result<Vec<f32>, ModelError> {
            self.0.clone()
        }
    }

    fn adapter(output: Result<Vec<f32>, ModelError>) -> ClassifierAdapter {
        ClassifierAdapter::new(Box::new(FixedModel(output)), LabelMap::default())
    }

    #[test]
    fn test_scalar_output_has_full_confidence() {
        let result = adapter(Ok(vec![2.0])).classify(&FeatureVector::zeros());
        assert_eq!(result, ClassificationResult::new(2, 1.0));
    }

    #[test]
    fn test_probability_output_takes_argmax() {
        let result =
            adapter(Ok(vec![0.05, 0.1, 0.7, 0.1, 0.05])).classify(&FeatureVector::zeros());
        assert_eq!(result.index, Some(2));
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_probability_ties_pick_first() {
        assert_eq!(interpret_output(&[0.4, 0.4, 0.2], 3).unwrap(), (0, 0.4));
    }

    #[test]
    fn test_unexpected_shape_is_zero_confidence() {
        let result = adapter(Ok(vec![0.5, 0.5])).classify(&FeatureVector::zeros());
        assert_eq!(result, ClassificationResult::none());

        assert!(matches!(
            interpret_output(&[0.1, 0.2, 0.3], 5),
            Err(ModelError::UnexpectedOutputShape {
                expected_classes: 5,
                actual_len: 3
            })
        ));
        assert!(interpret_output(&[1.5], 5).is_err());
        assert_eq!(interpret_output(&[4.0], 5).unwrap(), (4, 1.0));
        assert!(interpret_output(&[-1.0], 5).is_err());
    }

    #[test]
    fn test_scalar_index_out_of_range_is_zero_confidence() {
        assert_eq!(
            interpret_output(&[7.0], 5),
            Err(ModelError::ClassIndexOutOfRange {
                index: 7,
                classes: 5
            })
        );
        assert!(interpret_output(&[5.0], 5).is_err());

        let result = adapter(Ok(vec![7.0])).classify(&FeatureVector::zeros());
        assert_eq!(result, ClassificationResult::none());
    }

    #[test]
    fn test_inference_error_is_zero_confidence() {
        let result =
            adapter(Err(ModelError::Inference("boom".into()))).classify(&FeatureVector::zeros());
        assert!(!result.is_valid());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_unavailable_reported_once() {
        let mut adapter = ClassifierAdapter::from_load(
            Err(ModelError::Unavailable("missing file".into())),
            LabelMap::default(),
        );
        assert!(!adapter.is_available());
        assert!(adapter.take_unavailable_notice().is_some());
        assert!(adapter.take_unavailable_notice().is_none());
        assert!(!adapter.classify(&FeatureVector::zeros()).is_valid());
    }

    #[test]
    fn test_template_model_recognises_reference_poses() {
        let labels = LabelMap::default();
        let adapter = ClassifierAdapter::new(
            Box::new(TemplateModel::from_reference_poses(&labels)),
            labels.clone(),
        );

        for label in GestureLabel::ALL {
            let pose = synthetic_pose(label, Handedness::Left, Vec3::new(0.2, 1.0, 0.3), 1.3);
            let features = extract_features(&pose.joints).unwrap().features;
            let result = adapter.classify(&features);
            assert_eq!(result.index, labels.index_of(label), "misclassified {label}");
            assert!(result.confidence > 0.7, "{label} confidence {}", result.confidence);
        }
    }

    #[test]
    fn test_template_model_index_mode() {
        let labels = LabelMap::default();
        let model =
            TemplateModel::from_reference_poses(&labels).with_output(OutputMode::ClassIndex);
        let pose = synthetic_pose(GestureLabel::Fist, Handedness::Right, Vec3::ZERO, 1.0);
        let features = extract_features(&pose.joints).unwrap().features;
        assert_eq!(model.predict(features.as_slice()).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_template_json_must_match_labels() {
        let labels = LabelMap::default();
        let model = TemplateModel::from_reference_poses(&labels);
        let json = serde_json::to_string(&model).unwrap();
        assert!(TemplateModel::from_json(&json, &labels).is_ok());

        let short = LabelMap::new(vec![GestureLabel::Fist]).unwrap();
        assert!(TemplateModel::from_json(&json, &short).is_err());
    }
}
