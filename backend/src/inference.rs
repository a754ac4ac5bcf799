//! Request path: reading -> scaled features -> forward pass -> thresholded verdict.

use ndarray::ArrayView1;
use shared::{ErrorResponse, PredictionReply, PredictionResponse, SensorReading};

use crate::artifacts::Artifacts;
use crate::artifacts::classifier::INPUT_DIM;

/// Probabilities strictly above this are classified as failure risk.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("invalid reading: {0}")]
    Validation(String),
    #[error("scaling failed: {0}")]
    Scaling(String),
    #[error("forward pass failed: {0}")]
    Forward(String),
}

impl InferenceError {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Validation(_) => "validation",
            InferenceError::Scaling(_) => "scaling",
            InferenceError::Forward(_) => "forward",
        }
    }
}

/// Model input: eight scaled continuous values followed by the unscaled `tempMode` flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; INPUT_DIM as usize]);

impl FeatureVector {
    pub fn new(values: [f32; INPUT_DIM as usize]) -> Self {
        Self(values)
    }

    pub fn assemble(scaled: ArrayView1<'_, f64>, categorical: f64) -> Result<Self, InferenceError> {
        let continuous = INPUT_DIM as usize - 1;
        if scaled.len() != continuous {
            return Err(InferenceError::Scaling(format!(
                "expected {} scaled values, got {}",
                continuous,
                scaled.len()
            )));
        }

        let mut values = [0.0f32; INPUT_DIM as usize];
        for (idx, (slot, value)) in values.iter_mut().zip(scaled.iter()).enumerate() {
            *slot = *value as f32;
            if !slot.is_finite() {
                return Err(InferenceError::Scaling(format!(
                    "scaled value for {} is outside the f32 range",
                    shared::CONTINUOUS_FEATURES[idx]
                )));
            }
        }
        values[continuous] = categorical as f32;
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

pub fn classify(probability: f32) -> u8 {
    u8::from(probability > DECISION_THRESHOLD)
}

/// Scores readings against the artifacts loaded at startup. Holds no per-request state.
pub struct InferenceService {
    artifacts: Artifacts,
}

impl InferenceService {
    pub fn new(artifacts: Artifacts) -> Self {
        Self { artifacts }
    }

    pub fn features(&self, reading: &SensorReading) -> Result<FeatureVector, InferenceError> {
        let continuous = reading.continuous();
        if let Some(idx) = continuous.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::Validation(format!(
                "{} is not a finite number",
                shared::CONTINUOUS_FEATURES[idx]
            )));
        }
        if !reading.categorical().is_finite() {
            return Err(InferenceError::Validation(format!(
                "{} is not a finite number",
                shared::CATEGORICAL_FEATURE
            )));
        }

        let scaled = self
            .artifacts
            .scaler
            .transform(ArrayView1::from(&continuous[..]))?;
        FeatureVector::assemble(scaled.view(), reading.categorical())
    }

    pub fn probability(&self, reading: &SensorReading) -> Result<f32, InferenceError> {
        let features = self.features(reading)?;
        self.artifacts.classifier.probability(&features)
    }

    pub fn predict(&self, reading: &SensorReading) -> Result<PredictionResponse, InferenceError> {
        let probability = self.probability(reading)?;
        Ok(PredictionResponse::new(classify(probability)))
    }

    /// Handler boundary: failures become an `{"error": ...}` body instead of propagating.
    pub fn respond(&self, reading: &SensorReading) -> PredictionReply {
        match self.predict(reading) {
            Ok(prediction) => PredictionReply::Prediction(prediction),
            Err(e) => {
                log::error!("Inference error ({}): {}", e.kind(), e);
                PredictionReply::Error(ErrorResponse {
                    error: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::classifier::tests::{
        misshapen_classifier, positive_classifier, zero_classifier,
    };
    use crate::artifacts::scaler::StandardScaler;
    use shared::PredictionStatus;

    fn scenario_a() -> SensorReading {
        SensorReading {
            footfall: 190.0,
            aq: 7.0,
            uss: 7.0,
            cs: 6.0,
            voc: 6.0,
            rp: 36.0,
            ip: 3.0,
            temperature: 1.0,
            temp_mode: 0.0,
        }
    }

    fn scaler() -> StandardScaler {
        StandardScaler::new(
            vec![306.38, 4.33, 2.94, 5.39, 2.84, 47.04, 4.57, 16.33],
            vec![1082.04, 1.44, 1.38, 1.27, 2.27, 16.42, 1.60, 5.97],
        )
        .unwrap()
    }

    fn service(classifier: crate::artifacts::classifier::SensorClassifier) -> InferenceService {
        InferenceService::new(Artifacts::new(scaler(), classifier))
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(classify(0.5), 0);
        assert_eq!(classify(0.500_001), 1);
        assert_eq!(classify(0.0), 0);
        assert_eq!(classify(1.0), 1);
    }

    #[test]
    fn exact_half_probability_is_normal() {
        let service = service(zero_classifier());
        assert_eq!(service.probability(&scenario_a()).unwrap(), 0.5);

        let response = service.predict(&scenario_a()).unwrap();
        assert_eq!(response.prediction, 0);
        assert_eq!(response.status, PredictionStatus::Normal);
    }

    #[test]
    fn categorical_flag_is_appended_unscaled() {
        let service = service(zero_classifier());
        let reading = SensorReading {
            temp_mode: 3.0,
            ..scenario_a()
        };
        let features = service.features(&reading).unwrap();
        assert_eq!(features.as_slice().len(), 9);
        assert_eq!(features.as_slice()[8], 3.0);
        assert!((features.as_slice()[0] - ((190.0 - 306.38) / 1082.04) as f32).abs() < 1e-6);
    }

    #[test]
    fn mean_reading_scales_to_zero_vector() {
        let service = service(zero_classifier());
        let reading = SensorReading {
            footfall: 306.38,
            aq: 4.33,
            uss: 2.94,
            cs: 5.39,
            voc: 2.84,
            rp: 47.04,
            ip: 4.57,
            temperature: 16.33,
            temp_mode: 1.0,
        };
        let features = service.features(&reading).unwrap();
        assert_eq!(&features.as_slice()[..8], &[0.0; 8]);
        assert_eq!(features.as_slice()[8], 1.0);
    }

    #[test]
    fn swapping_continuous_fields_changes_features() {
        let service = service(zero_classifier());
        let reading = scenario_a();
        let swapped = SensorReading {
            footfall: reading.aq,
            aq: reading.footfall,
            ..reading
        };
        let original = service.features(&reading).unwrap();
        let swapped = service.features(&swapped).unwrap();

        assert_ne!(original.as_slice()[0], swapped.as_slice()[0]);
        assert_ne!(original.as_slice()[1], swapped.as_slice()[1]);
        assert_eq!(&original.as_slice()[2..], &swapped.as_slice()[2..]);
    }

    #[test]
    fn scenario_a_status_matches_prediction() {
        let service = service(positive_classifier());
        let response = service.predict(&scenario_a()).unwrap();
        assert_eq!(response.model, "pytorch");
        assert!(response.prediction <= 1);
        assert_eq!(response.status, PredictionStatus::from_prediction(response.prediction));
    }

    #[test]
    fn predictions_are_deterministic() {
        let service = service(positive_classifier());
        let first = service.respond(&scenario_a());
        let second = service.respond(&scenario_a());
        assert_eq!(first, second);
    }

    #[test]
    fn non_finite_reading_is_a_validation_error() {
        let service = service(zero_classifier());
        let reading = SensorReading {
            voc: f64::NAN,
            ..scenario_a()
        };
        let err = service.predict(&reading).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("VOC"));
    }

    #[test]
    fn forward_failure_becomes_error_reply() {
        let service = service(misshapen_classifier());
        match service.respond(&scenario_a()) {
            PredictionReply::Error(ErrorResponse { error }) => {
                assert!(error.starts_with("forward pass failed"), "{error}");
            }
            PredictionReply::Prediction(p) => panic!("unexpected prediction {p:?}"),
        }
        // the service keeps answering after a failed request
        assert!(matches!(service.respond(&scenario_a()), PredictionReply::Error(_)));
    }

    #[test]
    fn scaled_value_beyond_f32_is_a_scaling_error() {
        let service = service(positive_classifier());
        let reading = SensorReading {
            footfall: 1e300,
            ..scenario_a()
        };
        let err = service.predict(&reading).unwrap_err();
        assert_eq!(err.kind(), "scaling");
        assert!(err.to_string().contains("footfall"), "{err}");
    }

    #[test]
    fn short_scaled_vector_is_rejected() {
        let scaled = ndarray::array![0.0, 1.0];
        let err = FeatureVector::assemble(scaled.view(), 0.0).unwrap_err();
        assert_eq!(err.kind(), "scaling");
    }
}
