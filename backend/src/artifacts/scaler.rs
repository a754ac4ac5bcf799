use ndarray::{Array1, ArrayView1};
use serde::Deserialize;
use shared::CONTINUOUS_FEATURES;
use std::path::Path;

use super::ArtifactError;
use crate::inference::InferenceError;

pub const N_FEATURES: usize = CONTINUOUS_FEATURES.len();

/// JSON export of a fitted standard scaler. `mean`/`scale` are null when centering/scaling
/// was disabled at fit time.
#[derive(Debug, Deserialize)]
struct ScalerFile {
    n_features_in: usize,
    feature_names: Option<Vec<String>>,
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
}

/// Elementwise `(x - mean) / scale` over the eight continuous features.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        let mean = check_parameter("mean", mean)?;
        let scale = check_parameter("scale", scale)?;
        if let Some(idx) = scale.iter().position(|s| *s == 0.0) {
            return Err(ArtifactError::InvalidParameter {
                name: "scale".into(),
                reason: format!("zero scale for feature {}", CONTINUOUS_FEATURES[idx]),
            });
        }
        Ok(Self {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ScalerFile = serde_json::from_str(&raw).map_err(|e| ArtifactError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if file.n_features_in != N_FEATURES {
            return Err(ArtifactError::Shape {
                artifact: "scaler".into(),
                expected: vec![N_FEATURES as i64],
                found: vec![file.n_features_in as i64],
            });
        }
        if let Some(names) = &file.feature_names {
            if names.iter().map(String::as_str).ne(CONTINUOUS_FEATURES) {
                return Err(ArtifactError::InvalidParameter {
                    name: "feature_names".into(),
                    reason: format!("expected {:?}, found {:?}", CONTINUOUS_FEATURES, names),
                });
            }
        }

        Self::new(
            file.mean.unwrap_or_else(|| vec![0.0; N_FEATURES]),
            file.scale.unwrap_or_else(|| vec![1.0; N_FEATURES]),
        )
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    pub fn transform(&self, input: ArrayView1<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        if input.len() != self.n_features() {
            return Err(InferenceError::Scaling(format!(
                "expected {} continuous features, got {}",
                self.n_features(),
                input.len()
            )));
        }
        let scaled = (&input - &self.mean) / &self.scale;
        if let Some(idx) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::Scaling(format!(
                "scaled value for {} is not finite",
                CONTINUOUS_FEATURES[idx]
            )));
        }
        Ok(scaled)
    }
}

fn check_parameter(name: &str, values: Vec<f64>) -> Result<Vec<f64>, ArtifactError> {
    if values.len() != N_FEATURES {
        return Err(ArtifactError::Shape {
            artifact: format!("scaler {name}"),
            expected: vec![N_FEATURES as i64],
            found: vec![values.len() as i64],
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ArtifactError::InvalidParameter {
            name: name.into(),
            reason: "contains a non-finite value".into(),
        });
    }
    Ok(values)
}
