//! Startup-time artifacts: the fitted feature scaler and the classifier weights.
//!
//! Both are loaded exactly once, before the HTTP server binds, and are read-only afterwards.
//! Any failure here is fatal for the process.

pub mod classifier;
pub mod scaler;

use std::path::PathBuf;

use crate::config::ArtifactPaths;
use classifier::SensorClassifier;
use scaler::StandardScaler;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed artifact {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("{artifact} has shape {found:?}, expected {expected:?}")]
    Shape {
        artifact: String,
        expected: Vec<i64>,
        found: Vec<i64>,
    },
    #[error("Missing parameter {name}")]
    MissingParameter { name: String },
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("Unsupported weights format for {}, expected .safetensors, .npz, .pt or .pth", .path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Failed to load tensors from {}: {source}", .path.display())]
    Torch {
        path: PathBuf,
        #[source]
        source: tch::TchError,
    },
}

/// Frozen inference context shared by every request.
pub struct Artifacts {
    pub scaler: StandardScaler,
    pub classifier: SensorClassifier,
}

impl Artifacts {
    pub fn new(scaler: StandardScaler, classifier: SensorClassifier) -> Self {
        Self { scaler, classifier }
    }

    /// Loads the scaler, then the weights. Stops at the first failure.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        log::info!("Loading scaler from {}", paths.scaler.display());
        let scaler = StandardScaler::load(&paths.scaler)?;
        log::info!("Scaler loaded: {} continuous features", scaler.n_features());

        log::info!("Loading classifier weights from {}", paths.weights.display());
        let classifier = SensorClassifier::load(&paths.weights)?;
        log::info!(
            "Classifier loaded: {} -> {} -> {} -> 1 on CPU",
            classifier::INPUT_DIM,
            classifier::HIDDEN_DIM,
            classifier::HIDDEN_DIM
        );

        Ok(Self::new(scaler, classifier))
    }
}
