use std::collections::HashMap;
use std::path::Path;
use tch::{Device, Kind, Tensor};

use super::ArtifactError;
use crate::inference::{FeatureVector, InferenceError};

pub const INPUT_DIM: i64 = 9;
pub const HIDDEN_DIM: i64 = 71;
/// Only active in training; scoring always runs with `train = false`.
pub const DROPOUT: f64 = 0.43305797500170606;

// Parameter prefixes of the trained sequential network. Indices 1, 2 and 4 are the
// ReLU/dropout stages and carry no weights.
const HIDDEN1: &str = "model.0";
const HIDDEN2: &str = "model.3";
const OUTPUT: &str = "model.5";

pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl Linear {
    fn forward(&self, xs: &Tensor) -> Result<Tensor, tch::TchError> {
        xs.f_linear(&self.weight, Some(&self.bias))
    }
}

/// 9 -> 71 (ReLU, dropout) -> 71 (ReLU) -> 1 (sigmoid), evaluated on CPU.
pub struct SensorClassifier {
    hidden1: Linear,
    hidden2: Linear,
    output: Linear,
}

impl SensorClassifier {
    /// Builds a classifier from already materialised layers. Layer shapes are not checked
    /// here; a mismatch surfaces as a forward-pass error.
    pub fn new(hidden1: Linear, hidden2: Linear, output: Linear) -> Self {
        Self {
            hidden1,
            hidden2,
            output,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        std::fs::metadata(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut params: HashMap<String, Tensor> = read_named_tensors(path)?.into_iter().collect();

        let hidden1 = take_linear(&mut params, HIDDEN1, HIDDEN_DIM, INPUT_DIM)?;
        let hidden2 = take_linear(&mut params, HIDDEN2, HIDDEN_DIM, HIDDEN_DIM)?;
        let output = take_linear(&mut params, OUTPUT, 1, HIDDEN_DIM)?;

        for name in params.keys() {
            log::warn!("Ignoring unexpected parameter {} in {}", name, path.display());
        }

        Ok(Self::new(hidden1, hidden2, output))
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor, tch::TchError> {
        let xs = self.hidden1.forward(xs)?.f_relu()?.f_dropout(DROPOUT, false)?;
        let xs = self.hidden2.forward(&xs)?.f_relu()?;
        self.output.forward(&xs)?.f_sigmoid()
    }

    /// Probability of failure for a single feature vector.
    pub fn probability(&self, features: &FeatureVector) -> Result<f32, InferenceError> {
        let prob = tch::no_grad(|| -> Result<f64, tch::TchError> {
            let input = Tensor::f_from_slice(features.as_slice())?.f_view([1, INPUT_DIM])?;
            self.forward(&input)?.f_double_value(&[0, 0])
        })
        .map_err(|e| InferenceError::Forward(e.to_string()))?;

        if !prob.is_finite() {
            return Err(InferenceError::Forward(format!(
                "model produced a non-finite probability ({prob})"
            )));
        }
        Ok(prob as f32)
    }
}

fn read_named_tensors(path: &Path) -> Result<Vec<(String, Tensor)>, ArtifactError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let tensors = match extension.as_deref() {
        Some("safetensors") => Tensor::read_safetensors(path),
        Some("npz") => Tensor::read_npz(path),
        // torch.save archives, possibly written from a CUDA device
        Some("pt") | Some("pth") => Tensor::loadz_multi_with_device(path, Device::Cpu),
        _ => {
            return Err(ArtifactError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    tensors.map_err(|source| ArtifactError::Torch {
        path: path.to_path_buf(),
        source,
    })
}

fn take_linear(
    params: &mut HashMap<String, Tensor>,
    prefix: &str,
    out_features: i64,
    in_features: i64,
) -> Result<Linear, ArtifactError> {
    Ok(Linear {
        weight: take_param(params, &format!("{prefix}.weight"), &[out_features, in_features])?,
        bias: take_param(params, &format!("{prefix}.bias"), &[out_features])?,
    })
}

fn take_param(
    params: &mut HashMap<String, Tensor>,
    name: &str,
    expected: &[i64],
) -> Result<Tensor, ArtifactError> {
    let tensor = params
        .remove(name)
        .ok_or_else(|| ArtifactError::MissingParameter { name: name.into() })?;

    let found = tensor.size();
    if found != expected {
        return Err(ArtifactError::Shape {
            artifact: name.into(),
            expected: expected.to_vec(),
            found,
        });
    }

    Ok(tensor.to_device(Device::Cpu).to_kind(Kind::Float))
}
