use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Tag reported in every successful prediction.
pub const MODEL_TAG: &str = "pytorch";

/// Column names of the continuous measurements, in the order the scaler was fitted on.
pub const CONTINUOUS_FEATURES: [&str; 8] =
    ["footfall", "AQ", "USS", "CS", "VOC", "RP", "IP", "Temperature"];

/// Column name of the pass-through categorical flag, always the last model input.
pub const CATEGORICAL_FEATURE: &str = "tempMode";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub footfall: f64,
    #[serde(rename = "AQ")]
    pub aq: f64,
    #[serde(rename = "USS")]
    pub uss: f64,
    #[serde(rename = "CS")]
    pub cs: f64,
    #[serde(rename = "VOC")]
    pub voc: f64,
    #[serde(rename = "RP")]
    pub rp: f64,
    #[serde(rename = "IP")]
    pub ip: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "tempMode")]
    pub temp_mode: f64,
}

impl SensorReading {
    /// Continuous measurements in `CONTINUOUS_FEATURES` order.
    pub fn continuous(&self) -> [f64; 8] {
        [
            self.footfall,
            self.aq,
            self.uss,
            self.cs,
            self.voc,
            self.rp,
            self.ip,
            self.temperature,
        ]
    }

    pub fn categorical(&self) -> f64 {
        self.temp_mode
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PredictionStatus {
    #[serde(rename = "normal")]
    #[strum(serialize = "normal")]
    Normal,
    #[serde(rename = "failure risk")]
    #[strum(serialize = "failure risk")]
    FailureRisk,
}

impl PredictionStatus {
    pub fn from_prediction(prediction: u8) -> Self {
        if prediction == 1 {
            PredictionStatus::FailureRisk
        } else {
            PredictionStatus::Normal
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub model: String,
    pub prediction: u8,
    pub status: PredictionStatus,
}

impl PredictionResponse {
    pub fn new(prediction: u8) -> Self {
        Self {
            model: MODEL_TAG.to_string(),
            prediction,
            status: PredictionStatus::from_prediction(prediction),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of a `/predict/pytorch` reply: exactly one of the two shapes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PredictionReply {
    Prediction(PredictionResponse),
    Error(ErrorResponse),
}
