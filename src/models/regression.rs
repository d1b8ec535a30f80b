// src/models/regression.rs - Serialized regression models
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid recipe catalogue {path}: {reason}")]
    Recipes { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ModelError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn recipes(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Recipes {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Named model inputs, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    values: Vec<(String, f64)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

/// A model output as it appears in responses: integer-valued models
/// produce JSON integers, all others JSON floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Integer(i64),
    Float(f64),
}

impl Prediction {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Prediction::Integer(v) => v as f64,
            Prediction::Float(v) => v,
        }
    }
}

pub trait Regressor: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> f64;

    fn integer_output(&self) -> bool {
        false
    }

    fn predict_value(&self, row: &FeatureRow) -> Prediction {
        let value = self.predict(row);
        if self.integer_output() {
            Prediction::Integer(value.round() as i64)
        } else {
            Prediction::Float(value)
        }
    }
}

/// `intercept + sum(weight * feature)`. Features without a weight count as 0.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinearModel {
    pub intercept: f64,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub integer_output: bool,
}

impl LinearModel {
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ModelError::Format {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Regressor for LinearModel {
    fn predict(&self, row: &FeatureRow) -> f64 {
        let linear = self.intercept
            + row
                .iter()
                .map(|(name, value)| self.weights.get(name).copied().unwrap_or(0.0) * value)
                .sum::<f64>();
        if self.integer_output {
            linear.round()
        } else {
            linear
        }
    }

    fn integer_output(&self) -> bool {
        self.integer_output
    }
}
