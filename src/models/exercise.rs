// src/models/exercise.rs - Per-exercise intensity prediction
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::regression::{FeatureRow, Prediction, Regressor};

pub const EXERCISES: [&str; 10] = [
    "Exercise 1",
    "Exercise 2",
    "Exercise 3",
    "Exercise 4",
    "Exercise 5",
    "Exercise 6",
    "Exercise 7",
    "Exercise 8",
    "Exercise 9",
    "Exercise 10",
];

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseIntensityRequest {
    pub actual_weight: f64,
    pub age: i64,
    pub gender: String,
    /// minutes
    pub duration: i64,
    pub bmi: f64,
    /// m
    pub height: f64,
}

impl ExerciseIntensityRequest {
    pub fn features(&self, exercise: &str) -> FeatureRow {
        FeatureRow::new()
            .with("Actual Weight", self.actual_weight)
            .with("Age", self.age as f64)
            .with("Duration", self.duration as f64)
            .with("BMI", self.bmi)
            .with("Height (m)", self.height)
            .with(format!("Gender_{}", self.gender), 1.0)
            .with(format!("Exercise_{}", exercise), 1.0)
    }
}

/// Serialized as a single-key object: `{"Exercise 1": 4}`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityLevel {
    pub exercise: &'static str,
    pub intensity: Prediction,
}

impl Serialize for IntensityLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.exercise, &self.intensity)?;
        map.end()
    }
}

/// One prediction per entry of `EXERCISES`, in order.
pub fn predict_exercise_intensity(model: &dyn Regressor, request: &ExerciseIntensityRequest) -> Vec<IntensityLevel> {
    EXERCISES
        .iter()
        .map(|&exercise| IntensityLevel {
            exercise,
            intensity: model.predict_value(&request.features(exercise)),
        })
        .collect()
}
