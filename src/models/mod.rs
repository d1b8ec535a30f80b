// src/models/mod.rs - Fitness model adapters
pub mod exercise;
pub mod meal_plan;
pub mod recipes;
pub mod regression;

pub use exercise::{predict_exercise_intensity, ExerciseIntensityRequest, IntensityLevel, EXERCISES};
pub use meal_plan::{predict_meal_plan, MealPlan, MealPlanRequest};
pub use recipes::{Recipe, RecipeCatalog};
pub use regression::{FeatureRow, LinearModel, ModelError, ModelResult, Prediction, Regressor};
