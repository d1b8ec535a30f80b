// src/models/meal_plan.rs - Daily calorie prediction and meal suggestions
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::recipes::{Recipe, RecipeCatalog};
use super::regression::{FeatureRow, ModelError, ModelResult, Regressor};

#[derive(Debug, Clone, Deserialize)]
pub struct MealPlanRequest {
    pub age: i64,
    /// kg
    pub weight: f64,
    /// m
    pub height: f64,
    pub bmi: f64,
    pub bmr: f64,
    pub activity_level: f64,
    pub gender: String,
    pub number_of_meals: i64,
    pub number_of_options: usize,
}

impl MealPlanRequest {
    pub fn features(&self) -> FeatureRow {
        FeatureRow::new()
            .with("age", self.age as f64)
            .with("weight(kg)", self.weight)
            .with("height(m)", self.height)
            .with("BMI", self.bmi)
            .with("BMR", self.bmr)
            .with("activity_level", self.activity_level)
            .with("gender_F", if self.gender == "F" { 1.0 } else { 0.0 })
            .with("gender_M", if self.gender == "M" { 1.0 } else { 0.0 })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlan {
    pub total_calories: f64,
    pub calories_per_meal: f64,
    pub suggested: Vec<Recipe>,
}

pub fn predict_meal_plan(
    model: &dyn Regressor,
    recipes: &RecipeCatalog,
    request: &MealPlanRequest,
) -> ModelResult<MealPlan> {
    if request.number_of_meals < 1 {
        return Err(ModelError::invalid_input("number_of_meals must be at least 1"));
    }

    let total = model.predict(&request.features());
    let per_meal = total / request.number_of_meals as f64;
    let suggested = recipes.below(per_meal, request.number_of_options);
    debug!(
        "Predicted {:.2} kcal, {:.2} per meal, {} suggestions",
        total,
        per_meal,
        suggested.len()
    );

    Ok(MealPlan {
        total_calories: round2(total),
        calories_per_meal: round2(per_meal),
        suggested,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    impl Regressor for Fixed {
        fn predict(&self, _row: &FeatureRow) -> f64 {
            self.0
        }
    }

    fn request(meals: i64, options: usize) -> MealPlanRequest {
        MealPlanRequest {
            age: 25,
            weight: 70.0,
            height: 1.75,
            bmi: 22.9,
            bmr: 1384.1,
            activity_level: 1.5,
            gender: "M".into(),
            number_of_meals: meals,
            number_of_options: options,
        }
    }

    fn catalog() -> RecipeCatalog {
        RecipeCatalog::from_reader("name,calories\nA,500\nB,900\nC,650\nD,300\n".as_bytes()).unwrap()
    }

    #[test]
    fn gender_is_one_hot() {
        let male = request(3, 1).features();
        assert_eq!(male.get("gender_M"), Some(1.0));
        assert_eq!(male.get("gender_F"), Some(0.0));

        let other = MealPlanRequest {
            gender: "X".into(),
            ..request(3, 1)
        };
        assert_eq!(other.features().get("gender_M"), Some(0.0));
        assert_eq!(other.features().get("gender_F"), Some(0.0));
        assert_eq!(other.features().get("weight(kg)"), Some(70.0));
    }

    #[test]
    fn splits_calories_and_filters_recipes() {
        let plan = predict_meal_plan(&Fixed(2000.0), &catalog(), &request(3, 10)).unwrap();
        assert_eq!(plan.total_calories, 2000.0);
        assert_eq!(plan.calories_per_meal, 666.67);
        // 650 < 666.666..., 900 is not
        assert_eq!(plan.suggested.len(), 3);
    }

    #[test]
    fn options_limit_the_suggestions() {
        let plan = predict_meal_plan(&Fixed(2000.0), &catalog(), &request(3, 1)).unwrap();
        assert_eq!(plan.suggested.len(), 1);
        assert_eq!(plan.suggested[0].calories(), Some(500.0));
    }

    #[test]
    fn zero_meals_is_invalid() {
        let err = predict_meal_plan(&Fixed(2000.0), &catalog(), &request(0, 1)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
    }
}
