// src/models/recipes.rs - Recipe catalogue used for meal suggestions
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::info;

use super::regression::{ModelError, ModelResult};

const CALORIES_COLUMN: &str = "calories";

/// One catalogue row, keyed by CSV column name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Recipe(Map<String, Value>);

impl Recipe {
    pub fn calories(&self) -> Option<f64> {
        self.0.get(CALORIES_COLUMN).and_then(Value::as_f64)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
}

impl RecipeCatalog {
    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_reader(file).map_err(|e| match e {
            ModelError::InvalidInput(reason) => ModelError::recipes(path, reason),
            other => other,
        })?;
        info!("Loaded {} recipes from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> ModelResult<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| ModelError::invalid_input(e.to_string()))?
            .clone();
        if !headers.iter().any(|h| h == CALORIES_COLUMN) {
            return Err(ModelError::invalid_input(format!("missing `{}` column", CALORIES_COLUMN)));
        }

        let mut recipes = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ModelError::invalid_input(e.to_string()))?;
            let row = headers
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| (column.to_string(), cell_value(cell)))
                .collect();
            recipes.push(Recipe(row));
        }

        Ok(Self { recipes })
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// First `limit` recipes, in catalogue order, with calories strictly
    /// below `max_calories`. Rows without a numeric calorie value never match.
    pub fn below(&self, max_calories: f64, limit: usize) -> Vec<Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.calories().is_some_and(|c| c < max_calories))
            .take(limit)
            .cloned()
            .collect()
    }
}

fn cell_value(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "name,calories,protein\n\
                       Oat bowl,320,12.5\n\
                       Steak,850,60\n\
                       Salad,180,\n\
                       Mystery,unknown,1\n\
                       Soup,240.5,8\n";

    #[test]
    fn numeric_cells_become_numbers() {
        let catalog = RecipeCatalog::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 5);

        let first = &catalog.below(1000.0, 1)[0];
        assert_eq!(first.get("name"), Some(&Value::String("Oat bowl".into())));
        assert_eq!(first.get("calories"), Some(&serde_json::json!(320)));
        assert_eq!(first.get("protein"), Some(&serde_json::json!(12.5)));
    }

    #[test]
    fn below_keeps_catalogue_order_and_limit() {
        let catalog = RecipeCatalog::from_reader(CSV.as_bytes()).unwrap();
        let names: Vec<_> = catalog
            .below(400.0, 10)
            .iter()
            .map(|r| r.get("name").and_then(Value::as_str).unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, ["Oat bowl", "Salad", "Soup"]);

        assert_eq!(catalog.below(400.0, 2).len(), 2);
        assert!(catalog.below(400.0, 0).is_empty());
    }

    #[test]
    fn the_bound_is_strict() {
        let catalog = RecipeCatalog::from_reader(CSV.as_bytes()).unwrap();
        assert!(catalog.below(180.0, 10).is_empty());
    }

    #[test]
    fn missing_calories_column_is_rejected() {
        let err = RecipeCatalog::from_reader("name,protein\nEgg,6\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
    }
}
