use serde::{Deserialize, Serialize};

use crate::dataset::RecipeRow;
use crate::nutrition::NutritionField;
use crate::quoted::decode_quoted_list;

/// User-facing recipe record with list fields decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Recipe {
    pub row_index: usize,
    pub name: String,
    pub cook_time: String,
    pub prep_time: String,
    pub total_time: String,
    #[serde(rename = "RecipeIngredientParts")]
    pub ingredient_parts: Vec<String>,
    pub calories: f32,
    pub fat_content: f32,
    pub saturated_fat_content: f32,
    pub cholesterol_content: f32,
    pub sodium_content: f32,
    pub carbohydrate_content: f32,
    pub fiber_content: f32,
    pub sugar_content: f32,
    pub protein_content: f32,
    #[serde(rename = "RecipeInstructions")]
    pub instructions: Vec<String>,
    pub food_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Recipe {
    pub fn from_row(row: &RecipeRow<'_>, instructions: &str, distance: Option<f64>) -> Self {
        let n = |field: NutritionField| row.nutrition[field.index()];
        Self {
            row_index: row.row_index,
            name: row.name.to_string(),
            cook_time: row.cook_time.to_string(),
            prep_time: row.prep_time.to_string(),
            total_time: row.total_time.to_string(),
            ingredient_parts: decode_quoted_list(row.ingredient_parts),
            calories: n(NutritionField::Calories),
            fat_content: n(NutritionField::Fat),
            saturated_fat_content: n(NutritionField::SaturatedFat),
            cholesterol_content: n(NutritionField::Cholesterol),
            sodium_content: n(NutritionField::Sodium),
            carbohydrate_content: n(NutritionField::Carbohydrate),
            fiber_content: n(NutritionField::Fiber),
            sugar_content: n(NutritionField::Sugar),
            protein_content: n(NutritionField::Protein),
            instructions: decode_quoted_list(instructions),
            food_type: row.food_type.to_string(),
            distance,
        }
    }
}

/// Outcome of a valid query. `InsufficientCandidates` is not an error: the
/// filters left fewer than `requested` eligible recipes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recommendation {
    Matches { recipes: Vec<Recipe> },
    InsufficientCandidates { requested: usize, available: usize },
}

impl Recommendation {
    pub fn recipes(&self) -> Option<&[Recipe]> {
        match self {
            Recommendation::Matches { recipes } => Some(recipes),
            Recommendation::InsufficientCandidates { .. } => None,
        }
    }

    pub fn into_recipes(self) -> Option<Vec<Recipe>> {
        match self {
            Recommendation::Matches { recipes } => Some(recipes),
            Recommendation::InsufficientCandidates { .. } => None,
        }
    }
}
