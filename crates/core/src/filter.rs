use rayon::prelude::*;

use crate::dataset::Dataset;

/// Eligibility rules applied before any distance computation.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    excluded: Vec<String>,
    food_type: Option<String>,
}

impl CandidateFilter {
    pub fn new<S: AsRef<str>>(excluded_ingredients: &[S], food_type: Option<&str>) -> Self {
        Self {
            excluded: excluded_ingredients
                .iter()
                .map(|term| term.as_ref().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
            food_type: food_type.map(str::to_string),
        }
    }

    /// Case-insensitive literal substring test against the excluded terms.
    pub fn excludes_ingredients(&self, ingredient_parts: &str) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let haystack = ingredient_parts.to_lowercase();
        self.excluded
            .iter()
            .any(|term| haystack.contains(term.as_str()))
    }

    /// Returns the surviving `row_index` values in ascending order. Ingredient
    /// exclusion runs first, then the exact food-type match.
    pub fn apply(&self, dataset: &Dataset) -> Vec<usize> {
        let food_code = match self.food_type.as_deref() {
            Some(label) => match dataset.food_types().code_of(label) {
                Some(code) => Some(code),
                None => return Vec::new(),
            },
            None => None,
        };
        let codes = dataset.food_types().codes();
        let ingredients = dataset.ingredient_parts();
        (0..dataset.len())
            .into_par_iter()
            .filter(|&row| !self.excludes_ingredients(&ingredients[row]))
            .filter(|&row| food_code.map_or(true, |code| codes[row] == code))
            .collect()
    }
}

pub fn filter_candidates<S: AsRef<str>>(
    dataset: &Dataset,
    excluded_ingredients: &[S],
    food_type: Option<&str>,
) -> Vec<usize> {
    CandidateFilter::new(excluded_ingredients, food_type).apply(dataset)
}
