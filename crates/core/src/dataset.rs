use std::mem::size_of;

use rustc_hash::FxHashMap;

use crate::error::{RecError, Result};
use crate::nutrition::NutritionRow;

/// Owned input row, used when building a dataset from an export.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub cook_time: String,
    pub prep_time: String,
    pub total_time: String,
    pub ingredient_parts: String,
    pub nutrition: NutritionRow,
    pub food_type: String,
}

/// Borrowed view of one resident row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipeRow<'a> {
    pub row_index: usize,
    pub name: &'a str,
    pub cook_time: &'a str,
    pub prep_time: &'a str,
    pub total_time: &'a str,
    pub ingredient_parts: &'a str,
    pub nutrition: &'a NutritionRow,
    pub food_type: &'a str,
}

/// Dictionary-encoded categorical column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodTypeColumn {
    dictionary: Vec<String>,
    codes: Vec<u32>,
}

impl FoodTypeColumn {
    pub fn from_parts(dictionary: Vec<String>, codes: Vec<u32>) -> Result<Self> {
        if let Some(bad) = codes.iter().find(|c| **c as usize >= dictionary.len()) {
            return Err(RecError::InvalidSnapshot(format!(
                "food type code {bad} outside dictionary of {} entries",
                dictionary.len()
            )));
        }
        Ok(Self { dictionary, codes })
    }

    pub fn dictionary(&self) -> &[String] {
        &self.dictionary
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    pub fn label(&self, row: usize) -> &str {
        self.dictionary[self.codes[row] as usize].as_str()
    }

    /// Dictionary code for an exact label, if any row carries it.
    pub fn code_of(&self, label: &str) -> Option<u32> {
        self.dictionary
            .iter()
            .position(|entry| entry == label)
            .map(|pos| pos as u32)
    }
}

/// Resident, immutable recipe table. Instructions are deliberately absent; they
/// are resolved per query from the secondary store using `row_index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub(crate) names: Vec<String>,
    pub(crate) cook_times: Vec<String>,
    pub(crate) prep_times: Vec<String>,
    pub(crate) total_times: Vec<String>,
    pub(crate) ingredient_parts: Vec<String>,
    pub(crate) nutrition: Vec<NutritionRow>,
    pub(crate) food_types: FoodTypeColumn,
}

impl Dataset {
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn row(&self, row_index: usize) -> Option<RecipeRow<'_>> {
        if row_index >= self.len() {
            return None;
        }
        Some(RecipeRow {
            row_index,
            name: &self.names[row_index],
            cook_time: &self.cook_times[row_index],
            prep_time: &self.prep_times[row_index],
            total_time: &self.total_times[row_index],
            ingredient_parts: &self.ingredient_parts[row_index],
            nutrition: &self.nutrition[row_index],
            food_type: self.food_types.label(row_index),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RecipeRow<'_>> + '_ {
        (0..self.len()).filter_map(move |idx| self.row(idx))
    }

    pub fn ingredient_parts(&self) -> &[String] {
        &self.ingredient_parts
    }

    pub fn nutrition(&self) -> &[NutritionRow] {
        &self.nutrition
    }

    pub fn food_types(&self) -> &FoodTypeColumn {
        &self.food_types
    }

    /// Rough heap footprint of the resident table in bytes.
    pub fn resident_bytes(&self) -> usize {
        let text = |column: &[String]| {
            column
                .iter()
                .map(|s| s.capacity() + size_of::<String>())
                .sum::<usize>()
        };
        text(&self.names)
            + text(&self.cook_times)
            + text(&self.prep_times)
            + text(&self.total_times)
            + text(&self.ingredient_parts)
            + text(&self.food_types.dictionary)
            + self.nutrition.len() * size_of::<NutritionRow>()
            + self.food_types.codes.len() * size_of::<u32>()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let rows = self.names.len();
        let columns = [
            ("cook_time", self.cook_times.len()),
            ("prep_time", self.prep_times.len()),
            ("total_time", self.total_times.len()),
            ("ingredient_parts", self.ingredient_parts.len()),
            ("nutrition", self.nutrition.len()),
            ("food_type", self.food_types.codes.len()),
        ];
        for (column, len) in columns {
            if len != rows {
                return Err(RecError::InvalidSnapshot(format!(
                    "column {column} has {len} rows, expected {rows}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DatasetBuilder {
    dataset: Dataset,
    food_type_codes: FxHashMap<String, u32>,
}

impl DatasetBuilder {
    pub fn push(&mut self, recipe: NewRecipe) -> usize {
        let row_index = self.dataset.len();
        let code = match self.food_type_codes.get(&recipe.food_type) {
            Some(code) => *code,
            None => {
                let code = self.dataset.food_types.dictionary.len() as u32;
                self.dataset
                    .food_types
                    .dictionary
                    .push(recipe.food_type.clone());
                self.food_type_codes.insert(recipe.food_type, code);
                code
            }
        };
        self.dataset.food_types.codes.push(code);
        self.dataset.names.push(recipe.name);
        self.dataset.cook_times.push(recipe.cook_time);
        self.dataset.prep_times.push(recipe.prep_time);
        self.dataset.total_times.push(recipe.total_time);
        self.dataset.ingredient_parts.push(recipe.ingredient_parts);
        self.dataset.nutrition.push(recipe.nutrition);
        row_index
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn build(self) -> Dataset {
        self.dataset
    }
}

impl FromIterator<NewRecipe> for Dataset {
    fn from_iter<I: IntoIterator<Item = NewRecipe>>(iter: I) -> Self {
        let mut builder = DatasetBuilder::default();
        for recipe in iter {
            builder.push(recipe);
        }
        builder.build()
    }
}
