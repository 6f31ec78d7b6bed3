use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};

pub const NUTRITION_DIMS: usize = 9;

/// Resident nutrition features of one recipe, in [`NutritionField::ALL`] order.
pub type NutritionRow = [f32; NUTRITION_DIMS];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NutritionField {
    Calories,
    Fat,
    SaturatedFat,
    Cholesterol,
    Sodium,
    Carbohydrate,
    Fiber,
    Sugar,
    Protein,
}

impl NutritionField {
    pub const ALL: [NutritionField; NUTRITION_DIMS] = [
        NutritionField::Calories,
        NutritionField::Fat,
        NutritionField::SaturatedFat,
        NutritionField::Cholesterol,
        NutritionField::Sodium,
        NutritionField::Carbohydrate,
        NutritionField::Fiber,
        NutritionField::Sugar,
        NutritionField::Protein,
    ];

    /// Column name used in CSV exports and in snapshot numeric columns.
    pub fn column(&self) -> &'static str {
        match self {
            NutritionField::Calories => "Calories",
            NutritionField::Fat => "FatContent",
            NutritionField::SaturatedFat => "SaturatedFatContent",
            NutritionField::Cholesterol => "CholesterolContent",
            NutritionField::Sodium => "SodiumContent",
            NutritionField::Carbohydrate => "CarbohydrateContent",
            NutritionField::Fiber => "FiberContent",
            NutritionField::Sugar => "SugarContent",
            NutritionField::Protein => "ProteinContent",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == name)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Target nutrition profile of a query. Always exactly nine finite components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutritionVector(NutritionRow);

impl NutritionVector {
    pub fn new(values: NutritionRow) -> Result<Self> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(RecError::invalid_request(format!(
                "nutrition value for {} is not a finite number",
                NutritionField::ALL[pos].column()
            )));
        }
        Ok(Self(values))
    }

    pub fn from_slice(values: &[f32]) -> Result<Self> {
        let row: NutritionRow = values.try_into().map_err(|_| {
            RecError::invalid_request(format!(
                "nutrition vector must have exactly {NUTRITION_DIMS} values, got {}",
                values.len()
            ))
        })?;
        Self::new(row)
    }

    pub fn values(&self) -> &NutritionRow {
        &self.0
    }

    pub fn get(&self, field: NutritionField) -> f32 {
        self.0[field.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_roundtrip() {
        for field in NutritionField::ALL {
            assert_eq!(NutritionField::from_column(field.column()), Some(field));
        }
        assert_eq!(NutritionField::from_column("calories"), None);
    }

    #[test]
    fn rejects_wrong_dimensionality() {
        let err = NutritionVector::from_slice(&[1.0; 8]).unwrap_err();
        assert!(err.is_invalid_request());
        let err = NutritionVector::from_slice(&[1.0; 10]).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut values = [1.0; NUTRITION_DIMS];
        values[4] = f32::NAN;
        let err = NutritionVector::new(values).unwrap_err();
        assert!(err.to_string().contains("SodiumContent"));
    }

    #[test]
    fn keeps_field_order() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let vector = NutritionVector::from_slice(&values).unwrap();
        assert_eq!(vector.get(NutritionField::Protein), 9.0);
        assert_eq!(vector.get(NutritionField::Sodium), 5.0);
    }
}
