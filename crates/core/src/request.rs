use crate::error::{RecError, Result};
use crate::nutrition::NutritionVector;

pub const DEFAULT_NEIGHBORS: usize = 5;

/// A validated recommendation query. Built through [`RequestBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    target: NutritionVector,
    excluded_ingredients: Vec<String>,
    food_type: Option<String>,
    k: usize,
    return_distance: bool,
}

impl RecommendationRequest {
    pub fn builder(target: &[f32]) -> RequestBuilder {
        RequestBuilder::new(target)
    }

    pub fn target(&self) -> &NutritionVector {
        &self.target
    }

    pub fn excluded_ingredients(&self) -> &[String] {
        &self.excluded_ingredients
    }

    pub fn food_type(&self) -> Option<&str> {
        self.food_type.as_deref()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn return_distance(&self) -> bool {
        self.return_distance
    }
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    target: Vec<f32>,
    excluded_ingredients: Vec<String>,
    food_type: Option<String>,
    k: usize,
    return_distance: bool,
}

impl RequestBuilder {
    pub fn new(target: &[f32]) -> Self {
        Self {
            target: target.to_vec(),
            excluded_ingredients: Vec::new(),
            food_type: None,
            k: DEFAULT_NEIGHBORS,
            return_distance: false,
        }
    }

    pub fn exclude<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_ingredients
            .extend(ingredients.into_iter().map(Into::into));
        self
    }

    pub fn food_type(mut self, food_type: Option<String>) -> Self {
        self.food_type = food_type;
        self
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn return_distance(mut self, enabled: bool) -> Self {
        self.return_distance = enabled;
        self
    }

    /// Blank exclusion terms are dropped so they cannot match every row. An
    /// empty `food_type` string is treated as "no filter".
    pub fn build(self) -> Result<RecommendationRequest> {
        let target = NutritionVector::from_slice(&self.target)?;
        if self.k == 0 {
            return Err(RecError::invalid_request("k must be at least 1"));
        }
        let excluded_ingredients = self
            .excluded_ingredients
            .into_iter()
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
            .collect();
        let food_type = self.food_type.filter(|ft| !ft.is_empty());
        Ok(RecommendationRequest {
            target,
            excluded_ingredients,
            food_type,
            k: self.k,
            return_distance: self.return_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: [f32; 9] = [500.0, 20.0, 5.0, 50.0, 400.0, 60.0, 8.0, 10.0, 25.0];

    #[test]
    fn defaults_match_query_contract() {
        let request = RecommendationRequest::builder(&TARGET).build().unwrap();
        assert_eq!(request.k(), DEFAULT_NEIGHBORS);
        assert!(!request.return_distance());
        assert!(request.excluded_ingredients().is_empty());
        assert_eq!(request.food_type(), None);
    }

    #[test]
    fn rejects_zero_neighbors() {
        let err = RecommendationRequest::builder(&TARGET).k(0).build().unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn rejects_short_target() {
        let err = RecommendationRequest::builder(&TARGET[..7]).build().unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn blank_terms_are_dropped() {
        let request = RecommendationRequest::builder(&TARGET)
            .exclude(["", "  ", " egg ", "milk"])
            .food_type(Some(String::new()))
            .build()
            .unwrap();
        assert_eq!(request.excluded_ingredients(), &["egg", "milk"]);
        assert_eq!(request.food_type(), None);
    }
}
