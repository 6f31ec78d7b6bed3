//! Brute-force cosine nearest-neighbour search over standardized nutrition
//! features.
//!
//! Standardization statistics are fitted on the candidate set of each query,
//! not on the whole dataset, so the same target can rank differently once
//! filters change the eligible pool.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::nutrition::{NutritionRow, NutritionVector, NUTRITION_DIMS};

pub type Features = [f64; NUTRITION_DIMS];

/// Distance reported when cosine similarity is undefined (a zero vector).
pub const UNDEFINED_DISTANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row_index: usize,
    pub distance: f64,
}

impl Neighbor {
    /// Ascending distance, then ascending row index.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.row_index.cmp(&other.row_index))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ranking {
    Ranked(Vec<Neighbor>),
    InsufficientCandidates { requested: usize, available: usize },
}

/// Per-field mean and population standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Features,
    std_dev: Features,
}

impl Standardizer {
    pub fn fit<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a NutritionRow>,
        I::IntoIter: Clone,
    {
        let rows = rows.into_iter();
        let mut mean = [0.0f64; NUTRITION_DIMS];
        let mut count = 0usize;
        for row in rows.clone() {
            for (acc, value) in mean.iter_mut().zip(row.iter()) {
                *acc += *value as f64;
            }
            count += 1;
        }
        if count == 0 {
            return Self {
                mean,
                std_dev: [0.0; NUTRITION_DIMS],
            };
        }
        for acc in mean.iter_mut() {
            *acc /= count as f64;
        }
        let mut variance = [0.0f64; NUTRITION_DIMS];
        for row in rows {
            for dim in 0..NUTRITION_DIMS {
                let delta = row[dim] as f64 - mean[dim];
                variance[dim] += delta * delta;
            }
        }
        let mut std_dev = [0.0f64; NUTRITION_DIMS];
        for dim in 0..NUTRITION_DIMS {
            std_dev[dim] = (variance[dim] / count as f64).sqrt();
        }
        Self { mean, std_dev }
    }

    pub fn mean(&self) -> &Features {
        &self.mean
    }

    pub fn std_dev(&self) -> &Features {
        &self.std_dev
    }

    /// A field whose spread is indistinguishable from rounding noise is
    /// constant across the candidate set.
    pub fn is_constant(&self, dim: usize) -> bool {
        self.std_dev[dim] <= 10.0 * f64::EPSILON * self.mean[dim].abs().max(1.0)
    }

    /// Constant fields map to 0 for every input, target included, so they add
    /// nothing to any distance.
    pub fn transform(&self, row: &NutritionRow) -> Features {
        let mut out = [0.0f64; NUTRITION_DIMS];
        for dim in 0..NUTRITION_DIMS {
            if !self.is_constant(dim) {
                out[dim] = (row[dim] as f64 - self.mean[dim]) / self.std_dev[dim];
            }
        }
        out
    }
}

pub fn cosine_distance(a: &Features, b: &Features) -> f64 {
    let mut dot = 0.0f64;
    let mut a_norm = 0.0f64;
    let mut b_norm = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }
    if a_norm == 0.0 || b_norm == 0.0 {
        return UNDEFINED_DISTANCE;
    }
    (1.0 - dot / (a_norm.sqrt() * b_norm.sqrt())).clamp(0.0, 2.0)
}

/// Ranks `candidates` by cosine distance to `target` and keeps the closest `k`.
/// Returns [`Ranking::InsufficientCandidates`] instead of a short list when
/// fewer than `k` candidates are available.
pub fn nearest_neighbors(
    dataset: &Dataset,
    candidates: &[usize],
    target: &NutritionVector,
    k: usize,
) -> Ranking {
    if candidates.len() < k {
        return Ranking::InsufficientCandidates {
            requested: k,
            available: candidates.len(),
        };
    }
    let nutrition = dataset.nutrition();
    let scaler = Standardizer::fit(candidates.iter().map(|&row| &nutrition[row]));
    let target = scaler.transform(target.values());
    let mut scored: Vec<Neighbor> = candidates
        .par_iter()
        .map(|&row| Neighbor {
            row_index: row,
            distance: cosine_distance(&target, &scaler.transform(&nutrition[row])),
        })
        .collect();
    Ranking::Ranked(select_top_k(&mut scored, k))
}

fn select_top_k(scored: &mut Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, Neighbor::rank_cmp);
        scored.truncate(k);
    }
    scored.sort_unstable_by(Neighbor::rank_cmp);
    std::mem::take(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::NewRecipe;

    fn dataset(rows: &[NutritionRow]) -> Dataset {
        rows.iter()
            .map(|nutrition| NewRecipe {
                name: String::new(),
                cook_time: String::new(),
                prep_time: String::new(),
                total_time: String::new(),
                ingredient_parts: String::new(),
                nutrition: *nutrition,
                food_type: "Any".to_string(),
            })
            .collect()
    }

    fn ranked(ranking: Ranking) -> Vec<Neighbor> {
        match ranking {
            Ranking::Ranked(list) => list,
            other => panic!("expected ranked output, got {other:?}"),
        }
    }

    #[test]
    fn population_statistics() {
        let rows = [
            [2.0; 9], [4.0; 9], [4.0; 9], [4.0; 9], [5.0; 9], [5.0; 9], [7.0; 9], [9.0; 9],
        ];
        let scaler = Standardizer::fit(rows.iter());
        assert!((scaler.mean()[0] - 5.0).abs() < 1e-12);
        assert!((scaler.std_dev()[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn constant_field_is_zeroed_for_target_too() {
        let mut a = [1.0; 9];
        let mut b = [1.0; 9];
        a[0] = 10.0;
        b[0] = 20.0;
        let scaler = Standardizer::fit([a, b].iter());
        assert!(scaler.is_constant(1));
        let mut target = [1.0; 9];
        target[1] = 1000.0;
        let features = scaler.transform(&target);
        assert_eq!(features[1], 0.0);
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_norm_is_maximum_finite_distance() {
        let zero = [0.0; NUTRITION_DIMS];
        let mut one = [0.0; NUTRITION_DIMS];
        one[0] = 1.0;
        assert_eq!(cosine_distance(&zero, &one), UNDEFINED_DISTANCE);
        assert_eq!(cosine_distance(&one, &one), 0.0);
        let mut opposite = one;
        opposite[0] = -1.0;
        assert_eq!(cosine_distance(&one, &opposite), 2.0);
    }

    #[test]
    fn insufficient_candidates_are_signalled() {
        let data = dataset(&[[1.0; 9], [2.0; 9]]);
        let target = NutritionVector::new([1.0; 9]).unwrap();
        assert_eq!(
            nearest_neighbors(&data, &[0, 1], &target, 3),
            Ranking::InsufficientCandidates {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn ties_break_on_row_index() {
        // Rows 1 and 3 are identical, as are rows 0 and 2.
        let mut near = [0.0; 9];
        near[0] = 1.0;
        near[1] = 2.0;
        let mut far = [0.0; 9];
        far[0] = 2.0;
        far[1] = 1.0;
        let data = dataset(&[far, near, far, near]);
        let target = NutritionVector::new(near).unwrap();
        let result = ranked(nearest_neighbors(&data, &[0, 1, 2, 3], &target, 4));
        let order: Vec<_> = result.iter().map(|n| n.row_index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert_eq!(result[0].distance, result[1].distance);
    }

    #[test]
    fn constant_field_does_not_break_ranking() {
        let mut rows = Vec::new();
        for idx in 0..5 {
            let mut row = [3.0; 9];
            row[0] = idx as f32;
            row[1] = (idx * idx) as f32;
            rows.push(row);
        }
        let data = dataset(&rows);
        let mut target = rows[2];
        target[5] = 999.0;
        let target = NutritionVector::new(target).unwrap();
        let result = ranked(nearest_neighbors(&data, &[0, 1, 2, 3, 4], &target, 5));
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|n| n.distance.is_finite()));
        assert_eq!(result[0].row_index, 2);
    }
}
