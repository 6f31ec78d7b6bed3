pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/nutrirec.v1.rs"));
}

mod dataset;
mod error;
mod filter;
mod nutrition;
mod quoted;
mod recipe;
mod request;
mod similarity;
mod snapshot;

pub use dataset::{Dataset, DatasetBuilder, FoodTypeColumn, NewRecipe, RecipeRow};
pub use error::{RecError, Result};
pub use filter::{filter_candidates, CandidateFilter};
pub use nutrition::{NutritionField, NutritionRow, NutritionVector, NUTRITION_DIMS};
pub use quoted::decode_quoted_list;
pub use recipe::{Recipe, Recommendation};
pub use request::{RecommendationRequest, RequestBuilder, DEFAULT_NEIGHBORS};
pub use similarity::{
    cosine_distance, nearest_neighbors, Features, Neighbor, Ranking, Standardizer,
    UNDEFINED_DISTANCE,
};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
