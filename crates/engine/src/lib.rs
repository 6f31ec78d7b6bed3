pub mod assemble;
pub mod config;
pub mod instructions;
pub mod pipeline;
pub mod store;

pub use assemble::assemble_recipes;
pub use config::EngineConfig;
pub use instructions::InstructionStore;
pub use nutrirec_core::{
    NutritionField, RecError, Recipe, Recommendation, RecommendationRequest, RequestBuilder,
    NUTRITION_DIMS,
};
pub use pipeline::Recommender;
pub use store::{DatasetStore, InstructionSource};
