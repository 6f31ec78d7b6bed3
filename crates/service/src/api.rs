use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nutrirec_engine::{RecError, Recipe, RecommendationRequest, Recommender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use tracing::error;

pub struct AppState {
    recommender: Recommender,
}

impl AppState {
    pub fn new(recommender: Recommender) -> Self {
        Self { recommender }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/health", get(handle_health))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct QueryParams {
    n_neighbors: Option<usize>,
    #[serde(default)]
    return_distance: bool,
}

#[derive(Debug, Deserialize)]
struct PredictionIn {
    nutrition_input: Vec<f32>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    params: Option<QueryParams>,
    #[serde(default)]
    food_type: Option<String>,
}

/// `output` is `null` when fewer candidates survive filtering than requested.
#[derive(Debug, Serialize)]
struct PredictionOut {
    output: Option<Vec<Recipe>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    rows: usize,
    default_k: usize,
    max_k: usize,
}

async fn handle_recommend(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionIn>, JsonRejection>,
) -> Result<Json<PredictionOut>, AppError> {
    let Json(body) = payload.map_err(AppError::bad_request)?;
    let request = build_request(&state.recommender, body)?;
    let outcome = task::spawn_blocking(move || state.recommender.recommend(&request))
        .await
        .map_err(AppError::internal)??;
    Ok(Json(PredictionOut {
        output: outcome.into_recipes(),
    }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let recommender = &state.recommender;
    Json(HealthResponse {
        status: "ok",
        rows: recommender.dataset().len(),
        default_k: recommender.default_k(),
        max_k: recommender.max_k(),
    })
}

fn build_request(
    recommender: &Recommender,
    body: PredictionIn,
) -> Result<RecommendationRequest, AppError> {
    let params = body.params.unwrap_or_default();
    let request = RecommendationRequest::builder(&body.nutrition_input)
        .exclude(body.ingredients)
        .food_type(body.food_type)
        .k(params.n_neighbors.unwrap_or(recommender.default_k()))
        .return_distance(params.return_distance)
        .build()?;
    Ok(request)
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn bad_request<E: ToString>(msg: E) -> Self {
        Self::BadRequest(msg.to_string())
    }

    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl From<RecError> for AppError {
    fn from(err: RecError) -> Self {
        if err.is_invalid_request() {
            Self::bad_request(err)
        } else {
            Self::internal(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "detail": msg })))
                    .into_response()
            }
            AppError::Internal(err) => {
                error!("internal_error" = %err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
