//! Crop prediction endpoint
//!
//! `suitability` and `expected_yield` are fixed placeholder values; neither
//! the model nor the request influences them.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiResult, AppState};

/// Placeholder suitability score returned with every prediction
pub const SUITABILITY: u32 = 90;

/// Placeholder expected yield returned with every prediction
pub const EXPECTED_YIELD: &str = "3.5 tons/hectare";

/// POST /predict request body (all fields required)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub soil_type: String,
    pub past_yield: f64,
    pub location: String,
}

/// POST /predict response body
#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub recommended_crop: String,
    pub suitability: u32,
    pub expected_yield: String,
}

impl PredictResponse {
    pub fn new(recommended_crop: impl Into<String>) -> Self {
        Self {
            recommended_crop: recommended_crop.into(),
            suitability: SUITABILITY,
            expected_yield: EXPECTED_YIELD.to_string(),
        }
    }
}

/// POST /predict
///
/// Unknown soil types and locations are not errors; the encoder's defaults
/// apply. A body that is not valid JSON or lacks a field gets 422, a request
/// without a JSON content type gets 415.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let Json(request) = payload?;

    let features = state
        .encoder
        .encode(&request.soil_type, &request.location, request.past_yield);
    let crop = state.classifier.classify(&features);

    debug!(
        soil_type = %request.soil_type,
        location = %request.location,
        features = ?features.as_array(),
        crop,
        "Prediction"
    );

    Ok(Json(PredictResponse::new(crop)))
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
