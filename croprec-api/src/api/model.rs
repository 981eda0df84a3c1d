//! Loaded model metadata endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use croprec_common::artifact::ModelArtifact;
use croprec_common::SoilEncoding;

use crate::{ApiError, ApiResult, AppState};

/// Summary of the artifact the service is serving
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub format_version: u32,
    pub encoding: SoilEncoding,
    pub n_trees: usize,
    pub n_samples: usize,
    pub labels: Vec<String>,
    pub trained_at: DateTime<Utc>,
}

impl From<&ModelArtifact> for ModelInfo {
    fn from(artifact: &ModelArtifact) -> Self {
        Self {
            format_version: artifact.format_version,
            encoding: artifact.encoding.clone(),
            n_trees: artifact.forest.n_trees(),
            n_samples: artifact.n_samples,
            labels: artifact.labels.clone(),
            trained_at: artifact.trained_at,
        }
    }
}

/// GET /model
pub async fn get_model_info(State(state): State<AppState>) -> ApiResult<Json<ModelInfo>> {
    state
        .model_info
        .as_deref()
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no model artifact metadata loaded".to_string()))
}

/// Build model metadata routes
pub fn model_routes() -> Router<AppState> {
    Router::new().route("/model", get(get_model_info))
}
