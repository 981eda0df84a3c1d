//! croprec-api library - crop recommendation prediction service
//!
//! Exposes the router, application state and startup loading so the binary
//! and integration tests build the service the same way.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use croprec_common::artifact::ModelArtifact;
use croprec_common::{CropClassifier, FeatureEncoder, SoilEncoding};

use crate::api::model::ModelInfo;
use crate::config::ServiceConfig;

/// Application state shared across handlers
///
/// Everything here is read-only after startup; requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    /// Loaded classifier
    pub classifier: Arc<dyn CropClassifier>,
    /// Request feature encoder (soil table + rainfall source)
    pub encoder: Arc<FeatureEncoder>,
    /// Artifact metadata for GET /model; None for classifiers not loaded from an artifact
    pub model_info: Option<Arc<ModelInfo>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn CropClassifier>, encoder: FeatureEncoder) -> Self {
        Self {
            classifier,
            encoder: Arc::new(encoder),
            model_info: None,
            startup_time: Utc::now(),
        }
    }

    /// State backed by a trained artifact
    pub fn from_artifact(artifact: ModelArtifact, encoder: FeatureEncoder) -> Self {
        let info = ModelInfo::from(&artifact);
        Self {
            model_info: Some(Arc::new(info)),
            ..Self::new(Arc::new(artifact), encoder)
        }
    }
}

/// Load the artifact named by `config` and build the application state
///
/// Any failure here is fatal: the service does not start without a model.
pub fn load_state(config: &ServiceConfig) -> Result<AppState> {
    let artifact = ModelArtifact::load(&config.model_path).with_context(|| {
        format!(
            "Failed to load model artifact {} (run croprec-train first)",
            config.model_path.display()
        )
    })?;

    let encoder = FeatureEncoder::new(
        SoilEncoding::standard(),
        Arc::new(config.rainfall.to_table()),
    );

    if let Err(e) = artifact.check_encoding(encoder.soil_encoding()) {
        if config.strict_encoding {
            return Err(e).context("Refusing to serve with mismatched soil encoding");
        }
        warn!("{}; predictions will use the serving table's codes", e);
    } else {
        info!("Soil encoding {} matches serving table", artifact.encoding);
    }

    Ok(AppState::from_artifact(artifact, encoder))
}

/// Build application router
///
/// All routes allow any origin, method and header (local frontend development).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::model_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
