//! # croprec Common Library
//!
//! Shared code for the crop recommendation trainer and prediction service:
//! - Feature encoding (soil codes, rainfall lookup, feature vectors)
//! - Embedded training dataset and sample sources
//! - Random forest classifier
//! - Model artifact persistence
//! - Configuration loading

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod forest;
pub mod rainfall;

pub use artifact::{CropClassifier, ModelArtifact};
pub use encoding::{FeatureEncoder, FeatureVector, SoilEncoding};
pub use error::{Error, Result};
pub use rainfall::{RainfallProvider, StaticRainfallTable};
