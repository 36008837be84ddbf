//! Model training and prediction
//!
//! Gradient-boosted decision trees over engineered match features:
//! - multiclass outcome model (1/X/2) as one-vs-rest boosters
//! - regression model for total goals
//! - one binary model per betting market
//!
//! Artifacts (models, label encoders, the feature-column schema) are
//! persisted per training run and replayed identically at prediction
//! time; a schema mismatch is fatal, never silently ignored.

pub mod features;
pub mod gbm;
pub mod predictor;
pub mod trainer;

#[cfg(test)]
mod tests;

pub use features::{FeatureEncoders, LabelEncoder, FEATURE_COLUMNS};
pub use gbm::{Gbm, GbmParams, Objective};
pub use predictor::{ModelHandle, ModelPolicy, ModelStore};
pub use trainer::{train_all, train_models, TrainTargets, TrainingReport};
