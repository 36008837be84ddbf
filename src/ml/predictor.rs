//! Prediction and value-bet derivation
//!
//! Loads the persisted artifacts, replays the training-time feature
//! schema over the day's combined records, and derives value flags by
//! comparing each predicted probability against the bookmaker-implied
//! probability (1 / decimal odds). A market the bookmaker did not price
//! gets no value flag at all, rather than a false one.

use super::features::{feature_vector, verify_schema, FeatureEncoders};
use super::gbm::Gbm;
use super::trainer::{
    self, encoders_path, feature_columns_path, market_model_path, outcome_model_path,
    total_goals_model_path, OutcomeModel,
};
use crate::config::TrainerConfig;
use crate::error::{PipelineError, Result};
use crate::storage;
use crate::types::{
    implied_probability, CombinedRecord, Market, MarketScore, MlScores, OutcomeClass,
    OutcomeScore, PredictedRecord,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Value requires the model to beat the implied probability strictly.
/// An unpriced selection gets no flag.
pub(crate) fn value_flag(probability: f64, odds: Option<f64>) -> Option<bool> {
    implied_probability(odds).map(|implied| probability > implied)
}

/// What to do when no trained artifacts exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPolicy {
    /// Fail with `ModelNotTrained`.
    UseSaved,
    /// Train from the merged history first, then load.
    TrainIfMissing,
}

/// Loaded, schema-checked artifacts ready to score records.
#[derive(Debug)]
pub struct ModelHandle {
    encoders: FeatureEncoders,
    outcome: OutcomeModel,
    total_goals: Gbm,
    markets: Vec<(Market, Gbm)>,
}

/// Artifact directory plus the training policy knobs.
pub struct ModelStore {
    model_dir: PathBuf,
    trainer_config: TrainerConfig,
}

impl ModelStore {
    pub fn new(model_dir: PathBuf, trainer_config: TrainerConfig) -> Self {
        Self {
            model_dir,
            trainer_config,
        }
    }

    /// Load artifacts, training them first if the policy allows.
    pub fn ensure(&self, data_dir: &Path, policy: ModelPolicy) -> Result<ModelHandle> {
        match ModelHandle::load(&self.model_dir) {
            Ok(handle) => Ok(handle),
            Err(e @ PipelineError::ModelNotTrained(_)) => match policy {
                ModelPolicy::UseSaved => Err(e),
                ModelPolicy::TrainIfMissing => {
                    info!("no saved models, training from merged history");
                    let merged = storage::load_all_merged(data_dir)?;
                    trainer::train_all(&merged, &self.trainer_config, &self.model_dir)?;
                    ModelHandle::load(&self.model_dir)
                }
            },
            Err(e) => Err(e),
        }
    }
}

impl ModelHandle {
    /// Load and schema-check every artifact in the directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let columns: Vec<String> = load_artifact(&feature_columns_path(model_dir), "features")?;
        verify_schema(&columns)?;

        let mut encoders: FeatureEncoders = load_artifact(&encoders_path(model_dir), "encoders")?;
        encoders.rebuild_indexes();
        let outcome: OutcomeModel = load_artifact(&outcome_model_path(model_dir), "outcome")?;
        let total_goals: Gbm = load_artifact(&total_goals_model_path(model_dir), "total_goals")?;

        let mut markets = Vec::new();
        for market in Market::ALL {
            let path = market_model_path(model_dir, market);
            if path.exists() {
                markets.push((market, load_artifact(&path, market.as_str())?));
            } else {
                warn!(market = market.as_str(), "no model artifact, market will not be scored");
            }
        }
        Ok(Self {
            encoders,
            outcome,
            total_goals,
            markets,
        })
    }

    /// Score one record.
    pub fn predict(&self, record: &CombinedRecord) -> MlScores {
        let row = feature_vector(record, &self.encoders);

        let probs = self.outcome.predict_probs(&row);
        let pred = OutcomeClass::ALL
            .into_iter()
            .max_by(|a, b| {
                probs[a.index()]
                    .partial_cmp(&probs[b.index()])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(OutcomeClass::Home);
        let class_value =
            |class: OutcomeClass| value_flag(probs[class.index()], class.odds(&record.odds));
        let outcome = OutcomeScore {
            prob_home: probs[0],
            prob_draw: probs[1],
            prob_away: probs[2],
            pred,
            home_value: class_value(OutcomeClass::Home),
            draw_value: class_value(OutcomeClass::Draw),
            away_value: class_value(OutcomeClass::Away),
        };

        let markets = self
            .markets
            .iter()
            .map(|(market, model)| {
                let probability = model.predict(&row);
                let value = value_flag(probability, market.odds(&record.odds));
                MarketScore {
                    market: *market,
                    probability,
                    value,
                }
            })
            .collect();

        MlScores {
            outcome: Some(outcome),
            total_goals: Some(self.total_goals.predict(&row)),
            markets,
        }
    }

    /// Score a whole day of combined records.
    pub fn predict_all(&self, records: &[CombinedRecord]) -> Vec<PredictedRecord> {
        let predicted: Vec<PredictedRecord> = records
            .iter()
            .map(|record| PredictedRecord {
                combined: record.clone(),
                ml: self.predict(record),
            })
            .collect();

        let value_count = predicted
            .iter()
            .flat_map(|p| p.ml.markets.iter())
            .filter(|m| m.value == Some(true))
            .count();
        info!(
            records = predicted.len(),
            value_flags = value_count,
            "prediction complete"
        );
        predicted
    }
}

fn load_artifact<T: DeserializeOwned>(path: &Path, name: &str) -> Result<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::ModelNotTrained(name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&raw)?)
}
