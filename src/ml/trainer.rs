//! Model training
//!
//! Consumes the full merged history, gates on minimum sample counts,
//! fits the outcome / total-goals / per-market boosters on a shuffled
//! holdout split, and persists all artifacts atomically.

use super::features::{feature_vector, FeatureEncoders, FEATURE_COLUMNS};
use super::gbm::{Gbm, GbmParams, Objective};
use crate::config::TrainerConfig;
use crate::error::{PipelineError, Result};
use crate::types::{CombinedRecord, Market, MergedRecord, OutcomeClass, ScoreLine};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Multiclass outcome artifact: one-vs-rest boosters in class order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeModel {
    pub classes: Vec<String>,
    pub models: Vec<Gbm>,
}

impl OutcomeModel {
    /// Normalized class probabilities (home, draw, away).
    pub fn predict_probs(&self, row: &[f64]) -> [f64; 3] {
        let mut probs = [0.0; 3];
        for (i, model) in self.models.iter().enumerate().take(3) {
            probs[i] = model.predict(row);
        }
        let sum: f64 = probs.iter().sum();
        if sum > 0.0 {
            for p in probs.iter_mut() {
                *p /= sum;
            }
        } else {
            probs = [1.0 / 3.0; 3];
        }
        probs
    }
}

/// Which model families a training run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainTargets {
    All,
    Outcome,
    Goals,
    Markets,
}

impl TrainTargets {
    fn outcome(&self) -> bool {
        matches!(self, TrainTargets::All | TrainTargets::Outcome)
    }
    fn goals(&self) -> bool {
        matches!(self, TrainTargets::All | TrainTargets::Goals)
    }
    fn markets(&self) -> bool {
        matches!(self, TrainTargets::All | TrainTargets::Markets)
    }
}

/// Metrics from one training run. Families outside the run's targets
/// report None.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub labeled_samples: usize,
    pub train_samples: usize,
    pub holdout_samples: usize,
    pub outcome_accuracy: Option<f64>,
    pub total_goals_rmse: Option<f64>,
    pub market_accuracy: Vec<(Market, f64)>,
    pub skipped_markets: Vec<Market>,
}

/// Train every model from the merged history and persist the artifacts.
pub fn train_all(
    merged: &[MergedRecord],
    config: &TrainerConfig,
    model_dir: &Path,
) -> Result<TrainingReport> {
    train_models(merged, config, model_dir, TrainTargets::All)
}

/// Train the targeted model families and persist their artifacts.
pub fn train_models(
    merged: &[MergedRecord],
    config: &TrainerConfig,
    model_dir: &Path,
    targets: TrainTargets,
) -> Result<TrainingReport> {
    let labeled: Vec<(&CombinedRecord, ScoreLine)> = merged
        .iter()
        .filter_map(|m| m.result.map(|score| (&m.combined, score)))
        .collect();

    if labeled.len() < config.min_samples {
        return Err(PipelineError::InsufficientData {
            required: config.min_samples,
            available: labeled.len(),
        });
    }
    info!(
        labeled = labeled.len(),
        total = merged.len(),
        "training corpus loaded"
    );

    let records: Vec<CombinedRecord> = labeled.iter().map(|(r, _)| (*r).clone()).collect();
    let scores: Vec<ScoreLine> = labeled.iter().map(|(_, s)| *s).collect();
    // A partial run scores alongside models it did not refit, so it
    // must keep the category codes those models were trained with.
    let encoders = if targets == TrainTargets::All {
        FeatureEncoders::fit(&records)
    } else {
        match saved_encoders(model_dir)? {
            Some(saved) => saved,
            None => FeatureEncoders::fit(&records),
        }
    };
    let features: Vec<Vec<f64>> = records
        .iter()
        .map(|r| feature_vector(r, &encoders))
        .collect();

    // Shuffled holdout split, seeded for reproducible runs.
    let mut indices: Vec<usize> = (0..records.len()).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);
    let holdout_len = ((records.len() as f64 * config.test_size).round() as usize)
        .clamp(1, records.len() - 1);
    let (holdout_idx, train_idx) = indices.split_at(holdout_len);

    let params = GbmParams {
        num_rounds: config.num_rounds,
        learning_rate: config.learning_rate,
        max_depth: config.max_depth,
        early_stopping_rounds: config.early_stopping_rounds,
        ..Default::default()
    };

    let take = |idx: &[usize], values: &[Vec<f64>]| -> Vec<Vec<f64>> {
        idx.iter().map(|&i| values[i].clone()).collect()
    };
    let x_train = take(train_idx, &features);
    let x_holdout = take(holdout_idx, &features);

    // Outcome model: one logistic booster per class.
    let outcome_classes: Vec<f64> = scores
        .iter()
        .map(|s| OutcomeClass::from_score(s).index() as f64)
        .collect();
    let mut outcome = None;
    let mut outcome_accuracy = None;
    if targets.outcome() {
        let mut outcome_models = Vec::with_capacity(3);
        for class in OutcomeClass::ALL {
            let onehot = |idx: &[usize]| -> Vec<f64> {
                idx.iter()
                    .map(|&i| {
                        if outcome_classes[i] == class.index() as f64 {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            };
            let model = Gbm::train(
                &params,
                Objective::Logistic,
                &x_train,
                &onehot(train_idx),
                &x_holdout,
                &onehot(holdout_idx),
            );
            outcome_models.push(model);
        }
        let model = OutcomeModel {
            classes: OutcomeClass::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            models: outcome_models,
        };
        let correct = holdout_idx
            .iter()
            .filter(|&&i| {
                let probs = model.predict_probs(&features[i]);
                let pred = probs
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(c, _)| c)
                    .unwrap_or(0);
                pred as f64 == outcome_classes[i]
            })
            .count();
        let accuracy = correct as f64 / holdout_idx.len() as f64;
        info!(accuracy = format!("{accuracy:.3}"), "outcome model trained");
        outcome = Some(model);
        outcome_accuracy = Some(accuracy);
    }

    // Total goals regression.
    let mut total_goals_model = None;
    let mut total_goals_rmse = None;
    if targets.goals() {
        let goals: Vec<f64> = scores.iter().map(|s| s.total_goals() as f64).collect();
        let y_goals = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| goals[i]).collect() };
        let model = Gbm::train(
            &params,
            Objective::Squared,
            &x_train,
            &y_goals(train_idx),
            &x_holdout,
            &y_goals(holdout_idx),
        );
        let sse: f64 = holdout_idx
            .iter()
            .map(|&i| {
                let err = model.predict(&features[i]) - goals[i];
                err * err
            })
            .sum();
        let rmse = (sse / holdout_idx.len() as f64).sqrt();
        info!(rmse = format!("{rmse:.3}"), "total goals model trained");
        total_goals_model = Some(model);
        total_goals_rmse = Some(rmse);
    }

    // Binary markets: only rows where the bookmaker priced the market,
    // and only markets with enough of them.
    let mut market_models: Vec<(Market, Gbm)> = Vec::new();
    let mut market_accuracy = Vec::new();
    let mut skipped_markets = Vec::new();
    let trained_markets = if targets.markets() {
        Market::ALL.to_vec()
    } else {
        Vec::new()
    };
    for market in trained_markets {
        let priced = |idx: &[usize]| -> Vec<usize> {
            idx.iter()
                .copied()
                .filter(|&i| market.odds(&records[i].odds).is_some())
                .collect()
        };
        let train_rows = priced(train_idx);
        let holdout_rows = priced(holdout_idx);
        if train_rows.len() + holdout_rows.len() < config.min_market_samples {
            warn!(
                market = market.as_str(),
                available = train_rows.len() + holdout_rows.len(),
                required = config.min_market_samples,
                "skipping market, not enough priced samples"
            );
            skipped_markets.push(market);
            continue;
        }
        let labels = |rows: &[usize]| -> Vec<f64> {
            rows.iter().map(|&i| market.label(&scores[i])).collect()
        };
        let model = Gbm::train(
            &params,
            Objective::Logistic,
            &take(&train_rows, &features),
            &labels(&train_rows),
            &take(&holdout_rows, &features),
            &labels(&holdout_rows),
        );
        let accuracy = if holdout_rows.is_empty() {
            f64::NAN
        } else {
            let correct = holdout_rows
                .iter()
                .filter(|&&i| (model.predict(&features[i]) >= 0.5) == (market.label(&scores[i]) >= 0.5))
                .count();
            correct as f64 / holdout_rows.len() as f64
        };
        info!(
            market = market.as_str(),
            samples = train_rows.len(),
            accuracy = format!("{accuracy:.3}"),
            "market model trained"
        );
        market_accuracy.push((market, accuracy));
        market_models.push((market, model));
    }

    save_artifacts(
        model_dir,
        &encoders,
        outcome.as_ref(),
        total_goals_model.as_ref(),
        &market_models,
    )?;

    Ok(TrainingReport {
        labeled_samples: records.len(),
        train_samples: train_idx.len(),
        holdout_samples: holdout_idx.len(),
        outcome_accuracy,
        total_goals_rmse,
        market_accuracy,
        skipped_markets,
    })
}

pub(super) fn outcome_model_path(model_dir: &Path) -> std::path::PathBuf {
    model_dir.join("outcome_model.json")
}
pub(super) fn total_goals_model_path(model_dir: &Path) -> std::path::PathBuf {
    model_dir.join("total_goals_model.json")
}
pub(super) fn market_model_path(model_dir: &Path, market: Market) -> std::path::PathBuf {
    model_dir.join(format!("{}_model.json", market.as_str()))
}
pub(super) fn encoders_path(model_dir: &Path) -> std::path::PathBuf {
    model_dir.join("encoders.json")
}
pub(super) fn feature_columns_path(model_dir: &Path) -> std::path::PathBuf {
    model_dir.join("feature_columns.json")
}

fn saved_encoders(model_dir: &Path) -> Result<Option<FeatureEncoders>> {
    let raw = match std::fs::read_to_string(encoders_path(model_dir)) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut encoders: FeatureEncoders = serde_json::from_str(&raw)?;
    encoders.rebuild_indexes();
    Ok(Some(encoders))
}

fn save_artifacts(
    model_dir: &Path,
    encoders: &FeatureEncoders,
    outcome: Option<&OutcomeModel>,
    total_goals: Option<&Gbm>,
    markets: &[(Market, Gbm)],
) -> Result<()> {
    std::fs::create_dir_all(model_dir)?;
    write_atomic(&encoders_path(model_dir), encoders)?;
    let columns: Vec<String> = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
    write_atomic(&feature_columns_path(model_dir), &columns)?;
    if let Some(outcome) = outcome {
        write_atomic(&outcome_model_path(model_dir), outcome)?;
    }
    if let Some(total_goals) = total_goals {
        write_atomic(&total_goals_model_path(model_dir), total_goals)?;
    }
    for (market, model) in markets {
        write_atomic(&market_model_path(model_dir, *market), model)?;
    }
    info!(dir = %model_dir.display(), "model artifacts saved");
    Ok(())
}

/// Write then rename, so a crash mid-save never leaves a torn artifact.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
