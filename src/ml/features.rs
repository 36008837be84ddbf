//! Feature engineering
//!
//! Turns a CombinedRecord into the fixed 22-column vector the models
//! are trained on. The column list is persisted alongside the models
//! and checked on load; prediction must replay exactly this schema.

use crate::error::{PipelineError, Result};
use crate::types::{implied_probability, CombinedRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model input schema, in column order.
pub const FEATURE_COLUMNS: [&str; 22] = [
    // Bookmaker-implied probabilities
    "home_win_prob",
    "draw_prob",
    "away_win_prob",
    "odds_ratio",
    "favorite",
    // Tip probabilities (scaled 0-1)
    "tip_home_prob",
    "tip_draw_prob",
    "tip_away_prob",
    "prob_diff",
    "prob_sum",
    // Kelly and goals
    "kelly",
    "has_kelly_value",
    "avg_goals",
    // Predicted scores
    "home_pred_score",
    "away_pred_score",
    "predicted_total_goals",
    // Secondary markets
    "btts_prob",
    "over_1_5_prob",
    // Encoded categoricals
    "home_team_encoded",
    "away_team_encoded",
    "country_encoded",
    "league_name_encoded",
];

/// Fallback class for team/league names never seen in training.
const UNKNOWN: &str = "Unknown";

/// Maps category strings to stable integer codes.
///
/// Classes are sorted at fit time so the encoding is independent of
/// input order; "Unknown" is always a member and absorbs unseen values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn fit<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Self {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.push(UNKNOWN.to_string());
        classes.sort_unstable();
        classes.dedup();
        let mut encoder = Self {
            classes,
            index: HashMap::new(),
        };
        encoder.rebuild_index();
        encoder
    }

    /// Rebuild the lookup map; required after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
    }

    pub fn encode(&self, value: Option<&str>) -> f64 {
        let value = value.unwrap_or(UNKNOWN);
        let code = self
            .index
            .get(value)
            .or_else(|| self.index.get(UNKNOWN))
            .copied()
            .unwrap_or(0);
        code as f64
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// The four categorical encoders shared by every model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoders {
    pub home_team: LabelEncoder,
    pub away_team: LabelEncoder,
    pub country: LabelEncoder,
    pub league_name: LabelEncoder,
}

impl FeatureEncoders {
    /// Fit all encoders from the training corpus.
    pub fn fit(records: &[CombinedRecord]) -> Self {
        Self {
            home_team: LabelEncoder::fit(records.iter().map(|r| r.odds.home_team.as_str())),
            away_team: LabelEncoder::fit(records.iter().map(|r| r.odds.away_team.as_str())),
            country: LabelEncoder::fit(
                records
                    .iter()
                    .filter_map(|r| tip_country(r))
                    .collect::<Vec<_>>(),
            ),
            league_name: LabelEncoder::fit(
                records
                    .iter()
                    .filter_map(|r| tip_league(r))
                    .collect::<Vec<_>>(),
            ),
        }
    }

    pub fn rebuild_indexes(&mut self) {
        self.home_team.rebuild_index();
        self.away_team.rebuild_index();
        self.country.rebuild_index();
        self.league_name.rebuild_index();
    }
}

fn tip_country(record: &CombinedRecord) -> Option<&str> {
    record
        .tip
        .as_ref()
        .and_then(|t| t.country.as_deref())
        .or(record.odds.country.as_deref())
}

fn tip_league(record: &CombinedRecord) -> Option<&str> {
    record
        .tip
        .as_ref()
        .and_then(|t| t.league_name.as_deref())
        .or(record.odds.league.as_deref())
}

/// Build the 22-value feature vector for one record.
///
/// Missing probabilities default to 0.5, everything else to 0, so a
/// record with sparse odds still produces a full-width vector.
pub fn feature_vector(record: &CombinedRecord, encoders: &FeatureEncoders) -> Vec<f64> {
    let odds = &record.odds;
    let tip = record.tip.as_ref();

    let home_win_prob = implied_probability(odds.home_win).unwrap_or(0.5);
    let draw_prob = implied_probability(odds.draw).unwrap_or(0.5);
    let away_win_prob = implied_probability(odds.away_win).unwrap_or(0.5);

    let odds_ratio = match (odds.home_win, odds.away_win) {
        (Some(h), Some(a)) if a > 0.0 => h / a,
        _ => 0.0,
    };
    let favorite = match (odds.home_win, odds.away_win) {
        (Some(h), Some(a)) if h < a => 1.0,
        _ => 0.0,
    };

    // Tip probabilities arrive as percentages.
    let tip_home = tip.and_then(|t| t.prob_home).map(|p| p / 100.0);
    let tip_draw = tip.and_then(|t| t.prob_draw).map(|p| p / 100.0);
    let tip_away = tip.and_then(|t| t.prob_away).map(|p| p / 100.0);
    let prob_diff = match (tip_home, tip_away) {
        (Some(h), Some(a)) => h - a,
        _ => 0.0,
    };
    let prob_sum = match (tip_home, tip_draw, tip_away) {
        (Some(h), Some(d), Some(a)) => h + d + a,
        _ => 0.0,
    };

    let kelly = tip.and_then(|t| t.kelly).unwrap_or(0.0);
    let has_kelly_value = if kelly > 0.0 { 1.0 } else { 0.0 };
    let avg_goals = tip.and_then(|t| t.avg_goals).unwrap_or(0.0);
    let home_pred = tip.and_then(|t| t.home_pred_score).unwrap_or(0.0);
    let away_pred = tip.and_then(|t| t.away_pred_score).unwrap_or(0.0);

    vec![
        home_win_prob,
        draw_prob,
        away_win_prob,
        odds_ratio,
        favorite,
        tip_home.unwrap_or(0.5),
        tip_draw.unwrap_or(0.5),
        tip_away.unwrap_or(0.5),
        prob_diff,
        prob_sum,
        kelly,
        has_kelly_value,
        avg_goals,
        home_pred,
        away_pred,
        home_pred + away_pred,
        implied_probability(odds.btts_yes).unwrap_or(0.5),
        implied_probability(odds.total_over_1_5).unwrap_or(0.5),
        encoders.home_team.encode(Some(&odds.home_team)),
        encoders.away_team.encode(Some(&odds.away_team)),
        encoders.country.encode(tip_country(record)),
        encoders.league_name.encode(tip_league(record)),
    ]
}

/// Reject a saved column list that differs from this build's schema.
pub fn verify_schema(saved: &[String]) -> Result<()> {
    if saved.len() != FEATURE_COLUMNS.len()
        || saved.iter().zip(FEATURE_COLUMNS.iter()).any(|(s, c)| s != c)
    {
        return Err(PipelineError::SchemaMismatch {
            expected: FEATURE_COLUMNS.join(","),
            found: saved.join(","),
        });
    }
    Ok(())
}
