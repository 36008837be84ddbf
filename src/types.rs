//! Core record types shared across pipeline stages
//!
//! Wire field names match the JSON the scrapers have always produced
//! (`total_over_1.5`, `BTTS_yes`, `home_correct_score`, ...), so stage
//! files stay readable by the existing tooling around them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bookmaker's priced probability: 1 / decimal odds.
///
/// Returns None for absent, zero, or non-finite odds so a missing market
/// never turns into a bogus probability downstream.
pub fn implied_probability(odds: Option<f64>) -> Option<f64> {
    match odds {
        Some(o) if o.is_finite() && o > 0.0 => Some(1.0 / o),
        _ => None,
    }
}

/// One match scraped from the bookmaker, with per-market decimal odds.
///
/// Immutable once scraped for a given date. Odds are Option because the
/// site frequently shows " - " for suspended or unpriced markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRecord {
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickoff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_url: Option<String>,

    // 1X2
    #[serde(default)]
    pub home_win: Option<f64>,
    #[serde(default)]
    pub draw: Option<f64>,
    #[serde(default)]
    pub away_win: Option<f64>,

    // Draw no bet
    #[serde(default)]
    pub home_draw_no_bet: Option<f64>,
    #[serde(default)]
    pub away_draw_no_bet: Option<f64>,

    // Double chance
    #[serde(default)]
    pub home_draw_odds: Option<f64>,
    #[serde(default)]
    pub away_draw_odds: Option<f64>,

    // Totals
    #[serde(rename = "total_over_1.5", default)]
    pub total_over_1_5: Option<f64>,
    #[serde(rename = "total_under_3.5", default)]
    pub total_under_3_5: Option<f64>,

    // Both teams to score
    #[serde(rename = "BTTS_yes", default)]
    pub btts_yes: Option<f64>,
    #[serde(rename = "BTTS_no", default)]
    pub btts_no: Option<f64>,

    // Team totals
    #[serde(rename = "home_team_over_0.5", default)]
    pub home_team_over_0_5: Option<f64>,
    #[serde(rename = "away_team_over_0.5", default)]
    pub away_team_over_0_5: Option<f64>,
}

/// One match prediction scraped from the tipping site.
///
/// Probabilities arrive as whole percentages (0-100). Immutable once
/// scraped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipRecord {
    pub match_id: i64,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_name: Option<String>,
    pub date: NaiveDate,
    #[serde(rename = "prob_1", default)]
    pub prob_home: Option<f64>,
    #[serde(rename = "prob_x", default)]
    pub prob_draw: Option<f64>,
    #[serde(rename = "prob_2", default)]
    pub prob_away: Option<f64>,
    /// Predicted outcome: "1", "X" or "2".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pred: Option<String>,
    #[serde(default)]
    pub home_pred_score: Option<f64>,
    #[serde(default)]
    pub away_pred_score: Option<f64>,
    #[serde(default)]
    pub avg_goals: Option<f64>,
    #[serde(default)]
    pub kelly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_link: Option<String>,
}

/// Final score appended once a match has concluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreLine {
    #[serde(rename = "home_correct_score")]
    pub home_goals: u32,
    #[serde(rename = "away_correct_score")]
    pub away_goals: u32,
    #[serde(rename = "home_ht_score", default, skip_serializing_if = "Option::is_none")]
    pub home_ht: Option<u32>,
    #[serde(rename = "away_ht_score", default, skip_serializing_if = "Option::is_none")]
    pub away_ht: Option<u32>,
}

impl ScoreLine {
    pub fn total_goals(&self) -> u32 {
        self.home_goals + self.away_goals
    }
}

/// Scraped result row, keyed by the tipping site's match id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub match_id: i64,
    pub home_team: String,
    pub away_team: String,
    #[serde(flatten)]
    pub score: ScoreLine,
}

/// Odds record joined to its best-matching tip by the fuzzy matcher.
///
/// `tip` is None when no tip cleared the similarity threshold; such
/// records still flow through selection and prediction with tip-derived
/// fields defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    #[serde(flatten)]
    pub odds: OddsRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<TipRecord>,
    /// Average home/away team-name similarity (0-100) for the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_confidence: Option<f64>,
}

impl CombinedRecord {
    pub fn match_id(&self) -> Option<i64> {
        self.tip.as_ref().map(|t| t.match_id)
    }
}

/// CombinedRecord plus the actual result; one training sample.
///
/// Every field of the source CombinedRecord is carried unaltered;
/// `result` stays None until the match has been played and scraped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    #[serde(flatten)]
    pub combined: CombinedRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreLine>,
}

impl MergedRecord {
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }
}

/// Binary betting markets the models are trained on.
///
/// Each variant carries a fixed odds accessor and label rule so a market
/// can never be paired with the wrong column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "home_dnb")]
    HomeDnb,
    #[serde(rename = "away_dnb")]
    AwayDnb,
    #[serde(rename = "over_15")]
    Over15,
    #[serde(rename = "under_35")]
    Under35,
    #[serde(rename = "btts")]
    Btts,
    #[serde(rename = "home_over_05")]
    HomeOver05,
    #[serde(rename = "away_over_05")]
    AwayOver05,
}

impl Market {
    pub const ALL: [Market; 7] = [
        Market::HomeDnb,
        Market::AwayDnb,
        Market::Over15,
        Market::Under35,
        Market::Btts,
        Market::HomeOver05,
        Market::AwayOver05,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::HomeDnb => "home_dnb",
            Market::AwayDnb => "away_dnb",
            Market::Over15 => "over_15",
            Market::Under35 => "under_35",
            Market::Btts => "btts",
            Market::HomeOver05 => "home_over_05",
            Market::AwayOver05 => "away_over_05",
        }
    }

    /// The bookmaker odds column this market is priced from.
    pub fn odds(&self, odds: &OddsRecord) -> Option<f64> {
        match self {
            Market::HomeDnb => odds.home_draw_no_bet,
            Market::AwayDnb => odds.away_draw_no_bet,
            Market::Over15 => odds.total_over_1_5,
            Market::Under35 => odds.total_under_3_5,
            Market::Btts => odds.btts_yes,
            Market::HomeOver05 => odds.home_team_over_0_5,
            Market::AwayOver05 => odds.away_team_over_0_5,
        }
    }

    /// Training label (1.0 win / 0.0 loss) from the final score.
    pub fn label(&self, score: &ScoreLine) -> f64 {
        let won = match self {
            Market::HomeDnb => score.home_goals >= score.away_goals,
            Market::AwayDnb => score.away_goals >= score.home_goals,
            Market::Over15 => score.total_goals() >= 2,
            Market::Under35 => score.total_goals() <= 3,
            Market::Btts => score.home_goals > 0 && score.away_goals > 0,
            Market::HomeOver05 => score.home_goals >= 1,
            Market::AwayOver05 => score.away_goals >= 1,
        };
        if won {
            1.0
        } else {
            0.0
        }
    }
}

/// Classes of the 1X2 outcome model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeClass {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

impl OutcomeClass {
    pub const ALL: [OutcomeClass; 3] = [OutcomeClass::Home, OutcomeClass::Draw, OutcomeClass::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeClass::Home => "1",
            OutcomeClass::Draw => "X",
            OutcomeClass::Away => "2",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            OutcomeClass::Home => 0,
            OutcomeClass::Draw => 1,
            OutcomeClass::Away => 2,
        }
    }

    /// Each class has its own 1X2 price.
    pub fn odds(&self, odds: &OddsRecord) -> Option<f64> {
        match self {
            OutcomeClass::Home => odds.home_win,
            OutcomeClass::Draw => odds.draw,
            OutcomeClass::Away => odds.away_win,
        }
    }

    pub fn from_score(score: &ScoreLine) -> OutcomeClass {
        use std::cmp::Ordering;
        match score.home_goals.cmp(&score.away_goals) {
            Ordering::Greater => OutcomeClass::Home,
            Ordering::Equal => OutcomeClass::Draw,
            Ordering::Less => OutcomeClass::Away,
        }
    }
}

/// Rule-based bet eligibility per market; recomputed each run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSelection {
    pub home_over_bet: bool,
    pub away_over_bet: bool,
    pub home_draw_bet: bool,
    pub away_draw_bet: bool,
    pub over_1_5_bet: bool,
}

impl MarketSelection {
    pub fn any(&self) -> bool {
        self.home_over_bet
            || self.away_over_bet
            || self.home_draw_bet
            || self.away_draw_bet
            || self.over_1_5_bet
    }

    /// The bet kinds this selection makes eligible, in placement order.
    pub fn bets(&self) -> Vec<BetKind> {
        let mut kinds = Vec::new();
        if self.home_over_bet {
            kinds.push(BetKind::HomeOver05);
        }
        if self.away_over_bet {
            kinds.push(BetKind::AwayOver05);
        }
        if self.home_draw_bet {
            kinds.push(BetKind::HomeDraw);
        }
        if self.away_draw_bet {
            kinds.push(BetKind::AwayDraw);
        }
        if self.over_1_5_bet {
            kinds.push(BetKind::Over15);
        }
        kinds
    }
}

/// CombinedRecord annotated with selector flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRecord {
    #[serde(flatten)]
    pub combined: CombinedRecord,
    #[serde(flatten)]
    pub selection: MarketSelection,
}

/// Model score for one binary market.
///
/// `value` stays None (and off the wire) when the market had no odds,
/// so an absent price is distinguishable from "no value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketScore {
    pub market: Market,
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

/// Outcome-model scores with per-class value flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeScore {
    pub prob_home: f64,
    pub prob_draw: f64,
    pub prob_away: f64,
    pub pred: OutcomeClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_value: Option<bool>,
}

/// All model output for one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_goals: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markets: Vec<MarketScore>,
}

/// CombinedRecord annotated with model scores and value flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedRecord {
    #[serde(flatten)]
    pub combined: CombinedRecord,
    pub ml: MlScores,
}

/// Bet types the automator places and the settlement step resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetKind {
    #[serde(rename = "home_over_05")]
    HomeOver05,
    #[serde(rename = "away_over_05")]
    AwayOver05,
    #[serde(rename = "home_draw")]
    HomeDraw,
    #[serde(rename = "away_draw")]
    AwayDraw,
    #[serde(rename = "over_1_5")]
    Over15,
}

impl BetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetKind::HomeOver05 => "home_over_05",
            BetKind::AwayOver05 => "away_over_05",
            BetKind::HomeDraw => "home_draw",
            BetKind::AwayDraw => "away_draw",
            BetKind::Over15 => "over_1_5",
        }
    }

    pub fn odds(&self, odds: &OddsRecord) -> Option<f64> {
        match self {
            BetKind::HomeOver05 => odds.home_team_over_0_5,
            BetKind::AwayOver05 => odds.away_team_over_0_5,
            BetKind::HomeDraw => odds.home_draw_odds,
            BetKind::AwayDraw => odds.away_draw_odds,
            BetKind::Over15 => odds.total_over_1_5,
        }
    }

    /// Won/lost from the final score.
    pub fn settle(&self, score: &ScoreLine) -> SettlementStatus {
        let won = match self {
            BetKind::HomeOver05 => score.home_goals >= 1,
            BetKind::AwayOver05 => score.away_goals >= 1,
            BetKind::HomeDraw => score.home_goals >= score.away_goals,
            BetKind::AwayDraw => score.away_goals >= score.home_goals,
            BetKind::Over15 => score.total_goals() >= 2,
        };
        if won {
            SettlementStatus::Won
        } else {
            SettlementStatus::Lost
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Placed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Won,
    Lost,
    Void,
}

/// A placed (or attempted) bet, later enriched with its settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
    pub home_team: String,
    pub away_team: String,
    pub bet_type: BetKind,
    pub odds: f64,
    pub stake: Decimal,
    pub status: BetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub settlement_status: SettlementStatus,
}
