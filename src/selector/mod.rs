//! Rule-based market selection
//!
//! A fixed rule table over one CombinedRecord: each market needs its
//! odds at or above the configured cutoff AND its prediction condition.
//! Missing odds or tip fields simply fail the condition; selection never
//! errors. Same record + same thresholds always yields the same flags.

use crate::config::SelectorConfig;
use crate::types::{CombinedRecord, MarketSelection, SelectedRecord};
use tracing::info;

/// Evaluate the rule table for one match.
pub fn evaluate(record: &CombinedRecord, config: &SelectorConfig) -> MarketSelection {
    let odds = &record.odds;
    let tip = record.tip.as_ref();

    // Absent values behave as zero, which fails every condition.
    let num = |v: Option<f64>| v.unwrap_or(0.0);
    let home_pred = num(tip.and_then(|t| t.home_pred_score));
    let away_pred = num(tip.and_then(|t| t.away_pred_score));
    let avg_goals = num(tip.and_then(|t| t.avg_goals));
    let prob_home = num(tip.and_then(|t| t.prob_home));
    let prob_draw = num(tip.and_then(|t| t.prob_draw));
    let prob_away = num(tip.and_then(|t| t.prob_away));

    // Tip probabilities are percentages; the config threshold is 0-1.
    let double_chance_min = config.double_chance_min_prob * 100.0;

    MarketSelection {
        home_over_bet: num(odds.home_team_over_0_5) >= config.home_over_min_odds
            && home_pred >= 1.0
            && home_pred >= away_pred,
        away_over_bet: num(odds.away_team_over_0_5) >= config.away_over_min_odds
            && away_pred >= 2.0
            && away_pred >= home_pred,
        home_draw_bet: num(odds.home_draw_odds) >= config.home_draw_min_odds
            && home_pred >= away_pred
            && prob_home + prob_draw > double_chance_min,
        away_draw_bet: num(odds.away_draw_odds) >= config.away_draw_min_odds
            && away_pred >= home_pred
            && prob_away + prob_draw > double_chance_min,
        over_1_5_bet: num(odds.total_over_1_5) >= config.over_15_min_odds
            && home_pred + away_pred >= 2.0
            && avg_goals > 2.0,
    }
}

/// Flag every record and log the per-market summary.
pub fn select_markets(records: &[CombinedRecord], config: &SelectorConfig) -> Vec<SelectedRecord> {
    let selected: Vec<SelectedRecord> = records
        .iter()
        .map(|record| SelectedRecord {
            combined: record.clone(),
            selection: evaluate(record, config),
        })
        .collect();

    let total = selected.len();
    let pct = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 / total as f64 * 100.0
        }
    };
    let count = |f: fn(&MarketSelection) -> bool| selected.iter().filter(|s| f(&s.selection)).count();
    let home_over = count(|s| s.home_over_bet);
    let away_over = count(|s| s.away_over_bet);
    let home_draw = count(|s| s.home_draw_bet);
    let away_draw = count(|s| s.away_draw_bet);
    let over_15 = count(|s| s.over_1_5_bet);
    info!(total, "market selection complete");
    info!("  home_over_05: {home_over} ({:.2}%)", pct(home_over));
    info!("  away_over_05: {away_over} ({:.2}%)", pct(away_over));
    info!("  home_draw:    {home_draw} ({:.2}%)", pct(home_draw));
    info!("  away_draw:    {away_draw} ({:.2}%)", pct(away_draw));
    info!("  over_1_5:     {over_15} ({:.2}%)", pct(over_15));
    selected
}
