//! Result merging
//!
//! Joins a day's combined records with the scraped final scores by the
//! tipping site's match id, producing the labeled rows the trainer
//! accumulates. Records without a tip (no id to join on) or without a
//! finished result keep `result: null` and are still written out; the
//! trainer filters them later.

use crate::types::{CombinedRecord, MergedRecord, ResultEntry};
use std::collections::HashMap;
use tracing::info;

pub fn merge_results(combined: Vec<CombinedRecord>, results: Vec<ResultEntry>) -> Vec<MergedRecord> {
    let by_id: HashMap<i64, &ResultEntry> = results.iter().map(|r| (r.match_id, r)).collect();

    let merged: Vec<MergedRecord> = combined
        .into_iter()
        .map(|record| {
            let result = record
                .match_id()
                .and_then(|id| by_id.get(&id))
                .map(|entry| entry.score);
            MergedRecord {
                combined: record,
                result,
            }
        })
        .collect();

    let labeled = merged.iter().filter(|m| m.has_result()).count();
    info!(
        total = merged.len(),
        labeled,
        unlabeled = merged.len() - labeled,
        "merged results into combined records"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OddsRecord, ScoreLine, TipRecord};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn combined(home: &str, match_id: Option<i64>) -> CombinedRecord {
        CombinedRecord {
            odds: OddsRecord {
                home_team: home.into(),
                away_team: "Away".into(),
                league: None,
                country: None,
                date: date(),
                kickoff: None,
                game_url: None,
                home_win: Some(1.5),
                draw: None,
                away_win: None,
                home_draw_no_bet: None,
                away_draw_no_bet: None,
                home_draw_odds: None,
                away_draw_odds: None,
                total_over_1_5: None,
                total_under_3_5: None,
                btts_yes: None,
                btts_no: None,
                home_team_over_0_5: None,
                away_team_over_0_5: None,
            },
            tip: match_id.map(|id| TipRecord {
                match_id: id,
                home_team: home.into(),
                away_team: "Away".into(),
                country: None,
                league_name: None,
                date: date(),
                prob_home: Some(50.0),
                prob_draw: Some(30.0),
                prob_away: Some(20.0),
                pred: None,
                home_pred_score: None,
                away_pred_score: None,
                avg_goals: None,
                kelly: None,
                preview_link: None,
                game_link: None,
            }),
            match_confidence: match_id.map(|_| 95.0),
        }
    }

    fn result(match_id: i64, home: u32, away: u32) -> ResultEntry {
        ResultEntry {
            match_id,
            home_team: "H".into(),
            away_team: "A".into(),
            score: ScoreLine {
                home_goals: home,
                away_goals: away,
                home_ht: None,
                away_ht: None,
            },
        }
    }

    #[test]
    fn joins_by_tip_match_id() {
        let merged = merge_results(
            vec![combined("A", Some(10)), combined("B", Some(11))],
            vec![result(11, 3, 1)],
        );
        assert!(merged[0].result.is_none());
        let score = merged[1].result.unwrap();
        assert_eq!((score.home_goals, score.away_goals), (3, 1));
    }

    #[test]
    fn tipless_records_stay_unlabeled() {
        let merged = merge_results(vec![combined("A", None)], vec![result(10, 1, 0)]);
        assert_eq!(merged.len(), 1);
        assert!(!merged[0].has_result());
    }

    #[test]
    fn source_fields_survive_the_merge() {
        let source = combined("Arsenal", Some(10));
        let merged = merge_results(vec![source.clone()], vec![result(10, 2, 2)]);
        assert_eq!(merged[0].combined, source);
    }
}
