//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::NaiveDate;

    fn score(home: u32, away: u32) -> ScoreLine {
        ScoreLine {
            home_goals: home,
            away_goals: away,
            home_ht: None,
            away_ht: None,
        }
    }

    fn bare_odds() -> OddsRecord {
        OddsRecord {
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            league: None,
            country: None,
            date: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            kickoff: None,
            game_url: None,
            home_win: Some(1.80),
            draw: Some(3.50),
            away_win: Some(4.20),
            home_draw_no_bet: Some(1.30),
            away_draw_no_bet: None,
            home_draw_odds: Some(1.18),
            away_draw_odds: None,
            total_over_1_5: Some(1.28),
            total_under_3_5: Some(1.45),
            btts_yes: Some(1.75),
            btts_no: None,
            home_team_over_0_5: Some(1.12),
            away_team_over_0_5: Some(1.40),
        }
    }

    #[test]
    fn test_implied_probability_handles_bad_odds() {
        assert_eq!(implied_probability(Some(2.0)), Some(0.5));
        assert_eq!(implied_probability(None), None);
        assert_eq!(implied_probability(Some(0.0)), None);
        assert_eq!(implied_probability(Some(f64::NAN)), None);
        assert_eq!(implied_probability(Some(f64::INFINITY)), None);
    }

    #[test]
    fn test_odds_record_uses_dotted_wire_names() {
        let json = serde_json::to_value(bare_odds()).unwrap();
        assert_eq!(json["total_over_1.5"], 1.28);
        assert_eq!(json["total_under_3.5"], 1.45);
        assert_eq!(json["BTTS_yes"], 1.75);
        assert_eq!(json["home_team_over_0.5"], 1.12);
        assert!(json.get("total_over_1_5").is_none());

        let back: OddsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, bare_odds());
    }

    #[test]
    fn test_odds_record_tolerates_missing_markets() {
        let record: OddsRecord = serde_json::from_str(
            r#"{"home_team":"A","away_team":"B","date":"2026-08-30"}"#,
        )
        .unwrap();
        assert_eq!(record.home_win, None);
        assert_eq!(record.total_over_1_5, None);
    }

    #[test]
    fn test_tip_record_probability_wire_names() {
        let tip: TipRecord = serde_json::from_str(
            r#"{
                "match_id": 42,
                "home_team": "Arsenal",
                "away_team": "Chelsea",
                "date": "2026-08-30",
                "prob_1": 55.0,
                "prob_x": 25.0,
                "prob_2": 20.0,
                "pred": "1"
            }"#,
        )
        .unwrap();
        assert_eq!(tip.prob_home, Some(55.0));
        assert_eq!(tip.prob_draw, Some(25.0));
        assert_eq!(tip.prob_away, Some(20.0));
        let json = serde_json::to_value(&tip).unwrap();
        assert_eq!(json["prob_1"], 55.0);
    }

    #[test]
    fn test_score_line_wire_names_and_total() {
        let entry: ResultEntry = serde_json::from_str(
            r#"{
                "match_id": 42,
                "home_team": "Arsenal",
                "away_team": "Chelsea",
                "home_correct_score": 2,
                "away_correct_score": 1,
                "home_ht_score": 1,
                "away_ht_score": 0
            }"#,
        )
        .unwrap();
        assert_eq!(entry.score.home_goals, 2);
        assert_eq!(entry.score.away_goals, 1);
        assert_eq!(entry.score.home_ht, Some(1));
        assert_eq!(entry.score.total_goals(), 3);
    }

    #[test]
    fn test_combined_record_flattens_odds_fields() {
        let combined = CombinedRecord {
            odds: bare_odds(),
            tip: None,
            match_confidence: None,
        };
        let json = serde_json::to_value(&combined).unwrap();
        assert_eq!(json["home_team"], "Arsenal");
        assert!(json.get("tip").is_none());
        assert!(json.get("match_confidence").is_none());
        assert_eq!(combined.match_id(), None);
    }

    #[test]
    fn test_market_odds_accessor_matches_column() {
        let odds = bare_odds();
        assert_eq!(Market::HomeDnb.odds(&odds), Some(1.30));
        assert_eq!(Market::AwayDnb.odds(&odds), None);
        assert_eq!(Market::Over15.odds(&odds), Some(1.28));
        assert_eq!(Market::Btts.odds(&odds), Some(1.75));
        assert_eq!(Market::AwayOver05.odds(&odds), Some(1.40));
    }

    #[test]
    fn test_market_labels_from_score() {
        let s = score(2, 1);
        assert_eq!(Market::HomeDnb.label(&s), 1.0);
        assert_eq!(Market::AwayDnb.label(&s), 0.0);
        assert_eq!(Market::Over15.label(&s), 1.0);
        assert_eq!(Market::Under35.label(&s), 1.0);
        assert_eq!(Market::Btts.label(&s), 1.0);

        let blank = score(0, 0);
        assert_eq!(Market::HomeDnb.label(&blank), 1.0);
        assert_eq!(Market::AwayDnb.label(&blank), 1.0);
        assert_eq!(Market::Over15.label(&blank), 0.0);
        assert_eq!(Market::HomeOver05.label(&blank), 0.0);
        assert_eq!(Market::Btts.label(&blank), 0.0);

        assert_eq!(Market::Under35.label(&score(2, 2)), 0.0);
    }

    #[test]
    fn test_outcome_class_from_score() {
        assert_eq!(OutcomeClass::from_score(&score(3, 0)), OutcomeClass::Home);
        assert_eq!(OutcomeClass::from_score(&score(1, 1)), OutcomeClass::Draw);
        assert_eq!(OutcomeClass::from_score(&score(0, 2)), OutcomeClass::Away);
    }

    #[test]
    fn test_selection_bets_in_placement_order() {
        let selection = MarketSelection {
            home_over_bet: true,
            away_over_bet: false,
            home_draw_bet: true,
            away_draw_bet: false,
            over_1_5_bet: true,
        };
        assert!(selection.any());
        assert_eq!(
            selection.bets(),
            vec![BetKind::HomeOver05, BetKind::HomeDraw, BetKind::Over15]
        );
        assert!(!MarketSelection::default().any());
        assert!(MarketSelection::default().bets().is_empty());
    }

    #[test]
    fn test_bet_kind_settlement_rules() {
        assert_eq!(BetKind::HomeOver05.settle(&score(1, 3)), SettlementStatus::Won);
        assert_eq!(BetKind::HomeOver05.settle(&score(0, 2)), SettlementStatus::Lost);
        assert_eq!(BetKind::HomeDraw.settle(&score(1, 1)), SettlementStatus::Won);
        assert_eq!(BetKind::HomeDraw.settle(&score(0, 1)), SettlementStatus::Lost);
        assert_eq!(BetKind::AwayDraw.settle(&score(0, 1)), SettlementStatus::Won);
        assert_eq!(BetKind::Over15.settle(&score(1, 1)), SettlementStatus::Won);
        assert_eq!(BetKind::Over15.settle(&score(1, 0)), SettlementStatus::Lost);
    }

    #[test]
    fn test_statuses_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&BetStatus::Placed).unwrap(), "\"placed\"");
        assert_eq!(
            serde_json::to_string(&SettlementStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&BetKind::Over15).unwrap(), "\"over_1_5\"");
        assert_eq!(serde_json::to_string(&Market::HomeDnb).unwrap(), "\"home_dnb\"");
        assert_eq!(serde_json::to_string(&OutcomeClass::Draw).unwrap(), "\"X\"");
    }
}
