use super::features::{feature_vector, verify_schema, FeatureEncoders, LabelEncoder, FEATURE_COLUMNS};
use super::predictor::{value_flag, ModelHandle, ModelPolicy, ModelStore};
use super::trainer::{train_all, train_models, TrainTargets};
use crate::config::TrainerConfig;
use crate::error::PipelineError;
use crate::types::{CombinedRecord, MergedRecord, OddsRecord, ScoreLine, TipRecord};
use chrono::NaiveDate;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
}

/// A fully priced record; strong home sides get short home odds.
fn combined(i: usize, home_strong: bool) -> CombinedRecord {
    let (home_win, away_win) = if home_strong { (1.40, 6.0) } else { (5.5, 1.45) };
    CombinedRecord {
        odds: OddsRecord {
            home_team: format!("Home {}", i % 10),
            away_team: format!("Away {}", i % 10),
            league: Some("League".into()),
            country: Some("Country".into()),
            date: date(),
            kickoff: None,
            game_url: None,
            home_win: Some(home_win),
            draw: Some(4.0),
            away_win: Some(away_win),
            home_draw_no_bet: Some(1.20),
            away_draw_no_bet: Some(3.0),
            home_draw_odds: Some(1.15),
            away_draw_odds: Some(1.9),
            total_over_1_5: Some(1.35),
            total_under_3_5: Some(1.40),
            btts_yes: Some(1.85),
            btts_no: Some(1.85),
            home_team_over_0_5: Some(1.20),
            away_team_over_0_5: Some(1.50),
        },
        tip: Some(TipRecord {
            match_id: i as i64,
            home_team: format!("Home {}", i % 10),
            away_team: format!("Away {}", i % 10),
            country: Some("Country".into()),
            league_name: Some("League".into()),
            date: date(),
            prob_home: Some(if home_strong { 65.0 } else { 15.0 }),
            prob_draw: Some(20.0),
            prob_away: Some(if home_strong { 15.0 } else { 65.0 }),
            pred: None,
            home_pred_score: Some(if home_strong { 2.0 } else { 0.0 }),
            away_pred_score: Some(if home_strong { 0.0 } else { 2.0 }),
            avg_goals: Some(2.4),
            kelly: Some(0.05),
            preview_link: None,
            game_link: None,
        }),
        match_confidence: Some(100.0),
    }
}

/// Corpus where the favourite always wins 2-0.
fn corpus(n: usize) -> Vec<MergedRecord> {
    (0..n)
        .map(|i| {
            let home_strong = i % 2 == 0;
            let (home, away) = if home_strong { (2, 0) } else { (0, 2) };
            MergedRecord {
                combined: combined(i, home_strong),
                result: Some(ScoreLine {
                    home_goals: home,
                    away_goals: away,
                    home_ht: None,
                    away_ht: None,
                }),
            }
        })
        .collect()
}

#[test]
fn feature_vector_matches_schema_width() {
    let encoders = FeatureEncoders::fit(&[combined(0, true)]);
    let row = feature_vector(&combined(0, true), &encoders);
    assert_eq!(row.len(), FEATURE_COLUMNS.len());
    // Implied home probability for 1.40 odds.
    assert!((row[0] - 1.0 / 1.40).abs() < 1e-9);
    // favorite flag set: home odds shorter than away.
    assert_eq!(row[4], 1.0);
}

#[test]
fn label_encoder_falls_back_to_unknown() {
    let encoder = LabelEncoder::fit(["Arsenal", "Chelsea"]);
    let known = encoder.encode(Some("Arsenal"));
    let unseen = encoder.encode(Some("Real Madrid"));
    let missing = encoder.encode(None);
    assert_ne!(known, unseen);
    assert_eq!(unseen, missing);
    assert!(encoder.classes().contains(&"Unknown".to_string()));
}

#[test]
fn schema_check_rejects_renamed_columns() {
    let good: Vec<String> = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
    assert!(verify_schema(&good).is_ok());

    let mut bad = good.clone();
    bad[3] = "renamed".into();
    assert!(matches!(
        verify_schema(&bad),
        Err(PipelineError::SchemaMismatch { .. })
    ));
    assert!(matches!(
        verify_schema(&good[..10]),
        Err(PipelineError::SchemaMismatch { .. })
    ));
}

#[test]
fn too_few_labeled_samples_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = train_all(&corpus(10), &TrainerConfig::default(), dir.path()).unwrap_err();
    match err {
        PipelineError::InsufficientData { required, available } => {
            assert_eq!(required, 50);
            assert_eq!(available, 10);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unlabeled_rows_do_not_count_toward_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let mut merged = corpus(30);
    merged.extend((30..80).map(|i| MergedRecord {
        combined: combined(i, true),
        result: None,
    }));
    let err = train_all(&merged, &TrainerConfig::default(), dir.path()).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData { available: 30, .. }));
}

#[test]
fn train_persist_load_predict_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrainerConfig {
        num_rounds: 40,
        ..TrainerConfig::default()
    };
    let report = train_all(&corpus(80), &config, dir.path()).unwrap();
    assert_eq!(report.labeled_samples, 80);
    assert!(report.skipped_markets.is_empty());
    // The corpus is perfectly separable by the odds features.
    let accuracy = report.outcome_accuracy.unwrap();
    assert!(accuracy > 0.8, "got {accuracy}");

    let handle = ModelHandle::load(dir.path()).unwrap();
    let predicted = handle.predict_all(&[combined(500, true)]);
    assert_eq!(predicted.len(), 1);
    let ml = &predicted[0].ml;
    let outcome = ml.outcome.as_ref().unwrap();
    assert!(outcome.prob_home > outcome.prob_away);
    let sum = outcome.prob_home + outcome.prob_draw + outcome.prob_away;
    assert!((sum - 1.0).abs() < 1e-9);
    assert!(ml.total_goals.is_some());
    assert_eq!(ml.markets.len(), crate::types::Market::ALL.len());
    // Every market was priced, so every score carries a value flag.
    assert!(ml.markets.iter().all(|m| m.value.is_some()));
}

#[test]
fn unpriced_market_gets_no_value_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrainerConfig {
        num_rounds: 20,
        ..TrainerConfig::default()
    };
    train_all(&corpus(60), &config, dir.path()).unwrap();
    let handle = ModelHandle::load(dir.path()).unwrap();

    let mut record = combined(1, true);
    record.odds.btts_yes = None;
    record.odds.draw = None;
    let scores = handle.predict(&record);
    let btts = scores
        .markets
        .iter()
        .find(|m| m.market == crate::types::Market::Btts)
        .unwrap();
    assert_eq!(btts.value, None);
    assert_eq!(scores.outcome.as_ref().unwrap().draw_value, None);
    assert!(scores.outcome.as_ref().unwrap().home_value.is_some());
}

#[test]
fn value_flag_requires_beating_the_implied_probability() {
    // Implied probability at decimal odds 2.0 is exactly 0.5.
    assert_eq!(value_flag(0.55, Some(2.0)), Some(true));
    assert_eq!(value_flag(0.50, Some(2.0)), Some(false));
    assert_eq!(value_flag(0.45, Some(2.0)), Some(false));
    assert_eq!(value_flag(0.99, None), None);
}

#[test]
fn retraining_one_family_keeps_the_saved_encoders() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrainerConfig {
        num_rounds: 20,
        ..TrainerConfig::default()
    };
    train_all(&corpus(60), &config, dir.path()).unwrap();
    let encoders_before = std::fs::read(dir.path().join("encoders.json")).unwrap();
    let outcome_before = std::fs::read(dir.path().join("outcome_model.json")).unwrap();

    // Same fixtures under new team names; a full refit would re-encode
    // every category and strand the untouched outcome model.
    let mut renamed = corpus(60);
    for record in &mut renamed {
        record.combined.odds.home_team = format!("Renamed {}", record.combined.odds.home_team);
        record.combined.odds.away_team = format!("Renamed {}", record.combined.odds.away_team);
    }
    train_models(&renamed, &config, dir.path(), TrainTargets::Goals).unwrap();

    let encoders_after = std::fs::read(dir.path().join("encoders.json")).unwrap();
    let outcome_after = std::fs::read(dir.path().join("outcome_model.json")).unwrap();
    assert_eq!(encoders_before, encoders_after);
    assert_eq!(outcome_before, outcome_after);
    ModelHandle::load(dir.path()).unwrap();
}

#[test]
fn use_saved_policy_fails_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path().join("models"), TrainerConfig::default());
    let err = store
        .ensure(dir.path(), ModelPolicy::UseSaved)
        .unwrap_err();
    assert!(matches!(err, PipelineError::ModelNotTrained(_)));
}

#[test]
fn train_if_missing_policy_trains_from_history() {
    let dir = tempfile::tempdir().unwrap();
    crate::storage::write_stage(dir.path(), crate::storage::Stage::Merged, date(), &corpus(60))
        .unwrap();
    let config = TrainerConfig {
        num_rounds: 20,
        ..TrainerConfig::default()
    };
    let store = ModelStore::new(dir.path().join("models"), config);
    let handle = store.ensure(dir.path(), ModelPolicy::TrainIfMissing).unwrap();
    let predicted = handle.predict_all(&[combined(3, false)]);
    assert!(predicted[0].ml.outcome.is_some());
}
