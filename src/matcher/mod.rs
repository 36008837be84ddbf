//! Fuzzy team-name matching between the two sites
//!
//! The bookmaker and the tipping site spell team names differently
//! ("Man United" vs "Manchester United FC"), so odds and tips are
//! joined by similarity rather than by key. A pair matches only when
//! BOTH team names clear the threshold; the pair's confidence is the
//! average of the two scores.

use crate::types::{CombinedRecord, OddsRecord, TipRecord};
use strsim::{jaro_winkler, normalized_levenshtein};
use tracing::{debug, info};

/// Club-name suffixes both sites append inconsistently.
const TEAM_SUFFIXES: &[&str] = &[
    " FC", " FC.", " F.C.", " AFC", " A.F.C.", " CF", " C.F.", " CD", " C.D.", " UD", " U.D.",
    " SD", " S.D.", " AC", " A.C.", " AS", " A.S.", " SC", " S.C.", " SV", " VfB", " VfL", " FK",
    " NK", " SK",
];

/// Strip one trailing club suffix and surrounding whitespace.
pub fn normalize_team_name(name: &str) -> String {
    let mut normalized = name.trim();
    for suffix in TEAM_SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim_end();
            break;
        }
    }
    normalized.to_string()
}

/// Similarity of two team names on a 0-100 scale.
///
/// Exact (case-insensitive) and normalized-exact names short-circuit to
/// 100. Otherwise the score is the best of edit-distance similarity,
/// token-sorted similarity (handles "United Manchester" word order) and
/// Jaro-Winkler (forgiving of truncations like "Wolverhampton"/"Wolves"
/// prefixes).
pub fn team_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.trim().to_lowercase();
    let b_lower = b.trim().to_lowercase();
    if a_lower == b_lower {
        return 100.0;
    }
    if normalize_team_name(a).to_lowercase() == normalize_team_name(b).to_lowercase() {
        return 100.0;
    }

    let edit = normalized_levenshtein(&a_lower, &b_lower);
    let token_sort = normalized_levenshtein(&sort_tokens(&a_lower), &sort_tokens(&b_lower));
    let jw = jaro_winkler(&a_lower, &b_lower);
    edit.max(token_sort).max(jw) * 100.0
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Score a fixture pair. Some only when both team names clear the
/// threshold; the value is the average of the two scores.
fn pair_score(odds: &OddsRecord, tip: &TipRecord, threshold: f64) -> Option<f64> {
    let home = team_similarity(&odds.home_team, &tip.home_team);
    if home < threshold {
        return None;
    }
    let away = team_similarity(&odds.away_team, &tip.away_team);
    if away < threshold {
        return None;
    }
    Some((home + away) / 2.0)
}

/// Join odds to tips by team-name similarity.
///
/// Greedy one-to-one assignment: all clearing pairs are ranked by score
/// (ties broken by input order) and consumed best-first, so a tip can
/// never be attached to two fixtures. Odds without a surviving tip are
/// kept with `tip: None`; tips without a fixture are dropped. Output
/// preserves the odds input order.
pub fn match_day(
    odds: Vec<OddsRecord>,
    tips: Vec<TipRecord>,
    threshold: f64,
) -> Vec<CombinedRecord> {
    // (score, odds index, tip index) for every pair above threshold.
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for (oi, odds_record) in odds.iter().enumerate() {
        for (ti, tip) in tips.iter().enumerate() {
            if let Some(score) = pair_score(odds_record, tip, threshold) {
                candidates.push((score, oi, ti));
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut tip_for_odds: Vec<Option<(usize, f64)>> = vec![None; odds.len()];
    let mut tip_taken = vec![false; tips.len()];
    for (score, oi, ti) in candidates {
        if tip_for_odds[oi].is_some() || tip_taken[ti] {
            continue;
        }
        tip_for_odds[oi] = Some((ti, score));
        tip_taken[ti] = true;
        debug!(
            home = %odds[oi].home_team,
            tip_home = %tips[ti].home_team,
            score = format!("{score:.1}"),
            "matched fixture"
        );
    }

    let total = odds.len();
    let tip_count = tips.len();
    let mut tips: Vec<Option<TipRecord>> = tips.into_iter().map(Some).collect();
    let combined: Vec<CombinedRecord> = odds
        .into_iter()
        .enumerate()
        .map(|(oi, odds_record)| match tip_for_odds[oi] {
            Some((ti, score)) => CombinedRecord {
                odds: odds_record,
                tip: tips[ti].take(),
                match_confidence: Some(score),
            },
            None => CombinedRecord {
                odds: odds_record,
                tip: None,
                match_confidence: None,
            },
        })
        .collect();

    let matched = combined.iter().filter(|c| c.tip.is_some()).count();
    info!(
        matched,
        unmatched = total - matched,
        tips_unused = tip_count - matched,
        "fixture matching complete"
    );
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn odds(home: &str, away: &str) -> OddsRecord {
        OddsRecord {
            home_team: home.into(),
            away_team: away.into(),
            league: None,
            country: None,
            date: date(),
            kickoff: None,
            game_url: None,
            home_win: None,
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
        }
    }

    fn tip(id: i64, home: &str, away: &str) -> TipRecord {
        TipRecord {
            match_id: id,
            home_team: home.into(),
            away_team: away.into(),
            country: None,
            league_name: None,
            date: date(),
            prob_home: None,
            prob_draw: None,
            prob_away: None,
            pred: None,
            home_pred_score: None,
            away_pred_score: None,
            avg_goals: None,
            kelly: None,
            preview_link: None,
            game_link: None,
        }
    }

    #[test]
    fn normalize_strips_club_suffixes() {
        assert_eq!(normalize_team_name("Arsenal FC"), "Arsenal");
        assert_eq!(normalize_team_name("Sunderland A.F.C."), "Sunderland");
        assert_eq!(normalize_team_name("Hamburger SV"), "Hamburger");
        assert_eq!(normalize_team_name("Barcelona"), "Barcelona");
    }

    #[test]
    fn identical_and_suffixed_names_score_100() {
        assert_eq!(team_similarity("Arsenal", "arsenal"), 100.0);
        assert_eq!(team_similarity("Arsenal FC", "Arsenal"), 100.0);
    }

    #[test]
    fn word_order_is_forgiven() {
        let score = team_similarity("United Manchester", "Manchester United");
        assert!(score > 95.0, "got {score}");
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(team_similarity("Arsenal", "Real Madrid") < 60.0);
    }

    #[test]
    fn both_teams_must_clear_threshold() {
        let combined = match_day(
            vec![odds("Arsenal", "Chelsea")],
            vec![tip(1, "Arsenal FC", "Liverpool")],
            85.0,
        );
        assert_eq!(combined.len(), 1);
        assert!(combined[0].tip.is_none());
        assert!(combined[0].match_confidence.is_none());
    }

    #[test]
    fn greedy_assignment_prefers_higher_score() {
        // Both fixtures clear the bar against tip 1; the exact-name pair
        // must win it and the other fixture must take tip 2.
        let combined = match_day(
            vec![odds("Arsenal", "Chelsea"), odds("Arsenal FC", "Chelsea FC")],
            vec![
                tip(2, "Arsenal B", "Chelsea B"),
                tip(1, "Arsenal", "Chelsea"),
            ],
            85.0,
        );
        assert_eq!(combined[0].tip.as_ref().unwrap().match_id, 1);
        assert_eq!(combined[1].tip.as_ref().unwrap().match_id, 2);
    }

    #[test]
    fn a_tip_is_never_used_twice() {
        let combined = match_day(
            vec![odds("Arsenal", "Chelsea"), odds("Arsenal", "Chelsea")],
            vec![tip(1, "Arsenal", "Chelsea")],
            85.0,
        );
        let matched: Vec<_> = combined.iter().filter(|c| c.tip.is_some()).collect();
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn output_preserves_odds_order_and_confidence() {
        let combined = match_day(
            vec![odds("Zebre", "Parma"), odds("Arsenal", "Chelsea")],
            vec![tip(1, "Arsenal", "Chelsea")],
            85.0,
        );
        assert_eq!(combined[0].odds.home_team, "Zebre");
        assert_eq!(combined[1].match_confidence, Some(100.0));
    }
}
