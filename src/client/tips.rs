//! Tipping site client
//!
//! Two feeds: the per-date prediction list (probabilities, predicted
//! scores, expected goals) and the per-date results list (final scores,
//! present only once a match has finished). Both are paginated.

use super::Fetcher;
use crate::config::ScraperConfig;
use crate::error::Result;
use crate::types::{ResultEntry, ScoreLine, TipRecord};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Clone)]
pub struct TipsClient {
    fetcher: Fetcher,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTip {
    id: Option<i64>,
    #[serde(rename = "hostName")]
    host_name: Option<String>,
    #[serde(rename = "guestName")]
    guest_name: Option<String>,
    country: Option<String>,
    #[serde(rename = "leagueName")]
    league_name: Option<String>,
    #[serde(rename = "prob1")]
    prob_home: Option<f64>,
    #[serde(rename = "probX")]
    prob_draw: Option<f64>,
    #[serde(rename = "prob2")]
    prob_away: Option<f64>,
    pred: Option<String>,
    #[serde(rename = "hostGoals")]
    host_goals: Option<f64>,
    #[serde(rename = "guestGoals")]
    guest_goals: Option<f64>,
    #[serde(rename = "avgGoals")]
    avg_goals: Option<f64>,
    kelly: Option<f64>,
    #[serde(rename = "previewLink")]
    preview_link: Option<String>,
    #[serde(rename = "gameLink")]
    game_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawResult {
    id: Option<i64>,
    #[serde(rename = "hostName")]
    host_name: Option<String>,
    #[serde(rename = "guestName")]
    guest_name: Option<String>,
    #[serde(rename = "hostScore")]
    host_score: Option<u32>,
    #[serde(rename = "guestScore")]
    guest_score: Option<u32>,
    #[serde(rename = "hostHtScore")]
    host_ht_score: Option<u32>,
    #[serde(rename = "guestHtScore")]
    guest_ht_score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PageResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "hasMore", default)]
    has_more: bool,
}

impl TipsClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            base_url: config.tips_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// All predictions published for the date.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<TipRecord>> {
        let url = format!("{}/api/predictions", self.base_url);
        let mut tips = Vec::new();
        let mut page = 1u32;
        loop {
            let resp: PageResponse<RawTip> = self
                .fetcher
                .get_json(
                    &url,
                    &[("date", date.to_string()), ("page", page.to_string())],
                )
                .await?;
            debug!(%date, page, items = resp.items.len(), "prediction page");
            tips.extend(resp.items.into_iter().filter_map(|raw| parse_tip(raw, date)));
            if !resp.has_more {
                break;
            }
            page += 1;
            self.fetcher.pace().await;
        }
        info!(%date, count = tips.len(), "fetched predictions");
        Ok(tips)
    }

    /// Final scores for the date; unfinished matches are absent.
    pub async fn fetch_results(&self, date: NaiveDate) -> Result<Vec<ResultEntry>> {
        let url = format!("{}/api/results", self.base_url);
        let mut results = Vec::new();
        let mut page = 1u32;
        loop {
            let resp: PageResponse<RawResult> = self
                .fetcher
                .get_json(
                    &url,
                    &[("date", date.to_string()), ("page", page.to_string())],
                )
                .await?;
            debug!(%date, page, items = resp.items.len(), "results page");
            results.extend(resp.items.into_iter().filter_map(parse_result));
            if !resp.has_more {
                break;
            }
            page += 1;
            self.fetcher.pace().await;
        }
        info!(%date, count = results.len(), "fetched results");
        Ok(results)
    }
}

fn parse_tip(raw: RawTip, date: NaiveDate) -> Option<TipRecord> {
    Some(TipRecord {
        match_id: raw.id?,
        home_team: non_empty(raw.host_name)?,
        away_team: non_empty(raw.guest_name)?,
        country: raw.country,
        league_name: raw.league_name,
        date,
        prob_home: raw.prob_home,
        prob_draw: raw.prob_draw,
        prob_away: raw.prob_away,
        pred: raw.pred,
        home_pred_score: raw.host_goals,
        away_pred_score: raw.guest_goals,
        avg_goals: raw.avg_goals,
        kelly: raw.kelly,
        preview_link: raw.preview_link,
        game_link: raw.game_link,
    })
}

fn parse_result(raw: RawResult) -> Option<ResultEntry> {
    Some(ResultEntry {
        match_id: raw.id?,
        home_team: non_empty(raw.host_name)?,
        away_team: non_empty(raw.guest_name)?,
        score: ScoreLine {
            home_goals: raw.host_score?,
            away_goals: raw.guest_score?,
            home_ht: raw.host_ht_score,
            away_ht: raw.guest_ht_score,
        },
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    let s = s?.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_parses_with_partial_fields() {
        let raw: RawTip = serde_json::from_str(
            r#"{
                "id": 1234,
                "hostName": "Arsenal FC",
                "guestName": "Chelsea",
                "prob1": 55.0,
                "probX": 25.0,
                "prob2": 20.0,
                "pred": "1",
                "hostGoals": 2.1,
                "guestGoals": 0.8,
                "avgGoals": 2.9
            }"#,
        )
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let tip = parse_tip(raw, date).unwrap();
        assert_eq!(tip.match_id, 1234);
        assert_eq!(tip.prob_home, Some(55.0));
        assert_eq!(tip.avg_goals, Some(2.9));
        assert_eq!(tip.kelly, None);
        assert_eq!(tip.date, date);
    }

    #[test]
    fn tip_without_id_is_dropped() {
        let raw: RawTip =
            serde_json::from_str(r#"{"hostName": "A", "guestName": "B"}"#).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(parse_tip(raw, date).is_none());
    }

    #[test]
    fn unfinished_result_is_dropped() {
        let raw: RawResult = serde_json::from_str(
            r#"{"id": 9, "hostName": "A", "guestName": "B", "hostScore": 1}"#,
        )
        .unwrap();
        assert!(parse_result(raw).is_none());

        let raw: RawResult = serde_json::from_str(
            r#"{"id": 9, "hostName": "A", "guestName": "B",
                "hostScore": 2, "guestScore": 0, "hostHtScore": 1, "guestHtScore": 0}"#,
        )
        .unwrap();
        let entry = parse_result(raw).unwrap();
        assert_eq!(entry.score.home_goals, 2);
        assert_eq!(entry.score.home_ht, Some(1));
    }
}
