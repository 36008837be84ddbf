//! Bookmaker odds client
//!
//! Pulls the soccer fixture list for a date and lifts the market prices
//! into `OddsRecord`s. The site serves odds as strings ("1.28", "-"),
//! so everything is parsed leniently and unpriced markets become None.

use super::{parse_odds, Fetcher};
use crate::config::ScraperConfig;
use crate::error::Result;
use crate::types::OddsRecord;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Clone)]
pub struct OddsClient {
    fetcher: Fetcher,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFixture {
    #[serde(rename = "homeTeam")]
    home_team: Option<String>,
    #[serde(rename = "awayTeam")]
    away_team: Option<String>,
    league: Option<String>,
    country: Option<String>,
    #[serde(rename = "kickOff")]
    kick_off: Option<String>,
    #[serde(rename = "eventUrl")]
    event_url: Option<String>,
    #[serde(default)]
    markets: RawMarkets,
}

/// Market cells as the site serves them: decimal strings or "-".
#[derive(Debug, Clone, Default, Deserialize)]
struct RawMarkets {
    #[serde(rename = "homeWin")]
    home_win: Option<String>,
    draw: Option<String>,
    #[serde(rename = "awayWin")]
    away_win: Option<String>,
    #[serde(rename = "homeDrawNoBet")]
    home_draw_no_bet: Option<String>,
    #[serde(rename = "awayDrawNoBet")]
    away_draw_no_bet: Option<String>,
    #[serde(rename = "homeOrDraw")]
    home_or_draw: Option<String>,
    #[serde(rename = "awayOrDraw")]
    away_or_draw: Option<String>,
    #[serde(rename = "totalOver15")]
    total_over_1_5: Option<String>,
    #[serde(rename = "totalUnder35")]
    total_under_3_5: Option<String>,
    #[serde(rename = "bttsYes")]
    btts_yes: Option<String>,
    #[serde(rename = "bttsNo")]
    btts_no: Option<String>,
    #[serde(rename = "homeOver05")]
    home_over_0_5: Option<String>,
    #[serde(rename = "awayOver05")]
    away_over_0_5: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    fixtures: Vec<RawFixture>,
}

impl OddsClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            base_url: config.odds_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// All soccer fixtures priced for the date.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<OddsRecord>> {
        let url = format!("{}/api/sports/soccer/fixtures", self.base_url);
        let resp: FixturesResponse = self
            .fetcher
            .get_json(&url, &[("date", date.to_string())])
            .await?;

        let total = resp.fixtures.len();
        let records: Vec<OddsRecord> = resp
            .fixtures
            .into_iter()
            .filter_map(|raw| parse_fixture(raw, date))
            .collect();
        if records.len() < total {
            warn!(dropped = total - records.len(), "fixtures missing team names were skipped");
        }
        info!(%date, count = records.len(), "fetched bookmaker odds");
        Ok(records)
    }
}

fn parse_fixture(raw: RawFixture, date: NaiveDate) -> Option<OddsRecord> {
    let home_team = raw.home_team?.trim().to_string();
    let away_team = raw.away_team?.trim().to_string();
    if home_team.is_empty() || away_team.is_empty() {
        return None;
    }
    let m = raw.markets;
    Some(OddsRecord {
        home_team,
        away_team,
        league: raw.league,
        country: raw.country,
        date,
        kickoff: raw.kick_off,
        game_url: raw.event_url,
        home_win: parse_odds(m.home_win.as_deref()),
        draw: parse_odds(m.draw.as_deref()),
        away_win: parse_odds(m.away_win.as_deref()),
        home_draw_no_bet: parse_odds(m.home_draw_no_bet.as_deref()),
        away_draw_no_bet: parse_odds(m.away_draw_no_bet.as_deref()),
        home_draw_odds: parse_odds(m.home_or_draw.as_deref()),
        away_draw_odds: parse_odds(m.away_or_draw.as_deref()),
        total_over_1_5: parse_odds(m.total_over_1_5.as_deref()),
        total_under_3_5: parse_odds(m.total_under_3_5.as_deref()),
        btts_yes: parse_odds(m.btts_yes.as_deref()),
        btts_no: parse_odds(m.btts_no.as_deref()),
        home_team_over_0_5: parse_odds(m.home_over_0_5.as_deref()),
        away_team_over_0_5: parse_odds(m.away_over_0_5.as_deref()),
    })
}
