//! Bet placement automation
//!
//! The bookmaker has no public betting API, so placement drives a real
//! browser session over WebDriver. The `BetPlacer` trait is the seam:
//! the live implementation logs into the site and clicks through each
//! slip; the dry-run implementation only logs, which is also what the
//! batch loop is tested against. Bets are placed one at a time and a
//! failed placement never aborts the batch.

use crate::config::BettingConfig;
use crate::error::{PipelineError, Result};
use crate::types::{BetKind, BetRecord, BetStatus, SelectedRecord, SettlementStatus};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

/// One bet the batch loop intends to place.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedBet {
    pub match_id: Option<i64>,
    pub home_team: String,
    pub away_team: String,
    pub bet_type: BetKind,
    pub odds: f64,
    pub stake: Decimal,
    pub game_url: Option<String>,
}

/// Seam between the batch loop and the browser session.
#[async_trait]
pub trait BetPlacer: Send {
    /// One-time session setup (login).
    async fn prepare(&mut self) -> Result<()>;
    async fn place(&mut self, bet: &PlannedBet) -> Result<()>;
    /// Session teardown; errors here are logged, not propagated.
    async fn finish(&mut self) -> Result<()>;
}

/// Expand selector flags into placeable bets, in record order.
///
/// A flagged market without a live price cannot be placed and is
/// skipped with a warning; the batch is capped at `max_bets`.
pub fn plan_bets(selected: &[SelectedRecord], config: &BettingConfig) -> Vec<PlannedBet> {
    let mut planned = Vec::new();
    'records: for record in selected {
        for kind in record.selection.bets() {
            if planned.len() >= config.max_bets {
                warn!(cap = config.max_bets, "bet cap reached, remaining selections dropped");
                break 'records;
            }
            let Some(odds) = kind.odds(&record.combined.odds) else {
                warn!(
                    home = %record.combined.odds.home_team,
                    bet_type = kind.as_str(),
                    "selected market has no price, skipping"
                );
                continue;
            };
            planned.push(PlannedBet {
                match_id: record.combined.match_id(),
                home_team: record.combined.odds.home_team.clone(),
                away_team: record.combined.odds.away_team.clone(),
                bet_type: kind,
                odds,
                stake: config.stake,
                game_url: record.combined.odds.game_url.clone(),
            });
        }
    }
    info!(planned = planned.len(), "bet plan built");
    planned
}

/// Place every planned bet sequentially, recording each outcome.
pub async fn place_all(
    placer: &mut dyn BetPlacer,
    planned: &[PlannedBet],
    date: NaiveDate,
) -> Vec<BetRecord> {
    let mut records = Vec::with_capacity(planned.len());
    if planned.is_empty() {
        return records;
    }
    if let Err(e) = placer.prepare().await {
        warn!("placement session failed to start: {e}");
        for bet in planned {
            records.push(to_record(bet, date, Some(format!("session setup failed: {e}"))));
        }
        return records;
    }

    for bet in planned {
        let error = match placer.place(bet).await {
            Ok(()) => {
                info!(
                    home = %bet.home_team,
                    away = %bet.away_team,
                    bet_type = bet.bet_type.as_str(),
                    odds = bet.odds,
                    "bet placed"
                );
                None
            }
            Err(e) => {
                warn!(
                    home = %bet.home_team,
                    bet_type = bet.bet_type.as_str(),
                    "placement failed: {e}"
                );
                Some(e.to_string())
            }
        };
        records.push(to_record(bet, date, error));
    }

    if let Err(e) = placer.finish().await {
        warn!("placement session teardown failed: {e}");
    }
    let placed = records.iter().filter(|r| r.status == BetStatus::Placed).count();
    info!(placed, failed = records.len() - placed, "placement batch complete");
    records
}

fn to_record(bet: &PlannedBet, date: NaiveDate, error: Option<String>) -> BetRecord {
    BetRecord {
        id: Uuid::new_v4(),
        date,
        match_id: bet.match_id,
        home_team: bet.home_team.clone(),
        away_team: bet.away_team.clone(),
        bet_type: bet.bet_type,
        odds: bet.odds,
        stake: bet.stake,
        status: if error.is_none() {
            BetStatus::Placed
        } else {
            BetStatus::Failed
        },
        error,
        placed_at: Utc::now(),
        settlement_status: SettlementStatus::Pending,
    }
}

/// Logs what would be placed without opening a browser.
pub struct DryRunPlacer;

#[async_trait]
impl BetPlacer for DryRunPlacer {
    async fn prepare(&mut self) -> Result<()> {
        info!("dry run, no browser session");
        Ok(())
    }

    async fn place(&mut self, bet: &PlannedBet) -> Result<()> {
        info!(
            home = %bet.home_team,
            away = %bet.away_team,
            bet_type = bet.bet_type.as_str(),
            odds = bet.odds,
            stake = %bet.stake,
            "dry run bet"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// Site selectors, kept together so layout changes are one edit.
const LOGIN_URL_PATH: &str = "/account/login";
const USERNAME_INPUT: &str = "input[name='username']";
const PASSWORD_INPUT: &str = "input[name='password']";
const LOGIN_BUTTON: &str = "button[type='submit']";
const STAKE_INPUT: &str = "input.betslip-stake";
const CONFIRM_BUTTON: &str = "button.betslip-confirm";

/// Live placement through a WebDriver browser session.
pub struct WebDriverPlacer {
    driver: Option<WebDriver>,
    webdriver_url: String,
    base_url: String,
    headless: bool,
    username: String,
    password: String,
}

impl WebDriverPlacer {
    pub fn new(config: &BettingConfig, base_url: &str) -> Result<Self> {
        let (username, password) = config.credentials()?;
        Ok(Self {
            driver: None,
            webdriver_url: config.webdriver_url.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            headless: config.headless,
            username,
            password,
        })
    }

    fn driver(&self) -> Result<&WebDriver> {
        self.driver
            .as_ref()
            .ok_or_else(|| PipelineError::Automation("browser session not started".into()))
    }

    /// CSS selector of the odds button for a market.
    fn market_selector(kind: BetKind) -> String {
        format!("button[data-market='{}']", kind.as_str())
    }
}

fn wd_err(e: WebDriverError) -> PipelineError {
    PipelineError::Automation(e.to_string())
}

#[async_trait]
impl BetPlacer for WebDriverPlacer {
    async fn prepare(&mut self) -> Result<()> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.set_headless().map_err(wd_err)?;
        }
        let driver = WebDriver::new(&self.webdriver_url, caps)
            .await
            .map_err(wd_err)?;

        driver
            .goto(format!("{}{}", self.base_url, LOGIN_URL_PATH))
            .await
            .map_err(wd_err)?;
        driver
            .find(By::Css(USERNAME_INPUT))
            .await
            .map_err(wd_err)?
            .send_keys(self.username.as_str())
            .await
            .map_err(wd_err)?;
        driver
            .find(By::Css(PASSWORD_INPUT))
            .await
            .map_err(wd_err)?
            .send_keys(self.password.as_str())
            .await
            .map_err(wd_err)?;
        driver
            .find(By::Css(LOGIN_BUTTON))
            .await
            .map_err(wd_err)?
            .click()
            .await
            .map_err(wd_err)?;

        info!("browser session logged in");
        self.driver = Some(driver);
        Ok(())
    }

    async fn place(&mut self, bet: &PlannedBet) -> Result<()> {
        let url = bet
            .game_url
            .as_deref()
            .ok_or_else(|| PipelineError::Automation("no game url for fixture".into()))?;
        let driver = self.driver()?;

        driver.goto(url).await.map_err(wd_err)?;
        driver
            .find(By::Css(&Self::market_selector(bet.bet_type)))
            .await
            .map_err(wd_err)?
            .click()
            .await
            .map_err(wd_err)?;

        let stake_input = driver.find(By::Css(STAKE_INPUT)).await.map_err(wd_err)?;
        stake_input.clear().await.map_err(wd_err)?;
        stake_input
            .send_keys(bet.stake.to_string())
            .await
            .map_err(wd_err)?;
        driver
            .find(By::Css(CONFIRM_BUTTON))
            .await
            .map_err(wd_err)?
            .click()
            .await
            .map_err(wd_err)?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await.map_err(wd_err)?;
        }
        Ok(())
    }
}
