//! Pipeline configuration
//!
//! Loaded from a TOML file; every section has working defaults so a
//! bare `[scraper]`-less file still runs against the live sites.

use crate::error::{PipelineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory for dated stage files (odds_*.json, combined_*.json, ...).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory for model artifacts; defaults to `<data_dir>/models`.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {path}: {e}")))?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("models"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            model_dir: None,
            scraper: ScraperConfig::default(),
            matcher: MatcherConfig::default(),
            selector: SelectorConfig::default(),
            trainer: TrainerConfig::default(),
            betting: BettingConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("betting_data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_odds_base_url")]
    pub odds_base_url: String,
    #[serde(default = "default_tips_base_url")]
    pub tips_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Random inter-request delay window, to stay under rate limits.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            odds_base_url: default_odds_base_url(),
            tips_base_url: default_tips_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_odds_base_url() -> String {
    "https://www.betway.co.za".to_string()
}
fn default_tips_base_url() -> String {
    "https://www.forebet.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    1_000
}
fn default_min_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    2_000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    /// Minimum team-name similarity (0-100) for a pair to count.
    #[serde(default = "default_match_threshold")]
    pub threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: default_match_threshold(),
        }
    }
}

fn default_match_threshold() -> f64 {
    85.0
}

/// Rule thresholds for the market selector: each market needs its odds
/// at or above the cutoff plus the prediction condition.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_home_over_min_odds")]
    pub home_over_min_odds: f64,
    #[serde(default = "default_away_over_min_odds")]
    pub away_over_min_odds: f64,
    #[serde(default = "default_home_draw_min_odds")]
    pub home_draw_min_odds: f64,
    #[serde(default = "default_away_draw_min_odds")]
    pub away_draw_min_odds: f64,
    #[serde(default = "default_over_15_min_odds")]
    pub over_15_min_odds: f64,
    /// Combined P(side)+P(draw) a double-chance bet must exceed (0-1).
    #[serde(default = "default_double_chance_min_prob")]
    pub double_chance_min_prob: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            home_over_min_odds: default_home_over_min_odds(),
            away_over_min_odds: default_away_over_min_odds(),
            home_draw_min_odds: default_home_draw_min_odds(),
            away_draw_min_odds: default_away_draw_min_odds(),
            over_15_min_odds: default_over_15_min_odds(),
            double_chance_min_prob: default_double_chance_min_prob(),
        }
    }
}

fn default_home_over_min_odds() -> f64 {
    1.25
}
fn default_away_over_min_odds() -> f64 {
    1.30
}
fn default_home_draw_min_odds() -> f64 {
    1.35
}
fn default_away_draw_min_odds() -> f64 {
    1.30
}
fn default_over_15_min_odds() -> f64 {
    1.35
}
fn default_double_chance_min_prob() -> f64 {
    0.70
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    /// Labeled samples required before any training happens.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Labeled samples required per binary market model.
    #[serde(default = "default_min_market_samples")]
    pub min_market_samples: usize,
    /// Holdout fraction for the validation slice.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_num_rounds")]
    pub num_rounds: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Early-stopping patience in boosting rounds.
    #[serde(default = "default_early_stopping_rounds")]
    pub early_stopping_rounds: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            min_market_samples: default_min_market_samples(),
            test_size: default_test_size(),
            num_rounds: default_num_rounds(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            early_stopping_rounds: default_early_stopping_rounds(),
            seed: default_seed(),
        }
    }
}

fn default_min_samples() -> usize {
    50
}
fn default_min_market_samples() -> usize {
    30
}
fn default_test_size() -> f64 {
    0.25
}
fn default_num_rounds() -> usize {
    200
}
fn default_learning_rate() -> f64 {
    0.05
}
fn default_max_depth() -> usize {
    4
}
fn default_early_stopping_rounds() -> usize {
    20
}
fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Deserialize)]
pub struct BettingConfig {
    /// WebDriver endpoint the automation session connects to.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Flat stake per single bet.
    #[serde(default = "default_stake")]
    pub stake: Decimal,
    /// Hard cap on bets placed per run.
    #[serde(default = "default_max_bets")]
    pub max_bets: usize,
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl BettingConfig {
    /// Site credentials come from the environment, never the config file.
    pub fn credentials(&self) -> Result<(String, String)> {
        let username = std::env::var("BETFLOW_SITE_USERNAME")
            .map_err(|_| PipelineError::Config("BETFLOW_SITE_USERNAME not set".into()))?;
        let password = std::env::var("BETFLOW_SITE_PASSWORD")
            .map_err(|_| PipelineError::Config("BETFLOW_SITE_PASSWORD not set".into()))?;
        Ok((username, password))
    }
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            stake: default_stake(),
            max_bets: default_max_bets(),
            headless: default_headless(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_stake() -> Decimal {
    dec!(10)
}
fn default_max_bets() -> usize {
    20
}
fn default_headless() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Secondary analytics copy; every write is mirrored here when set.
    #[serde(default)]
    pub analytics_path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            analytics_path: None,
        }
    }
}

fn default_db_path() -> String {
    "betting_data/betflow.db".to_string()
}

/// Load a `.env` file when present so site credentials can live there.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
