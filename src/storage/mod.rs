//! Stage files and database persistence
//!
//! Every pipeline step reads and writes dated JSON stage files
//! (`odds_2026-08-30.json`, `combined_2026-08-30.json`, ...) under the
//! configured data directory, so each step can be rerun in isolation.
//! Writes are additionally snapshotted into SQLite, and mirrored into a
//! second analytics database when one is configured.

use crate::config::DatabaseConfig;
use crate::error::{PipelineError, Result};
use crate::types::{BetRecord, MergedRecord, SettlementStatus};
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Pipeline stages with a dated JSON file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Odds,
    Tips,
    Results,
    Combined,
    Selected,
    Merged,
    Predictions,
    Bets,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Odds => "odds",
            Stage::Tips => "tips",
            Stage::Results => "results",
            Stage::Combined => "combined",
            Stage::Selected => "selected",
            Stage::Merged => "merged",
            Stage::Predictions => "predictions",
            Stage::Bets => "bets",
        }
    }
}

/// Path of a stage file: `<data_dir>/<stage>_<date>.json`.
pub fn stage_path(data_dir: &Path, stage: Stage, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("{}_{}.json", stage.as_str(), date))
}

/// Read and parse a stage file.
///
/// A missing file maps to `MissingInput` so callers can tell "run the
/// earlier step first" apart from real IO failures.
pub fn read_stage<T: DeserializeOwned>(data_dir: &Path, stage: Stage, date: NaiveDate) -> Result<Vec<T>> {
    let path = stage_path(data_dir, stage, date);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::MissingInput {
                stage: stage.as_str(),
                path,
            })
        }
        Err(e) => return Err(e.into()),
    };
    let records: Vec<T> = serde_json::from_str(&raw)?;
    debug!(stage = stage.as_str(), %date, count = records.len(), "loaded stage file");
    Ok(records)
}

/// Write a stage file, creating the data directory if needed.
pub fn write_stage<T: Serialize>(
    data_dir: &Path,
    stage: Stage,
    date: NaiveDate,
    records: &[T],
) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = stage_path(data_dir, stage, date);
    let raw = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, raw)?;
    info!(stage = stage.as_str(), %date, count = records.len(), path = %path.display(), "wrote stage file");
    Ok(path)
}

/// Load every `merged_*.json` in the data directory, oldest first.
///
/// This is the training corpus: all historical merged days concatenated.
pub fn load_all_merged(data_dir: &Path) -> Result<Vec<MergedRecord>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::MissingInput {
                stage: "merged",
                path: data_dir.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("merged_") && name.ends_with(".json") {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut records = Vec::new();
    for path in &files {
        let raw = std::fs::read_to_string(path)?;
        let mut day: Vec<MergedRecord> = serde_json::from_str(&raw)?;
        records.append(&mut day);
    }
    info!(files = files.len(), records = records.len(), "loaded merged history");
    Ok(records)
}

/// SQLite persistence with an optional mirrored analytics copy.
///
/// Mirror failures are logged and swallowed; the analytics copy must
/// never fail a pipeline run.
pub struct Database {
    pool: SqlitePool,
    analytics: Option<SqlitePool>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::open(&config.path).await?;
        let analytics = match &config.analytics_path {
            Some(path) => Some(Self::open(path).await?),
            None => None,
        };
        let db = Self { pool, analytics };
        db.init_schema().await?;
        Ok(db)
    }

    async fn open(path: &str) -> Result<SqlitePool> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::from_str(path)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    async fn init_schema(&self) -> Result<()> {
        for pool in self.pools() {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS stage_snapshots (
                    stage TEXT NOT NULL,
                    date TEXT NOT NULL,
                    record_count INTEGER NOT NULL,
                    payload TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (stage, date)
                )
                "#,
            )
            .execute(pool)
            .await?;
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS bets (
                    id TEXT PRIMARY KEY,
                    date TEXT NOT NULL,
                    bet_type TEXT NOT NULL,
                    status TEXT NOT NULL,
                    settlement_status TEXT NOT NULL,
                    payload TEXT NOT NULL
                )
                "#,
            )
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    fn pools(&self) -> impl Iterator<Item = &SqlitePool> {
        std::iter::once(&self.pool).chain(self.analytics.as_ref())
    }

    /// Snapshot a stage's records for the date, replacing any prior run.
    pub async fn record_snapshot<T: Serialize>(
        &self,
        stage: Stage,
        date: NaiveDate,
        records: &[T],
    ) -> Result<()> {
        let payload = serde_json::to_string(records)?;
        let now = Utc::now();
        sqlx::query(
            "INSERT OR REPLACE INTO stage_snapshots (stage, date, record_count, payload, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(stage.as_str())
        .bind(date.to_string())
        .bind(records.len() as i64)
        .bind(&payload)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if let Some(analytics) = &self.analytics {
            let mirror = sqlx::query(
                "INSERT OR REPLACE INTO stage_snapshots (stage, date, record_count, payload, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(stage.as_str())
            .bind(date.to_string())
            .bind(records.len() as i64)
            .bind(&payload)
            .bind(now.to_rfc3339())
            .execute(analytics)
            .await;
            if let Err(e) = mirror {
                warn!(stage = stage.as_str(), "analytics mirror write failed: {e}");
            }
        }
        Ok(())
    }

    /// Insert or update a bet. The full record rides in `payload`; the
    /// indexed columns exist for ad-hoc queries.
    pub async fn upsert_bet(&self, bet: &BetRecord) -> Result<()> {
        let payload = serde_json::to_string(bet)?;
        sqlx::query(
            "INSERT OR REPLACE INTO bets (id, date, bet_type, status, settlement_status, payload) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(bet.id.to_string())
        .bind(bet.date.to_string())
        .bind(bet.bet_type.as_str())
        .bind(status_str(bet))
        .bind(settlement_str(bet.settlement_status))
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        if let Some(analytics) = &self.analytics {
            let mirror = sqlx::query(
                "INSERT OR REPLACE INTO bets (id, date, bet_type, status, settlement_status, payload) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(bet.id.to_string())
            .bind(bet.date.to_string())
            .bind(bet.bet_type.as_str())
            .bind(status_str(bet))
            .bind(settlement_str(bet.settlement_status))
            .bind(&payload)
            .execute(analytics)
            .await;
            if let Err(e) = mirror {
                warn!(bet = %bet.id, "analytics mirror write failed: {e}");
            }
        }
        Ok(())
    }

    /// All bets recorded for a date, newest file state wins.
    pub async fn bets_for_date(&self, date: NaiveDate) -> Result<Vec<BetRecord>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT payload FROM bets WHERE date = ? ORDER BY id")
                .bind(date.to_string())
                .fetch_all(&self.pool)
                .await?;
        let mut bets = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            bets.push(serde_json::from_str(&payload)?);
        }
        Ok(bets)
    }

    /// Bets still awaiting settlement, across all dates.
    pub async fn pending_bets(&self) -> Result<Vec<BetRecord>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT payload FROM bets WHERE settlement_status = 'pending' AND status = 'placed' \
             ORDER BY date, id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut bets = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            bets.push(serde_json::from_str(&payload)?);
        }
        Ok(bets)
    }
}

fn status_str(bet: &BetRecord) -> &'static str {
    match bet.status {
        crate::types::BetStatus::Placed => "placed",
        crate::types::BetStatus::Failed => "failed",
    }
}

fn settlement_str(status: SettlementStatus) -> &'static str {
    match status {
        SettlementStatus::Pending => "pending",
        SettlementStatus::Won => "won",
        SettlementStatus::Lost => "lost",
        SettlementStatus::Void => "void",
    }
}
