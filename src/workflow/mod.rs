//! Daily pipeline orchestration
//!
//! Each pipeline step is a standalone async function over the shared
//! `PipelineContext`; the CLI exposes every one as its own subcommand
//! and `run` chains them for the daily workflow. Steps time themselves,
//! a failed step is recorded and the run continues unless
//! `stop_on_error` is set, and the run ends with a summary table.

use crate::automation::{self, DryRunPlacer, WebDriverPlacer};
use crate::client::{OddsClient, TipsClient};
use crate::config::Config;
use crate::error::Result;
use crate::matcher;
use crate::merger;
use crate::ml::{train_all, ModelPolicy, ModelStore, TrainingReport};
use crate::selector;
use crate::settlement::{self, SettlementSummary};
use crate::storage::{self, Database, Stage};
use crate::types::{CombinedRecord, OddsRecord, ResultEntry, SelectedRecord, TipRecord};
use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use std::time::Instant;
use tracing::{error, info};

/// Shared handles every step draws on.
pub struct PipelineContext {
    pub config: Config,
    pub db: Database,
    pub odds_client: OddsClient,
    pub tips_client: TipsClient,
}

impl PipelineContext {
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::connect(&config.database).await?;
        let odds_client = OddsClient::new(&config.scraper)?;
        let tips_client = TipsClient::new(&config.scraper)?;
        Ok(Self {
            config,
            db,
            odds_client,
            tips_client,
        })
    }

    fn model_store(&self) -> ModelStore {
        ModelStore::new(self.config.model_dir(), self.config.trainer.clone())
    }
}

/// Scrape tipping-site predictions and write `tips_<date>.json`.
pub async fn scrape_tips(ctx: &PipelineContext, date: NaiveDate) -> Result<usize> {
    let tips = ctx.tips_client.fetch_day(date).await?;
    storage::write_stage(&ctx.config.data_dir, Stage::Tips, date, &tips)?;
    ctx.db.record_snapshot(Stage::Tips, date, &tips).await?;
    Ok(tips.len())
}

/// Scrape bookmaker odds and write `odds_<date>.json`.
pub async fn scrape_odds(ctx: &PipelineContext, date: NaiveDate) -> Result<usize> {
    let odds = ctx.odds_client.fetch_day(date).await?;
    storage::write_stage(&ctx.config.data_dir, Stage::Odds, date, &odds)?;
    ctx.db.record_snapshot(Stage::Odds, date, &odds).await?;
    Ok(odds.len())
}

/// Fuzzy-join the day's odds and tips into `combined_<date>.json`.
pub async fn match_fixtures(ctx: &PipelineContext, date: NaiveDate) -> Result<usize> {
    let odds: Vec<OddsRecord> = storage::read_stage(&ctx.config.data_dir, Stage::Odds, date)?;
    let tips: Vec<TipRecord> = storage::read_stage(&ctx.config.data_dir, Stage::Tips, date)?;
    let combined = matcher::match_day(odds, tips, ctx.config.matcher.threshold);
    storage::write_stage(&ctx.config.data_dir, Stage::Combined, date, &combined)?;
    ctx.db.record_snapshot(Stage::Combined, date, &combined).await?;
    Ok(combined.len())
}

/// Scrape final scores and label the day's combined records.
pub async fn merge_results(ctx: &PipelineContext, date: NaiveDate) -> Result<usize> {
    let results = ctx.tips_client.fetch_results(date).await?;
    storage::write_stage(&ctx.config.data_dir, Stage::Results, date, &results)?;
    let combined: Vec<CombinedRecord> =
        storage::read_stage(&ctx.config.data_dir, Stage::Combined, date)?;
    let merged = merger::merge_results(combined, results);
    storage::write_stage(&ctx.config.data_dir, Stage::Merged, date, &merged)?;
    ctx.db.record_snapshot(Stage::Merged, date, &merged).await?;
    Ok(merged.len())
}

/// Settle pending bets against the date's final scores.
pub async fn settle(ctx: &PipelineContext, date: NaiveDate) -> Result<SettlementSummary> {
    // Reuse the scores the merge step already scraped when present.
    let results: Vec<ResultEntry> =
        match storage::read_stage(&ctx.config.data_dir, Stage::Results, date) {
            Ok(results) => results,
            Err(e) if e.is_missing_input() => ctx.tips_client.fetch_results(date).await?,
            Err(e) => return Err(e),
        };
    let mut bets = ctx.db.pending_bets().await?;
    let summary = settlement::settle_bets(&mut bets, &results);
    for bet in &bets {
        ctx.db.upsert_bet(bet).await?;
    }
    Ok(summary)
}

/// Train all models from the accumulated merged history.
pub async fn train(ctx: &PipelineContext) -> Result<TrainingReport> {
    let merged = storage::load_all_merged(&ctx.config.data_dir)?;
    train_all(&merged, &ctx.config.trainer, &ctx.config.model_dir())
}

/// Score the day's combined records and write `predictions_<date>.json`.
pub async fn predict(ctx: &PipelineContext, date: NaiveDate, policy: ModelPolicy) -> Result<usize> {
    let combined: Vec<CombinedRecord> =
        storage::read_stage(&ctx.config.data_dir, Stage::Combined, date)?;
    let handle = ctx.model_store().ensure(&ctx.config.data_dir, policy)?;
    let predicted = handle.predict_all(&combined);
    storage::write_stage(&ctx.config.data_dir, Stage::Predictions, date, &predicted)?;
    ctx.db.record_snapshot(Stage::Predictions, date, &predicted).await?;
    Ok(predicted.len())
}

/// Apply the rule table and write `selected_<date>.json`.
pub async fn select_markets(ctx: &PipelineContext, date: NaiveDate) -> Result<usize> {
    let combined: Vec<CombinedRecord> =
        storage::read_stage(&ctx.config.data_dir, Stage::Combined, date)?;
    let selected = selector::select_markets(&combined, &ctx.config.selector);
    storage::write_stage(&ctx.config.data_dir, Stage::Selected, date, &selected)?;
    ctx.db.record_snapshot(Stage::Selected, date, &selected).await?;
    Ok(selected.len())
}

/// Place the day's selected bets and record every attempt.
pub async fn place_bets(ctx: &PipelineContext, date: NaiveDate, dry_run: bool) -> Result<usize> {
    let selected: Vec<SelectedRecord> =
        storage::read_stage(&ctx.config.data_dir, Stage::Selected, date)?;
    let planned = automation::plan_bets(&selected, &ctx.config.betting);

    let records = if dry_run {
        let mut placer = DryRunPlacer;
        automation::place_all(&mut placer, &planned, date).await
    } else {
        let mut placer =
            WebDriverPlacer::new(&ctx.config.betting, &ctx.config.scraper.odds_base_url)?;
        automation::place_all(&mut placer, &planned, date).await
    };

    storage::write_stage(&ctx.config.data_dir, Stage::Bets, date, &records)?;
    for bet in &records {
        ctx.db.upsert_bet(bet).await?;
    }
    Ok(records.len())
}

/// Which steps to run, and on what dates.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Date being bet on (upcoming fixtures).
    pub target_date: NaiveDate,
    /// Date whose finished matches are merged and settled.
    pub results_date: NaiveDate,
    pub skip_scrape: bool,
    pub skip_match: bool,
    pub skip_merge: bool,
    pub skip_settle: bool,
    pub skip_train: bool,
    pub skip_predict: bool,
    pub skip_select: bool,
    pub skip_bets: bool,
    pub stop_on_error: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

/// Outcome of one workflow step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub name: &'static str,
    pub status: StepStatus,
    pub detail: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone)]
pub struct WorkflowSummary {
    pub steps: Vec<StepOutcome>,
    /// True when stop_on_error ended the run early.
    pub halted: bool,
}

impl WorkflowSummary {
    pub fn failed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }
}

type StepFuture<'a> = BoxFuture<'a, Result<String>>;

fn count_detail(noun: &str) -> impl Fn(usize) -> String + '_ {
    move |n| format!("{n} {noun}")
}

/// Run the full daily workflow in order.
pub async fn run(ctx: &PipelineContext, options: &WorkflowOptions) -> WorkflowSummary {
    let target = options.target_date;
    let results = options.results_date;
    info!(%target, %results, "starting workflow");

    let steps: Vec<(&'static str, bool, StepFuture<'_>)> = vec![
        (
            "scrape-tips",
            options.skip_scrape,
            Box::pin(async move { scrape_tips(ctx, target).await.map(count_detail("tips")) }),
        ),
        (
            "scrape-odds",
            options.skip_scrape,
            Box::pin(async move { scrape_odds(ctx, target).await.map(count_detail("fixtures")) }),
        ),
        (
            "match",
            options.skip_match,
            Box::pin(async move { match_fixtures(ctx, target).await.map(count_detail("records")) }),
        ),
        (
            "merge-results",
            options.skip_merge,
            Box::pin(async move { merge_results(ctx, results).await.map(count_detail("records")) }),
        ),
        (
            "settle",
            options.skip_settle,
            Box::pin(async move {
                settle(ctx, results)
                    .await
                    .map(|s| format!("{} won, {} lost, {} pending", s.won, s.lost, s.still_pending))
            }),
        ),
        (
            "select-markets",
            options.skip_select,
            Box::pin(async move { select_markets(ctx, target).await.map(count_detail("records")) }),
        ),
        (
            "train",
            options.skip_train,
            Box::pin(async move {
                train(ctx).await.map(|r| {
                    format!(
                        "{} samples, outcome acc {:.3}",
                        r.labeled_samples,
                        r.outcome_accuracy.unwrap_or(f64::NAN)
                    )
                })
            }),
        ),
        (
            "predict",
            options.skip_predict,
            Box::pin(async move {
                predict(ctx, target, ModelPolicy::UseSaved)
                    .await
                    .map(count_detail("records"))
            }),
        ),
        (
            "place-bets",
            options.skip_bets,
            Box::pin(async move {
                place_bets(ctx, target, options.dry_run)
                    .await
                    .map(count_detail("bets"))
            }),
        ),
    ];

    let mut summary = WorkflowSummary {
        steps: Vec::with_capacity(steps.len()),
        halted: false,
    };
    for (name, skipped, fut) in steps {
        if summary.halted || skipped {
            summary.steps.push(StepOutcome {
                name,
                status: StepStatus::Skipped,
                detail: if summary.halted { "run halted".into() } else { "skipped".into() },
                duration_secs: 0.0,
            });
            continue;
        }
        info!(step = name, "running step");
        let started = Instant::now();
        let outcome = match fut.await {
            Ok(detail) => StepOutcome {
                name,
                status: StepStatus::Completed,
                detail,
                duration_secs: started.elapsed().as_secs_f64(),
            },
            Err(e) => {
                error!(step = name, "step failed: {e}");
                if options.stop_on_error {
                    summary.halted = true;
                }
                StepOutcome {
                    name,
                    status: StepStatus::Failed,
                    detail: e.to_string(),
                    duration_secs: started.elapsed().as_secs_f64(),
                }
            }
        };
        summary.steps.push(outcome);
    }

    print_summary(&summary);
    summary
}

fn print_summary(summary: &WorkflowSummary) {
    println!("\n{:=<72}", "");
    println!("WORKFLOW SUMMARY");
    println!("{:=<72}", "");
    for step in &summary.steps {
        let status = match step.status {
            StepStatus::Completed => "ok",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "skipped",
        };
        println!(
            "  {:<16} {:<8} {:>7.2}s  {}",
            step.name, status, step.duration_secs, step.detail
        );
    }
    let elapsed: f64 = summary.steps.iter().map(|s| s.duration_secs).sum();
    println!("{:=<72}", "");
    println!("Total elapsed: {elapsed:.2}s");
    if summary.halted {
        println!("Run halted by stop-on-error.");
    }
}
