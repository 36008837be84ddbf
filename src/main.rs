//! Daily value-betting pipeline CLI
//!
//! One subcommand per pipeline step plus `workflow` to chain them all.

use betflow::{
    config::{self, Config},
    error::PipelineError,
    ml::{train_models, ModelPolicy, ModelStore, TrainTargets},
    storage::{self, Stage},
    types::CombinedRecord,
    workflow::{self, PipelineContext, WorkflowOptions},
};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "betflow.toml";

#[derive(Parser)]
#[command(name = "betflow")]
#[command(about = "Daily odds/tips scraping, model training and bet placement pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape tipping-site predictions for a date
    ScrapeTips {
        /// Date (YYYY-MM-DD), default tomorrow SAST
        #[arg(long)]
        date: Option<String>,
        /// Also write the scraped records to this file
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Scrape bookmaker odds for a date
    ScrapeOdds {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Fuzzy-join the day's odds and tips
    Match {
        #[arg(long)]
        date: Option<String>,
        /// Minimum per-team similarity (0-100)
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Scrape final scores and label the day's combined records
    MergeResults {
        /// Date (YYYY-MM-DD), default yesterday SAST
        #[arg(long)]
        date: Option<String>,
    },
    /// Settle pending bets against final scores
    Settle {
        #[arg(long)]
        date: Option<String>,
    },
    /// Apply the market rule table to the day's combined records
    SelectMarkets {
        #[arg(long)]
        date: Option<String>,
    },
    /// Train models from the accumulated merged history
    Train {
        /// Which model families to train
        #[arg(long, value_enum, default_value = "all")]
        model: ModelArg,
        /// Holdout fraction override
        #[arg(long)]
        test_size: Option<f64>,
    },
    /// Score the day's combined records with the trained models
    Predict {
        #[arg(long)]
        date: Option<String>,
        /// Retrain these families before predicting
        #[arg(long, value_enum)]
        model: Option<ModelArg>,
        /// Fail instead of training when no saved models exist
        #[arg(long)]
        no_train: bool,
        #[arg(long)]
        test_size: Option<f64>,
        /// Score records from this file instead of the combined stage
        #[arg(long)]
        input_file: Option<PathBuf>,
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Place the day's selected bets
    PlaceBets {
        #[arg(long)]
        date: Option<String>,
        /// Log planned bets without driving the browser
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the full daily pipeline
    Workflow {
        /// Target date for upcoming fixtures, default tomorrow SAST
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        skip_scrape: bool,
        #[arg(long)]
        skip_match: bool,
        #[arg(long)]
        skip_merge: bool,
        #[arg(long)]
        skip_settle: bool,
        #[arg(long)]
        skip_training: bool,
        #[arg(long)]
        skip_predict: bool,
        #[arg(long)]
        skip_select: bool,
        #[arg(long)]
        skip_betting: bool,
        /// Halt the run at the first failing step and exit non-zero
        #[arg(long)]
        stop_on_error: bool,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    All,
    Outcome,
    Goals,
    Markets,
}

impl From<ModelArg> for TrainTargets {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::All => TrainTargets::All,
            ModelArg::Outcome => TrainTargets::Outcome,
            ModelArg::Goals => TrainTargets::Goals,
            ModelArg::Markets => TrainTargets::Markets,
        }
    }
}

/// Wall-clock date in SAST (UTC+2, no DST).
fn sast_today() -> NaiveDate {
    (Utc::now() + Duration::hours(2)).date_naive()
}

fn default_target_date() -> NaiveDate {
    sast_today() + Duration::days(1)
}

fn default_results_date() -> NaiveDate {
    sast_today() - Duration::days(1)
}

fn resolve_date(arg: Option<String>, default: NaiveDate) -> Result<NaiveDate, PipelineError> {
    match arg {
        Some(s) => {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| PipelineError::InvalidDate(s))
        }
        None => Ok(default),
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Ok(Config::load(p)?),
        // Without --config the default file is optional.
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(Config::load(DEFAULT_CONFIG)?),
        None => Ok(Config::default()),
    }
}

/// Mirror a stage file to a caller-chosen path.
fn copy_stage_output(
    config: &Config,
    stage: Stage,
    date: NaiveDate,
    dest: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(dest) = dest {
        let src = storage::stage_path(&config.data_dir, stage, date);
        std::fs::copy(&src, dest)?;
        tracing::info!(path = %dest.display(), "wrote output copy");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    config::load_dotenv();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::ScrapeTips { date, output_file } => {
            let date = resolve_date(date, default_target_date())?;
            let ctx = PipelineContext::new(config).await?;
            let count = workflow::scrape_tips(&ctx, date).await?;
            tracing::info!(%date, count, "tips scraped");
            copy_stage_output(&ctx.config, Stage::Tips, date, output_file.as_deref())
        }
        Commands::ScrapeOdds { date, output_file } => {
            let date = resolve_date(date, default_target_date())?;
            let ctx = PipelineContext::new(config).await?;
            let count = workflow::scrape_odds(&ctx, date).await?;
            tracing::info!(%date, count, "odds scraped");
            copy_stage_output(&ctx.config, Stage::Odds, date, output_file.as_deref())
        }
        Commands::Match {
            date,
            threshold,
            output_file,
        } => {
            let date = resolve_date(date, default_target_date())?;
            let mut config = config;
            if let Some(threshold) = threshold {
                config.matcher.threshold = threshold;
            }
            let ctx = PipelineContext::new(config).await?;
            let count = workflow::match_fixtures(&ctx, date).await?;
            tracing::info!(%date, count, "fixtures matched");
            copy_stage_output(&ctx.config, Stage::Combined, date, output_file.as_deref())
        }
        Commands::MergeResults { date } => {
            let date = resolve_date(date, default_results_date())?;
            let ctx = PipelineContext::new(config).await?;
            let count = workflow::merge_results(&ctx, date).await?;
            tracing::info!(%date, count, "results merged");
            Ok(())
        }
        Commands::Settle { date } => {
            let date = resolve_date(date, default_results_date())?;
            let ctx = PipelineContext::new(config).await?;
            let summary = workflow::settle(&ctx, date).await?;
            tracing::info!(
                %date,
                won = summary.won,
                lost = summary.lost,
                pending = summary.still_pending,
                "bets settled"
            );
            Ok(())
        }
        Commands::SelectMarkets { date } => {
            let date = resolve_date(date, default_target_date())?;
            let ctx = PipelineContext::new(config).await?;
            let count = workflow::select_markets(&ctx, date).await?;
            tracing::info!(%date, count, "markets selected");
            Ok(())
        }
        Commands::Train { model, test_size } => {
            let mut config = config;
            if let Some(test_size) = test_size {
                config.trainer.test_size = test_size;
            }
            let merged = storage::load_all_merged(&config.data_dir)?;
            let report =
                train_models(&merged, &config.trainer, &config.model_dir(), model.into())?;
            tracing::info!(
                labeled = report.labeled_samples,
                train = report.train_samples,
                holdout = report.holdout_samples,
                "training finished"
            );
            if let Some(acc) = report.outcome_accuracy {
                tracing::info!(accuracy = format!("{acc:.3}"), "outcome holdout accuracy");
            }
            if let Some(rmse) = report.total_goals_rmse {
                tracing::info!(rmse = format!("{rmse:.3}"), "total-goals holdout rmse");
            }
            for (market, acc) in &report.market_accuracy {
                tracing::info!(market = market.as_str(), accuracy = format!("{acc:.3}"), "market holdout accuracy");
            }
            Ok(())
        }
        Commands::Predict {
            date,
            model,
            no_train,
            test_size,
            input_file,
            output_file,
        } => {
            let date = resolve_date(date, default_target_date())?;
            let mut config = config;
            if let Some(test_size) = test_size {
                config.trainer.test_size = test_size;
            }
            // An explicit --model forces a retrain of those families first.
            if let (Some(model), false) = (model, no_train) {
                let merged = storage::load_all_merged(&config.data_dir)?;
                train_models(&merged, &config.trainer, &config.model_dir(), model.into())?;
            }
            let policy = if no_train {
                ModelPolicy::UseSaved
            } else {
                ModelPolicy::TrainIfMissing
            };
            match input_file {
                Some(input) => {
                    let raw = std::fs::read_to_string(&input)?;
                    let combined: Vec<CombinedRecord> = serde_json::from_str(&raw)?;
                    let store = ModelStore::new(config.model_dir(), config.trainer.clone());
                    let handle = store.ensure(&config.data_dir, policy)?;
                    let predicted = handle.predict_all(&combined);
                    match output_file {
                        Some(dest) => {
                            let json = serde_json::to_string_pretty(&predicted)?;
                            std::fs::write(&dest, json)?;
                            tracing::info!(path = %dest.display(), count = predicted.len(), "predictions written");
                        }
                        None => {
                            storage::write_stage(
                                &config.data_dir,
                                Stage::Predictions,
                                date,
                                &predicted,
                            )?;
                            tracing::info!(%date, count = predicted.len(), "predictions written");
                        }
                    }
                    Ok(())
                }
                None => {
                    let ctx = PipelineContext::new(config).await?;
                    let count = workflow::predict(&ctx, date, policy).await?;
                    tracing::info!(%date, count, "records predicted");
                    copy_stage_output(&ctx.config, Stage::Predictions, date, output_file.as_deref())
                }
            }
        }
        Commands::PlaceBets { date, dry_run } => {
            let date = resolve_date(date, default_target_date())?;
            let ctx = PipelineContext::new(config).await?;
            let count = workflow::place_bets(&ctx, date, dry_run).await?;
            tracing::info!(%date, count, dry_run, "bets placed");
            Ok(())
        }
        Commands::Workflow {
            date,
            skip_scrape,
            skip_match,
            skip_merge,
            skip_settle,
            skip_training,
            skip_predict,
            skip_select,
            skip_betting,
            stop_on_error,
            dry_run,
        } => {
            let target_date = resolve_date(date, default_target_date())?;
            // Finished matches trail the betting target by two days.
            let results_date = target_date - Duration::days(2);
            let options = WorkflowOptions {
                target_date,
                results_date,
                skip_scrape,
                skip_match,
                skip_merge,
                skip_settle,
                skip_train: skip_training,
                skip_predict,
                skip_select,
                skip_bets: skip_betting,
                stop_on_error,
                dry_run,
            };
            let ctx = PipelineContext::new(config).await?;
            let summary = workflow::run(&ctx, &options).await;
            if summary.halted {
                anyhow::bail!(
                    "workflow halted after {} failed step(s)",
                    summary.failed_steps()
                );
            }
            Ok(())
        }
    }
}
