//! Daily value-betting pipeline
//!
//! Scrapes bookmaker odds and tipster predictions, fuzzy-joins them by
//! team names, trains gradient-boosted models on settled matches, flags
//! value bets, and places them through a browser session.
//!
//! ## Architecture
//!
//! ```text
//! Tips/Odds Clients → Matcher → Selector ─┬→ Automation → Settlement
//!                        │                │
//!                        └→ Merger → ML (Trainer/Predictor)
//! ```

pub mod automation;
pub mod client;
pub mod config;
pub mod error;
pub mod matcher;
pub mod merger;
pub mod ml;
pub mod selector;
pub mod settlement;
pub mod storage;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod config_tests;
