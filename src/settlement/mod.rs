//! Bet settlement
//!
//! Resolves previously placed bets against scraped final scores. A bet
//! with no score yet (postponed, abandoned, or simply not finished)
//! stays pending and is retried on the next run. Failed placements are
//! never settled.

use crate::types::{BetRecord, BetStatus, ResultEntry, SettlementStatus};
use std::collections::HashMap;
use tracing::{debug, info};

/// Counts from one settlement pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SettlementSummary {
    pub won: usize,
    pub lost: usize,
    pub still_pending: usize,
    pub skipped: usize,
}

/// Settle pending bets in place; returns what changed.
pub fn settle_bets(bets: &mut [BetRecord], results: &[ResultEntry]) -> SettlementSummary {
    let by_id: HashMap<i64, &ResultEntry> = results.iter().map(|r| (r.match_id, r)).collect();

    let mut summary = SettlementSummary::default();
    for bet in bets.iter_mut() {
        if bet.status != BetStatus::Placed || bet.settlement_status != SettlementStatus::Pending {
            summary.skipped += 1;
            continue;
        }
        let score = bet.match_id.and_then(|id| by_id.get(&id)).map(|r| r.score);
        match score {
            Some(score) => {
                bet.settlement_status = bet.bet_type.settle(&score);
                debug!(
                    bet = %bet.id,
                    bet_type = bet.bet_type.as_str(),
                    score = format!("{}-{}", score.home_goals, score.away_goals),
                    outcome = ?bet.settlement_status,
                    "settled bet"
                );
                match bet.settlement_status {
                    SettlementStatus::Won => summary.won += 1,
                    SettlementStatus::Lost => summary.lost += 1,
                    _ => {}
                }
            }
            None => summary.still_pending += 1,
        }
    }
    info!(
        won = summary.won,
        lost = summary.lost,
        still_pending = summary.still_pending,
        skipped = summary.skipped,
        "settlement pass complete"
    );
    summary
}
