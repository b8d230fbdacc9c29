use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::ledger::{DailyLedger, DifficultyLedger};
use crate::types::RewardEvent;

/// Difficulty-to-hashrate conversion used by the power estimate:
/// `avg_difficulty * POWER_DIFFICULTY_FACTOR / POWER_BLOCK_DIVISOR / POWER_NORMALIZATION`.
const POWER_DIFFICULTY_FACTOR: f64 = 1_000_000.0;
const POWER_BLOCK_DIVISOR: f64 = 48_000.0;
const POWER_NORMALIZATION: f64 = 1_000.0;

/// Convert raw atomic units to display units.
pub fn raw_to_display(raw: u64, ratio: u64) -> Decimal {
    if ratio == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(raw) / Decimal::from(ratio)
}

/// Sum rewards strictly above `last_known_height`.
///
/// Returns the tick diff and the newly confirmed rewards in the order given
/// (the wallet returns newest first). Rewards above `ceiling` are dropped.
pub fn compute_tick_diff(
    events: &[RewardEvent],
    last_known_height: u64,
    ceiling: Decimal,
) -> (Decimal, Vec<RewardEvent>) {
    let found: Vec<RewardEvent> = events
        .iter()
        .filter(|e| e.height > last_known_height)
        .filter(|e| {
            let ok = e.amount <= ceiling;
            if !ok {
                debug!(height = e.height, amount = %e.amount, "dropping reward above ceiling");
            }
            ok
        })
        .cloned()
        .collect();
    let diff: Decimal = found.iter().map(|e| e.amount).sum();
    (diff, found)
}

/// Estimate mining power per day from reward totals and average difficulty.
///
/// Only days present in both ledgers appear in the result.
pub fn compute_power(
    ledger: &DailyLedger,
    difficulty: &DifficultyLedger,
    miniblock_worth: f64,
) -> BTreeMap<NaiveDate, f64> {
    if miniblock_worth <= 0.0 {
        return BTreeMap::new();
    }
    ledger
        .totals()
        .iter()
        .filter_map(|(day, total)| {
            let avg_difficulty = difficulty.get(*day)?;
            let reward = total.to_f64().unwrap_or(0.0);
            let miniblocks = reward / miniblock_worth;
            let power = miniblocks * (avg_difficulty * POWER_DIFFICULTY_FACTOR / POWER_BLOCK_DIVISOR)
                / POWER_NORMALIZATION;
            Some((*day, power))
        })
        .collect()
}

/// Estimated starting height for `days` of history, clamped at zero.
pub fn history_start_height(height: u64, days: usize, blocks_per_day: u64) -> u64 {
    height.saturating_sub(blocks_per_day.saturating_mul(days as u64))
}
