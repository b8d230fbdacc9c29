//! Calendar-day ledgers: reward totals and average network difficulty.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeDelta};
use rust_decimal::Decimal;

use crate::types::RewardEvent;

/// Block difficulty is averaged and then divided by this to give GH/s-scale
/// figures on the dashboard.
pub const DIFFICULTY_SCALE: f64 = 1_000_000_000.0;

/// The `days` consecutive calendar days ending at `today`, oldest first.
fn day_range(days: usize, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..days).rev().map(move |offset| today - TimeDelta::days(offset as i64))
}

/// Rolling window of per-day reward totals.
///
/// Always holds exactly `days` consecutive days, the newest being the most
/// recent day a tick was recorded on.
#[derive(Debug, Clone)]
pub struct DailyLedger {
    days: usize,
    totals: BTreeMap<NaiveDate, Decimal>,
}

impl DailyLedger {
    /// `days` zero-valued days ending at `today`. A range of zero is treated
    /// as one day.
    pub fn new(days: usize, today: NaiveDate) -> Self {
        let days = days.max(1);
        let totals = day_range(days, today)
            .map(|day| (day, Decimal::ZERO))
            .collect();
        Self { days, totals }
    }

    /// Build the ledger from reward history. Events above `ceiling` and
    /// events outside the day range are ignored.
    pub fn from_events(
        days: usize,
        today: NaiveDate,
        events: &[RewardEvent],
        ceiling: Decimal,
    ) -> Self {
        let mut ledger = Self::new(days, today);
        for event in events {
            if event.amount > ceiling {
                continue;
            }
            if let Some(total) = ledger.totals.get_mut(&event.timestamp.date()) {
                *total += event.amount;
            }
        }
        ledger
    }

    /// Fold one tick's reward into the ledger.
    ///
    /// Same day as the newest entry: accumulate. A newer day: evict the
    /// oldest day and start the new one with `diff`. Returns the evicted day.
    /// Ticks dated before the newest day are ignored.
    pub fn record(&mut self, today: NaiveDate, diff: Decimal) -> Option<NaiveDate> {
        let newest = self.newest_day()?;
        if today == newest {
            if let Some(total) = self.totals.get_mut(&today) {
                *total += diff;
            }
            None
        } else if today > newest {
            let evicted = self.totals.pop_first().map(|(day, _)| day);
            self.totals.insert(today, diff);
            evicted
        } else {
            None
        }
    }

    pub fn newest_day(&self) -> Option<NaiveDate> {
        self.totals.last_key_value().map(|(day, _)| *day)
    }

    pub fn get(&self, day: NaiveDate) -> Option<Decimal> {
        self.totals.get(&day).copied()
    }

    pub fn totals(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.totals
    }

    /// Configured day range; the ledger always holds this many days.
    pub fn days(&self) -> usize {
        self.days
    }

}

/// Average network difficulty per calendar day, scaled by
/// `DIFFICULTY_SCALE`. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct DifficultyLedger {
    averages: BTreeMap<NaiveDate, f64>,
}

impl DifficultyLedger {
    /// Average `(day, difficulty)` samples over the `days` days ending at
    /// `today`. Days without samples average to zero; samples for other days
    /// are dropped.
    pub fn from_samples(
        days: usize,
        today: NaiveDate,
        samples: impl IntoIterator<Item = (NaiveDate, u128)>,
    ) -> Self {
        let mut acc: BTreeMap<NaiveDate, (f64, u64)> = day_range(days.max(1), today)
            .map(|day| (day, (0.0, 0)))
            .collect();
        for (day, difficulty) in samples {
            if let Some((sum, count)) = acc.get_mut(&day) {
                *sum += difficulty as f64;
                *count += 1;
            }
        }
        let averages = acc
            .into_iter()
            .map(|(day, (sum, count))| {
                let avg = if count == 0 {
                    0.0
                } else {
                    sum / count as f64 / DIFFICULTY_SCALE
                };
                (day, avg)
            })
            .collect();
        Self { averages }
    }

    pub fn get(&self, day: NaiveDate) -> Option<f64> {
        self.averages.get(&day).copied()
    }

    pub fn averages(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.averages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid test date")
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).expect("valid test time")
    }

    fn reward(height: u64, timestamp: NaiveDateTime, amount: Decimal) -> RewardEvent {
        RewardEvent {
            height,
            timestamp,
            amount,
        }
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ── DailyLedger ────────────────────────────────────────────────

    #[test]
    fn new_ledger_has_consecutive_zero_days() {
        let ledger = DailyLedger::new(7, day(10));
        assert_eq!(ledger.totals().len(), 7);
        let days: Vec<NaiveDate> = ledger.totals().keys().copied().collect();
        assert_eq!(days.first(), Some(&day(4)));
        assert_eq!(days.last(), Some(&day(10)));
        assert!(ledger.totals().values().all(|v| v.is_zero()));
    }

    #[test]
    fn new_ledger_crosses_month_boundary() {
        let ledger = DailyLedger::new(3, day(1));
        let days: Vec<String> = ledger.totals().keys().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2023-12-30", "2023-12-31", "2024-01-01"]);
    }

    #[test]
    fn zero_day_range_keeps_one_day() {
        let ledger = DailyLedger::new(0, day(5));
        assert_eq!(ledger.totals().len(), 1);
        assert_eq!(ledger.days(), 1);
    }

    #[test]
    fn from_events_scenario() {
        // 500000 raw / 100000 = 5.0 on 2024-01-01
        let events = vec![reward(100, at(1, 0, 5), dec!(5.0))];
        let ledger = DailyLedger::from_events(7, day(3), &events, dec!(100));
        assert_eq!(ledger.get(day(1)), Some(dec!(5.0)));
        assert_eq!(ledger.get(day(3)), Some(Decimal::ZERO));
    }

    #[test]
    fn from_events_ignores_out_of_range_and_anomalies() {
        let events = vec![
            reward(5, at(10, 1, 0), dec!(0.5)),
            reward(4, at(10, 2, 0), dec!(250)),
            reward(3, at(8, 23, 59), dec!(1)),
            reward(2, at(1, 12, 0), dec!(3)), // older than the range
        ];
        let ledger = DailyLedger::from_events(3, day(10), &events, dec!(100));
        assert_eq!(ledger.totals().len(), 3);
        assert_eq!(ledger.get(day(10)), Some(dec!(0.5)));
        assert_eq!(ledger.get(day(8)), Some(dec!(1)));
        assert_eq!(ledger.get(day(1)), None);
        let total: Decimal = ledger.totals().values().sum();
        assert_eq!(total, dec!(1.5));
    }

    #[test]
    fn record_same_day_accumulates() {
        let mut ledger = DailyLedger::new(7, day(10));
        assert_eq!(ledger.record(day(10), dec!(0.0615)), None);
        assert_eq!(ledger.record(day(10), dec!(0.0615)), None);
        assert_eq!(ledger.get(day(10)), Some(dec!(0.1230)));
        assert_eq!(ledger.totals().len(), 7);
    }

    #[test]
    fn record_rollover_evicts_oldest() {
        let mut ledger = DailyLedger::new(3, day(10));
        let evicted = ledger.record(day(11), dec!(10.0));
        assert_eq!(evicted, Some(day(8)));
        assert_eq!(ledger.totals().len(), 3);
        assert_eq!(ledger.newest_day(), Some(day(11)));
        assert_eq!(ledger.get(day(11)), Some(dec!(10.0)));
        assert_eq!(ledger.get(day(8)), None);
    }

    #[test]
    fn record_rollover_across_gap_still_one_eviction() {
        let mut ledger = DailyLedger::new(3, day(10));
        let evicted = ledger.record(day(13), dec!(1));
        assert_eq!(evicted, Some(day(8)));
        let days: Vec<NaiveDate> = ledger.totals().keys().copied().collect();
        assert_eq!(days, vec![day(9), day(10), day(13)]);
    }

    #[test]
    fn record_older_day_is_ignored() {
        let mut ledger = DailyLedger::new(3, day(10));
        assert_eq!(ledger.record(day(9), dec!(4)), None);
        assert_eq!(ledger.get(day(9)), Some(Decimal::ZERO));
    }

    #[test]
    fn size_invariant_over_many_ticks() {
        let mut ledger = DailyLedger::new(5, day(1));
        for i in 0..200u32 {
            let today = day(1) + TimeDelta::days((i / 7) as i64);
            ledger.record(today, dec!(0.0615));
            assert_eq!(ledger.totals().len(), 5);
        }
    }

    // ── DifficultyLedger ───────────────────────────────────────────

    #[test]
    fn difficulty_averages_per_day() {
        let samples = vec![
            (day(9), 2_000_000_000u128),
            (day(9), 4_000_000_000),
            (day(10), 1_500_000_000),
            (day(1), 9_000_000_000), // outside range
        ];
        let ledger = DifficultyLedger::from_samples(3, day(10), samples);
        assert_eq!(ledger.averages().len(), 3);
        assert!(approx_eq(ledger.get(day(9)).unwrap(), 3.0));
        assert!(approx_eq(ledger.get(day(10)).unwrap(), 1.5));
        assert!(approx_eq(ledger.get(day(8)).unwrap(), 0.0));
        assert_eq!(ledger.get(day(1)), None);
    }
}
