//! Per-minute bucketing and fixed-capacity rolling windows.
//!
//! At startup the last seven days of rewards are bucketed per minute and used
//! to seed six rolling windows. After that, every poll tick appends the same
//! increment to all six windows.

use std::collections::{BTreeMap, VecDeque};

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use rust_decimal::Decimal;

use crate::types::RewardEvent;

pub const CAPACITY_M15: usize = 15;
pub const CAPACITY_H1: usize = 60;
pub const CAPACITY_H6: usize = 360;
pub const CAPACITY_H12: usize = 720;
pub const CAPACITY_H24: usize = 1440;
pub const CAPACITY_D7: usize = 10080;

/// History cutoffs (minutes before now) used when seeding each window.
/// The "1h" window is seeded from two hours of history and the "6h" window
/// from seven hours.
pub const SEED_CUTOFF_M15_MINUTES: i64 = 15;
pub const SEED_CUTOFF_H1_MINUTES: i64 = 2 * 60;
pub const SEED_CUTOFF_H6_MINUTES: i64 = 7 * 60;
pub const SEED_CUTOFF_H12_MINUTES: i64 = 12 * 60;
pub const SEED_CUTOFF_H24_MINUTES: i64 = 24 * 60;
pub const SEED_CUTOFF_D7_MINUTES: i64 = 7 * 24 * 60;

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Sum event amounts into one bucket per minute, covering every minute from
/// `start` to `now` inclusive. Minutes without events hold zero; events
/// outside the covered range are ignored.
pub fn bucket_by_minute(
    events: &[RewardEvent],
    start: NaiveDateTime,
    now: NaiveDateTime,
) -> BTreeMap<NaiveDateTime, Decimal> {
    let mut buckets = BTreeMap::new();
    let end = truncate_to_minute(now);
    let mut slot = truncate_to_minute(start);
    while slot <= end {
        buckets.insert(slot, Decimal::ZERO);
        slot += TimeDelta::minutes(1);
    }
    for event in events {
        if let Some(total) = buckets.get_mut(&truncate_to_minute(event.timestamp)) {
            *total += event.amount;
        }
    }
    buckets
}

/// Fixed-capacity queue of increments, oldest first.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<Decimal>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an increment, evicting the oldest one when full.
    pub fn push(&mut self, value: Decimal) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn sum(&self) -> Decimal {
        self.values.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decimal> {
        self.values.iter()
    }
}

/// The six rolling windows shown on the dashboard.
#[derive(Debug, Clone)]
pub struct RollingWindows {
    pub m15: RollingWindow,
    pub h1: RollingWindow,
    pub h6: RollingWindow,
    pub h12: RollingWindow,
    pub h24: RollingWindow,
    pub d7: RollingWindow,
}

impl Default for RollingWindows {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingWindows {
    pub fn new() -> Self {
        Self {
            m15: RollingWindow::new(CAPACITY_M15),
            h1: RollingWindow::new(CAPACITY_H1),
            h6: RollingWindow::new(CAPACITY_H6),
            h12: RollingWindow::new(CAPACITY_H12),
            h24: RollingWindow::new(CAPACITY_H24),
            d7: RollingWindow::new(CAPACITY_D7),
        }
    }

    /// Seed the windows from reward history.
    ///
    /// Buckets the last seven days per minute, skips any minute whose total
    /// exceeds `ceiling`, and appends each remaining minute (oldest first) to
    /// every window whose seeding cutoff it is strictly newer than. Window
    /// capacity then keeps only the most recent minutes.
    pub fn seed(events: &[RewardEvent], now: NaiveDateTime, ceiling: Decimal) -> Self {
        let qualifying: Vec<RewardEvent> = events
            .iter()
            .filter(|e| e.amount <= ceiling)
            .cloned()
            .collect();
        let start = truncate_to_minute(now - TimeDelta::minutes(SEED_CUTOFF_D7_MINUTES));
        let buckets = bucket_by_minute(&qualifying, start, now);

        let mut windows = Self::new();
        let cutoffs = [
            now - TimeDelta::minutes(SEED_CUTOFF_M15_MINUTES),
            now - TimeDelta::minutes(SEED_CUTOFF_H1_MINUTES),
            now - TimeDelta::minutes(SEED_CUTOFF_H6_MINUTES),
            now - TimeDelta::minutes(SEED_CUTOFF_H12_MINUTES),
            now - TimeDelta::minutes(SEED_CUTOFF_H24_MINUTES),
            start,
        ];
        for (minute, amount) in buckets {
            if amount > ceiling {
                continue;
            }
            let targets = [
                &mut windows.m15,
                &mut windows.h1,
                &mut windows.h6,
                &mut windows.h12,
                &mut windows.h24,
                &mut windows.d7,
            ];
            for (window, cutoff) in targets.into_iter().zip(cutoffs) {
                if minute > cutoff {
                    window.push(amount);
                }
            }
        }
        windows
    }

    /// Append the same increment to every window.
    pub fn push_all(&mut self, value: Decimal) {
        self.m15.push(value);
        self.h1.push(value);
        self.h6.push(value);
        self.h12.push(value);
        self.h24.push(value);
        self.d7.push(value);
    }

    /// Windows paired with their dashboard labels, shortest first.
    pub fn labelled(&self) -> [(&'static str, &RollingWindow); 6] {
        [
            ("15m", &self.m15),
            ("1h", &self.h1),
            ("6h", &self.h6),
            ("12h", &self.h12),
            ("24h", &self.h24),
            ("7d", &self.d7),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .and_then(|date| date.and_hms_opt(h, m, s))
            .expect("valid test datetime")
    }

    fn reward(height: u64, timestamp: NaiveDateTime, amount: Decimal) -> RewardEvent {
        RewardEvent {
            height,
            timestamp,
            amount,
        }
    }

    fn sums(w: &RollingWindows) -> Vec<Decimal> {
        w.labelled().iter().map(|(_, win)| win.sum()).collect()
    }

    // ── RollingWindow ──────────────────────────────────────────────

    #[test]
    fn window_evicts_oldest_at_capacity() {
        let mut w = RollingWindow::new(3);
        for v in [dec!(1), dec!(2), dec!(3), dec!(4)] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert!(w.is_full());
        assert_eq!(w.sum(), dec!(9));
        assert_eq!(w.iter().copied().collect::<Vec<_>>(), vec![dec!(2), dec!(3), dec!(4)]);
    }

    #[test]
    fn window_partial_fill() {
        let mut w = RollingWindow::new(15);
        w.push(dec!(0.5));
        assert_eq!(w.len(), 1);
        assert!(!w.is_full());
        assert_eq!(w.capacity(), 15);
        assert_eq!(w.sum(), dec!(0.5));
    }

    #[test]
    fn zero_capacity_window_stays_empty() {
        let mut w = RollingWindow::new(0);
        w.push(dec!(1));
        assert!(w.is_empty());
    }

    #[test]
    fn push_all_reaches_every_window() {
        let mut w = RollingWindows::new();
        w.push_all(dec!(10.0));
        assert!(sums(&w).iter().all(|s| *s == dec!(10.0)));
        assert!(w.labelled().iter().all(|(_, win)| win.len() == 1));
    }

    #[test]
    fn capacities_match_labels() {
        let w = RollingWindows::new();
        let caps: Vec<usize> = w.labelled().iter().map(|(_, win)| win.capacity()).collect();
        assert_eq!(caps, vec![15, 60, 360, 720, 1440, 10080]);
    }

    // ── bucket_by_minute ───────────────────────────────────────────

    #[test]
    fn buckets_fill_gaps_with_zero() {
        let events = vec![reward(1, at(1, 0, 2, 40), dec!(1.5))];
        let b = bucket_by_minute(&events, at(1, 0, 0, 0), at(1, 0, 4, 59));
        assert_eq!(b.len(), 5);
        assert_eq!(b[&at(1, 0, 0, 0)], Decimal::ZERO);
        assert_eq!(b[&at(1, 0, 2, 0)], dec!(1.5));
        assert_eq!(b[&at(1, 0, 4, 0)], Decimal::ZERO);
    }

    #[test]
    fn buckets_sum_same_minute() {
        let events = vec![
            reward(1, at(1, 0, 1, 5), dec!(0.0615)),
            reward(2, at(1, 0, 1, 50), dec!(0.0615)),
        ];
        let b = bucket_by_minute(&events, at(1, 0, 0, 0), at(1, 0, 1, 0));
        assert_eq!(b[&at(1, 0, 1, 0)], dec!(0.1230));
    }

    #[test]
    fn buckets_ignore_out_of_range() {
        let events = vec![
            reward(1, at(1, 23, 59, 0), dec!(1)),
            reward(2, at(2, 0, 10, 0), dec!(1)),
        ];
        let b = bucket_by_minute(&events, at(2, 0, 0, 0), at(2, 0, 5, 0));
        assert_eq!(b.values().copied().sum::<Decimal>(), Decimal::ZERO);
    }

    // ── seed ───────────────────────────────────────────────────────

    #[test]
    fn seed_places_event_by_horizon() {
        let now = at(8, 12, 0, 30);
        let events = vec![
            reward(10, at(8, 11, 50, 0), dec!(1)), // 10 minutes ago
            reward(9, at(8, 11, 30, 0), dec!(2)),  // 30 minutes ago
            reward(8, at(8, 8, 0, 0), dec!(4)),    // 4 hours ago
            reward(7, at(8, 2, 0, 0), dec!(8)),    // 10 hours ago
            reward(6, at(7, 18, 0, 0), dec!(16)),  // 18 hours ago
            reward(5, at(5, 12, 0, 0), dec!(32)),  // 3 days ago
        ];
        let w = RollingWindows::seed(&events, now, dec!(100));
        assert_eq!(w.m15.sum(), dec!(1));
        assert_eq!(w.h1.sum(), dec!(3));
        assert_eq!(w.h6.sum(), dec!(7));
        assert_eq!(w.h12.sum(), dec!(15));
        assert_eq!(w.h24.sum(), dec!(31));
        assert_eq!(w.d7.sum(), dec!(63));
    }

    #[test]
    fn seed_capacity_bounds_wider_cutoffs() {
        let now = at(8, 12, 0, 0);
        let events = vec![
            reward(2, at(8, 10, 30, 0), dec!(1)), // inside the 2h cutoff, 90 minutes ago
            reward(1, at(8, 5, 30, 0), dec!(2)),  // inside the 7h cutoff, 6.5 hours ago
        ];
        let w = RollingWindows::seed(&events, now, dec!(100));
        // Zero-filled minutes push the older minutes out of the capped windows
        assert_eq!(w.h1.sum(), Decimal::ZERO);
        assert_eq!(w.h6.sum(), dec!(1));
        assert_eq!(w.h12.sum(), dec!(3));
    }

    #[test]
    fn seed_truncates_to_capacity() {
        let now = at(8, 12, 0, 0);
        // One reward per minute for the last 30 minutes
        let events: Vec<RewardEvent> = (0..30)
            .map(|i| reward(100 + i, now - TimeDelta::minutes(i as i64), dec!(1)))
            .collect();
        let w = RollingWindows::seed(&events, now, dec!(100));
        assert_eq!(w.m15.len(), 15);
        assert_eq!(w.m15.sum(), dec!(15));
        assert_eq!(w.h1.len(), 60);
        assert_eq!(w.h1.sum(), dec!(30));
    }

    #[test]
    fn seed_fills_zero_minutes() {
        let now = at(8, 12, 0, 0);
        let w = RollingWindows::seed(&[], now, dec!(100));
        assert_eq!(w.m15.len(), 15);
        assert!(w.m15.is_full());
        assert!(w.d7.is_full());
        assert!(sums(&w).iter().all(|s| s.is_zero()));
    }

    #[test]
    fn seed_scenario_single_old_reward() {
        // 2024-01-01T00:05:00 worth 5.0, observed a few hours later
        let now = at(1, 6, 0, 0);
        let events = vec![reward(100, at(1, 0, 5, 0), dec!(5.0))];
        let w = RollingWindows::seed(&events, now, dec!(100));
        assert_eq!(w.h12.sum(), dec!(5.0));
        assert_eq!(w.h24.sum(), dec!(5.0));
        assert_eq!(w.d7.sum(), dec!(5.0));
        assert_eq!(w.h6.sum(), dec!(5.0));
        assert_eq!(w.h1.sum(), Decimal::ZERO);
        assert_eq!(w.m15.sum(), Decimal::ZERO);
    }

    #[test]
    fn seed_excludes_anomalies() {
        let now = at(8, 12, 0, 0);
        let events = vec![
            reward(2, at(8, 11, 55, 0), dec!(150)),
            reward(1, at(8, 11, 50, 0), dec!(1)),
        ];
        let w = RollingWindows::seed(&events, now, dec!(100));
        assert!(sums(&w).iter().all(|s| *s == dec!(1)));
    }

    #[test]
    fn seed_sum_never_exceeds_qualifying_total() {
        let now = at(8, 12, 0, 0);
        let events: Vec<RewardEvent> = (0..500)
            .map(|i| reward(i, now - TimeDelta::minutes(i as i64 * 7), dec!(0.0615)))
            .collect();
        let w = RollingWindows::seed(&events, now, dec!(100));
        let horizons = [
            SEED_CUTOFF_M15_MINUTES,
            SEED_CUTOFF_H1_MINUTES,
            SEED_CUTOFF_H6_MINUTES,
            SEED_CUTOFF_H12_MINUTES,
            SEED_CUTOFF_H24_MINUTES,
            SEED_CUTOFF_D7_MINUTES,
        ];
        for ((_, window), minutes) in w.labelled().iter().zip(horizons) {
            let cutoff = now - TimeDelta::minutes(minutes);
            let qualifying: Decimal = events
                .iter()
                .filter(|e| e.timestamp >= cutoff)
                .map(|e| e.amount)
                .sum();
            assert!(window.sum() <= qualifying);
        }
    }

    #[test]
    fn truncate_drops_seconds() {
        let t = at(1, 3, 4, 59);
        assert_eq!(truncate_to_minute(t), at(1, 3, 4, 0));
    }
}
