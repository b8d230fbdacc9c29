use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::info;

use crate::engine::compute_tick_diff;
use crate::ledger::DailyLedger;
use crate::types::{PriceQuote, RewardEvent, TickOutcome};
use crate::window::RollingWindows;

/// Aggregated reward state for one monitored wallet.
///
/// Rebuilt from RPC history at startup and mutated once per poll tick.
#[derive(Debug, Clone)]
pub struct WalletState {
    pub last_known_height: u64,
    pub windows: RollingWindows,
    pub ledger: DailyLedger,
    /// Balance in display units, refreshed every tick.
    pub balance: Decimal,
    /// Reward confirmed during the most recent tick.
    pub last_diff: Decimal,
}

impl WalletState {
    /// Seed windows and ledger from reward history fetched at startup.
    pub fn bootstrap(
        height: u64,
        balance: Decimal,
        history: &[RewardEvent],
        now: NaiveDateTime,
        days: usize,
        ceiling: Decimal,
    ) -> Self {
        Self {
            last_known_height: height,
            windows: RollingWindows::seed(history, now, ceiling),
            ledger: DailyLedger::from_events(days, now.date(), history, ceiling),
            balance,
            last_diff: Decimal::ZERO,
        }
    }

    /// Fold one poll tick into the state.
    ///
    /// `transfers` are the rewards fetched from `last_known_height` upward;
    /// they are only considered when `current_height` has advanced. The
    /// resulting diff (zero when nothing new arrived) goes into the ledger
    /// and is appended to every rolling window.
    pub fn apply_tick(
        &mut self,
        current_height: u64,
        transfers: &[RewardEvent],
        today: NaiveDate,
        ceiling: Decimal,
    ) -> TickOutcome {
        let (diff, found) = if current_height > self.last_known_height {
            let tick = compute_tick_diff(transfers, self.last_known_height, ceiling);
            self.last_known_height = current_height;
            tick
        } else {
            (Decimal::ZERO, Vec::new())
        };

        let evicted_day = self.ledger.record(today, diff);
        if let Some(day) = evicted_day {
            info!(%day, %today, "Daily ledger rolled over");
        }
        self.windows.push_all(diff);
        self.last_diff = diff;

        TickOutcome {
            diff,
            found,
            evicted_day,
        }
    }
}

/// Counts consecutive polls without a reward and fires once the count
/// exceeds the configured threshold.
#[derive(Debug, Clone, Default)]
pub struct AbsenceTracker {
    threshold: u32,
    zero_ticks: u32,
}

impl AbsenceTracker {
    /// A threshold of zero disables the alert.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            zero_ticks: 0,
        }
    }

    /// Record a tick. Returns the number of reward-less polls when the alert
    /// fires; the counter restarts afterwards.
    pub fn observe(&mut self, diff: Decimal) -> Option<u32> {
        if !diff.is_zero() {
            self.zero_ticks = 0;
            return None;
        }
        self.zero_ticks += 1;
        if self.threshold > 0 && self.zero_ticks > self.threshold {
            let polls = self.zero_ticks;
            self.zero_ticks = 0;
            return Some(polls);
        }
        None
    }

    pub fn zero_ticks(&self) -> u32 {
        self.zero_ticks
    }
}

/// Mutable state owned by the polling loop.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub quote: PriceQuote,
    pub absence: AbsenceTracker,
    /// Lines drawn by the previous frame, cleared before the next one.
    pub drawn_lines: usize,
    /// Set when log output followed the previous frame; the next redraw
    /// resets the screen instead of drawing over it.
    pub screen_dirty: bool,
    pub ticks: u64,
}

impl SessionState {
    pub fn new(quote: PriceQuote, notify_count: u32) -> Self {
        Self {
            quote,
            absence: AbsenceTracker::new(notify_count),
            drawn_lines: 0,
            screen_dirty: false,
            ticks: 0,
        }
    }
}
