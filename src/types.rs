use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A coinbase reward (mini-block) credited to the monitored wallet.
///
/// `amount` is already converted to display units and `timestamp` is the
/// wall-clock time reported by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardEvent {
    pub height: u64,
    pub timestamp: NaiveDateTime,
    pub amount: Decimal,
}

/// Raw transfer entry as returned by the wallet's `GetTransfers` method.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferEntry {
    pub height: u64,
    /// RFC 3339 timestamp, possibly with an offset and fractional seconds.
    pub time: String,
    /// Amount in raw atomic units.
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeightResult {
    pub height: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResult {
    pub balance: u64,
}

/// `GetTransfers` result. The wallet omits `entries` (or sends null) when
/// nothing matches the filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransfersResult {
    #[serde(default)]
    pub entries: Option<Vec<TransferEntry>>,
}

/// Filter sent with `GetTransfers`.
#[derive(Debug, Clone, Serialize)]
pub struct TransfersFilter {
    pub coinbase: bool,
    pub min_height: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockResult {
    pub block_header: BlockHeader,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    /// Block time in epoch milliseconds.
    pub timestamp: u64,
    /// Network difficulty as a decimal integer string.
    pub difficulty: String,
}

/// Current market quote for the coin. Zeroed when the lookup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriceQuote {
    pub price: f64,
    pub change_24h: f64,
}

/// Result of folding one poll tick into a `WalletState`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Total newly confirmed reward for this tick, display units.
    pub diff: Decimal,
    /// Newly confirmed rewards, in the order the wallet returned them.
    pub found: Vec<RewardEvent>,
    /// Day evicted from the daily ledger if this tick crossed midnight.
    pub evicted_day: Option<chrono::NaiveDate>,
}

impl TickOutcome {
    /// Whether folding this tick logged anything (found rewards or a ledger
    /// rollover).
    pub fn logged(&self) -> bool {
        !self.found.is_empty() || self.evicted_day.is_some()
    }
}
