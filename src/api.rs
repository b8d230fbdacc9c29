use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::engine::raw_to_display;
use crate::ledger::DifficultyLedger;
use crate::rpc::{NodeClient, WalletClient, parse_difficulty, parse_transfer_time};
use crate::types::{PriceQuote, RewardEvent, TransferEntry};

/// Blocks between progress log lines while sampling difficulty.
const DIFFICULTY_PROGRESS_EVERY: u64 = 5_000;

/// Convert raw transfer entries into reward events.
///
/// Entries with an unparseable timestamp are dropped with a warning.
pub fn rewards_from_entries(entries: &[TransferEntry], ratio: u64) -> Vec<RewardEvent> {
    entries
        .iter()
        .filter_map(|entry| match parse_transfer_time(&entry.time) {
            Ok(timestamp) => Some(RewardEvent {
                height: entry.height,
                timestamp,
                amount: raw_to_display(entry.amount, ratio),
            }),
            Err(e) => {
                warn!(height = entry.height, "Dropping transfer: {e}");
                None
            }
        })
        .collect()
}

/// Fetch all coinbase rewards at or above `min_height`, newest first.
pub async fn fetch_rewards(
    wallet: &WalletClient,
    min_height: u64,
    ratio: u64,
) -> Result<Vec<RewardEvent>> {
    let entries = wallet
        .get_coinbase_transfers(min_height)
        .await
        .with_context(|| format!("failed to get transfers from {}", wallet.endpoint()))?;
    let rewards = rewards_from_entries(&entries, ratio);
    debug!("Fetched {} rewards from height {min_height}", rewards.len());
    Ok(rewards)
}

/// Local calendar day of a block timestamp in epoch milliseconds.
pub fn block_day(timestamp_ms: u64) -> Option<NaiveDate> {
    let ms = i64::try_from(timestamp_ms).ok()?;
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.date_naive())
}

/// Sample the last `sample_blocks` blocks from the daemon and average their
/// difficulty per day over the `days` days ending at `today`.
pub async fn fetch_difficulty_ledger(
    node: &NodeClient,
    sample_blocks: u64,
    days: usize,
    today: NaiveDate,
) -> Result<DifficultyLedger> {
    let height = node
        .get_height()
        .await
        .with_context(|| format!("failed to get height from {}", node.endpoint()))?;
    let start = height.saturating_sub(sample_blocks);
    info!("Sampling difficulty from blocks {start}..{height}");

    let mut samples = Vec::with_capacity((height - start) as usize);
    for h in start..height {
        let header = node
            .get_block_header(h)
            .await
            .with_context(|| format!("failed to get block {h} from {}", node.endpoint()))?;
        let difficulty = parse_difficulty(&header.difficulty)?;
        if let Some(day) = block_day(header.timestamp) {
            samples.push((day, difficulty));
        }
        if (h - start + 1) % DIFFICULTY_PROGRESS_EVERY == 0 {
            info!("Sampled {} / {} blocks", h - start + 1, height - start);
        }
    }

    let ledger = DifficultyLedger::from_samples(days, today, samples);
    debug!("Difficulty averages: {:?}", ledger.averages());
    Ok(ledger)
}

#[derive(Debug, Deserialize)]
struct CoinMarket {
    current_price: f64,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

fn quote_from_markets(markets: &[CoinMarket]) -> Option<PriceQuote> {
    let market = markets.first()?;
    let change = market.price_change_percentage_24h.unwrap_or(0.0);
    Some(PriceQuote {
        price: market.current_price,
        change_24h: (change * 100.0).round() / 100.0,
    })
}

async fn try_fetch_price_quote(http: &reqwest::Client, url: &str) -> Result<PriceQuote> {
    let markets: Vec<CoinMarket> = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    quote_from_markets(&markets).context("price lookup returned no markets")
}

/// Current price and 24h change. Any failure degrades to a zero quote.
pub async fn fetch_price_quote(http: &reqwest::Client, url: &str) -> PriceQuote {
    match try_fetch_price_quote(http, url).await {
        Ok(quote) => {
            debug!("Price quote: {quote:?}");
            quote
        }
        Err(e) => {
            info!("Price lookup unavailable, fiat values disabled: {e}");
            PriceQuote::default()
        }
    }
}
