use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use tracing::info;

use derohe_monitor::api::{fetch_difficulty_ledger, fetch_price_quote, fetch_rewards};
use derohe_monitor::config::{AppConfig, CONFIG_PATH, MonitorConfig, Overrides};
use derohe_monitor::engine::{compute_power, history_start_height, raw_to_display};
use derohe_monitor::notify::{self, Notification};
use derohe_monitor::reporter::{self, DashboardView};
use derohe_monitor::rpc::{JsonRpcClient, NodeClient, WalletClient};
use derohe_monitor::state::{SessionState, WalletState};
use derohe_monitor::types::TickOutcome;

#[derive(Parser)]
#[command(name = "derohe-monitor", about = "DERO HE wallet mining reward monitor")]
struct Args {
    /// Wallet RPC address (host:port). Default 127.0.0.1:10103
    #[arg(long, env = "DERO_WALLET_RPC")]
    rpc_server: Option<String>,

    /// Daemon RPC address, enables difficulty and power graphs
    #[arg(long, env = "DERO_NODE_RPC")]
    node_rpc_server: Option<String>,

    /// Second wallet RPC address, shown as an extra earnings row
    #[arg(long)]
    secondary_rpc_server: Option<String>,

    /// Alert after this many consecutive polls without a reward (0 disables)
    #[arg(long)]
    notify_count: Option<u32>,

    /// Render the dashboard once and exit
    #[arg(long)]
    one_shot: bool,

    /// Number of days in the daily histogram. Default 7
    #[arg(long)]
    day_range: Option<usize>,

    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            rpc_server: self.rpc_server.clone(),
            node_rpc_server: self.node_rpc_server.clone(),
            secondary_rpc_server: self.secondary_rpc_server.clone(),
            notify_count: self.notify_count,
            day_range: self.day_range,
            one_shot: self.one_shot,
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn rpc_client(url: &url::Url, config: &MonitorConfig) -> Result<JsonRpcClient> {
    JsonRpcClient::new(url.clone(), config.connect_timeout, config.read_timeout)
        .with_context(|| format!("failed to build RPC client for {url}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let app = AppConfig::load_or_default(&args.config)?;
    let config = MonitorConfig::resolve(app, args.overrides())?;

    info!(
        "Starting monitor: wallet={} node={} secondary={} days={} notify_count={} poll={}s",
        config.wallet_url,
        config.node_url.as_ref().map_or("-".to_string(), |u| u.to_string()),
        config.secondary_url.as_ref().map_or("-".to_string(), |u| u.to_string()),
        config.day_range,
        config.notify_count,
        config.poll_interval.as_secs(),
    );

    // --- Bootstrap from RPC history ---
    let wallet = WalletClient::new(rpc_client(&config.wallet_url, &config)?);
    let mut primary = bootstrap_wallet(&wallet, &config).await?;

    let mut secondary = match &config.secondary_url {
        Some(url) => {
            let client = WalletClient::new(rpc_client(url, &config)?);
            let state = bootstrap_wallet(&client, &config).await?;
            Some((client, state))
        }
        None => None,
    };

    let price_http = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout)
        .build()
        .context("failed to build price client")?;
    let quote = fetch_price_quote(&price_http, &config.price_url).await;

    let difficulty = match &config.node_url {
        Some(url) => {
            let node = NodeClient::new(rpc_client(url, &config)?);
            let ledger = fetch_difficulty_ledger(
                &node,
                config.difficulty_sample_blocks,
                config.day_range,
                local_now().date(),
            )
            .await?;
            Some(ledger)
        }
        None => None,
    };

    let mut session = SessionState::new(quote, config.notify_count);

    // --- Polling loop ---
    info!(
        "Entering polling loop (interval: {}s). Press Ctrl+C to stop.",
        config.poll_interval.as_secs()
    );
    loop {
        let now = local_now();
        let outcome = poll_wallet(&wallet, &mut primary, &config, now).await?;
        session.screen_dirty |= outcome.logged();
        if let Some((client, state)) = secondary.as_mut() {
            let outcome = poll_wallet(client, state, &config, now).await?;
            session.screen_dirty |= outcome.logged();
        }
        session.ticks += 1;

        let absence_alert = session.absence.observe(primary.last_diff);
        let power = difficulty
            .as_ref()
            .map(|d| compute_power(&primary.ledger, d, config.miniblock_worth));

        let frame = reporter::render_dashboard(&DashboardView {
            config: &config,
            primary: &primary,
            secondary: secondary.as_ref().map(|(_, state)| state),
            difficulty: difficulty.as_ref(),
            power: power.as_ref(),
            quote: session.quote,
            now,
            absence_alert,
        });
        session.drawn_lines = reporter::redraw(
            &mut std::io::stdout().lock(),
            &frame,
            session.drawn_lines,
            config.poll_interval.as_secs(),
            session.screen_dirty,
        )
        .context("failed to write dashboard")?;

        session.screen_dirty = absence_alert.is_some();
        if let Some(polls) = absence_alert {
            notify::announce(&Notification::reward_absence(polls));
        }

        if config.one_shot {
            println!();
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("Shutdown signal received after {} polls", session.ticks);
                break;
            }
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }

    Ok(())
}

/// Build a wallet's state from its current height, balance and reward
/// history.
async fn bootstrap_wallet(client: &WalletClient, config: &MonitorConfig) -> Result<WalletState> {
    let height = client
        .get_height()
        .await
        .with_context(|| format!("failed to get height from {}", client.endpoint()))?;
    let min_height =
        history_start_height(height, config.day_range, config.blocks_per_day_estimate);
    info!(
        "Loading reward history for {} from height {min_height} (tip {height})",
        client.endpoint()
    );
    let history = fetch_rewards(client, min_height, config.ratio).await?;
    let balance = client
        .get_balance()
        .await
        .with_context(|| format!("failed to get balance from {}", client.endpoint()))?;
    info!("Loaded {} rewards", history.len());

    Ok(WalletState::bootstrap(
        height,
        raw_to_display(balance, config.ratio),
        &history,
        local_now(),
        config.day_range,
        config.reward_ceiling,
    ))
}

/// One polling tick for a wallet: detect new rewards, update aggregates,
/// announce each find and refresh the balance.
async fn poll_wallet(
    client: &WalletClient,
    state: &mut WalletState,
    config: &MonitorConfig,
    now: NaiveDateTime,
) -> Result<TickOutcome> {
    let height = client
        .get_height()
        .await
        .with_context(|| format!("failed to get height from {}", client.endpoint()))?;
    let transfers = if height > state.last_known_height {
        fetch_rewards(client, state.last_known_height, config.ratio).await?
    } else {
        Vec::new()
    };

    let outcome = state.apply_tick(height, &transfers, now.date(), config.reward_ceiling);
    for event in &outcome.found {
        notify::announce(&Notification::reward_found(event, now));
    }

    let balance = client
        .get_balance()
        .await
        .with_context(|| format!("failed to get balance from {}", client.endpoint()))?;
    state.balance = raw_to_display(balance, config.ratio);
    Ok(outcome)
}
