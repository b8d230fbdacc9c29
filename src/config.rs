use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{COINGECKO_DERO_URL, DEFAULT_WALLET_RPC, JSON_RPC_PATH};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// RPC endpoints and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Wallet RPC address (`host:port` or full URL).
    #[serde(default = "default_wallet")]
    pub wallet: String,
    /// Daemon RPC address used for difficulty and power estimates.
    #[serde(default)]
    pub node: Option<String>,
    /// Second wallet shown as an extra earnings row.
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

/// Polling and accounting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Polling interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Raw atomic units per display unit.
    #[serde(default = "default_ratio")]
    pub ratio: u64,
    /// Rewards above this many display units are treated as anomalies.
    #[serde(default = "default_reward_ceiling")]
    pub reward_ceiling: u64,
    /// Days kept in the daily histogram.
    #[serde(default = "default_day_range")]
    pub day_range: usize,
    /// Alert after this many consecutive reward-less polls (0 disables).
    #[serde(default)]
    pub notify_count: u32,
    /// Rough block count per day, used to bound the history query.
    #[serde(default = "default_blocks_per_day")]
    pub blocks_per_day_estimate: u64,
    /// Blocks sampled from the daemon to average difficulty.
    #[serde(default = "default_difficulty_sample_blocks")]
    pub difficulty_sample_blocks: u64,
}

/// Dashboard rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Reward value of one mini-block in display units.
    #[serde(default = "default_miniblock_worth")]
    pub miniblock_worth: f64,
    /// Maximum bar length in the daily graphs.
    #[serde(default = "default_graph_width")]
    pub graph_width: usize,
    #[serde(default = "default_price_url")]
    pub price_url: String,
}

fn default_wallet() -> String {
    DEFAULT_WALLET_RPC.to_string()
}

fn default_connect_timeout() -> u64 {
    9
}

fn default_read_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    30
}

fn default_ratio() -> u64 {
    100_000
}

fn default_reward_ceiling() -> u64 {
    100
}

fn default_day_range() -> usize {
    7
}

fn default_blocks_per_day() -> u64 {
    5000
}

fn default_difficulty_sample_blocks() -> u64 {
    35_000
}

fn default_miniblock_worth() -> f64 {
    0.0615
}

fn default_graph_width() -> usize {
    50
}

fn default_price_url() -> String {
    COINGECKO_DERO_URL.to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            wallet: default_wallet(),
            node: None,
            secondary: None,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            ratio: default_ratio(),
            reward_ceiling: default_reward_ceiling(),
            day_range: default_day_range(),
            notify_count: 0,
            blocks_per_day_estimate: default_blocks_per_day(),
            difficulty_sample_blocks: default_difficulty_sample_blocks(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            miniblock_worth: default_miniblock_worth(),
            graph_width: default_graph_width(),
            price_url: default_price_url(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rpc_server: Option<String>,
    pub node_rpc_server: Option<String>,
    pub secondary_rpc_server: Option<String>,
    pub notify_count: Option<u32>,
    pub day_range: Option<usize>,
    pub one_shot: bool,
}

/// Immutable runtime configuration for one monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub wallet_url: Url,
    pub node_url: Option<Url>,
    pub secondary_url: Option<Url>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub poll_interval: Duration,
    pub ratio: u64,
    pub reward_ceiling: Decimal,
    pub day_range: usize,
    pub notify_count: u32,
    pub blocks_per_day_estimate: u64,
    pub difficulty_sample_blocks: u64,
    pub miniblock_worth: f64,
    pub graph_width: usize,
    pub price_url: String,
    pub one_shot: bool,
}

impl MonitorConfig {
    /// Merge the file config with command-line overrides and validate.
    pub fn resolve(app: AppConfig, overrides: Overrides) -> Result<Self> {
        let wallet = overrides.rpc_server.unwrap_or(app.rpc.wallet);
        let node = overrides.node_rpc_server.or(app.rpc.node);
        let secondary = overrides.secondary_rpc_server.or(app.rpc.secondary);
        let day_range = overrides.day_range.unwrap_or(app.settings.day_range);
        let notify_count = overrides.notify_count.unwrap_or(app.settings.notify_count);

        if day_range == 0 {
            anyhow::bail!("day range must be at least 1");
        }
        if app.settings.ratio == 0 {
            anyhow::bail!("settings.ratio must be positive");
        }
        if app.settings.poll_interval_secs == 0 {
            anyhow::bail!("settings.poll_interval_secs must be positive");
        }
        if app.display.miniblock_worth <= 0.0 {
            anyhow::bail!("display.miniblock_worth must be positive");
        }

        Ok(Self {
            wallet_url: rpc_endpoint(&wallet)?,
            node_url: node.as_deref().map(rpc_endpoint).transpose()?,
            secondary_url: secondary.as_deref().map(rpc_endpoint).transpose()?,
            connect_timeout: Duration::from_secs(app.rpc.connect_timeout_secs),
            read_timeout: Duration::from_secs(app.rpc.read_timeout_secs),
            poll_interval: Duration::from_secs(app.settings.poll_interval_secs),
            ratio: app.settings.ratio,
            reward_ceiling: Decimal::from(app.settings.reward_ceiling),
            day_range,
            notify_count,
            blocks_per_day_estimate: app.settings.blocks_per_day_estimate,
            difficulty_sample_blocks: app.settings.difficulty_sample_blocks,
            miniblock_worth: app.display.miniblock_worth,
            graph_width: app.display.graph_width,
            price_url: app.display.price_url,
            one_shot: overrides.one_shot,
        })
    }
}

/// Turn a `host:port` address into a JSON-RPC endpoint URL. Full URLs are
/// accepted as-is; a bare root path gets `/json_rpc` appended.
pub fn rpc_endpoint(addr: &str) -> Result<Url> {
    let addr = addr.trim();
    let raw = if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };
    let mut url = Url::parse(&raw).with_context(|| format!("invalid RPC address {addr:?}"))?;
    if url.path() == "/" || url.path().is_empty() {
        url.set_path(JSON_RPC_PATH);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let app = AppConfig::parse("").unwrap();
        assert_eq!(app.rpc.wallet, "127.0.0.1:10103");
        assert_eq!(app.settings.poll_interval_secs, 30);
        assert_eq!(app.settings.ratio, 100_000);
        assert_eq!(app.settings.day_range, 7);
        assert_eq!(app.display.graph_width, 50);
        assert!(app.rpc.node.is_none());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let app = AppConfig::parse(
            r#"
            [rpc]
            node = "127.0.0.1:10102"

            [settings]
            day_range = 14
            notify_count = 20
            "#,
        )
        .unwrap();
        assert_eq!(app.rpc.wallet, "127.0.0.1:10103");
        assert_eq!(app.rpc.node.as_deref(), Some("127.0.0.1:10102"));
        assert_eq!(app.rpc.read_timeout_secs, 120);
        assert_eq!(app.settings.day_range, 14);
        assert_eq!(app.settings.notify_count, 20);
        assert_eq!(app.settings.reward_ceiling, 100);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(AppConfig::parse("[settings]\nday_range = \"seven\"").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let app = AppConfig::load_or_default(Path::new("does-not-exist/config.toml")).unwrap();
        assert_eq!(app.settings.poll_interval_secs, 30);
    }

    #[test]
    fn resolve_applies_overrides() {
        let overrides = Overrides {
            rpc_server: Some("10.0.0.2:20000".to_string()),
            node_rpc_server: Some("10.0.0.3:10102".to_string()),
            day_range: Some(3),
            notify_count: Some(10),
            one_shot: true,
            ..Default::default()
        };
        let cfg = MonitorConfig::resolve(AppConfig::default(), overrides).unwrap();
        assert_eq!(cfg.wallet_url.as_str(), "http://10.0.0.2:20000/json_rpc");
        assert_eq!(
            cfg.node_url.as_ref().map(|u| u.as_str()),
            Some("http://10.0.0.3:10102/json_rpc")
        );
        assert!(cfg.secondary_url.is_none());
        assert_eq!(cfg.day_range, 3);
        assert_eq!(cfg.notify_count, 10);
        assert_eq!(cfg.reward_ceiling, dec!(100));
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert!(cfg.one_shot);
    }

    #[test]
    fn resolve_rejects_zero_day_range() {
        let overrides = Overrides {
            day_range: Some(0),
            ..Default::default()
        };
        assert!(MonitorConfig::resolve(AppConfig::default(), overrides).is_err());
    }

    #[test]
    fn resolve_rejects_zero_ratio() {
        let mut app = AppConfig::default();
        app.settings.ratio = 0;
        assert!(MonitorConfig::resolve(app, Overrides::default()).is_err());
    }

    #[test]
    fn endpoint_from_full_url() {
        let url = rpc_endpoint("https://wallet.example:443/json_rpc").unwrap();
        assert_eq!(url.as_str(), "https://wallet.example/json_rpc");
        let url = rpc_endpoint("http://127.0.0.1:10103").unwrap();
        assert_eq!(url.path(), "/json_rpc");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(rpc_endpoint("http://").is_err());
    }
}
