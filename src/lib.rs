pub mod api;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod notify;
pub mod reporter;
pub mod rpc;
pub mod state;
pub mod types;
pub mod window;

/// Default wallet RPC address (DERO HE wallet `--rpc-server` port)
pub const DEFAULT_WALLET_RPC: &str = "127.0.0.1:10103";

/// Path appended to bare `host:port` RPC addresses
pub const JSON_RPC_PATH: &str = "/json_rpc";

/// CoinGecko markets endpoint for the DERO/USD quote (public, no auth required)
pub const COINGECKO_DERO_URL: &str =
    "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd&ids=dero";
