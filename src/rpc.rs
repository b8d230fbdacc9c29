//! JSON-RPC 2.0 plumbing for the wallet and daemon endpoints.
//!
//! Every call is a single POST. Failures are surfaced as `RpcError`; the
//! monitor treats everything except a bad transfer timestamp as fatal.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::types::{
    BalanceResult, BlockHeader, BlockResult, HeightResult, TransferEntry, TransfersFilter,
    TransfersResult,
};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("rpc payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("rpc method {method} failed with code {code}: {message}")]
    Remote {
        method: &'static str,
        code: i64,
        message: String,
    },
    #[error("rpc method {0} returned no result")]
    MissingResult(&'static str),
    #[error("invalid timestamp {0:?}")]
    Timestamp(String),
    #[error("invalid difficulty {0:?}")]
    Difficulty(String),
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decode a raw JSON-RPC response body into the method's result type.
fn decode_response<R: DeserializeOwned>(method: &'static str, body: &str) -> Result<R, RpcError> {
    let envelope: RpcResponse<R> = serde_json::from_str(body)?;
    if let Some(err) = envelope.error {
        return Err(RpcError::Remote {
            method,
            code: err.code,
            message: err.message,
        });
    }
    envelope.result.ok_or(RpcError::MissingResult(method))
}

/// Minimal JSON-RPC 2.0 client over HTTP POST.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl JsonRpcClient {
    pub fn new(
        endpoint: Url,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Option<Value>,
    ) -> Result<R, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "1",
            method,
            params,
        };
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Status(status));
        }
        let body = resp.text().await?;
        debug!(method, bytes = body.len(), endpoint = %self.endpoint, "rpc response");
        decode_response(method, &body)
    }
}

/// Typed client for the wallet RPC server.
#[derive(Debug, Clone)]
pub struct WalletClient {
    rpc: JsonRpcClient,
}

impl WalletClient {
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }

    pub fn endpoint(&self) -> &Url {
        self.rpc.endpoint()
    }

    pub async fn get_height(&self) -> Result<u64, RpcError> {
        let res: HeightResult = self.rpc.call("GetHeight", None).await?;
        Ok(res.height)
    }

    /// Wallet balance in raw atomic units.
    pub async fn get_balance(&self) -> Result<u64, RpcError> {
        let res: BalanceResult = self.rpc.call("GetBalance", None).await?;
        Ok(res.balance)
    }

    /// Coinbase transfers at or above `min_height`, newest first.
    pub async fn get_coinbase_transfers(
        &self,
        min_height: u64,
    ) -> Result<Vec<TransferEntry>, RpcError> {
        let filter = TransfersFilter {
            coinbase: true,
            min_height,
        };
        let params = serde_json::to_value(filter)?;
        let res: TransfersResult = self.rpc.call("GetTransfers", Some(params)).await?;
        Ok(res.entries.unwrap_or_default())
    }
}

/// Typed client for the daemon RPC server.
#[derive(Debug, Clone)]
pub struct NodeClient {
    rpc: JsonRpcClient,
}

impl NodeClient {
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }

    pub fn endpoint(&self) -> &Url {
        self.rpc.endpoint()
    }

    pub async fn get_height(&self) -> Result<u64, RpcError> {
        let res: HeightResult = self.rpc.call("DERO.GetHeight", None).await?;
        Ok(res.height)
    }

    pub async fn get_block_header(&self, height: u64) -> Result<BlockHeader, RpcError> {
        let params = serde_json::json!({ "height": height });
        let res: BlockResult = self.rpc.call("DERO.GetBlock", Some(params)).await?;
        Ok(res.block_header)
    }
}

/// Parse a wallet transfer timestamp, keeping its wall-clock time and
/// discarding any UTC offset.
pub fn parse_transfer_time(raw: &str) -> Result<NaiveDateTime, RpcError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| RpcError::Timestamp(raw.to_string()))
}

/// Parse a block header difficulty (decimal integer string).
pub fn parse_difficulty(raw: &str) -> Result<u128, RpcError> {
    raw.trim()
        .parse::<u128>()
        .map_err(|_| RpcError::Difficulty(raw.to_string()))
}
