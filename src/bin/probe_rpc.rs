//! Probe: wallet JSON-RPC
//!
//! Hits the wallet's `/json_rpc` endpoint and documents:
//! - GetHeight / GetBalance response shapes
//! - GetTransfers (coinbase only) entry fields and ordering
//! - Latency over multiple requests

use anyhow::Result;
use derohe_monitor::DEFAULT_WALLET_RPC;
use derohe_monitor::config::rpc_endpoint;
use serde_json::{Value, json};
use std::time::Instant;

async fn post(client: &reqwest::Client, url: &str, method: &str, params: Option<Value>) -> Result<Value> {
    let mut body = json!({"jsonrpc": "2.0", "id": "1", "method": method});
    if let Some(params) = params {
        body["params"] = params;
    }
    let resp = client.post(url).json(&body).send().await?;
    Ok(resp.json().await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_WALLET_RPC.to_string());
    let url = rpc_endpoint(&addr)?.to_string();
    let client = reqwest::Client::new();

    println!("=== Probe: wallet RPC ===");
    println!("Endpoint: {}", url);
    println!();

    // 1. GetHeight
    println!("--- 1. GetHeight ---");
    let start = Instant::now();
    let body = post(&client, &url, "GetHeight", None).await?;
    println!("Latency: {:?}", start.elapsed());
    println!("{}", serde_json::to_string_pretty(&body)?);
    let height = body
        .pointer("/result/height")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    println!();

    // 2. GetBalance
    println!("--- 2. GetBalance ---");
    let start = Instant::now();
    let body = post(&client, &url, "GetBalance", None).await?;
    println!("Latency: {:?}", start.elapsed());
    println!("{}", serde_json::to_string_pretty(&body)?);
    println!();

    // 3. GetTransfers over the last ~day of blocks
    println!("--- 3. GetTransfers (coinbase, last 5000 blocks) ---");
    let min_height = height.saturating_sub(5_000);
    let start = Instant::now();
    let body = post(
        &client,
        &url,
        "GetTransfers",
        Some(json!({"coinbase": true, "min_height": min_height})),
    )
    .await?;
    let latency = start.elapsed();
    let entries = body
        .pointer("/result/entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    println!("Returned {} entries from height {} (latency: {:?})", entries.len(), min_height, latency);
    for entry in entries.iter().take(3) {
        println!("{}", serde_json::to_string_pretty(entry)?);
    }
    let heights: Vec<u64> = entries
        .iter()
        .filter_map(|e| e.get("height").and_then(|v| v.as_u64()))
        .collect();
    let descending = heights.windows(2).all(|w| w[0] >= w[1]);
    println!("  Heights descending: {}", descending);
    println!();

    // 4. Latency measurements over 5 requests
    println!("--- 4. Latency over 5 requests (GetHeight) ---");
    let mut latencies = Vec::new();
    for i in 0..5 {
        let start = Instant::now();
        let _body = post(&client, &url, "GetHeight", None).await?;
        let latency = start.elapsed();
        println!("  Request {}: {:?}", i + 1, latency);
        latencies.push(latency);
    }
    let avg = latencies.iter().sum::<std::time::Duration>() / latencies.len() as u32;
    println!("  Average: {:?}", avg);
    println!();

    println!("=== Probe Complete ===");
    Ok(())
}
