//! JSON-RPC transport — `eth_call`-backed implementation of the
//! [`ProfileReader`] capability.
//!
//! Feature-gated: the engine core never depends on this module. Bundled
//! submission is deliberately not implemented here; it requires the host's
//! smart-account signing stack, which is an external collaborator.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::ReadError;
use crate::external::ProfileReader;
use crate::profile::PlayerStats;
use crate::program::{decode_player_stats, encode_get_player_stats};
use crate::shared::AddressStr;

/// Reads player stats from the game contract over JSON-RPC.
pub struct RpcProfileReader {
    endpoint: String,
    contract: AddressStr,
    client: Client,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcProfileReader {
    pub fn new(endpoint: &str, contract: AddressStr) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            contract,
            client,
        }
    }
}

#[async_trait]
impl ProfileReader for RpcProfileReader {
    async fn read(&self, player: &AddressStr) -> Result<PlayerStats, ReadError> {
        let player_bytes = player.to_bytes().map_err(ReadError)?;
        let call_data = encode_get_player_stats(player_bytes);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": self.contract.as_str(),
                    "data": format!("0x{}", hex::encode(call_data)),
                },
                "latest",
            ],
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReadError(e.to_string()))?;

        let parsed: RpcResponse = resp.json().await.map_err(|e| ReadError(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ReadError(format!(
                "eth_call failed ({}): {}",
                err.code, err.message
            )));
        }

        let result = parsed
            .result
            .ok_or_else(|| ReadError("eth_call returned no result".into()))?;
        let raw = hex::decode(result.strip_prefix("0x").unwrap_or(&result))
            .map_err(|e| ReadError(e.to_string()))?;

        decode_player_stats(&raw)
    }
}
