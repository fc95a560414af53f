// src/rpc.rs
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::TokenMetadata;

/// Failure of a single JSON-RPC round trip against a Sui fullnode.
///
/// `Node` carries the node-reported code and message verbatim so callers can
/// classify it; the other variants are transport-level and never structural.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error: HTTP {0}")]
    Status(StatusCode),

    #[error("invalid JSON response from node: {0}")]
    InvalidResponse(String),

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },
}

impl RpcError {
    /// Whether the node reported the "required object cannot be located"
    /// class of failure (e.g. no TreasuryCap for a bridged coin). The node's
    /// error format carries no stability guarantee, so the match lives here
    /// and nowhere else.
    pub fn is_structural_absence(&self) -> bool {
        let RpcError::Node { message, .. } = self else {
            return false;
        };
        let msg = message.to_ascii_lowercase();
        ["not found", "cannot find", "does not exist", "notexists"]
            .iter()
            .any(|needle| msg.contains(needle))
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    #[allow(dead_code)]
    id: Option<Value>,
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SupplyValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceValue {
    total_balance: String,
}

/// One object returned by `sui_getObject` / `suix_getDynamicFieldObject`.
/// The node answers with either `data` or `error`, never both.
#[derive(Debug, Deserialize)]
pub struct ObjectResponse {
    pub data: Option<ObjectData>,
    pub error: Option<ObjectResponseError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: String,
    #[allow(dead_code)]
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    /// Move struct content, `{ dataType, type, fields: {...} }`. Left as raw
    /// JSON; field extraction happens in `market`.
    pub content: Option<Value>,
}

/// Object-level error: `code` is e.g. "notExists", "dynamicFieldNotFound"
/// or "deleted".
#[derive(Debug, Deserialize)]
pub struct ObjectResponseError {
    pub code: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub object_id: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    pub parent_object_id: Option<String>,
}

impl ObjectResponseError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code.as_str(),
            "notExists" | "dynamicFieldNotFound" | "deleted"
        )
    }
}

/// Thin Sui JSON-RPC client. Stateless apart from the request-id counter;
/// a single instance serves any number of independent calls.
pub struct SuiClient {
    http: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl SuiClient {
    pub fn new(endpoint: &str) -> Result<Self, RpcError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        info!("📡 Sending {} → {}", method, self.endpoint);

        let resp = self.http.post(&self.endpoint).json(&payload).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(RpcError::Status(resp.status()));
        }

        let text = resp.text().await?;
        let envelope: RpcEnvelope =
            serde_json::from_str(&text).map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }

        // `result: null` is a legal answer (e.g. unknown coin metadata);
        // per-method result types decide whether null is acceptable.
        let result = envelope.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
    }

    /// `suix_getCoinMetadata`. `None` when the node knows no metadata for
    /// the coin type.
    pub async fn get_coin_metadata(
        &self,
        coin_type: &str,
    ) -> Result<Option<TokenMetadata>, RpcError> {
        self.call("suix_getCoinMetadata", json!([coin_type])).await
    }

    /// `suix_getTotalSupply`. Fails with a node error when the coin has no
    /// discoverable TreasuryCap (the normal case for bridged coins).
    pub async fn get_total_supply(&self, coin_type: &str) -> Result<u128, RpcError> {
        let supply: SupplyValue = self.call("suix_getTotalSupply", json!([coin_type])).await?;
        supply.value.parse().map_err(|_| {
            RpcError::InvalidResponse(format!("total supply is not an integer: {}", supply.value))
        })
    }

    /// `suix_getBalance`: aggregate balance of `owner` in `coin_type`.
    pub async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128, RpcError> {
        let balance: BalanceValue = self
            .call("suix_getBalance", json!([owner, coin_type]))
            .await?;
        balance.total_balance.parse().map_err(|_| {
            RpcError::InvalidResponse(format!(
                "total balance is not an integer: {}",
                balance.total_balance
            ))
        })
    }

    /// `sui_getObject` with type and content requested.
    pub async fn get_object(&self, object_id: &str) -> Result<ObjectResponse, RpcError> {
        self.call(
            "sui_getObject",
            json!([{
                "id": object_id,
                "options": { "showType": true, "showContent": true },
            }]),
        )
        .await
    }

    /// `suix_getDynamicFieldObject`: table entry under `parent_id` keyed by
    /// the already-derived dynamic field `name`.
    pub async fn get_dynamic_field_object(
        &self,
        parent_id: &str,
        name: &Value,
    ) -> Result<ObjectResponse, RpcError> {
        self.call("suix_getDynamicFieldObject", json!([parent_id, name]))
            .await
    }
}
