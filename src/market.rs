// src/market.rs
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::info;

use crate::rpc::{ObjectResponseError, RpcError, SuiClient};

/// Graph-traversal failure; each step of the table → entry → object chain
/// fails with its own variant so diagnostics never collapse.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("markets table {0} not found on chain")]
    TableNotFound(String),

    #[error("no market entry for {coin_type} in table {table_id}")]
    MarketNotFound { table_id: String, coin_type: String },

    #[error("market object {object_id}: field `{field}` missing or malformed")]
    Decode {
        object_id: String,
        field: &'static str,
    },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// A lending market resolved out of the markets table, balances still raw.
#[derive(Debug)]
pub struct ResolvedMarket {
    pub markets_table_id: String,
    pub market_object_id: String,
    pub balance_holding: u64,
    pub borrowed_amount: u64,
}

/// Dynamic-field key for a coin's market entry. The table is keyed by Move
/// `TypeName` values, whose `name` is the coin type path without the `0x`
/// prefix.
pub fn dynamic_field_key(coin_type: &str) -> Value {
    json!({
        "type": "0x1::type_name::TypeName",
        "value": { "name": coin_type.trim_start_matches("0x") },
    })
}

/// Resolve the market entry for `coin_type` inside `markets_table_id` and
/// decode its pooled/borrowed balances.
pub async fn resolve_market(
    client: &SuiClient,
    markets_table_id: &str,
    coin_type: &str,
) -> Result<ResolvedMarket, MarketError> {
    // Probe the table itself first: a missing table and a missing entry
    // within an existing table are different failures.
    let table = client.get_object(markets_table_id).await?;
    if table.data.is_none() {
        return Err(match table.error {
            Some(err) if err.is_not_found() => {
                MarketError::TableNotFound(markets_table_id.to_string())
            }
            other => unexpected_response("markets table", markets_table_id, other),
        });
    }

    let key = dynamic_field_key(coin_type);
    let entry = client.get_dynamic_field_object(markets_table_id, &key).await?;
    let entry_data = match (entry.data, entry.error) {
        (Some(data), _) => data,
        (None, Some(err)) if err.is_not_found() => {
            return Err(MarketError::MarketNotFound {
                table_id: markets_table_id.to_string(),
                coin_type: coin_type.to_string(),
            });
        }
        (None, other) => return Err(unexpected_response("market entry", coin_type, other)),
    };

    let market_object_id = entry_data.object_id;
    info!("Resolved market entry {} for {}", market_object_id, coin_type);

    // Re-fetch the referenced object for its full content.
    let object = client.get_object(&market_object_id).await?;
    let content = object
        .data
        .and_then(|data| data.content)
        .ok_or_else(|| decode_err(&market_object_id, "content"))?;

    let (balance_holding, borrowed_amount) = decode_market_balances(&market_object_id, &content)?;

    Ok(ResolvedMarket {
        markets_table_id: markets_table_id.to_string(),
        market_object_id,
        balance_holding,
        borrowed_amount,
    })
}

fn decode_err(object_id: &str, field: &'static str) -> MarketError {
    MarketError::Decode {
        object_id: object_id.to_string(),
        field,
    }
}

// An object response with neither data nor a recognized not-found code is a
// node-side anomaly, not a structural absence.
fn unexpected_response(what: &str, id: &str, err: Option<ObjectResponseError>) -> MarketError {
    let detail = err.map_or_else(|| "no data".to_string(), |e| e.code);
    MarketError::Rpc(RpcError::InvalidResponse(format!("{what} {id}: {detail}")))
}

/// Extract `balance_holding` and `borrowed_amount` from a market object's
/// Move content. Fields are located by name inside
/// `content.fields.value.fields`, never by position.
fn decode_market_balances(object_id: &str, content: &Value) -> Result<(u64, u64), MarketError> {
    let fields = content
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| decode_err(object_id, "fields"))?;

    let value_fields = fields
        .get("value")
        .and_then(|v| v.get("fields"))
        .and_then(Value::as_object)
        .ok_or_else(|| decode_err(object_id, "value"))?;

    let balance_holding = u64_field(object_id, value_fields, "balance_holding")?;
    let borrowed_amount = u64_field(object_id, value_fields, "borrowed_amount")?;
    Ok((balance_holding, borrowed_amount))
}

// Move u64 values arrive as JSON strings; small ones occasionally as numbers.
fn u64_field(
    object_id: &str,
    fields: &Map<String, Value>,
    name: &'static str,
) -> Result<u64, MarketError> {
    match fields.get(name) {
        Some(Value::String(s)) => s.parse().map_err(|_| decode_err(object_id, name)),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| decode_err(object_id, name)),
        _ => Err(decode_err(object_id, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market_content() -> Value {
        json!({
            "dataType": "moveObject",
            "type": "0x2::dynamic_field::Field<0x1::type_name::TypeName, 0xc8a5::market::Market>",
            "fields": {
                "id": { "id": "0xfeed" },
                "name": {
                    "type": "0x1::type_name::TypeName",
                    "fields": { "name": "77045f1b9f811a7a8fb9ebd085b5b0c55c5cb0d1520ff55f7037f89b5da9f5f1::TBTC::TBTC" }
                },
                "value": {
                    "type": "0xc8a5::market::Market",
                    "fields": {
                        "coin_type": {
                            "type": "0x1::type_name::TypeName",
                            "fields": { "name": "77045f1b9f811a7a8fb9ebd085b5b0c55c5cb0d1520ff55f7037f89b5da9f5f1::TBTC::TBTC" }
                        },
                        "balance_holding": "5566768803",
                        "borrowed_amount": "4762220369"
                    }
                }
            }
        })
    }

    #[test]
    fn key_encodes_type_path_without_prefix() {
        let key = dynamic_field_key(
            "0x77045f1b9f811a7a8fb9ebd085b5b0c55c5cb0d1520ff55f7037f89b5da9f5f1::TBTC::TBTC",
        );
        assert_eq!(key["type"], "0x1::type_name::TypeName");
        assert_eq!(
            key["value"]["name"],
            "77045f1b9f811a7a8fb9ebd085b5b0c55c5cb0d1520ff55f7037f89b5da9f5f1::TBTC::TBTC"
        );
    }

    #[test]
    fn decodes_well_formed_market_object() {
        let (holding, borrowed) = decode_market_balances("0xfeed", &market_content()).unwrap();
        assert_eq!(holding, 5_566_768_803);
        assert_eq!(borrowed, 4_762_220_369);
    }

    #[test]
    fn numeric_field_encoding_is_accepted() {
        let mut content = market_content();
        content["fields"]["value"]["fields"]["balance_holding"] = json!(5566768803u64);
        let (holding, _) = decode_market_balances("0xfeed", &content).unwrap();
        assert_eq!(holding, 5_566_768_803);
    }

    #[test]
    fn missing_field_names_the_offender() {
        let mut content = market_content();
        content["fields"]["value"]["fields"]
            .as_object_mut()
            .unwrap()
            .remove("borrowed_amount");

        match decode_market_balances("0xfeed", &content) {
            Err(MarketError::Decode { object_id, field }) => {
                assert_eq!(object_id, "0xfeed");
                assert_eq!(field, "borrowed_amount");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn mistyped_field_is_a_decode_error() {
        let mut content = market_content();
        content["fields"]["value"]["fields"]["balance_holding"] = json!(true);
        assert!(matches!(
            decode_market_balances("0xfeed", &content),
            Err(MarketError::Decode { field: "balance_holding", .. })
        ));
    }

    #[test]
    fn missing_value_wrapper_is_a_decode_error() {
        let content = json!({ "fields": { "name": {} } });
        assert!(matches!(
            decode_market_balances("0xfeed", &content),
            Err(MarketError::Decode { field: "value", .. })
        ));
    }

    #[test]
    fn table_and_entry_failures_stay_distinct() {
        let table_missing = MarketError::TableNotFound("0x2326".to_string());
        let entry_missing = MarketError::MarketNotFound {
            table_id: "0x2326".to_string(),
            coin_type: "0x77::TBTC::TBTC".to_string(),
        };
        assert!(table_missing.to_string().contains("0x2326"));
        assert!(entry_missing.to_string().contains("no market entry"));
        assert_ne!(table_missing.to_string(), entry_missing.to_string());
    }
}
