// src/models.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coingecko::MarketQuote;

/// On-chain coin descriptors, as served by `suix_getCoinMetadata`.
/// `decimals` drives every human-scaling conversion downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "iconUrl")]
    pub icon_url: Option<String>,
}

/// Outcome of the authoritative on-chain supply query. A sum type keyed by
/// `status`: the raw/human amounts are only reachable in the `ok` variant.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TotalSupply {
    Ok {
        raw: String,
        human: String,
        source: &'static str,
    },
    Unavailable {
        error: String,
    },
}

impl TotalSupply {
    pub fn onchain(raw: u128, decimals: u8) -> Self {
        TotalSupply::Ok {
            raw: raw.to_string(),
            human: humanize_amount(raw, decimals),
            source: "onchain",
        }
    }

    pub fn unavailable(error: String) -> Self {
        TotalSupply::Unavailable { error }
    }
}

/// Supply/price figures taken from the external aggregator when the
/// on-chain supply is structurally unavailable. Never authoritative: the
/// `source` tag keeps it distinguishable from on-chain data.
#[derive(Debug, Serialize)]
pub struct FallbackSupply {
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circulating_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_usd: Option<f64>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackSupply {
    pub fn ok(quote: MarketQuote) -> Self {
        FallbackSupply {
            source: "coingecko",
            circulating_supply: quote.circulating_supply,
            total_supply: quote.total_supply,
            price_usd: quote.price_usd,
            market_cap_usd: quote.market_cap_usd,
            status: "ok",
            error: None,
        }
    }

    pub fn unavailable(error: String) -> Self {
        FallbackSupply {
            source: "coingecko",
            circulating_supply: None,
            total_supply: None,
            price_usd: None,
            market_cap_usd: None,
            status: "unavailable",
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OwnerBalance {
    pub owner: String,
    pub raw: String,
    pub human: String,
}

/// Full per-token report: metadata, supply resolution outcome, optional
/// fallback and optional owner balance.
#[derive(Debug, Serialize)]
pub struct TokenReport {
    pub coin_type: String,
    pub metadata: TokenMetadata,
    pub total_supply: TotalSupply,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_fallback: Option<FallbackSupply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_balance: Option<OwnerBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_balance_error: Option<String>,
}

/// The `alphalend` section of the market report: either the resolved market
/// with scaled balances, or the failure with the table id for diagnosis.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AlphalendSection {
    Resolved {
        markets_table_id: String,
        market_object_id: String,
        balance_holding_raw: u64,
        balance_holding_human: String,
        borrowed_amount_raw: u64,
        borrowed_amount_human: String,
    },
    Failed {
        error: String,
        markets_table_id: String,
    },
}

#[derive(Debug, Serialize)]
pub struct MarketReport {
    pub coin_type: String,
    pub alphalend: AlphalendSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackSupply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_of_global_supply: Option<String>,
}

/// Scale a raw integer amount by `10^decimals` into a decimal string.
/// Exact: the raw value is re-scaled as a `Decimal`, never routed through
/// floating point. Trailing zeros are stripped ("1", not "1.00000000").
pub fn humanize_amount(raw: u128, decimals: u8) -> String {
    let Ok(value) = i128::try_from(raw) else {
        return raw.to_string();
    };
    match Decimal::try_from_i128_with_scale(value, u32::from(decimals)) {
        Ok(scaled) => scaled.normalize().to_string(),
        // Past Decimal's 96-bit mantissa or 28-digit scale; report raw.
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromStr;

    #[test]
    fn humanize_matches_known_market_values() {
        assert_eq!(humanize_amount(5_566_768_803, 8), "55.66768803");
        assert_eq!(humanize_amount(4_762_220_369, 8), "47.62220369");
    }

    #[test]
    fn humanize_zero_decimals_is_identity() {
        assert_eq!(humanize_amount(123_456, 0), "123456");
    }

    #[test]
    fn humanize_strips_trailing_zeros() {
        assert_eq!(humanize_amount(100_000_000, 8), "1");
        assert_eq!(humanize_amount(150_000_000, 8), "1.5");
        assert_eq!(humanize_amount(0, 8), "0");
    }

    #[test]
    fn humanize_keeps_sub_unit_amounts() {
        assert_eq!(humanize_amount(1, 8), "0.00000001");
    }

    #[test]
    fn humanize_round_trips_exactly() {
        let raw: u128 = 5_566_768_803;
        let human = humanize_amount(raw, 8);
        let back = Decimal::from_str(&human).unwrap() * Decimal::from(10u64.pow(8));
        assert_eq!(back, Decimal::from(raw as u64));
    }

    #[test]
    fn total_supply_serializes_by_status() {
        let ok = serde_json::to_value(TotalSupply::onchain(100, 2)).unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["raw"], "100");
        assert_eq!(ok["human"], "1");
        assert_eq!(ok["source"], "onchain");

        let missing = serde_json::to_value(TotalSupply::unavailable("RPC error".into())).unwrap();
        assert_eq!(missing["status"], "unavailable");
        assert_eq!(missing["error"], "RPC error");
        // The unavailable variant must not leak amount fields.
        assert!(missing.get("raw").is_none());
        assert!(missing.get("human").is_none());
    }

    #[test]
    fn fallback_unavailable_keeps_error_only() {
        let fb = serde_json::to_value(FallbackSupply::unavailable("timeout".into())).unwrap();
        assert_eq!(fb["source"], "coingecko");
        assert_eq!(fb["status"], "unavailable");
        assert_eq!(fb["error"], "timeout");
        assert!(fb.get("price_usd").is_none());
    }

    #[test]
    fn metadata_accepts_node_casing() {
        let meta: TokenMetadata = serde_json::from_str(
            r#"{"decimals":8,"name":"tBTC v2","symbol":"TBTC","description":"Bridged tBTC","iconUrl":"https://example.org/tbtc.svg","id":"0xabc"}"#,
        )
        .unwrap();
        assert_eq!(meta.decimals, 8);
        assert_eq!(meta.icon_url.as_deref(), Some("https://example.org/tbtc.svg"));
        // Serialized back out in snake_case for report consumers.
        let out = serde_json::to_value(&meta).unwrap();
        assert!(out.get("icon_url").is_some());
    }
}
