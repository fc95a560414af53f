// src/report.rs
use eyre::{eyre, Result};
use rust_decimal::prelude::{FromPrimitive, FromStr};
use rust_decimal::Decimal;
use tracing::warn;

use crate::coingecko::CoinGeckoClient;
use crate::config::Config;
use crate::market::{self, MarketError};
use crate::models::{
    humanize_amount, AlphalendSection, MarketReport, OwnerBalance, TokenReport, TotalSupply,
};
use crate::rpc::SuiClient;
use crate::supply;

/// Build the full token report: metadata, supply resolution (with optional
/// fallback) and, when configured, the owner's balance. An owner-balance
/// failure degrades to `owner_balance_error`; it never sinks the report.
pub async fn build_token_report(cfg: &Config) -> Result<TokenReport> {
    let client = SuiClient::new(&cfg.rpc_url)?;
    let coingecko = CoinGeckoClient::new(
        &cfg.coingecko_id,
        cfg.coingecko_api_key.clone(),
        cfg.coingecko_retries,
    )?;

    let metadata = client
        .get_coin_metadata(&cfg.coin_type)
        .await?
        .ok_or_else(|| eyre!("coin metadata not found for {}", cfg.coin_type))?;

    let (total_supply, supply_fallback) = supply::resolve_total_supply(
        &client,
        &coingecko,
        &cfg.coin_type,
        metadata.decimals,
        cfg.allow_fallback,
    )
    .await?;

    let mut owner_balance = None;
    let mut owner_balance_error = None;
    if let Some(owner) = &cfg.owner {
        match client.get_balance(owner, &cfg.coin_type).await {
            Ok(raw) => {
                owner_balance = Some(OwnerBalance {
                    owner: owner.clone(),
                    raw: raw.to_string(),
                    human: humanize_amount(raw, metadata.decimals),
                });
            }
            Err(e) => {
                warn!("Balance lookup failed for {}: {}", owner, e);
                owner_balance_error = Some(e.to_string());
            }
        }
    }

    Ok(TokenReport {
        coin_type: cfg.coin_type.clone(),
        metadata,
        total_supply,
        supply_fallback,
        owner_balance,
        owner_balance_error,
    })
}

/// Build the lending-market report: the AlphaLend pooled/borrowed balances
/// for the coin plus the supply engine's fallback pricing context.
///
/// Structural market failures (table missing, entry missing, undecodable
/// object) are reported inside the `alphalend` section so the rest of the
/// document still gets populated; transient RPC failures abort.
pub async fn build_market_report(cfg: &Config) -> Result<MarketReport> {
    let client = SuiClient::new(&cfg.rpc_url)?;
    let coingecko = CoinGeckoClient::new(
        &cfg.coingecko_id,
        cfg.coingecko_api_key.clone(),
        cfg.coingecko_retries,
    )?;

    let metadata = client
        .get_coin_metadata(&cfg.coin_type)
        .await?
        .ok_or_else(|| eyre!("coin metadata not found for {}", cfg.coin_type))?;

    let alphalend = match market::resolve_market(&client, &cfg.markets_table_id, &cfg.coin_type)
        .await
    {
        Ok(m) => AlphalendSection::Resolved {
            markets_table_id: m.markets_table_id,
            market_object_id: m.market_object_id,
            balance_holding_raw: m.balance_holding,
            balance_holding_human: humanize_amount(m.balance_holding.into(), metadata.decimals),
            borrowed_amount_raw: m.borrowed_amount,
            borrowed_amount_human: humanize_amount(m.borrowed_amount.into(), metadata.decimals),
        },
        Err(MarketError::Rpc(e)) => return Err(e.into()),
        Err(e) => {
            warn!("Market resolution failed: {}", e);
            AlphalendSection::Failed {
                error: e.to_string(),
                markets_table_id: cfg.markets_table_id.clone(),
            }
        }
    };

    let (supply, fallback) = supply::resolve_total_supply(
        &client,
        &coingecko,
        &cfg.coin_type,
        metadata.decimals,
        cfg.allow_fallback,
    )
    .await?;

    // Global supply for the percent estimate: on-chain when resolved,
    // otherwise whatever the fallback reported.
    let global_supply = match (&supply, &fallback) {
        (TotalSupply::Ok { human, .. }, _) => Decimal::from_str(human).ok(),
        (_, Some(fb)) => fb
            .total_supply
            .or(fb.circulating_supply)
            .and_then(Decimal::from_f64),
        _ => None,
    };

    let percent_of_global_supply = match (&alphalend, global_supply) {
        (AlphalendSection::Resolved { balance_holding_raw, .. }, Some(global)) => {
            percent_of_global(*balance_holding_raw, metadata.decimals, global)
        }
        _ => None,
    };

    Ok(MarketReport {
        coin_type: cfg.coin_type.clone(),
        alphalend,
        fallback,
        percent_of_global_supply,
    })
}

/// Pooled holding as a percentage of the global supply, computed in exact
/// decimal arithmetic and rounded to six places.
fn percent_of_global(holding_raw: u64, decimals: u8, global_supply: Decimal) -> Option<String> {
    if global_supply <= Decimal::ZERO {
        return None;
    }
    let holding =
        Decimal::try_from_i128_with_scale(i128::from(holding_raw), u32::from(decimals)).ok()?;
    let percent = holding / global_supply * Decimal::from(100);
    Some(percent.round_dp(6).normalize().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_global_on_round_numbers() {
        // 50 tokens pooled out of a 200-token global supply.
        let pct = percent_of_global(5_000_000_000, 8, Decimal::from(200)).unwrap();
        assert_eq!(pct, "25");
    }

    #[test]
    fn percent_of_global_rounds_to_six_places() {
        let pct = percent_of_global(5_566_768_803, 8, Decimal::from(5189)).unwrap();
        // 55.66768803 / 5189 * 100 = 1.0728019...
        assert_eq!(pct, "1.072802");
    }

    #[test]
    fn zero_or_negative_global_supply_yields_no_estimate() {
        assert!(percent_of_global(5_000_000_000, 8, Decimal::ZERO).is_none());
        assert!(percent_of_global(5_000_000_000, 8, Decimal::from(-1)).is_none());
    }
}
