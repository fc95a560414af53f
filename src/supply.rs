// src/supply.rs
use tracing::{info, warn};

use crate::coingecko::CoinGeckoClient;
use crate::models::{FallbackSupply, TotalSupply};
use crate::rpc::{RpcError, SuiClient};

/// Fold the on-chain supply query into the report outcome, deciding whether
/// the fallback path may run.
///
/// Authoritative data always wins: on success no fallback is attempted.
/// A structurally absent TreasuryCap degrades to `unavailable` (keeping the
/// node's message verbatim) and opens the fallback path; any other failure
/// is a hard error of the supply step.
fn supply_outcome(
    result: Result<u128, RpcError>,
    decimals: u8,
) -> Result<(TotalSupply, bool), RpcError> {
    match result {
        Ok(raw) => Ok((TotalSupply::onchain(raw, decimals), false)),
        Err(e) if e.is_structural_absence() => {
            Ok((TotalSupply::unavailable(e.to_string()), true))
        }
        Err(e) => Err(e),
    }
}

/// Resolve the token's total supply: on-chain first, CoinGecko as the
/// tagged, non-authoritative fallback. External failures are absorbed into
/// `FallbackSupply` rather than raised, so the rest of the report stays valid.
pub async fn resolve_total_supply(
    client: &SuiClient,
    coingecko: &CoinGeckoClient,
    coin_type: &str,
    decimals: u8,
    allow_fallback: bool,
) -> Result<(TotalSupply, Option<FallbackSupply>), RpcError> {
    let (supply, structurally_absent) =
        supply_outcome(client.get_total_supply(coin_type).await, decimals)?;

    let fallback = if structurally_absent && allow_fallback {
        info!("On-chain supply unavailable for {}, falling back to CoinGecko", coin_type);
        Some(match coingecko.fetch_market_quote().await {
            Ok(quote) => FallbackSupply::ok(quote),
            Err(e) => {
                warn!("CoinGecko fallback failed: {}", e);
                FallbackSupply::unavailable(e.to_string())
            }
        })
    } else {
        None
    };

    Ok((supply, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_cap() -> RpcError {
        RpcError::Node {
            code: -32000,
            message: "Cannot find object [0x77..] in storage".to_string(),
        }
    }

    #[test]
    fn onchain_success_never_opens_fallback() {
        let (supply, wants_fallback) = supply_outcome(Ok(12_345_678), 8).unwrap();
        assert!(!wants_fallback);
        match supply {
            TotalSupply::Ok { raw, human, source } => {
                assert_eq!(raw, "12345678");
                assert_eq!(human, "0.12345678");
                assert_eq!(source, "onchain");
            }
            TotalSupply::Unavailable { .. } => panic!("expected ok supply"),
        }
    }

    #[test]
    fn structural_absence_degrades_and_opens_fallback() {
        let (supply, wants_fallback) = supply_outcome(Err(missing_cap()), 8).unwrap();
        assert!(wants_fallback);
        match supply {
            TotalSupply::Unavailable { error } => {
                // The node's message survives verbatim inside the report.
                assert!(error.contains("Cannot find object [0x77..] in storage"));
            }
            TotalSupply::Ok { .. } => panic!("expected unavailable supply"),
        }
    }

    #[test]
    fn transient_failure_is_a_hard_error() {
        let result = supply_outcome(
            Err(RpcError::Node {
                code: -32603,
                message: "Internal error".to_string(),
            }),
            8,
        );
        assert!(result.is_err());

        let result = supply_outcome(
            Err(RpcError::InvalidResponse("truncated body".to_string())),
            8,
        );
        assert!(result.is_err());
    }
}
