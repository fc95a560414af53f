use dotenvy::dotenv;
use eyre::Result;
use serde::Deserialize;
use std::env;
use tracing::info;

/// Sui mainnet fullnode JSON-RPC endpoint.
pub const SUI_MAINNET_RPC: &str = "https://fullnode.mainnet.sui.io:443";

/// Bridged tBTC coin type on Sui mainnet.
pub const TBTC_COIN_TYPE: &str =
    "0x77045f1b9f811a7a8fb9ebd085b5b0c55c5cb0d1520ff55f7037f89b5da9f5f1::TBTC::TBTC";

/// AlphaLend markets table (Table<TypeName, Market>) on Sui mainnet.
/// See https://docs.alphafi.xyz/alphalend/developers/contract-and-object-ids
pub const ALPHALEND_MARKETS_TABLE_ID: &str =
    "0x2326d387ba8bb7d24aa4cfa31f9a1e58bf9234b097574afb06c5dfb267df4c2e";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    pub coin_type: String,
    pub markets_table_id: String,
    pub coingecko_id: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_retries: u32,
    pub owner: Option<String>,
    pub allow_fallback: bool,
    pub port: u16,
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // Load from .env file

    // Sui JSON-RPC endpoint (default: mainnet fullnode)
    let rpc_url = env::var("SUI_RPC")
        .or_else(|_| env::var("RPC_URL")) // alias support
        .unwrap_or_else(|_| SUI_MAINNET_RPC.to_string());

    // Coin type to resolve (default: bridged tBTC)
    let coin_type = env::var("TBTC_COIN_TYPE").unwrap_or_else(|_| TBTC_COIN_TYPE.to_string());

    // AlphaLend markets table holding per-coin market entries
    let markets_table_id =
        env::var("MARKETS_TABLE_ID").unwrap_or_else(|_| ALPHALEND_MARKETS_TABLE_ID.to_string());

    // CoinGecko coin id used by the supply fallback
    let coingecko_id = env::var("COINGECKO_ID").unwrap_or_else(|_| "tbtc".to_string());

    let coingecko_api_key = env::var("COINGECKO_API_KEY")
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    // Retries for the external fallback fetch (default: 3)
    let coingecko_retries = env::var("COINGECKO_RETRIES")
        .unwrap_or_else(|_| "3".to_string())
        .parse()
        .unwrap_or(3);

    // Optional owner address whose tBTC balance is included in the report
    let owner = env::var("OWNER_ADDRESS")
        .ok()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty());

    // NO_FALLBACK=1 disables the CoinGecko fallback entirely
    let no_fallback = env::var("NO_FALLBACK")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // API port (default: 8000)
    let port = env::var("PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .unwrap_or(8000);

    let cfg = Config {
        rpc_url,
        coin_type,
        markets_table_id,
        coingecko_id,
        coingecko_api_key,
        coingecko_retries,
        owner,
        allow_fallback: !no_fallback,
        port,
    };

    info!(
        "Loaded config: rpc={} coin_type={} markets_table={} fallback={}",
        cfg.rpc_url, cfg.coin_type, cfg.markets_table_id, cfg.allow_fallback
    );

    Ok(cfg)
}
