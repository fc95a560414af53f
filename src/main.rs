mod api;
mod coingecko;
mod config;
mod market;
mod models;
mod report;
mod rpc;
mod supply;

use tracing::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr) // keep stdout clean for the JSON report
        .with_target(false)
        .init();

    let cfg = config::load()?;

    // Modes: default prints the full token report, `market` the AlphaLend
    // market report, `serve` runs the HTTP API.
    match std::env::args().nth(1).as_deref() {
        Some("serve") => {
            info!("Starting sui-tbtc-supply API on port {}", cfg.port);
            api::serve(cfg).await?;
        }
        Some("market") => {
            let doc = report::build_market_report(&cfg).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        _ => {
            let doc = report::build_token_report(&cfg).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}
