use axum::{extract::Query, http::StatusCode, response::Json, routing::get, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::models::{AlphalendSection, MarketReport, TokenReport};
use crate::report;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub rpc: Option<String>,
    pub no_fallback: Option<bool>,
    pub owner: Option<String>,
}

type ApiError = (StatusCode, Json<Value>);

pub async fn serve(cfg: Config) -> eyre::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "sui-tbtc-supply API running" }))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/tbtc", get({
            let cfg = cfg.clone();
            move |q: Query<ReportQuery>| {
                let cfg = cfg.clone();
                async move { token_report(cfg, q.0).await }
            }
        }))
        .route("/alphalend/tbtc", get({
            let cfg = cfg.clone();
            move |q: Query<ReportQuery>| {
                let cfg = cfg.clone();
                async move { market_report(cfg, q.0).await }
            }
        }))
        .route("/alphalend/tbtc/pooled", get({
            let cfg = cfg.clone();
            move |q: Query<ReportQuery>| {
                let cfg = cfg.clone();
                async move { pooled_balance(cfg, q.0).await }
            }
        }))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// Per-request overrides: the query parameters shadow the process config.
fn apply_overrides(mut cfg: Config, q: &ReportQuery) -> Config {
    if let Some(rpc) = &q.rpc {
        cfg.rpc_url = rpc.clone();
    }
    if q.no_fallback.unwrap_or(false) {
        cfg.allow_fallback = false;
    }
    if let Some(owner) = &q.owner {
        cfg.owner = Some(owner.clone());
    }
    cfg
}

async fn token_report(cfg: Config, q: ReportQuery) -> Result<Json<TokenReport>, ApiError> {
    let cfg = apply_overrides(cfg, &q);
    report::build_token_report(&cfg)
        .await
        .map(Json)
        .map_err(upstream_error)
}

async fn market_report(cfg: Config, q: ReportQuery) -> Result<Json<MarketReport>, ApiError> {
    let cfg = apply_overrides(cfg, &q);
    report::build_market_report(&cfg)
        .await
        .map(Json)
        .map_err(upstream_error)
}

// Pooled-balance subset of the market report; 404 when the market entry is
// absent.
async fn pooled_balance(cfg: Config, q: ReportQuery) -> Result<Json<Value>, ApiError> {
    let cfg = apply_overrides(cfg, &q);
    let doc = report::build_market_report(&cfg)
        .await
        .map_err(upstream_error)?;

    match doc.alphalend {
        AlphalendSection::Resolved {
            markets_table_id,
            market_object_id,
            balance_holding_raw,
            balance_holding_human,
            ..
        } => Ok(Json(json!({
            "coin_type": doc.coin_type,
            "markets_table_id": markets_table_id,
            "market_object_id": market_object_id,
            "balance_holding_raw": balance_holding_raw,
            "balance_holding_human": balance_holding_human,
        }))),
        AlphalendSection::Failed { error, markets_table_id } => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": error, "markets_table_id": markets_table_id })),
        )),
    }
}

fn upstream_error(e: eyre::Report) -> ApiError {
    (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() })))
}
