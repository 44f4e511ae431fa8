// ===============================
// src/metrics.rs
// ===============================
use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::{
    header::CONTENT_TYPE,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use tracing::{error, info};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Trading loop --------
pub static TICKS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("ticks_total", "trading loop iterations").unwrap());

pub static TICK_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tick_errors_total", "ticks abandoned because of an error"),
        &["kind"],
    )
    .unwrap()
});

pub static STRATEGY_RUNS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("strategy_runs_total", "strategy runs on a two-sided book").unwrap()
});

// -------- Orders --------
pub static ORDERS_PLACED: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("orders_placed_total", "orders placed by the strategy").unwrap());

pub static ORDERS_CLOSED: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("orders_closed_total", "orders closed by inventory pruning").unwrap());

pub static FILLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fills_total", "locally simulated fills"),
        &["side"],
    )
    .unwrap()
});

pub static OPEN_ORDERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("open_orders", "open orders per side"), &["side"]).unwrap()
});

pub static TOTAL_ORDERS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("orders_total", "orders ever placed (any status)").unwrap());

// -------- Market & balance --------
pub static BEST_BID: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("market_best_bid", "best market bid").unwrap());

pub static BEST_ASK: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("market_best_ask", "best market ask").unwrap());

pub static BALANCE_BASE: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("balance_base", "estimated base asset balance").unwrap());

pub static BALANCE_QUOTE: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("balance_quote", "estimated quote asset balance").unwrap());

// ---- Config visibility ----
pub static CONFIG_FEED_MODE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_feed_mode", "feed mode (label: mode)"),
        &["mode"],
    )
    .unwrap()
});

pub static CONFIG_SYMBOL: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_symbol", "configured symbol (label: symbol)"),
        &["symbol"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(TICKS.clone())),
        REGISTRY.register(Box::new(TICK_ERRORS.clone())),
        REGISTRY.register(Box::new(STRATEGY_RUNS.clone())),
        REGISTRY.register(Box::new(ORDERS_PLACED.clone())),
        REGISTRY.register(Box::new(ORDERS_CLOSED.clone())),
        REGISTRY.register(Box::new(FILLS.clone())),
        REGISTRY.register(Box::new(OPEN_ORDERS.clone())),
        REGISTRY.register(Box::new(TOTAL_ORDERS.clone())),
        REGISTRY.register(Box::new(BEST_BID.clone())),
        REGISTRY.register(Box::new(BEST_ASK.clone())),
        REGISTRY.register(Box::new(BALANCE_BASE.clone())),
        REGISTRY.register(Box::new(BALANCE_QUOTE.clone())),
        // Config visibility
        REGISTRY.register(Box::new(CONFIG_FEED_MODE.clone())),
        REGISTRY.register(Box::new(CONFIG_SYMBOL.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

async fn handle(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let mut rsp = Response::new(Body::from(encode_metrics()));
    rsp.headers_mut().insert(
        CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    Ok(rsp)
}

/// Serve every path (/, /metrics) with the registry dump. Port 0 disables the server.
pub async fn serve_metrics(port: u16) {
    if port == 0 {
        info!("metrics server disabled");
        return;
    }
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(handle)) });

    let server = match Server::try_bind(&addr) {
        Ok(b) => b.serve(make_svc),
        Err(e) => {
            error!(?e, %addr, "metrics bind failed");
            return;
        }
    };
    info!(%addr, "metrics listening (/ and /metrics)");
    if let Err(e) = server.await {
        error!(?e, "metrics server error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        init();
        TICKS.inc();
        let text = String::from_utf8(encode_metrics()).unwrap();
        assert!(text.contains("ticks_total"));
    }
}
