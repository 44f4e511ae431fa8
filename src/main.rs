// ===============================
// src/main.rs
// ===============================
/*
 cd ladder_bot

 # konfigurasi yang aktif
curl -s localhost:9898/metrics | egrep '^config_(feed_mode|symbol)'

# aktivitas bot
curl -s localhost:9898/metrics | egrep '^(ticks_total|fills_total|open_orders|balance_)'

*/
/*
=============================================================================
Project : ladder_bot — async market-making bot in Rust
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Polls an order book (mock/HTTP), places a ladder of bids and asks
          around the best prices, simulates fills locally, estimates
          balances from filled orders, exposes Prometheus metrics, and
          records JSONL events.

=============================================================================
*/
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ladder_bot::{
    bot::{Bot, BotCfg, Lifecycle},
    config::{self, Args, FeedMode},
    domain::Event,
    feed::{BookFeed, HttpBookFeed, MockBookFeed},
    metrics, orders::OrderStore,
    positions::{self, BalanceTracker},
    recorder,
    strategy::LadderStrategy,
};

#[tokio::main]
async fn main() {
    // ---- Logging ----
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ---- Load config ----
    let args = match config::load() {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };
    let params = args.ladder_params();

    // ---- Metrics ----
    metrics::init();
    tokio::spawn(metrics::serve_metrics(args.metrics_port));

    info!(
        feed_mode = args.feed_mode.as_str(),
        symbol = %args.symbol,
        precision = %args.precision,
        initial_base = args.initial_base,
        initial_quote = args.initial_quote,
        depth = params.depth,
        tolerance = params.tolerance,
        ask_jitter = params.ask_jitter,
        amount = params.amount,
        tick_ms = args.tick_interval_ms,
        balance_ms = args.balance_interval_ms,
        "startup config"
    );
    metrics::CONFIG_FEED_MODE.with_label_values(&[args.feed_mode.as_str()]).set(1);
    metrics::CONFIG_SYMBOL.with_label_values(&[&args.symbol]).set(1);

    // ---- Recorder (optional) ----
    let rec_tx = args.record_file.clone().map(|path| {
        let (tx, rx) = mpsc::channel::<Event>(8192);
        tokio::spawn(recorder::run(rx, path));
        let _ = tx.try_send(Event::Note(format!("startup symbol={} feed={}", args.symbol, args.feed_mode.as_str())));
        tx
    });

    // ---- Shared state ----
    let store = Arc::new(Mutex::new(OrderStore::new()));
    let tracker = BalanceTracker::new(args.initial_base, args.initial_quote);
    let lifecycle = Lifecycle::new();
    lifecycle.start();

    // ---- Balance reporter ----
    let reporter = tokio::spawn(positions::run_reporter(
        tracker,
        store.clone(),
        args.balance_interval(),
        lifecycle.clone(),
        rec_tx.clone(),
    ));

    // ---- Trading loop ----
    let strategy = LadderStrategy::new(params);
    let trading = match args.feed_mode {
        FeedMode::Mock => spawn_bot(&args, MockBookFeed::new(350.0), strategy, store, tracker, &lifecycle, rec_tx),
        FeedMode::Http => {
            let feed = HttpBookFeed::new(args.book_url.clone());
            spawn_bot(&args, feed, strategy, store, tracker, &lifecycle, rec_tx)
        }
    };

    // ---- Shutdown: Ctrl-C -> stop, tick yang sedang jalan diselesaikan ----
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(?e, "ctrl_c listener failed");
    }
    info!("shutdown requested");
    lifecycle.stop();
    if let Err(e) = trading.await {
        error!(?e, "trading task failed");
    }
    reporter.abort();
}

fn spawn_bot<F: BookFeed + 'static>(
    args: &Args,
    feed: F,
    strategy: LadderStrategy,
    store: Arc<Mutex<OrderStore>>,
    tracker: BalanceTracker,
    lifecycle: &Lifecycle,
    rec_tx: Option<mpsc::Sender<Event>>,
) -> tokio::task::JoinHandle<()> {
    let cfg = BotCfg {
        symbol: args.symbol.clone(),
        precision: args.precision.clone(),
        interval: args.tick_interval(),
    };
    let mut bot = Bot::new(cfg, feed, strategy, store, tracker, lifecycle.clone());
    if let Some(tx) = rec_tx {
        bot = bot.with_recorder(tx);
    }
    tokio::spawn(bot.run())
}
