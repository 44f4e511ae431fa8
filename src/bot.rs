// ===============================
// src/bot.rs (trading loop)
// ===============================
//
// Satu tick:
//   fetch book (await) -> strategy.execute -> status -> match_orders -> log
// Error apa pun di dalam tick ditangkap di batas tick, di-log, lalu loop
// lanjut setelah delay normal. stop() hanya dicek di awal iterasi berikutnya.
//
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{sync::mpsc, time::{sleep, Duration}};
use tracing::{error, info};

use crate::domain::{Event, MarketSnapshot, Order, OrderQuery, OrderStatus, PriceRef, Side, StatusReport};
use crate::error::BotError;
use crate::feed::BookFeed;
use crate::gateway::LocalFillSimulator;
use crate::metrics::{BEST_ASK, BEST_BID, OPEN_ORDERS, TICKS, TICK_ERRORS, TOTAL_ORDERS};
use crate::orders::OrderStore;
use crate::positions::BalanceTracker;
use crate::strategy::Strategy;

/// Shared start/stop flag, checked once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    running: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new() -> Self { Self::default() }
    pub fn start(&self) { self.running.store(true, Ordering::SeqCst); }
    pub fn stop(&self) { self.running.store(false, Ordering::SeqCst); }
    pub fn is_running(&self) -> bool { self.running.load(Ordering::SeqCst) }
}

#[derive(Debug, Clone)]
pub struct BotCfg {
    pub symbol: String,
    pub precision: String,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub placed: bool,
    pub status: StatusReport,
    pub filled: usize,
    pub open_orders: usize,
    pub total_orders: usize,
}

pub struct Bot<F, S> {
    cfg: BotCfg,
    feed: F,
    strategy: S,
    store: Arc<Mutex<OrderStore>>,
    tracker: BalanceTracker,
    simulator: LocalFillSimulator,
    lifecycle: Lifecycle,
    rec_tx: Option<mpsc::Sender<Event>>,
}

impl<F: BookFeed, S: Strategy> Bot<F, S> {
    pub fn new(
        cfg: BotCfg,
        feed: F,
        strategy: S,
        store: Arc<Mutex<OrderStore>>,
        tracker: BalanceTracker,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            cfg,
            feed,
            strategy,
            store,
            tracker,
            simulator: LocalFillSimulator::new(),
            lifecycle,
            rec_tx: None,
        }
    }

    pub fn with_recorder(mut self, rec_tx: mpsc::Sender<Event>) -> Self {
        self.rec_tx = Some(rec_tx);
        self
    }

    pub async fn run(mut self) {
        info!(symbol = %self.cfg.symbol, strategy = self.strategy.name(), interval_ms = self.cfg.interval.as_millis() as u64, "bot: started");
        while self.lifecycle.is_running() {
            TICKS.inc();
            match self.tick().await {
                Ok(r) => info!(
                    placed = r.placed,
                    best_bid = r.status.best_market_bid,
                    best_ask = r.status.best_market_ask,
                    nearest_bid = ?r.status.nearest_open_bid.map(|p| p.price),
                    nearest_ask = ?r.status.nearest_open_ask.map(|p| p.price),
                    bot_bids = %r.status.open_bid_prices,
                    bot_asks = %r.status.open_ask_prices,
                    filled = r.filled,
                    open_orders = r.open_orders,
                    orders = r.total_orders,
                    "tick"
                ),
                Err(e) => {
                    TICK_ERRORS.with_label_values(&[error_kind(&e)]).inc();
                    error!(error = %e, "tick skipped due to an error");
                }
            }
            sleep(self.cfg.interval).await;
        }
        info!("bot: stopped");
    }

    pub async fn tick(&mut self) -> Result<TickReport, BotError> {
        let raw = self.feed.fetch_book(&self.cfg.symbol, &self.cfg.precision).await?;
        let snapshot = MarketSnapshot::from_raw(raw);

        let mut store = self.store.lock();
        let placed = self.strategy.execute(&mut store, &self.tracker, &snapshot)?;

        let (Some(best_bid), Some(best_ask)) = (snapshot.best_bid(), snapshot.best_ask()) else {
            return Err(BotError::EmptyBook);
        };
        let (best_bid_px, best_ask_px) = (best_bid.price(), best_ask.price());
        BEST_BID.set(best_bid_px);
        BEST_ASK.set(best_ask_px);

        let status = status_report(&store, best_bid_px, best_ask_px);
        let filled = self.simulator.match_orders(&mut store, best_bid_px, best_ask_px);

        let open_bids = store.count_by_example(&OrderQuery::open(Side::Bid));
        let open_asks = store.count_by_example(&OrderQuery::open(Side::Ask));
        let open_orders = store.count_by_example(&OrderQuery::default().status(OrderStatus::Open));
        let total_orders = store.len();
        drop(store);

        OPEN_ORDERS.with_label_values(&["bid"]).set(open_bids as i64);
        OPEN_ORDERS.with_label_values(&["ask"]).set(open_asks as i64);
        TOTAL_ORDERS.set(total_orders as i64);

        if let Some(tx) = &self.rec_tx {
            let _ = tx.try_send(Event::Book { ts: Utc::now(), best_bid: best_bid_px, best_ask: best_ask_px });
            let _ = tx.try_send(Event::Status(status.clone()));
            for o in &filled {
                let _ = tx.try_send(Event::Filled(o.clone()));
            }
        }

        Ok(TickReport {
            placed,
            status,
            filled: filled.len(),
            open_orders,
            total_orders,
        })
    }
}

fn error_kind(e: &BotError) -> &'static str {
    match e {
        BotError::FeedFetch(_) => "feed",
        BotError::UnsupportedSide(_) => "unsupported_side",
        BotError::EmptyBook => "empty_book",
    }
}

/// Best market prices plus the bot's own open orders, ascending by price.
///
/// "Nearest" is the first entry of the ascending sort on both sides.
pub fn status_report(store: &OrderStore, best_bid_px: f64, best_ask_px: f64) -> StatusReport {
    let sorted = |side: Side| {
        let mut v = store.find_all_by_example(&OrderQuery::open(side));
        v.sort_by(|a, b| a.price.total_cmp(&b.price));
        v
    };
    let bids = sorted(Side::Bid);
    let asks = sorted(Side::Ask);
    let csv = |v: &[Order]| {
        v.iter().map(|o| o.price.to_string()).collect::<Vec<_>>().join(", ")
    };

    StatusReport {
        best_market_bid: best_bid_px,
        best_market_ask: best_ask_px,
        nearest_open_bid: bids.first().map(|o| PriceRef { side: o.side, price: o.price }),
        nearest_open_ask: asks.first().map(|o| PriceRef { side: o.side, price: o.price }),
        open_bid_prices: csv(&bids),
        open_ask_prices: csv(&asks),
    }
}
