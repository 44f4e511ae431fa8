// ===============================
// src/positions.rs (balance tracker)
// ===============================
//
// Balance tidak disimpan; dihitung ulang tiap kali dari order Filled.
// O(n) per query — cukup untuk skala bot ini.
//
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{sync::mpsc, time::{sleep, Duration}};
use tracing::{error, info};

use crate::bot::Lifecycle;
use crate::domain::{Balance, Event, Order, OrderQuery, OrderStatus, Side};
use crate::error::BotError;
use crate::metrics::{BALANCE_BASE, BALANCE_QUOTE};
use crate::orders::OrderStore;

#[derive(Debug, Clone, Copy)]
pub struct BalanceTracker {
    initial: Balance,
}

impl BalanceTracker {
    pub fn new(initial_base: f64, initial_quote: f64) -> Self {
        Self { initial: Balance { base: initial_base, quote: initial_quote } }
    }

    pub fn initial(&self) -> Balance { self.initial }

    /// Fold Filled orders over the initial balance.
    pub fn get_balance(&self, store: &OrderStore) -> Result<Balance, BotError> {
        store
            .find_all_by_example(&OrderQuery::default().status(OrderStatus::Filled))
            .iter()
            .try_fold(self.initial, |memo, o| {
                let (d_base, d_quote) = fill_delta(o)?;
                Ok(Balance { base: memo.base + d_base, quote: memo.quote + d_quote })
            })
    }
}

/// (base, quote) delta of one filled order.
///
/// Both sides move base by `-amount`. For a Bid that means a buy *lowers*
/// base; the rule is kept as-is, see DESIGN.md "balance sign rule".
pub fn fill_delta(o: &Order) -> Result<(f64, f64), BotError> {
    let notional = (o.amount * o.price).abs();
    match o.side {
        Side::Ask => Ok((-o.amount, -notional)),
        Side::Bid => Ok((-o.amount, notional)),
        Side::Unknown => Err(BotError::UnsupportedSide(o.side.to_string())),
    }
}

/// Loop laporan balance: log + gauge + journal tiap `interval`.
pub async fn run_reporter(
    tracker: BalanceTracker,
    store: Arc<Mutex<OrderStore>>,
    interval: Duration,
    lifecycle: Lifecycle,
    rec_tx: Option<mpsc::Sender<Event>>,
) {
    info!(interval_ms = interval.as_millis() as u64, "balance reporter: started");
    while lifecycle.is_running() {
        let res = tracker.get_balance(&store.lock());
        match res {
            Ok(balance) => {
                info!(base = balance.base, quote = balance.quote, "balance");
                BALANCE_BASE.set(balance.base);
                BALANCE_QUOTE.set(balance.quote);
                if let Some(tx) = &rec_tx {
                    let _ = tx.try_send(Event::Balance { ts: Utc::now(), balance });
                }
            }
            Err(e) => error!(?e, "balance computation failed"),
        }
        sleep(interval).await;
    }
    info!("balance reporter: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderPatch;

    const B0: f64 = 10.0;
    const Q0: f64 = 2000.0;

    fn filled(store: &mut OrderStore, side: Side, price: f64, amount: f64) {
        let id = store.create(side, price, amount);
        store.update(&id, OrderPatch::status(OrderStatus::Filled));
    }

    #[test]
    fn no_fills_returns_initial_balance() {
        let tracker = BalanceTracker::new(B0, Q0);
        let mut store = OrderStore::new();
        store.create(Side::Bid, 300.0, 1.0);
        let id = store.create(Side::Ask, 300.0, -1.0);
        store.update(&id, OrderPatch::status(OrderStatus::Closed));

        let b = tracker.get_balance(&store).unwrap();
        assert_eq!(b, Balance { base: B0, quote: Q0 });
    }

    #[test]
    fn filled_ask_adds_base_and_spends_quote() {
        let tracker = BalanceTracker::new(B0, Q0);
        let mut store = OrderStore::new();
        filled(&mut store, Side::Ask, 300.0, -1.0);

        let b = tracker.get_balance(&store).unwrap();
        assert_eq!(b.base, B0 + 1.0);
        assert_eq!(b.quote, Q0 - 300.0);
    }

    #[test]
    fn filled_bid_follows_pinned_rule() {
        let tracker = BalanceTracker::new(B0, Q0);
        let mut store = OrderStore::new();
        filled(&mut store, Side::Bid, 300.0, 1.0);

        let b = tracker.get_balance(&store).unwrap();
        // base turun saat bid terisi: perilaku yang dipertahankan
        assert_eq!(b.base, B0 - 1.0);
        assert_eq!(b.quote, Q0 + 300.0);
    }

    #[test]
    fn fills_accumulate() {
        let tracker = BalanceTracker::new(B0, Q0);
        let mut store = OrderStore::new();
        filled(&mut store, Side::Ask, 200.0, -2.0);
        filled(&mut store, Side::Bid, 100.0, 1.0);

        let b = tracker.get_balance(&store).unwrap();
        assert_eq!(b.base, B0 + 2.0 - 1.0);
        assert_eq!(b.quote, Q0 - 400.0 + 100.0);
    }

    #[test]
    fn unknown_side_fill_is_an_error() {
        let tracker = BalanceTracker::new(B0, Q0);
        let mut store = OrderStore::new();
        filled(&mut store, Side::Unknown, 100.0, 1.0);

        let err = tracker.get_balance(&store).unwrap_err();
        assert!(matches!(err, BotError::UnsupportedSide(_)));
    }

    fn shared(store: OrderStore) -> Arc<Mutex<OrderStore>> { Arc::new(Mutex::new(store)) }

    #[tokio::test]
    async fn reporter_survives_unknown_side_and_stops_on_request() {
        let mut store = OrderStore::new();
        filled(&mut store, Side::Unknown, 100.0, 1.0);
        let lifecycle = Lifecycle::new();
        lifecycle.start();

        let handle = tokio::spawn(run_reporter(
            BalanceTracker::new(B0, Q0),
            shared(store),
            Duration::from_millis(5),
            lifecycle.clone(),
            None,
        ));
        sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());

        lifecycle.stop();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn reporter_journals_folded_balance() {
        let mut store = OrderStore::new();
        filled(&mut store, Side::Ask, 300.0, -1.0);
        let lifecycle = Lifecycle::new();
        lifecycle.start();
        let (tx, mut rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_reporter(
            BalanceTracker::new(B0, Q0),
            shared(store),
            Duration::from_millis(5),
            lifecycle.clone(),
            Some(tx),
        ));
        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        match ev {
            Event::Balance { balance, .. } => assert_eq!(balance, Balance { base: B0 + 1.0, quote: Q0 - 300.0 }),
            other => panic!("unexpected event {other:?}"),
        }

        lifecycle.stop();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
