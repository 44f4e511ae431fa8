// ===============================
// src/gateway.rs (local fill simulator)
// ===============================
//
// Tidak ada venue sungguhan: order lokal dianggap tereksekusi kalau harganya
// lebih agresif dari best price pasar saat ini.
//   - Bid Open dengan price >  best bid -> Filled
//   - Ask Open dengan price <  best ask -> Filled
// Tidak ada partial fill; tiap update berdiri sendiri (tanpa rollback batch).
//
use tracing::{info, warn};

use crate::domain::{Order, OrderPatch, OrderQuery, OrderStatus, Side};
use crate::metrics::FILLS;
use crate::orders::OrderStore;
use crate::positions::fill_delta;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFillSimulator;

impl LocalFillSimulator {
    pub fn new() -> Self { Self }

    /// Fill every local order priced through the market.
    ///
    /// Returns the matched orders as they were before the transition, asks
    /// first, then bids, in store scan order.
    pub fn match_orders(&self, store: &mut OrderStore, best_bid_px: f64, best_ask_px: f64) -> Vec<Order> {
        let filled_bids = store
            .find_all_by_example(&OrderQuery::open(Side::Bid))
            .into_iter()
            .filter(|o| o.price > best_bid_px);
        let filled_asks = store
            .find_all_by_example(&OrderQuery::open(Side::Ask))
            .into_iter()
            .filter(|o| o.price < best_ask_px);

        let filled: Vec<Order> = filled_asks.chain(filled_bids).collect();

        for o in &filled {
            if !store.update(&o.id, OrderPatch::status(OrderStatus::Filled)) {
                warn!(id = %o.id, "fill: order vanished before update");
                continue;
            }
            match fill_delta(o) {
                Ok((base, quote)) => {
                    info!(side = %o.side, px = o.price, qty = o.amount, base_delta = base, quote_delta = quote, "FILLED")
                }
                Err(e) => warn!(side = %o.side, px = o.price, qty = o.amount, error = %e, "FILLED without balance delta"),
            }
            FILLS.with_label_values(&[side_label(o.side)]).inc();
        }
        filled
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Bid => "bid",
        Side::Ask => "ask",
        Side::Unknown => "unknown",
    }
}
