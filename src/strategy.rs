// ===============================
// src/strategy.rs
// ===============================
//
// Strategi market making "ladder":
//   1) book kosong di salah satu sisi      -> skip
//   2) rapikan inventory: sisakan N bid tertinggi & N ask terendah, sisanya Closed
//   3) cek dana (base & quote) terhadap threshold
//   4) pasang N pasang Bid/Ask di sekitar best price dengan jitter ±tolerance
//
// Best price selalu lewat MarketSnapshot::best_bid()/best_ask() (bid terbaik = elemen
// terakhir, ask terbaik = elemen pertama).
//

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::domain::{MarketSnapshot, OrderPatch, OrderQuery, OrderStatus, Side};
use crate::error::BotError;
use crate::metrics::{ORDERS_CLOSED, ORDERS_PLACED, STRATEGY_RUNS};
use crate::orders::OrderStore;
use crate::positions::BalanceTracker;

pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Returns `Ok(true)` when new orders were placed, `Ok(false)` when skipped.
    fn execute(
        &mut self,
        store: &mut OrderStore,
        tracker: &BalanceTracker,
        snapshot: &MarketSnapshot,
    ) -> Result<bool, BotError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderParams {
    /// Pairs placed per run, also the number of open orders kept per side.
    pub depth: usize,
    pub tolerance: f64,
    /// Price jitter around the best ask; never wider than `tolerance`.
    pub ask_jitter: f64,
    /// Base order size.
    pub amount: f64,
}

impl LadderParams {
    pub fn new(amount: f64) -> Self {
        Self { depth: 5, tolerance: 0.05, ask_jitter: 0.05, amount }
    }

    pub fn required_base(&self) -> f64 {
        self.amount * self.depth as f64 * self.tolerance
    }

    pub fn required_quote(&self, best_ask_px: f64) -> f64 {
        self.amount * best_ask_px * self.depth as f64 * self.tolerance
    }
}

/// Uniform draw in `center·(1 ± range)`.
pub fn jitter<R: Rng>(rng: &mut R, center: f64, range: f64) -> f64 {
    let a = center * (1.0 - range);
    let b = center * (1.0 + range);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    rng.gen_range(lo..=hi)
}

pub struct LadderStrategy {
    params: LadderParams,
    rng: StdRng,
}

impl LadderStrategy {
    pub fn new(params: LadderParams) -> Self {
        Self { params, rng: StdRng::from_entropy() }
    }

    pub fn with_seed(params: LadderParams, seed: u64) -> Self {
        Self { params, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn params(&self) -> &LadderParams { &self.params }

    /// The 2·depth quotes of one run, in placement order: Bid, Ask, Bid, Ask, ...
    pub fn ladder(&mut self, best_bid_px: f64, best_ask_px: f64) -> Vec<(Side, f64, f64)> {
        let p = self.params;
        let mut out = Vec::with_capacity(p.depth * 2);
        for _ in 0..p.depth {
            let bid_px = jitter(&mut self.rng, best_bid_px, p.tolerance);
            let bid_qty = jitter(&mut self.rng, p.amount, p.tolerance);
            out.push((Side::Bid, bid_px, bid_qty));

            let ask_px = jitter(&mut self.rng, best_ask_px, p.ask_jitter);
            let ask_qty = jitter(&mut self.rng, p.amount, p.tolerance);
            out.push((Side::Ask, ask_px, ask_qty));
        }
        out
    }

    /// Close every open order beyond the `depth` nearest to the market on each side.
    fn prune(&self, store: &mut OrderStore) {
        let mut bids = store.find_all_by_example(&OrderQuery::open(Side::Bid));
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        let mut asks = store.find_all_by_example(&OrderQuery::open(Side::Ask));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));

        let stale = bids.iter().skip(self.params.depth).chain(asks.iter().skip(self.params.depth));
        for o in stale {
            if store.update(&o.id, OrderPatch::status(OrderStatus::Closed)) {
                debug!(id = %o.id, side = %o.side, px = o.price, "CLOSED");
                ORDERS_CLOSED.inc();
            }
        }
    }
}

impl Strategy for LadderStrategy {
    fn name(&self) -> &'static str { "ladder" }

    fn execute(
        &mut self,
        store: &mut OrderStore,
        tracker: &BalanceTracker,
        snapshot: &MarketSnapshot,
    ) -> Result<bool, BotError> {
        let (Some(best_bid), Some(best_ask)) = (snapshot.best_bid(), snapshot.best_ask()) else {
            return Ok(false);
        };
        let (best_bid_px, best_ask_px) = (best_bid.price(), best_ask.price());
        STRATEGY_RUNS.inc();

        self.prune(store);

        let balance = tracker.get_balance(store)?;
        let need_base = self.params.required_base();
        let need_quote = self.params.required_quote(best_ask_px);
        if balance.base < need_base || balance.quote < need_quote {
            info!(base = balance.base, quote = balance.quote, need_base, need_quote, "skip strategy: missing funds");
            return Ok(false);
        }

        for (side, px, qty) in self.ladder(best_bid_px, best_ask_px) {
            store.create(side, px, qty);
            ORDERS_PLACED.inc();
        }
        info!(best_bid = best_bid_px, best_ask = best_ask_px, pairs = self.params.depth, "ladder placed");
        Ok(true)
    }
}
