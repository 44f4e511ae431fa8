// ===============================
// src/orders.rs (in-memory order store)
// ===============================
//
// Semua order hidup di memori selama proses berjalan:
// - dipartisi per side (ask, bid, lainnya) dengan urutan insert terjaga,
// - index id -> (bucket, posisi) pakai AHashMap,
// - order tidak pernah dihapus; Filled/Closed tetap bisa di-query.
//
use ahash::AHashMap as HashMap;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{Order, OrderId, OrderPatch, OrderQuery, OrderStatus, Side};

const ASKS: usize = 0;
const BIDS: usize = 1;
const OTHER: usize = 2;

fn bucket_of(side: Side) -> usize {
    match side {
        Side::Ask => ASKS,
        Side::Bid => BIDS,
        Side::Unknown => OTHER,
    }
}

#[derive(Debug, Default)]
pub struct OrderStore {
    buckets: [Vec<Order>; 3],
    index: HashMap<OrderId, (usize, usize)>,
}

impl OrderStore {
    pub fn new() -> Self { Self::default() }

    /// Place a new Open order and return its id. Price/amount are not validated.
    pub fn create(&mut self, side: Side, price: f64, amount: f64) -> OrderId {
        let mut id = OrderId::new();
        while self.index.contains_key(&id) {
            id = OrderId::new();
        }
        let now = Utc::now();
        let order = Order {
            id,
            side,
            price,
            amount,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        };

        let b = bucket_of(side);
        self.index.insert(id, (b, self.buckets[b].len()));
        self.buckets[b].push(order);
        info!(%side, price, amount, %id, "PLACE");
        id
    }

    /// Merge `patch` over an existing order. Returns false for an unknown id.
    ///
    /// `id`, `side` and `created_at` always come from the stored record, and
    /// the status only moves Open -> Filled | Closed.
    pub fn update(&mut self, id: &OrderId, patch: OrderPatch) -> bool {
        let Some(&(b, i)) = self.index.get(id) else {
            return false;
        };
        let OrderPatch { id: _, side: _, created_at: _, price, amount, status } = patch;

        let order = &mut self.buckets[b][i];
        if let Some(px) = price {
            order.price = px;
        }
        if let Some(qty) = amount {
            order.amount = qty;
        }
        if let Some(next) = status {
            if order.status.can_become(next) {
                order.status = next;
            } else {
                warn!(%id, from = %order.status, to = %next, "illegal status transition ignored");
            }
        }
        order.updated_at = Utc::now();
        debug!(%id, status = %order.status, side = %order.side, price = order.price, amount = order.amount, "order updated");
        true
    }

    pub fn find(&self, id: &OrderId) -> Option<Order> {
        self.index.get(id).map(|&(b, i)| self.buckets[b][i].clone())
    }

    /// Asks first, then bids, insertion order within each side.
    pub fn find_all(&self) -> Vec<Order> {
        self.iter().cloned().collect()
    }

    pub fn find_all_by_example(&self, example: &OrderQuery) -> Vec<Order> {
        self.iter().filter(|o| example.matches(o)).cloned().collect()
    }

    pub fn count_by_example(&self, example: &OrderQuery) -> usize {
        self.iter().filter(|o| example.matches(o)).count()
    }

    pub fn len(&self) -> usize { self.index.len() }

    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    fn iter(&self) -> impl Iterator<Item = &Order> {
        self.buckets[ASKS]
            .iter()
            .chain(self.buckets[BIDS].iter())
            .chain(self.buckets[OTHER].iter())
    }
}
