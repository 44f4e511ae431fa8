// ===============================
// src/domain.rs
// ===============================
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque order identifier, assigned by the store at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for OrderId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Bid,
    Ask,
    /// Side string yang tidak dikenal (mis. dari journal eksternal).
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self { Side::Bid => "BID", Side::Ask => "ASK", Side::Unknown => "UNKNOWN" };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus { Open, Filled, Closed }

impl OrderStatus {
    /// Open -> Filled | Closed, nothing else. Same-status is a no-op and allowed.
    pub fn can_become(self, next: OrderStatus) -> bool {
        self == next || (self == OrderStatus::Open && next != OrderStatus::Open)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self { OrderStatus::Open => "OPEN", OrderStatus::Filled => "FILLED", OrderStatus::Closed => "CLOSED" };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: f64,
    pub amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for `OrderStore::update`.
///
/// `id`, `side` and `created_at` may be supplied but are always ignored:
/// the store re-asserts them from the existing record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub id: Option<OrderId>,
    pub side: Option<Side>,
    pub created_at: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    pub amount: Option<f64>,
    pub status: Option<OrderStatus>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }
}

/// Query-by-example: every `Some` field must match exactly, `None` is unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    pub id: Option<OrderId>,
    pub side: Option<Side>,
    pub status: Option<OrderStatus>,
    pub price: Option<f64>,
    pub amount: Option<f64>,
}

impl OrderQuery {
    pub fn side(mut self, side: Side) -> Self { self.side = Some(side); self }
    pub fn status(mut self, status: OrderStatus) -> Self { self.status = Some(status); self }
    pub fn price(mut self, price: f64) -> Self { self.price = Some(price); self }
    pub fn amount(mut self, amount: f64) -> Self { self.amount = Some(amount); self }

    pub fn open(side: Side) -> Self { Self::default().side(side).status(OrderStatus::Open) }

    pub fn matches(&self, o: &Order) -> bool {
        self.id.map_or(true, |v| v == o.id)
            && self.side.map_or(true, |v| v == o.side)
            && self.status.map_or(true, |v| v == o.status)
            && self.price.map_or(true, |v| v == o.price)
            && self.amount.map_or(true, |v| v == o.amount)
    }
}

// Market data: satu level = (id, price, signed size), size > 0 bid, size < 0 ask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLevel(pub u64, pub f64, pub f64);

impl RawLevel {
    pub fn id(&self) -> u64 { self.0 }
    pub fn price(&self) -> f64 { self.1 }
    pub fn size(&self) -> f64 { self.2 }
}

/// Order book snapshot partitioned by the sign of size.
///
/// Book convention: the best bid is the LAST element of `bids`, the best ask
/// is the FIRST element of `asks`. Every consumer goes through
/// [`MarketSnapshot::best_bid`] / [`MarketSnapshot::best_ask`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
}

impl MarketSnapshot {
    pub fn from_raw(levels: impl IntoIterator<Item = RawLevel>) -> Self {
        let mut snap = Self::default();
        for lvl in levels {
            if lvl.size() > 0.0 {
                snap.bids.push(lvl);
            } else if lvl.size() < 0.0 {
                snap.asks.push(lvl);
            }
        }
        snap
    }

    pub fn best_bid(&self) -> Option<&RawLevel> { self.bids.last() }
    pub fn best_ask(&self) -> Option<&RawLevel> { self.asks.first() }

    pub fn is_two_sided(&self) -> bool { !self.bids.is_empty() && !self.asks.is_empty() }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance { pub base: f64, pub quote: f64 }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRef { pub side: Side, pub price: f64 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub best_market_bid: f64,
    pub best_market_ask: f64,
    pub nearest_open_bid: Option<PriceRef>,
    pub nearest_open_ask: Option<PriceRef>,
    pub open_bid_prices: String,
    pub open_ask_prices: String,
}

/// Journal events (JSONL recorder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Book { ts: DateTime<Utc>, best_bid: f64, best_ask: f64 },
    Filled(Order),
    Status(StatusReport),
    Balance { ts: DateTime<Utc>, balance: Balance },
    Note(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> MarketSnapshot {
        MarketSnapshot::from_raw([
            RawLevel(52648214807, 366.85, 15.0),
            RawLevel(52648237268, 366.98, -1.20136689),
            RawLevel(52648236451, 366.84828504, 6.8155),
            RawLevel(52648229021, 367.12, -6.7987),
            RawLevel(52648229024, 366.84, 40.7921),
            RawLevel(52647623549, 367.124450634, -1.39725),
        ])
    }

    #[test]
    fn partition_by_sign_keeps_relative_order() {
        let b = book();
        let bid_px: Vec<f64> = b.bids.iter().map(|l| l.price()).collect();
        let ask_px: Vec<f64> = b.asks.iter().map(|l| l.price()).collect();
        assert_eq!(bid_px, vec![366.85, 366.84828504, 366.84]);
        assert_eq!(ask_px, vec![366.98, 367.12, 367.124450634]);
    }

    #[test]
    fn zero_size_levels_are_dropped() {
        let b = MarketSnapshot::from_raw([RawLevel(1, 10.0, 0.0), RawLevel(2, 11.0, 1.0)]);
        assert_eq!(b.bids.len(), 1);
        assert!(b.asks.is_empty());
        assert!(!b.is_two_sided());
    }

    #[test]
    fn best_bid_is_last_and_best_ask_is_first() {
        let b = book();
        assert_eq!(b.best_bid().map(|l| l.price()), Some(366.84));
        assert_eq!(b.best_ask().map(|l| l.price()), Some(366.98));
    }

    #[test]
    fn empty_book_has_no_best_prices() {
        let b = MarketSnapshot::default();
        assert!(b.best_bid().is_none());
        assert!(b.best_ask().is_none());
    }

    #[test]
    fn status_transitions_are_one_way() {
        use OrderStatus::*;
        assert!(Open.can_become(Filled));
        assert!(Open.can_become(Closed));
        assert!(!Filled.can_become(Open));
        assert!(!Filled.can_become(Closed));
        assert!(!Closed.can_become(Filled));
        assert!(Closed.can_become(Closed));
    }

    #[test]
    fn unknown_side_string_decodes_to_unknown() {
        let s: Side = serde_json::from_str("\"MARKET\"").unwrap();
        assert_eq!(s, Side::Unknown);
        let s: Side = serde_json::from_str("\"ASK\"").unwrap();
        assert_eq!(s, Side::Ask);
    }
}
