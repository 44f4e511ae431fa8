// ===============================
// src/feed.rs
// ===============================
//
// Market Data adapters (satu panggilan = satu snapshot order book):
// - MockBookFeed : random-walk generator, 3 level per sisi
// - HttpBookFeed : GET {base}/{symbol}/{precision}, payload Bitfinex v2
//                  [[id, price, amount], ...] (amount > 0 bid, < 0 ask)
//
// Tidak ada retry / backoff / cache di sini: error langsung naik ke tick.
//

use std::future::Future;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::domain::RawLevel;
use crate::error::FeedError;

pub trait BookFeed: Send {
    fn fetch_book(
        &mut self,
        symbol: &str,
        precision: &str,
    ) -> impl Future<Output = Result<Vec<RawLevel>, FeedError>> + Send;
}

/// Decode a raw book payload.
pub fn parse_book(body: &str) -> Result<Vec<RawLevel>, FeedError> {
    serde_json::from_str::<Vec<RawLevel>>(body).map_err(|e| FeedError::Decode(e.to_string()))
}

pub struct HttpBookFeed {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBookFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub fn url_for(&self, symbol: &str, precision: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), symbol, precision)
    }
}

impl BookFeed for HttpBookFeed {
    async fn fetch_book(&mut self, symbol: &str, precision: &str) -> Result<Vec<RawLevel>, FeedError> {
        let url = self.url_for(symbol, precision);
        debug!(%url, "fetching book");
        let rsp = self.http.get(&url).send().await?;
        let code = rsp.status();
        if !code.is_success() {
            return Err(FeedError::Status(code.as_u16()));
        }
        let body = rsp.text().await?;
        parse_book(&body)
    }
}

/// Random-walk book for offline runs.
pub struct MockBookFeed {
    rng: StdRng,
    mid: f64,
    next_id: u64,
}

impl MockBookFeed {
    pub fn new(start_mid: f64) -> Self {
        Self { rng: StdRng::from_entropy(), mid: start_mid, next_id: 1 }
    }

    pub fn with_seed(start_mid: f64, seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), mid: start_mid, next_id: 1 }
    }

    /// Bids ascending (best last), asks ascending (best first).
    fn step(&mut self) -> Vec<RawLevel> {
        let drift = self.rng.gen_range(-0.002..=0.002);
        self.mid = (self.mid * (1.0 + drift)).max(1.0);
        let spread = self.mid * 0.0002;

        let mut out = Vec::with_capacity(6);
        for k in (0..3).rev() {
            let px = self.mid - spread * (1 + k) as f64;
            let size = self.rng.gen_range(0.1..20.0);
            out.push(RawLevel(self.bump(), px, size));
        }
        for k in 0..3 {
            let px = self.mid + spread * (1 + k) as f64;
            let size = self.rng.gen_range(0.1..20.0);
            out.push(RawLevel(self.bump(), px, -size));
        }
        out
    }

    fn bump(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl BookFeed for MockBookFeed {
    async fn fetch_book(&mut self, _symbol: &str, _precision: &str) -> Result<Vec<RawLevel>, FeedError> {
        Ok(self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketSnapshot;

    #[test]
    fn parses_bitfinex_book_payload() {
        let body = r#"[[52648214807,366.85,15],[52648237268,366.98,-1.20136689],[52648229024,366.84,40.7921]]"#;
        let levels = parse_book(body).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[1], RawLevel(52648237268, 366.98, -1.20136689));
    }

    #[test]
    fn bad_payload_is_a_decode_error() {
        assert!(matches!(parse_book(r#"{"error":"rate limit"}"#), Err(FeedError::Decode(_))));
    }

    #[test]
    fn url_is_base_symbol_precision() {
        let feed = HttpBookFeed::new("https://example.test/book/");
        assert_eq!(feed.url_for("tETHUSD", "R0"), "https://example.test/book/tETHUSD/R0");
    }

    #[tokio::test]
    async fn mock_book_follows_book_convention() {
        let mut feed = MockBookFeed::with_seed(350.0, 42);
        for _ in 0..20 {
            let snap = MarketSnapshot::from_raw(feed.fetch_book("tETHUSD", "R0").await.unwrap());
            assert_eq!((snap.bids.len(), snap.asks.len()), (3, 3));
            let best_bid = snap.best_bid().unwrap().price();
            let best_ask = snap.best_ask().unwrap().price();
            assert!(snap.bids.iter().all(|l| l.price() <= best_bid));
            assert!(snap.asks.iter().all(|l| l.price() >= best_ask));
            assert!(best_bid < best_ask);
        }
    }
}
