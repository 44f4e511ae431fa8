// ===============================
// src/error.rs
// ===============================
use thiserror::Error;

/// Failure of the market data call. Ditangkap di batas tick.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("book request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("book endpoint returned HTTP {0}")]
    Status(u16),
    #[error("book payload decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("feed fetch failed: {0}")]
    FeedFetch(#[from] FeedError),
    /// Invariant violation in balance accounting; not recovered internally.
    #[error("unsupported order side {0}")]
    UnsupportedSide(String),
    #[error("order book has an empty side")]
    EmptyBook,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be in [0, 1), got {value}")]
    Fraction { name: &'static str, value: f64 },
    #[error("ask jitter {jitter} must not exceed tolerance {tolerance}")]
    AskJitter { jitter: f64, tolerance: f64 },
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("ladder depth must be at least 1")]
    Depth,
}
