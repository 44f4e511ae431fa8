// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : ladder_bot — async market-making bot in Rust
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Polls an order book (mock/HTTP), places a ladder of bids and asks
          around the best prices, simulates fills locally, estimates
          balances from filled orders, exposes Prometheus metrics, and
          records JSONL events.

=============================================================================
*/
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use std::time::Duration;

use crate::error::ConfigError;
use crate::strategy::LadderParams;

/// Sumber market data
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FeedMode {
    Mock,
    Http,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Mock => "mock",
            FeedMode::Http => "http",
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(name = "ladder_bot", version, about = "Ladder market-making bot with local fill simulation")]
pub struct Args {
    // ===== Market =====
    #[arg(long, env = "LADDER_SYMBOL", default_value = "tETHUSD")]
    pub symbol: String,
    /// Aggregation/precision parameter passed to the book endpoint.
    #[arg(long, env = "LADDER_PRECISION", default_value = "R0")]
    pub precision: String,
    #[arg(long, env = "LADDER_FEED_MODE", value_enum, default_value_t = FeedMode::Mock)]
    pub feed_mode: FeedMode,
    #[arg(long, env = "LADDER_BOOK_URL", default_value = "https://api.deversifi.com/bfx/v2/book")]
    pub book_url: String,

    // ===== Balances =====
    #[arg(long, env = "LADDER_INITIAL_BASE", default_value_t = 10.0)]
    pub initial_base: f64,
    #[arg(long, env = "LADDER_INITIAL_QUOTE", default_value_t = 2000.0)]
    pub initial_quote: f64,

    // ===== Strategy =====
    /// Base order size; defaults to initial base / 50.
    #[arg(long, env = "LADDER_ORDER_AMOUNT")]
    pub order_amount: Option<f64>,
    #[arg(long, env = "LADDER_DEPTH", default_value_t = 5)]
    pub ladder_depth: usize,
    #[arg(long, env = "LADDER_TOLERANCE", default_value_t = 0.05)]
    pub tolerance: f64,
    /// Ask price jitter; defaults to the tolerance.
    #[arg(long, env = "LADDER_ASK_JITTER")]
    pub ask_jitter: Option<f64>,

    // ===== Loops =====
    #[arg(long, env = "LADDER_TICK_INTERVAL_MS", default_value_t = 5_000)]
    pub tick_interval_ms: u64,
    #[arg(long, env = "LADDER_BALANCE_INTERVAL_MS", default_value_t = 30_000)]
    pub balance_interval_ms: u64,

    // ===== files/metrics =====
    #[arg(long, env = "LADDER_RECORD_FILE")]
    pub record_file: Option<String>,
    #[arg(long, env = "LADDER_METRICS_PORT", default_value_t = 9898)]
    pub metrics_port: u16,
}

impl Args {
    pub fn tick_interval(&self) -> Duration { Duration::from_millis(self.tick_interval_ms) }

    pub fn balance_interval(&self) -> Duration { Duration::from_millis(self.balance_interval_ms) }

    pub fn ladder_params(&self) -> LadderParams {
        LadderParams {
            depth: self.ladder_depth,
            tolerance: self.tolerance,
            ask_jitter: self.ask_jitter.unwrap_or(self.tolerance),
            amount: self.order_amount.unwrap_or(self.initial_base / 50.0),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.ladder_params();
        if p.depth == 0 {
            return Err(ConfigError::Depth);
        }
        for (name, value) in [("tolerance", p.tolerance), ("ask_jitter", p.ask_jitter)] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::Fraction { name, value });
            }
        }
        if p.ask_jitter > p.tolerance {
            return Err(ConfigError::AskJitter { jitter: p.ask_jitter, tolerance: p.tolerance });
        }
        if p.amount.is_nan() || p.amount <= 0.0 {
            return Err(ConfigError::NotPositive { name: "order_amount", value: p.amount });
        }
        Ok(())
    }
}

pub fn load() -> Result<Args, ConfigError> {
    // Pastikan .env dibaca dulu (agar LADDER_SYMBOL, LADDER_FEED_MODE, dll ter-load)
    let _ = dotenv();
    let args = Args::parse();
    args.validate()?;
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["ladder_bot"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_reference_setup() {
        let a = parse(&[]);
        assert_eq!(a.initial_base, 10.0);
        assert_eq!(a.initial_quote, 2000.0);
        assert_eq!(a.tick_interval(), Duration::from_millis(5_000));
        assert_eq!(a.balance_interval(), Duration::from_millis(30_000));
        let p = a.ladder_params();
        assert_eq!(p, LadderParams::new(0.2));
        assert!(a.validate().is_ok());
    }

    #[test]
    fn generic_env_names_are_ignored() {
        std::env::set_var("SYMBOL", "tBTCUSD");
        std::env::set_var("TOLERANCE", "0.5");
        let a = parse(&[]);
        assert_eq!(a.symbol, "tETHUSD");
        assert_eq!(a.tolerance, 0.05);
    }

    #[test]
    fn amount_follows_initial_base() {
        let a = parse(&["--initial-base", "100"]);
        assert_eq!(a.ladder_params().amount, 2.0);
        let a = parse(&["--initial-base", "100", "--order-amount", "0.5"]);
        assert_eq!(a.ladder_params().amount, 0.5);
    }

    #[test]
    fn ask_jitter_wider_than_tolerance_is_rejected() {
        let a = parse(&["--ask-jitter", "0.1"]);
        assert!(matches!(a.validate(), Err(ConfigError::AskJitter { .. })));
        let a = parse(&["--ask-jitter", "0.01"]);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn bad_tolerance_and_depth_are_rejected() {
        assert!(matches!(parse(&["--tolerance", "1.5"]).validate(), Err(ConfigError::Fraction { .. })));
        assert!(matches!(parse(&["--ladder-depth", "0"]).validate(), Err(ConfigError::Depth)));
    }
}
