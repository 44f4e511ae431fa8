// ===============================
// src/lib.rs
// ===============================
//
// ladder_bot: market making ladder + simulasi fill lokal.
//
// Urutan dependensi (daun dulu):
//   domain, error -> orders -> positions (balance) -> gateway (fill sim)
//   -> strategy -> feed -> bot (loop trading)
//
pub mod bot;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod gateway;        // local fill simulator (tidak ada venue sungguhan)
pub mod metrics;
pub mod orders;
pub mod positions;      // balance tracker + reporter loop
pub mod recorder;
pub mod strategy;
