//! Cross-venue arbitrage scanner for Kalshi and Polymarket binary markets.
//!
//! The two venues list the same events ("will BTC be above $X on date Y")
//! under different tickers and price conventions. This library pairs each
//! Kalshi contract with its Polymarket counterpart and computes the range of
//! contract-count ratios that profits whichever way the event resolves.
//!
//! # Strategy
//!
//! Buy one "yes" where it is cheaper (`P_L`) and `m` "no" contracts on the
//! other venue (`P_H`). Both outcomes pay when:
//!
//! ```text
//! P_L / P_H  <  m  <  (1 - P_L) / (1 - P_H)
//!
//! Kalshi yes:     0.40
//! Polymarket yes: 0.60
//! ─────────────────────
//! 0.667 < m < 1.5, equal-profit m = 1.0, edge 0.20 per yes contract
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Venue listings, parsing, normalization and fetch client
//! - [`matching`]: One-to-one contract matching by date and strike
//! - [`arbitrage`]: Ratio interval, recommended multiplier and filtering
//! - [`pipeline`]: One analysis cycle over a snapshot
//! - [`report`]: JSON output and terminal table
//! - [`metrics`]: Prometheus counters and histograms
//! - [`utils`]: Utility functions

pub mod arbitrage;
pub mod config;
pub mod error;
pub mod market;
pub mod matching;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use config::Config;
pub use error::{ArbError, Result};
pub use pipeline::{AnalysisConfig, CycleReport, CycleStats, Pipeline};
