//! Arbitrage bounds for matched cross-venue pairs.
//!
//! This module handles:
//! - No-loss ratio interval and recommended multiplier per pair
//! - Filtering pairs into the emitted result set

pub mod aggregator;
pub mod calculator;

pub use aggregator::{
    aggregate, assess, AggregateOutcome, AggregatorConfig, ArbitrageRecord, PairAssessment,
};
pub use calculator::{
    calculate_bound, ArbitrageBound, CalculatorConfig, Multiplier, MultiplierPolicy, VenueQuote,
};
