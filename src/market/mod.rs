//! Venue listings and their normalization into contracts.
//!
//! This module handles:
//! - Venue and contract types, raw Kalshi/Polymarket listing shapes
//! - Free-text number and date extraction
//! - Series filtering and per-venue normalization
//! - Read-only listing fetch from both venues

pub mod client;
pub mod normalize;
pub mod parse;
pub mod types;

pub use client::{load_snapshot, read_listings, FetchConfig, VenueClient};
pub use normalize::{
    normalize_kalshi, normalize_kalshi_batch, normalize_polymarket, normalize_polymarket_batch,
    NormalizedBatch, SeriesFilter,
};
pub use parse::{extract_number, parse_expiration_date};
pub use types::{Contract, KalshiMarket, MarketSnapshot, PolymarketMarket, Venue};
