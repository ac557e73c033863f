//! Unified error types for the cross-venue arbitrage scanner.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::market::Venue;

/// Unified error type for the scanner.
#[derive(Error, Debug)]
pub enum ArbError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Venue fetch error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid configuration values. Always fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Strike tolerance below zero.
    #[error("MAX_STRIKE_DIFF must be non-negative, got {0}")]
    NegativeStrikeTolerance(Decimal),

    /// Skew weight outside [0, 1].
    #[error("MAX_SKEW must be within [0, 1], got {0}")]
    SkewOutOfRange(Decimal),

    /// Sanity ceiling not strictly positive.
    #[error("SANITY_CEILING must be positive, got {0}")]
    InvalidSanityCeiling(Decimal),

    /// Lookahead window not strictly positive.
    #[error("LOOKAHEAD_DAYS must be within 1..=3650, got {0}")]
    InvalidLookahead(i64),

    /// A count or interval that must be non-zero is zero.
    #[error("{name} must be greater than zero")]
    Zero {
        /// Environment variable name.
        name: &'static str,
    },

    /// Question pattern does not compile.
    #[error("invalid POLYMARKET_QUESTION_PATTERN {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// Base URL does not parse.
    #[error("invalid {name} {url:?}: {reason}")]
    InvalidUrl {
        /// Environment variable name.
        name: &'static str,
        /// The offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },
}

/// Venue listing fetch errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Venue answered with a non-success status.
    #[error("failed to fetch {venue} markets: {reason}")]
    FetchFailed {
        /// Venue being fetched.
        venue: Venue,
        /// Reason for failure.
        reason: String,
    },

    /// Pagination did not terminate within the page cap.
    #[error("{venue} pagination exceeded {pages} pages")]
    PageLimitExceeded {
        /// Venue being fetched.
        venue: Venue,
        /// Page cap that was hit.
        pages: u32,
    },

    /// Failed to parse listing data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// A raw record that cannot become a matchable contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// No venue identifier on the record.
    #[error("{venue} record has no id")]
    MissingId {
        /// Source venue.
        venue: Venue,
    },

    /// No numeric strike in any strike-bearing field.
    #[error("{venue} record {id} has no strike")]
    MissingStrike {
        /// Source venue.
        venue: Venue,
        /// Venue identifier.
        id: String,
    },

    /// No expiration field present.
    #[error("{venue} record {id} has no expiration date")]
    MissingExpiration {
        /// Source venue.
        venue: Venue,
        /// Venue identifier.
        id: String,
    },

    /// Expiration field present but unparsable.
    #[error("{venue} record {id} has malformed expiration {raw:?}")]
    InvalidExpiration {
        /// Source venue.
        venue: Venue,
        /// Venue identifier.
        id: String,
        /// Raw field value.
        raw: String,
    },

    /// Same id already seen earlier in the batch.
    #[error("{venue} record {id} is a duplicate")]
    DuplicateId {
        /// Source venue.
        venue: Venue,
        /// Venue identifier.
        id: String,
    },
}

impl NormalizeError {
    /// Short label used as a metrics tag.
    pub fn reason(&self) -> &'static str {
        match self {
            NormalizeError::MissingId { .. } => "missing_id",
            NormalizeError::MissingStrike { .. } => "missing_strike",
            NormalizeError::MissingExpiration { .. } => "missing_expiration",
            NormalizeError::InvalidExpiration { .. } => "invalid_expiration",
            NormalizeError::DuplicateId { .. } => "duplicate_id",
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ArbError>;
