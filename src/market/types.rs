//! Venue, contract and raw listing types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use time::{Date, OffsetDateTime};

/// Prediction-market venue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// Venue A.
    #[strum(to_string = "kalshi", serialize = "KALSHI")]
    Kalshi,
    /// Venue B.
    #[strum(to_string = "polymarket", serialize = "POLYMARKET", serialize = "poly")]
    Polymarket,
}

/// One binary-outcome instrument on one venue, venue-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    /// Source venue.
    pub venue: Venue,
    /// Venue-native identifier (ticker or market id).
    pub id: String,
    /// Human-readable label.
    pub title: Option<String>,
    /// Numeric threshold of the event.
    pub strike: Option<Decimal>,
    /// Expiration calendar date.
    pub expiration_date: Option<Date>,
    /// Implied probability of "yes", in [0, 1].
    pub yes_price: Option<Decimal>,
    /// Dollars invested, used only as a weighting signal.
    pub volume: Decimal,
}

impl Contract {
    /// Strike and expiration, when the contract can take part in matching.
    pub fn match_key(&self) -> Option<(Decimal, Date)> {
        Some((self.strike?, self.expiration_date?))
    }
}

/// Kalshi market object from `GET /markets`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KalshiMarket {
    /// Market ticker.
    pub ticker: Option<String>,
    /// Parent event ticker.
    pub event_ticker: Option<String>,
    /// Market title.
    pub title: Option<String>,
    /// Lower strike (number or numeric string).
    pub floor_strike: Option<Value>,
    /// Upper strike (number or numeric string).
    pub ceiling_strike: Option<Value>,
    /// Strike type (e.g. "greater").
    pub strike_type: Option<String>,
    /// Expected expiration timestamp (ISO-8601).
    pub expected_expiration_time: Option<String>,
    /// Close timestamp (ISO-8601).
    pub close_time: Option<String>,
    /// Best yes ask, in cents.
    pub yes_ask: Option<Value>,
    /// Last traded price, in cents.
    pub last_price: Option<Value>,
    /// Contract notional, in cents.
    pub notional_value: Option<Value>,
    /// Contracts traded.
    pub volume: Option<Value>,
}

/// Kalshi `GET /markets` page.
#[derive(Debug, Clone, Deserialize)]
pub struct KalshiMarketsPage {
    /// Markets on this page.
    #[serde(default)]
    pub markets: Vec<KalshiMarket>,
    /// Cursor for the next page, empty when done.
    pub cursor: Option<String>,
}

/// Polymarket Gamma market object from `GET /markets`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolymarketMarket {
    /// Market id (string or number).
    pub id: Option<Value>,
    /// Market question.
    pub question: Option<String>,
    /// Short label within a grouped event (often the strike).
    #[serde(rename = "groupItemTitle")]
    pub group_item_title: Option<String>,
    /// End date (date or ISO-8601 timestamp).
    #[serde(rename = "endDateIso")]
    pub end_date_iso: Option<String>,
    /// End timestamp (ISO-8601).
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    /// JSON-encoded array of outcome prices, yes first.
    #[serde(rename = "outcomePrices")]
    pub outcome_prices: Option<String>,
    /// Last traded price.
    #[serde(rename = "lastTradePrice")]
    pub last_trade_price: Option<Value>,
    /// Traded volume as a number.
    #[serde(rename = "volumeNum")]
    pub volume_num: Option<Value>,
    /// Traded volume as a string.
    pub volume: Option<Value>,
}

/// Raw listings of both venues captured in one fetch cycle.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// Venue A listings, in venue order.
    pub kalshi: Vec<KalshiMarket>,
    /// Venue B listings, in venue order.
    pub polymarket: Vec<PolymarketMarket>,
    /// When the snapshot was taken.
    pub captured_at: OffsetDateTime,
}

impl MarketSnapshot {
    /// Build a snapshot stamped with the current time.
    pub fn new(kalshi: Vec<KalshiMarket>, polymarket: Vec<PolymarketMarket>) -> Self {
        Self {
            kalshi,
            polymarket,
            captured_at: OffsetDateTime::now_utc(),
        }
    }
}
